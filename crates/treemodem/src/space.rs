//! Address-space handles and the manager contract the codecs decode
//! against.
//!
//! The marshaling layer never interprets an address space itself; it only
//! moves references to spaces across the wire. A basic space travels as a
//! dense integer index into the manager's table, a special space as one of
//! five enumerated codes. The [`SpaceManager`] trait is the resolution
//! contract; [`SpaceTable`] is the straightforward registry the driver side
//! uses.
//!
//! Handles returned by a manager are plain copies and remain meaningful for
//! as long as the manager they came from; decoders and encoders borrow the
//! manager and never outlive it.

use std::collections::HashMap;

/// An opaque handle to one address space, issued by a [`SpaceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddrSpace(u32);

/// The five enumerated spaces that travel by code rather than by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialSpace {
    Stack,
    Join,
    Fspec,
    Iop,
    Spacebase,
}

impl SpecialSpace {
    /// The wire length code for this space.
    #[must_use]
    pub(crate) fn code(self) -> u8 {
        match self {
            SpecialSpace::Stack => 0,
            SpecialSpace::Join => 1,
            SpecialSpace::Fspec => 2,
            SpecialSpace::Iop => 3,
            SpecialSpace::Spacebase => 4,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SpecialSpace::Stack),
            1 => Some(SpecialSpace::Join),
            2 => Some(SpecialSpace::Fspec),
            3 => Some(SpecialSpace::Iop),
            4 => Some(SpecialSpace::Spacebase),
            _ => None,
        }
    }
}

/// How a space is represented on the packed wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceClass {
    /// An ordinary space, identified by its index in the manager's table.
    Basic { index: usize },
    /// One of the enumerated special spaces.
    Special(SpecialSpace),
}

/// Resolution contract between the codecs and the address-space layer.
///
/// Implementations must hand out handles that are stable for the life of
/// the manager and must answer `classify`/`name` for every handle they
/// have issued.
pub trait SpaceManager {
    /// The basic space at `index`, if the table has one.
    fn by_index(&self, index: usize) -> Option<AddrSpace>;

    /// The space registered under `name`, basic or special.
    fn by_name(&self, name: &str) -> Option<AddrSpace>;

    /// The handle for a special space, if the manager provides it.
    fn special(&self, special: SpecialSpace) -> Option<AddrSpace>;

    /// How `space` is encoded on the packed wire.
    fn classify(&self, space: AddrSpace) -> SpaceClass;

    /// The name the XML encoding uses for `space`.
    fn name(&self, space: AddrSpace) -> &str;
}

/// A registry of address spaces, filled once at setup time.
///
/// # Examples
///
/// ```
/// use treemodem::{SpaceManager, SpaceTable, SpecialSpace};
///
/// let mut spaces = SpaceTable::new();
/// let ram = spaces.add_basic("ram");
/// spaces.add_special("stack", SpecialSpace::Stack);
///
/// assert_eq!(spaces.by_index(0), Some(ram));
/// assert_eq!(spaces.name(ram), "ram");
/// assert!(spaces.special(SpecialSpace::Join).is_none());
/// ```
#[derive(Debug, Default)]
pub struct SpaceTable {
    defs: Vec<SpaceDef>,
    by_name: HashMap<String, AddrSpace>,
    basic: Vec<AddrSpace>,
    special: [Option<AddrSpace>; 5],
}

#[derive(Debug)]
struct SpaceDef {
    name: String,
    class: SpaceClass,
}

impl SpaceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a basic space; indices are assigned in registration order.
    pub fn add_basic(&mut self, name: &str) -> AddrSpace {
        let index = self.basic.len();
        let handle = self.push(name, SpaceClass::Basic { index });
        self.basic.push(handle);
        handle
    }

    /// Registers one of the special spaces under the given name.
    pub fn add_special(&mut self, name: &str, special: SpecialSpace) -> AddrSpace {
        let handle = self.push(name, SpaceClass::Special(special));
        self.special[special.code() as usize] = Some(handle);
        handle
    }

    fn push(&mut self, name: &str, class: SpaceClass) -> AddrSpace {
        let handle = AddrSpace(u32::try_from(self.defs.len()).expect("space table overflow"));
        self.defs.push(SpaceDef {
            name: name.to_owned(),
            class,
        });
        self.by_name.insert(name.to_owned(), handle);
        handle
    }

    fn def(&self, space: AddrSpace) -> &SpaceDef {
        &self.defs[space.0 as usize]
    }
}

impl SpaceManager for SpaceTable {
    fn by_index(&self, index: usize) -> Option<AddrSpace> {
        self.basic.get(index).copied()
    }

    fn by_name(&self, name: &str) -> Option<AddrSpace> {
        self.by_name.get(name).copied()
    }

    fn special(&self, special: SpecialSpace) -> Option<AddrSpace> {
        self.special[special.code() as usize]
    }

    fn classify(&self, space: AddrSpace) -> SpaceClass {
        self.def(space).class
    }

    fn name(&self, space: AddrSpace) -> &str {
        &self.def(space).name
    }
}
