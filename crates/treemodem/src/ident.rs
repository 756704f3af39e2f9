//! Named element and attribute identifiers and the process-wide registry.
//!
//! Every element and attribute name that can appear on the wire is declared
//! once as a static [`ElementId`] or [`AttributeId`] pairing the name with
//! a small integer id. The packed encoding ships only the ids; the XML
//! encoding ships only the names; [`initialize`] builds the name→id maps
//! that let the XML decoder translate back.
//!
//! Raw id 0 is reserved: it is the *unknown* sentinel returned by the
//! `find` lookups and by decoder operations that have nothing to report,
//! and is never assigned to a named identifier.
//!
//! Higher layers declare their own identifiers as statics and hand them to
//! [`register_element`] / [`register_attribute`] before calling
//! [`initialize`]. Initialization is idempotent and may be repeated after
//! late registrations; once the last call returns, the registry is
//! read-only and safe to share across threads.
//!
//! # Examples
//!
//! ```
//! use treemodem::{initialize, AttributeId, ElementId};
//!
//! static ELEM_PATCH: ElementId = ElementId::new("patch", 200);
//! static ATTRIB_COLOR: AttributeId = AttributeId::new("color", 200);
//!
//! treemodem::register_element(&ELEM_PATCH);
//! treemodem::register_attribute(&ATTRIB_COLOR);
//! initialize();
//!
//! assert_eq!(ElementId::find("patch"), 200);
//! assert_eq!(ElementId::find("no-such-element"), 0);
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// The reserved raw id meaning "no identifier" / "name not registered".
pub const UNKNOWN_ID: u32 = 0;

/// A named element tag with its wire id.
///
/// Parallels the XML concept of an element: a collection of attributed
/// data with ordered children. Instances are declared `static` so the name
/// lives for the process.
#[derive(Debug)]
pub struct ElementId {
    name: &'static str,
    id: u32,
}

impl ElementId {
    /// Declares an identifier. Intended for `static` items only.
    #[must_use]
    pub const fn new(name: &'static str, id: u32) -> Self {
        Self { name, id }
    }

    /// The element's name as it appears in the XML encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The element's id as it appears in the packed encoding.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Looks up the id registered for `name`, or [`UNKNOWN_ID`].
    #[must_use]
    pub fn find(name: &str) -> u32 {
        ELEMENTS.find(name)
    }
}

/// A named attribute tag with its wire id.
///
/// An attribute labels one typed value within an element. The same
/// attribute may label different value types under different elements.
#[derive(Debug)]
pub struct AttributeId {
    name: &'static str,
    id: u32,
}

impl AttributeId {
    /// Declares an identifier. Intended for `static` items only.
    #[must_use]
    pub const fn new(name: &'static str, id: u32) -> Self {
        Self { name, id }
    }

    /// The attribute's name as it appears in the XML encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The attribute's id as it appears in the packed encoding.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Looks up the id registered for `name`, or [`UNKNOWN_ID`].
    #[must_use]
    pub fn find(name: &str) -> u32 {
        ATTRIBUTES.find(name)
    }
}

impl PartialEq<u32> for ElementId {
    fn eq(&self, other: &u32) -> bool {
        self.id == *other
    }
}

impl PartialEq<ElementId> for u32 {
    fn eq(&self, other: &ElementId) -> bool {
        *self == other.id
    }
}

impl PartialEq<u32> for AttributeId {
    fn eq(&self, other: &u32) -> bool {
        self.id == *other
    }
}

impl PartialEq<AttributeId> for u32 {
    fn eq(&self, other: &AttributeId) -> bool {
        *self == other.id
    }
}

/// Queues an element identifier for the next [`initialize`] call.
pub fn register_element(elem: &ElementId) {
    ELEMENTS.register(elem.name, elem.id);
}

/// Queues an attribute identifier for the next [`initialize`] call.
pub fn register_attribute(attrib: &AttributeId) {
    ATTRIBUTES.register(attrib.name, attrib.id);
}

/// Populates the name→id maps from all registered identifiers.
///
/// Idempotent: re-registering an identical `(name, id)` pair is a no-op.
/// Registering a name twice with *different* ids is a programming error
/// and panics.
pub fn initialize() {
    for elem in CORE_ELEMENTS {
        register_element(elem);
    }
    for attrib in CORE_ATTRIBUTES {
        register_attribute(attrib);
    }
    ELEMENTS.commit("element");
    ATTRIBUTES.commit("attribute");
}

struct Registry {
    state: LazyLock<RwLock<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    pending: Vec<(&'static str, u32)>,
    ids: HashMap<&'static str, u32>,
}

impl Registry {
    const fn new() -> Self {
        Self {
            state: LazyLock::new(|| RwLock::new(RegistryState::default())),
        }
    }

    fn register(&self, name: &'static str, id: u32) {
        let mut state = self.state.write().expect("identifier registry poisoned");
        state.pending.push((name, id));
    }

    fn commit(&self, kind: &str) {
        let mut state = self.state.write().expect("identifier registry poisoned");
        let pending = std::mem::take(&mut state.pending);
        for (name, id) in pending {
            assert!(id != UNKNOWN_ID, "{kind} `{name}` uses the reserved id 0");
            match state.ids.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
                Entry::Occupied(slot) => {
                    assert!(
                        *slot.get() == id,
                        "{kind} `{name}` registered with conflicting ids {} and {id}",
                        slot.get(),
                    );
                }
            }
        }
    }

    fn find(&self, name: &str) -> u32 {
        let state = self.state.read().expect("identifier registry poisoned");
        state.ids.get(name).copied().unwrap_or(UNKNOWN_ID)
    }
}

static ELEMENTS: Registry = Registry::new();
static ATTRIBUTES: Registry = Registry::new();

// Core marshaling vocabulary. Ids are part of the wire contract between
// driver and engine; append new entries, never renumber.

pub static ELEM_ADDR: ElementId = ElementId::new("addr", 1);
pub static ELEM_RANGE: ElementId = ElementId::new("range", 2);
pub static ELEM_RANGELIST: ElementId = ElementId::new("rangelist", 3);
pub static ELEM_REGISTER: ElementId = ElementId::new("register", 4);
pub static ELEM_SEQNUM: ElementId = ElementId::new("seqnum", 5);
pub static ELEM_VARNODE: ElementId = ElementId::new("varnode", 6);
pub static ELEM_VAL: ElementId = ElementId::new("val", 7);
pub static ELEM_VALUE: ElementId = ElementId::new("value", 8);
pub static ELEM_VOID: ElementId = ElementId::new("void", 9);
pub static ELEM_INPUT: ElementId = ElementId::new("input", 10);
pub static ELEM_OUTPUT: ElementId = ElementId::new("output", 11);
pub static ELEM_SYMBOL: ElementId = ElementId::new("symbol", 12);
pub static ELEM_TARGET: ElementId = ElementId::new("target", 13);
pub static ELEM_DATA: ElementId = ElementId::new("data", 14);
pub static ELEM_PROTOTYPE: ElementId = ElementId::new("prototype", 15);
pub static ELEM_SCOPE: ElementId = ElementId::new("scope", 16);
pub static ELEM_COMMENT: ElementId = ElementId::new("comment", 17);
pub static ELEM_COMMENTDB: ElementId = ElementId::new("commentdb", 18);
pub static ELEM_TYPE: ElementId = ElementId::new("type", 19);
pub static ELEM_TYPEREF: ElementId = ElementId::new("typeref", 20);
pub static ELEM_CORETYPES: ElementId = ElementId::new("coretypes", 21);
pub static ELEM_SPACES: ElementId = ElementId::new("spaces", 22);
pub static ELEM_SPACE: ElementId = ElementId::new("space", 23);
pub static ELEM_SPACE_BASE: ElementId = ElementId::new("space_base", 24);
pub static ELEM_SPACE_UNIQUE: ElementId = ElementId::new("space_unique", 25);
pub static ELEM_SPACE_OTHER: ElementId = ElementId::new("space_other", 26);
pub static ELEM_SPACE_OVERLAY: ElementId = ElementId::new("space_overlay", 27);
pub static ELEM_DOC: ElementId = ElementId::new("doc", 28);
pub static ELEM_FUNCTION: ElementId = ElementId::new("function", 29);
pub static ELEM_BLOCK: ElementId = ElementId::new("block", 30);
pub static ELEM_HIGH: ElementId = ElementId::new("high", 31);
pub static ELEM_LOCALDB: ElementId = ElementId::new("localdb", 32);

/// Pseudo-attribute labeling an XML element's text body.
///
/// The `#` prefix keeps it from ever colliding with a declared attribute
/// name; the packed encoding has no counterpart (packed elements carry no
/// mixed content).
pub static ATTRIB_CONTENT: AttributeId = AttributeId::new("#content", 1);
pub static ATTRIB_ALIGN: AttributeId = AttributeId::new("align", 2);
pub static ATTRIB_BIGENDIAN: AttributeId = AttributeId::new("bigendian", 3);
pub static ATTRIB_CODE: AttributeId = AttributeId::new("code", 4);
pub static ATTRIB_EXTRAPOP: AttributeId = AttributeId::new("extrapop", 5);
pub static ATTRIB_FIRST: AttributeId = AttributeId::new("first", 6);
pub static ATTRIB_FORMAT: AttributeId = AttributeId::new("format", 7);
pub static ATTRIB_ID: AttributeId = AttributeId::new("id", 8);
pub static ATTRIB_INDEX: AttributeId = AttributeId::new("index", 9);
pub static ATTRIB_LAST: AttributeId = AttributeId::new("last", 10);
pub static ATTRIB_METATYPE: AttributeId = AttributeId::new("metatype", 11);
pub static ATTRIB_MODEL: AttributeId = AttributeId::new("model", 12);
pub static ATTRIB_NAME: AttributeId = AttributeId::new("name", 13);
pub static ATTRIB_NAMELOCK: AttributeId = AttributeId::new("namelock", 14);
pub static ATTRIB_OFFSET: AttributeId = AttributeId::new("offset", 15);
pub static ATTRIB_READONLY: AttributeId = AttributeId::new("readonly", 16);
pub static ATTRIB_REF: AttributeId = AttributeId::new("ref", 17);
pub static ATTRIB_SIZE: AttributeId = AttributeId::new("size", 18);
pub static ATTRIB_SPACE: AttributeId = AttributeId::new("space", 19);
pub static ATTRIB_STORAGE: AttributeId = AttributeId::new("storage", 20);
pub static ATTRIB_TYPE: AttributeId = AttributeId::new("type", 21);
pub static ATTRIB_TYPELOCK: AttributeId = AttributeId::new("typelock", 22);
pub static ATTRIB_UNIQ: AttributeId = AttributeId::new("uniq", 23);
pub static ATTRIB_VAL: AttributeId = AttributeId::new("val", 24);
pub static ATTRIB_VALUE: AttributeId = AttributeId::new("value", 25);
pub static ATTRIB_WORDSIZE: AttributeId = AttributeId::new("wordsize", 26);
/// Base id for the indexed `piece1`, `piece2`, … attribute family; see
/// [`Encoder::write_string_indexed`](crate::Encoder::write_string_indexed).
pub static ATTRIB_PIECE: AttributeId = AttributeId::new("piece", 27);
pub static ATTRIB_DELAY: AttributeId = AttributeId::new("delay", 28);
pub static ATTRIB_PHYSICAL: AttributeId = AttributeId::new("physical", 29);
pub static ATTRIB_DEFAULTSPACE: AttributeId = AttributeId::new("defaultspace", 30);
pub static ATTRIB_UNIQBASE: AttributeId = AttributeId::new("uniqbase", 31);

static CORE_ELEMENTS: &[&ElementId] = &[
    &ELEM_ADDR,
    &ELEM_RANGE,
    &ELEM_RANGELIST,
    &ELEM_REGISTER,
    &ELEM_SEQNUM,
    &ELEM_VARNODE,
    &ELEM_VAL,
    &ELEM_VALUE,
    &ELEM_VOID,
    &ELEM_INPUT,
    &ELEM_OUTPUT,
    &ELEM_SYMBOL,
    &ELEM_TARGET,
    &ELEM_DATA,
    &ELEM_PROTOTYPE,
    &ELEM_SCOPE,
    &ELEM_COMMENT,
    &ELEM_COMMENTDB,
    &ELEM_TYPE,
    &ELEM_TYPEREF,
    &ELEM_CORETYPES,
    &ELEM_SPACES,
    &ELEM_SPACE,
    &ELEM_SPACE_BASE,
    &ELEM_SPACE_UNIQUE,
    &ELEM_SPACE_OTHER,
    &ELEM_SPACE_OVERLAY,
    &ELEM_DOC,
    &ELEM_FUNCTION,
    &ELEM_BLOCK,
    &ELEM_HIGH,
    &ELEM_LOCALDB,
];

static CORE_ATTRIBUTES: &[&AttributeId] = &[
    &ATTRIB_CONTENT,
    &ATTRIB_ALIGN,
    &ATTRIB_BIGENDIAN,
    &ATTRIB_CODE,
    &ATTRIB_EXTRAPOP,
    &ATTRIB_FIRST,
    &ATTRIB_FORMAT,
    &ATTRIB_ID,
    &ATTRIB_INDEX,
    &ATTRIB_LAST,
    &ATTRIB_METATYPE,
    &ATTRIB_MODEL,
    &ATTRIB_NAME,
    &ATTRIB_NAMELOCK,
    &ATTRIB_OFFSET,
    &ATTRIB_READONLY,
    &ATTRIB_REF,
    &ATTRIB_SIZE,
    &ATTRIB_SPACE,
    &ATTRIB_STORAGE,
    &ATTRIB_TYPE,
    &ATTRIB_TYPELOCK,
    &ATTRIB_UNIQ,
    &ATTRIB_VAL,
    &ATTRIB_VALUE,
    &ATTRIB_WORDSIZE,
    &ATTRIB_PIECE,
    &ATTRIB_DELAY,
    &ATTRIB_PHYSICAL,
    &ATTRIB_DEFAULTSPACE,
    &ATTRIB_UNIQBASE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        initialize();
        initialize();
        assert_eq!(ElementId::find("varnode"), ELEM_VARNODE.id());
        assert_eq!(AttributeId::find("offset"), ATTRIB_OFFSET.id());
    }

    #[test]
    fn unregistered_names_map_to_unknown() {
        initialize();
        assert_eq!(ElementId::find("definitely-not-registered"), UNKNOWN_ID);
        assert_eq!(AttributeId::find("definitely-not-registered"), UNKNOWN_ID);
    }

    #[test]
    fn late_registration_extends_the_map() {
        static ELEM_EXTRA: ElementId = ElementId::new("extra-test-elem", 900);
        initialize();
        assert_eq!(ElementId::find("extra-test-elem"), UNKNOWN_ID);
        register_element(&ELEM_EXTRA);
        initialize();
        assert_eq!(ElementId::find("extra-test-elem"), 900);
    }

    #[test]
    fn raw_id_comparisons() {
        assert!(ELEM_ADDR == 1);
        assert!(1u32 == ELEM_ADDR);
        assert!(ATTRIB_CONTENT == 1);
        assert!(2u32 != ATTRIB_CONTENT);
    }
}
