//! Shared tree model for round-trip tests.
//!
//! The crate's public surface is a pair of streaming walk APIs; tests
//! materialize full trees on both sides of a round trip so structural
//! equality is one `assert_eq!`.

use quickcheck::{Arbitrary, Gen};
use treemodem::{
    AddrSpace, AttributeId, Decoder, ElementId, Encoder, SpaceTable, SpecialSpace, ATTRIB_EXTRAPOP,
    ATTRIB_FORMAT, ATTRIB_NAME, ATTRIB_NAMELOCK, ATTRIB_OFFSET, ATTRIB_SIZE, ATTRIB_SPACE,
    ATTRIB_VAL, ELEM_ADDR, ELEM_DATA, ELEM_FUNCTION, ELEM_RANGE, ELEM_SYMBOL, ELEM_VARNODE,
    UNKNOWN_ID,
};

/// The value type an attribute carries in the test vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Bool,
    Signed,
    Unsigned,
    Str,
    Space,
}

/// Elements the generated trees draw from.
pub static ELEMS: &[&ElementId] = &[
    &ELEM_ADDR,
    &ELEM_RANGE,
    &ELEM_VARNODE,
    &ELEM_SYMBOL,
    &ELEM_DATA,
    &ELEM_FUNCTION,
];

/// Attributes the generated trees draw from, with their fixed value type.
pub static ATTRS: &[(&AttributeId, Kind)] = &[
    (&ATTRIB_NAMELOCK, Kind::Bool),
    (&ATTRIB_EXTRAPOP, Kind::Signed),
    (&ATTRIB_VAL, Kind::Signed),
    (&ATTRIB_OFFSET, Kind::Unsigned),
    (&ATTRIB_SIZE, Kind::Unsigned),
    (&ATTRIB_NAME, Kind::Str),
    (&ATTRIB_FORMAT, Kind::Str),
    (&ATTRIB_SPACE, Kind::Space),
];

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Str(String),
    /// Index into the canonical space handle list of [`test_spaces`].
    Space(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub elem: usize,
    pub attrs: Vec<(usize, AttrValue)>,
    pub children: Vec<Tree>,
}

/// A space table covering both basic and all special spaces.
pub fn test_spaces() -> (SpaceTable, Vec<AddrSpace>) {
    let mut table = SpaceTable::new();
    let mut handles = Vec::new();
    handles.push(table.add_basic("ram"));
    handles.push(table.add_basic("io"));
    handles.push(table.add_special("stack", SpecialSpace::Stack));
    handles.push(table.add_special("join", SpecialSpace::Join));
    handles.push(table.add_special("fspec", SpecialSpace::Fspec));
    handles.push(table.add_special("iop", SpecialSpace::Iop));
    handles.push(table.add_special("sbase", SpecialSpace::Spacebase));
    (table, handles)
}

pub fn encode_tree(enc: &mut dyn Encoder, tree: &Tree, handles: &[AddrSpace]) {
    enc.open_element(ELEMS[tree.elem]).unwrap();
    for (attr, value) in &tree.attrs {
        let attrib = ATTRS[*attr].0;
        match value {
            AttrValue::Bool(v) => enc.write_bool(attrib, *v).unwrap(),
            AttrValue::Signed(v) => enc.write_signed_integer(attrib, *v).unwrap(),
            AttrValue::Unsigned(v) => enc.write_unsigned_integer(attrib, *v).unwrap(),
            AttrValue::Str(v) => enc.write_string(attrib, v).unwrap(),
            AttrValue::Space(k) => enc.write_space(attrib, handles[*k]).unwrap(),
        }
    }
    for child in &tree.children {
        encode_tree(enc, child, handles);
    }
    enc.close_element(ELEMS[tree.elem]).unwrap();
}

pub fn decode_tree(dec: &mut dyn Decoder, handles: &[AddrSpace]) -> Tree {
    let id = dec.open_element().unwrap();
    let elem = ELEMS
        .iter()
        .position(|e| e.id() == id)
        .expect("unknown element id");
    let mut attrs = Vec::new();
    loop {
        let attr_id = dec.next_attribute_id().unwrap();
        if attr_id == UNKNOWN_ID {
            break;
        }
        let index = ATTRS
            .iter()
            .position(|(a, _)| a.id() == attr_id)
            .expect("unknown attribute id");
        let value = match ATTRS[index].1 {
            Kind::Bool => AttrValue::Bool(dec.read_bool().unwrap()),
            Kind::Signed => AttrValue::Signed(dec.read_signed_integer().unwrap()),
            Kind::Unsigned => AttrValue::Unsigned(dec.read_unsigned_integer().unwrap()),
            Kind::Str => AttrValue::Str(dec.read_string().unwrap()),
            Kind::Space => {
                let space = dec.read_space().unwrap();
                AttrValue::Space(
                    handles
                        .iter()
                        .position(|&h| h == space)
                        .expect("unknown space handle"),
                )
            }
        };
        attrs.push((index, value));
    }
    let mut children = Vec::new();
    while dec.peek_element().unwrap() != UNKNOWN_ID {
        children.push(decode_tree(dec, handles));
    }
    dec.close_element(id).unwrap();
    Tree {
        elem,
        attrs,
        children,
    }
}

fn arbitrary_value(g: &mut Gen, kind: Kind, space_count: usize) -> AttrValue {
    match kind {
        Kind::Bool => AttrValue::Bool(bool::arbitrary(g)),
        Kind::Signed => AttrValue::Signed(i64::arbitrary(g)),
        Kind::Unsigned => AttrValue::Unsigned(u64::arbitrary(g)),
        // The transport reserves NUL as its framing byte.
        Kind::Str => AttrValue::Str(String::arbitrary(g).replace('\0', " ")),
        Kind::Space => AttrValue::Space(usize::arbitrary(g) % space_count),
    }
}

fn arbitrary_tree(g: &mut Gen, depth: usize, space_count: usize) -> Tree {
    let elem = usize::arbitrary(g) % ELEMS.len();
    let mut attrs = Vec::new();
    for i in 0..ATTRS.len() {
        if bool::arbitrary(g) {
            attrs.push((i, arbitrary_value(g, ATTRS[i].1, space_count)));
        }
    }
    let children = if depth == 0 {
        Vec::new()
    } else {
        (0..usize::arbitrary(g) % 3)
            .map(|_| arbitrary_tree(g, depth - 1, space_count))
            .collect()
    };
    Tree {
        elem,
        attrs,
        children,
    }
}

impl Arbitrary for Tree {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_tree(g, 3, test_spaces().1.len())
    }
}
