use std::io::Cursor;

use super::{XmlDecoder, XmlEncoder};
use crate::codec::{Decoder, Encoder};
use crate::ident::{
    initialize, ATTRIB_BIGENDIAN, ATTRIB_CONTENT, ATTRIB_EXTRAPOP, ATTRIB_NAME, ATTRIB_OFFSET,
    ATTRIB_PIECE, ATTRIB_SPACE, ELEM_ADDR, ELEM_COMMENT, ELEM_FUNCTION, ELEM_RANGE, ELEM_SYMBOL,
    UNKNOWN_ID,
};
use crate::space::{SpaceManager, SpaceTable, SpecialSpace};
use crate::xml::document::Document;

fn encode_xml(spaces: &SpaceTable, build: impl FnOnce(&mut XmlEncoder<'_, &mut Vec<u8>>)) -> String {
    let mut bytes = Vec::new();
    let mut encoder = XmlEncoder::new(&mut bytes, spaces);
    build(&mut encoder);
    String::from_utf8(bytes).unwrap()
}

fn decoder<'a>(spaces: &'a SpaceTable, xml: &str) -> XmlDecoder<'a> {
    let mut decoder = XmlDecoder::new(spaces);
    decoder.ingest_stream(&mut Cursor::new(xml.as_bytes())).unwrap();
    decoder
}

#[test]
fn encoder_emits_minimal_canonical_xml() {
    initialize();
    let mut spaces = SpaceTable::new();
    let ram = spaces.add_basic("ram");

    let xml = encode_xml(&spaces, |enc| {
        enc.open_element(&ELEM_FUNCTION).unwrap();
        enc.write_string(&ATTRIB_NAME, "main").unwrap();
        enc.write_bool(&ATTRIB_BIGENDIAN, false).unwrap();
        enc.write_signed_integer(&ATTRIB_EXTRAPOP, -4).unwrap();
        enc.write_unsigned_integer(&ATTRIB_OFFSET, 0x20).unwrap();
        enc.open_element(&ELEM_ADDR).unwrap();
        enc.write_space(&ATTRIB_SPACE, ram).unwrap();
        enc.close_element(&ELEM_ADDR).unwrap();
        enc.open_element(&ELEM_COMMENT).unwrap();
        enc.write_string(&ATTRIB_CONTENT, "first & last").unwrap();
        enc.close_element(&ELEM_COMMENT).unwrap();
        enc.close_element(&ELEM_FUNCTION).unwrap();
    });

    assert_eq!(
        xml,
        "<function name=\"main\" bigendian=\"false\" extrapop=\"-4\" offset=\"0x20\">\
         <addr space=\"ram\"/>\
         <comment>first &amp; last</comment>\
         </function>"
    );
}

#[test]
fn decoder_walks_what_the_encoder_wrote() {
    initialize();
    let mut spaces = SpaceTable::new();
    let ram = spaces.add_basic("ram");

    let xml = encode_xml(&spaces, |enc| {
        enc.open_element(&ELEM_FUNCTION).unwrap();
        enc.write_bool(&ATTRIB_BIGENDIAN, true).unwrap();
        enc.write_unsigned_integer(&ATTRIB_OFFSET, 0xdead).unwrap();
        enc.open_element(&ELEM_ADDR).unwrap();
        enc.write_space(&ATTRIB_SPACE, ram).unwrap();
        enc.write_unsigned_integer(&ATTRIB_OFFSET, 0x100).unwrap();
        enc.close_element(&ELEM_ADDR).unwrap();
        enc.close_element(&ELEM_FUNCTION).unwrap();
    });

    let mut dec = decoder(&spaces, &xml);
    assert_eq!(dec.peek_element().unwrap(), ELEM_FUNCTION.id());
    let func = dec.open_element_expect(&ELEM_FUNCTION).unwrap();
    assert!(dec.read_bool_for(&ATTRIB_BIGENDIAN).unwrap());

    let addr = dec.open_element().unwrap();
    assert_eq!(addr, ELEM_ADDR.id());
    assert_eq!(dec.read_space_for(&ATTRIB_SPACE).unwrap(), Some(ram));
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).unwrap(), 0x100);
    dec.close_element(addr).unwrap();

    // Parent attributes remain addressable after the child closed.
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).unwrap(), 0xdead);
    dec.close_element(func).unwrap();
    assert_eq!(dec.peek_element().unwrap(), UNKNOWN_ID);
}

#[test]
fn typed_parses_accept_the_canonical_text_forms() {
    initialize();
    let spaces = SpaceTable::new();
    let xml = r#"<symbol name="x" offset="0x1f" extrapop="-128" bigendian="1" space="7"/>"#;
    let mut dec = decoder(&spaces, xml);
    dec.open_element().unwrap();
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).unwrap(), 0x1f);
    assert_eq!(dec.read_signed_integer_for(&ATTRIB_EXTRAPOP).unwrap(), -128);
    assert!(dec.read_bool_for(&ATTRIB_BIGENDIAN).unwrap());
    // Decimal unsigned works too.
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_SPACE).unwrap(), 7);
}

#[test]
fn invalid_text_forms_error() {
    initialize();
    let spaces = SpaceTable::new();
    let xml = r#"<symbol offset="0x1g" bigendian="maybe"/>"#;
    let mut dec = decoder(&spaces, xml);
    dec.open_element().unwrap();
    assert!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).is_err());
    let mut dec = decoder(&spaces, xml);
    dec.open_element().unwrap();
    assert!(dec.read_bool_for(&ATTRIB_BIGENDIAN).is_err());
}

#[test]
fn missing_attribute_reads_report_defaults() {
    initialize();
    let spaces = SpaceTable::new();
    let mut dec = decoder(&spaces, r#"<symbol name="x"/>"#);
    dec.open_element().unwrap();

    assert_eq!(dec.indexed_attribute_id(&ATTRIB_OFFSET).unwrap(), UNKNOWN_ID);
    assert_eq!(dec.read_string().unwrap(), "");
    assert!(!dec.read_bool_for(&ATTRIB_BIGENDIAN).unwrap());
    assert_eq!(dec.read_signed_integer_for(&ATTRIB_EXTRAPOP).unwrap(), 0);
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).unwrap(), 0);
    assert_eq!(dec.read_space_for(&ATTRIB_SPACE).unwrap(), None);
    assert_eq!(dec.read_string_for(&ATTRIB_NAME).unwrap(), "x");
}

#[test]
fn content_pseudo_attribute_reads_the_text_body() {
    initialize();
    let spaces = SpaceTable::new();
    let mut dec = decoder(&spaces, "<comment>line one &amp; two</comment>");
    let id = dec.open_element_expect(&ELEM_COMMENT).unwrap();
    assert_eq!(
        dec.read_string_for(&ATTRIB_CONTENT).unwrap(),
        "line one & two"
    );
    dec.close_element(id).unwrap();
}

#[test]
fn keyed_reads_leave_the_cursor_undisturbed() {
    initialize();
    let spaces = SpaceTable::new();
    let mut dec = decoder(
        &spaces,
        r#"<symbol name="sp" offset="8" extrapop="2"/>"#,
    );
    dec.open_element().unwrap();

    assert_eq!(dec.next_attribute_id().unwrap(), ATTRIB_NAME.id());
    assert_eq!(dec.read_signed_integer_for(&ATTRIB_EXTRAPOP).unwrap(), 2);
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).unwrap(), 8);
    assert_eq!(dec.next_attribute_id().unwrap(), ATTRIB_OFFSET.id());
    assert_eq!(dec.next_attribute_id().unwrap(), ATTRIB_EXTRAPOP.id());
    assert_eq!(dec.next_attribute_id().unwrap(), UNKNOWN_ID);
}

#[test]
fn indexed_attribute_families_round_trip() {
    initialize();
    let spaces = SpaceTable::new();
    let xml = encode_xml(&spaces, |enc| {
        enc.open_element(&ELEM_SYMBOL).unwrap();
        enc.write_string_indexed(&ATTRIB_PIECE, 0, "lo").unwrap();
        enc.write_string_indexed(&ATTRIB_PIECE, 2, "hi").unwrap();
        enc.close_element(&ELEM_SYMBOL).unwrap();
    });
    assert_eq!(xml, r#"<symbol piece1="lo" piece3="hi"/>"#);

    let mut dec = decoder(&spaces, &xml);
    dec.open_element().unwrap();
    // The suffixed names are not registered ids; the indexed lookup
    // recovers the family id from the cursor attribute.
    assert_eq!(dec.next_attribute_id().unwrap(), UNKNOWN_ID);
    assert_eq!(
        dec.indexed_attribute_id(&ATTRIB_PIECE).unwrap(),
        ATTRIB_PIECE.id()
    );
    assert_eq!(dec.read_string().unwrap(), "lo");
    assert_eq!(dec.next_attribute_id().unwrap(), UNKNOWN_ID);
    assert_eq!(
        dec.indexed_attribute_id(&ATTRIB_PIECE).unwrap(),
        ATTRIB_PIECE.id() + 2
    );
    assert_eq!(dec.read_string().unwrap(), "hi");
}

#[test]
fn close_element_checks_id_and_children() {
    initialize();
    let spaces = SpaceTable::new();

    let mut dec = decoder(&spaces, "<function><addr/></function>");
    let func = dec.open_element().unwrap();
    let err = dec.close_element(func).unwrap_err();
    assert_eq!(err.message(), "expecting element close");

    let mut dec = decoder(&spaces, "<function><addr/></function>");
    let func = dec.open_element().unwrap();
    assert!(dec.close_element(ELEM_RANGE.id()).is_err());
    dec.close_element_skipping(func).unwrap();
    assert_eq!(dec.peek_element().unwrap(), UNKNOWN_ID);
}

#[test]
fn open_element_expect_matches_by_name() {
    initialize();
    let spaces = SpaceTable::new();
    let mut dec = decoder(&spaces, "<addr/>");
    let err = dec.open_element_expect(&ELEM_RANGE).unwrap_err();
    assert_eq!(err.message(), "expected element <range>");

    let mut dec = decoder(&spaces, "<addr/>");
    assert_eq!(
        dec.open_element_expect(&ELEM_ADDR).unwrap(),
        ELEM_ADDR.id()
    );
}

#[test]
fn hostile_strings_survive_the_text_encoding() {
    initialize();
    let spaces = SpaceTable::new();
    let hostile = r#"a<b>&c"d'e"#;
    let xml = encode_xml(&spaces, |enc| {
        enc.open_element(&ELEM_COMMENT).unwrap();
        enc.write_string(&ATTRIB_NAME, hostile).unwrap();
        enc.write_string(&ATTRIB_CONTENT, hostile).unwrap();
        enc.close_element(&ELEM_COMMENT).unwrap();
    });

    let mut dec = decoder(&spaces, &xml);
    dec.open_element().unwrap();
    assert_eq!(dec.read_string_for(&ATTRIB_NAME).unwrap(), hostile);
    assert_eq!(dec.read_string_for(&ATTRIB_CONTENT).unwrap(), hostile);
}

#[test]
fn pre_parsed_documents_can_be_decoded_directly() {
    initialize();
    let mut spaces = SpaceTable::new();
    spaces.add_special("stack", SpecialSpace::Stack);
    let doc = Document::parse(r#"<addr space="stack" offset="0x8"/>"#).unwrap();
    let mut dec = XmlDecoder::from_document(&spaces, doc);
    let id = dec.open_element_expect(&ELEM_ADDR).unwrap();
    assert_eq!(
        dec.read_space_for(&ATTRIB_SPACE).unwrap(),
        spaces.by_name("stack")
    );
    assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET).unwrap(), 8);
    dec.close_element(id).unwrap();
}
