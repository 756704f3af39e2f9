//! Symmetric marshaling engines for tree-shaped decompiler records.
//!
//! A driver process and a decompiler engine exchange structured, tree-shaped
//! records: elements carrying typed attributes and ordered children. This
//! crate provides the transfer layer in two interchangeable encodings behind
//! one abstract contract ([`Decoder`] / [`Encoder`]):
//!
//! - **Packed** ([`PackedDecoder`] / [`PackedEncoder`]): a compact
//!   tag-length-value byte stream whose bytes are all non-zero, so a
//!   transport can frame records with zero bytes. Supports lazy attribute
//!   lookup and skipping over unknown subtrees without decoding them.
//! - **XML** ([`XmlDecoder`] / [`XmlEncoder`]): the same trees as minimal
//!   XML text, for diagnostics and tooling.
//!
//! Element and attribute names are interned once per process into small
//! integer ids (see [`ElementId`], [`AttributeId`], [`initialize`]); the
//! packed wire carries only the ids. Address-space references are resolved
//! through a caller-provided [`SpaceManager`].
//!
//! # Examples
//!
//! Encode a record in either encoding and read it back through the shared
//! contract:
//!
//! ```
//! use std::io::Cursor;
//! use treemodem::{
//!     initialize, Decoder, Encoder, PackedDecoder, PackedEncoder, SpaceTable,
//!     XmlDecoder, XmlEncoder, ATTRIB_NAME, ATTRIB_OFFSET, ELEM_SYMBOL,
//! };
//!
//! initialize();
//! let spaces = SpaceTable::new();
//!
//! fn write(enc: &mut dyn Encoder) -> std::io::Result<()> {
//!     enc.open_element(&ELEM_SYMBOL)?;
//!     enc.write_string(&ATTRIB_NAME, "entry")?;
//!     enc.write_unsigned_integer(&ATTRIB_OFFSET, 0x401000)?;
//!     enc.close_element(&ELEM_SYMBOL)
//! }
//!
//! fn read(dec: &mut dyn Decoder) -> treemodem::Result<()> {
//!     let id = dec.open_element_expect(&ELEM_SYMBOL)?;
//!     assert_eq!(dec.read_string_for(&ATTRIB_NAME)?, "entry");
//!     assert_eq!(dec.read_unsigned_integer_for(&ATTRIB_OFFSET)?, 0x401000);
//!     dec.close_element(id)
//! }
//!
//! let mut packed = Vec::new();
//! write(&mut PackedEncoder::new(&mut packed, &spaces))?;
//! let mut decoder = PackedDecoder::new(&spaces);
//! decoder.ingest_stream(&mut Cursor::new(&packed))?;
//! read(&mut decoder)?;
//!
//! let mut xml = Vec::new();
//! write(&mut XmlEncoder::new(&mut xml, &spaces))?;
//! let mut decoder = XmlDecoder::new(&spaces);
//! decoder.ingest_stream(&mut Cursor::new(&xml))?;
//! read(&mut decoder)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod codec;
mod error;
mod format;
mod ident;
mod packed;
mod space;
mod stream;
mod xml;

pub use codec::{Decoder, Encoder};
pub use error::{DecoderError, Result};
pub use ident::{
    initialize, register_attribute, register_element, AttributeId, ElementId, ATTRIB_ALIGN,
    ATTRIB_BIGENDIAN, ATTRIB_CODE, ATTRIB_CONTENT, ATTRIB_DEFAULTSPACE, ATTRIB_DELAY,
    ATTRIB_EXTRAPOP, ATTRIB_FIRST, ATTRIB_FORMAT, ATTRIB_ID, ATTRIB_INDEX, ATTRIB_LAST,
    ATTRIB_METATYPE, ATTRIB_MODEL, ATTRIB_NAME, ATTRIB_NAMELOCK, ATTRIB_OFFSET, ATTRIB_PHYSICAL,
    ATTRIB_PIECE, ATTRIB_READONLY, ATTRIB_REF, ATTRIB_SIZE, ATTRIB_SPACE, ATTRIB_STORAGE,
    ATTRIB_TYPE, ATTRIB_TYPELOCK, ATTRIB_UNIQ, ATTRIB_UNIQBASE, ATTRIB_VAL, ATTRIB_VALUE,
    ATTRIB_WORDSIZE, ELEM_ADDR, ELEM_BLOCK, ELEM_COMMENT, ELEM_COMMENTDB, ELEM_CORETYPES,
    ELEM_DATA, ELEM_DOC, ELEM_FUNCTION, ELEM_HIGH, ELEM_INPUT, ELEM_LOCALDB, ELEM_OUTPUT,
    ELEM_PROTOTYPE, ELEM_RANGE, ELEM_RANGELIST, ELEM_REGISTER, ELEM_SCOPE, ELEM_SEQNUM,
    ELEM_SPACE, ELEM_SPACES, ELEM_SPACE_BASE, ELEM_SPACE_OTHER, ELEM_SPACE_OVERLAY,
    ELEM_SPACE_UNIQUE, ELEM_SYMBOL, ELEM_TARGET, ELEM_TYPE, ELEM_TYPEREF, ELEM_VAL, ELEM_VALUE,
    ELEM_VARNODE, ELEM_VOID, UNKNOWN_ID,
};
pub use packed::{PackedDecoder, PackedEncoder};
pub use space::{AddrSpace, SpaceClass, SpaceManager, SpaceTable, SpecialSpace};
pub use xml::document::{Document, NodeId, XmlAttr};
pub use xml::{XmlDecoder, XmlEncoder};
