//! The abstract encode/decode contract shared by both engines.
//!
//! Schema layers are written against [`Decoder`] and [`Encoder`] and stay
//! agnostic of whether records travel as packed bytes or XML text. Both
//! traits are object safe; the concrete engines are
//! [`PackedDecoder`](crate::PackedDecoder) /
//! [`PackedEncoder`](crate::PackedEncoder) and
//! [`XmlDecoder`](crate::XmlDecoder) / [`XmlEncoder`](crate::XmlEncoder).

use std::io::{self, BufRead};

use crate::error::Result;
use crate::ident::{AttributeId, ElementId};
use crate::space::AddrSpace;

/// Pull-based access to one ingested document tree.
///
/// A decoder is driven in document order: `open_element`, any number of
/// attribute reads, recursion into children, then `close_element`.
/// Attributes of the open element may be visited sequentially with
/// [`next_attribute_id`](Decoder::next_attribute_id) or looked up in any
/// order with the keyed `*_for` reads; the two styles can be interleaved
/// freely, and keyed lookups never disturb the sequential cursor.
///
/// Any error poisons the decoder; discard it afterwards.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use treemodem::{
///     initialize, Decoder, Encoder, PackedDecoder, PackedEncoder, SpaceTable,
///     ATTRIB_OFFSET, ELEM_ADDR,
/// };
///
/// initialize();
/// let spaces = SpaceTable::new();
///
/// let mut bytes = Vec::new();
/// let mut encoder = PackedEncoder::new(&mut bytes, &spaces);
/// encoder.open_element(&ELEM_ADDR)?;
/// encoder.write_unsigned_integer(&ATTRIB_OFFSET, 0x1000)?;
/// encoder.close_element(&ELEM_ADDR)?;
///
/// let mut decoder = PackedDecoder::new(&spaces);
/// decoder.ingest_stream(&mut Cursor::new(bytes))?;
/// let id = decoder.open_element_expect(&ELEM_ADDR)?;
/// assert_eq!(decoder.read_unsigned_integer_for(&ATTRIB_OFFSET)?, 0x1000);
/// decoder.close_element(id)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Decoder {
    /// Reads the input to completion and takes ownership of its contents.
    ///
    /// Must be called exactly once, before any other operation. The packed
    /// engine stops at the transport's zero-byte terminator; the XML
    /// engine parses the whole input as one document.
    fn ingest_stream(&mut self, source: &mut dyn BufRead) -> Result<()>;

    /// The id of the next child of the open element (or of the document
    /// root at top level), without advancing. 0 when no child remains.
    fn peek_element(&mut self) -> Result<u32>;

    /// Opens the next child element and returns its id.
    ///
    /// Returns 0, consuming nothing, when the next record is not an
    /// element start.
    fn open_element(&mut self) -> Result<u32>;

    /// Opens the next child element, failing unless it is `elem`.
    fn open_element_expect(&mut self, elem: &ElementId) -> Result<u32>;

    /// Closes the open element, which must have id `id` and no unvisited
    /// children.
    fn close_element(&mut self, id: u32) -> Result<()>;

    /// Closes the open element with id `id`, discarding any unvisited
    /// children and grandchildren.
    fn close_element_skipping(&mut self, id: u32) -> Result<()>;

    /// Resets the sequential attribute cursor to the first attribute.
    ///
    /// No effect when no element is open.
    fn rewind_attributes(&mut self);

    /// Advances to the next attribute of the open element and returns its
    /// id, or 0 when the attributes are exhausted.
    ///
    /// A value left unread by the time of the next call is skipped.
    fn next_attribute_id(&mut self) -> Result<u32>;

    /// Random-access lookup of `attrib` within the open element.
    ///
    /// On a hit, returns `attrib`'s id and primes the next bare read to
    /// decode that attribute's value; on a miss, returns 0 and primes the
    /// next bare read to report the type's default. The sequential cursor
    /// is untouched either way.
    fn indexed_attribute_id(&mut self, attrib: &AttributeId) -> Result<u32>;

    /// Reads the current attribute value as a boolean.
    fn read_bool(&mut self) -> Result<bool>;

    /// Reads the attribute `attrib` as a boolean; `false` when absent.
    fn read_bool_for(&mut self, attrib: &AttributeId) -> Result<bool>;

    /// Reads the current attribute value as a signed integer.
    fn read_signed_integer(&mut self) -> Result<i64>;

    /// Reads the attribute `attrib` as a signed integer; 0 when absent.
    fn read_signed_integer_for(&mut self, attrib: &AttributeId) -> Result<i64>;

    /// Reads the current attribute as a signed integer, tolerating the
    /// string `expect` as an alias for `expect_val`.
    ///
    /// Used while a schema migrates an attribute from a keyword to a
    /// number: a signed integer decodes normally, the exact string
    /// `expect` decodes to `expect_val`, anything else is an error.
    fn read_signed_integer_expect_string(&mut self, expect: &str, expect_val: i64)
        -> Result<i64>;

    /// Keyed form of
    /// [`read_signed_integer_expect_string`](Decoder::read_signed_integer_expect_string);
    /// 0 when absent.
    fn read_signed_integer_expect_string_for(
        &mut self,
        attrib: &AttributeId,
        expect: &str,
        expect_val: i64,
    ) -> Result<i64>;

    /// Reads the current attribute value as an unsigned integer.
    fn read_unsigned_integer(&mut self) -> Result<u64>;

    /// Reads the attribute `attrib` as an unsigned integer; 0 when absent.
    fn read_unsigned_integer_for(&mut self, attrib: &AttributeId) -> Result<u64>;

    /// Reads the current attribute value as a string.
    fn read_string(&mut self) -> Result<String>;

    /// Reads the attribute `attrib` as a string; `""` when absent.
    fn read_string_for(&mut self, attrib: &AttributeId) -> Result<String>;

    /// Reads the current attribute value as an address-space reference.
    fn read_space(&mut self) -> Result<AddrSpace>;

    /// Reads the attribute `attrib` as an address-space reference; `None`
    /// when absent.
    fn read_space_for(&mut self, attrib: &AttributeId) -> Result<Option<AddrSpace>>;
}

/// Push-based emission of one document tree.
///
/// Callers must issue a balanced sequence: each `open_element` is followed
/// by that element's attribute writes, then its children, then the
/// matching `close_element`. Encoders do not buffer beyond their sink;
/// flushing is the caller's concern, and sink failures surface unchanged.
pub trait Encoder {
    /// Starts the element `elem`.
    fn open_element(&mut self, elem: &ElementId) -> io::Result<()>;

    /// Ends the element `elem`, which must be the innermost open one.
    fn close_element(&mut self, elem: &ElementId) -> io::Result<()>;

    /// Writes a boolean attribute of the open element.
    fn write_bool(&mut self, attrib: &AttributeId, val: bool) -> io::Result<()>;

    /// Writes a signed integer attribute of the open element.
    fn write_signed_integer(&mut self, attrib: &AttributeId, val: i64) -> io::Result<()>;

    /// Writes an unsigned integer attribute of the open element.
    fn write_unsigned_integer(&mut self, attrib: &AttributeId, val: u64) -> io::Result<()>;

    /// Writes a string attribute of the open element.
    fn write_string(&mut self, attrib: &AttributeId, val: &str) -> io::Result<()>;

    /// Writes one of a family of string attributes sharing the base tag
    /// `attrib`, distinguished by `index`.
    ///
    /// The packed form adds `index` to the attribute id; the XML form
    /// suffixes the attribute name with `index + 1`.
    fn write_string_indexed(
        &mut self,
        attrib: &AttributeId,
        index: u32,
        val: &str,
    ) -> io::Result<()>;

    /// Writes an address-space attribute of the open element.
    fn write_space(&mut self, attrib: &AttributeId, space: AddrSpace) -> io::Result<()>;
}
