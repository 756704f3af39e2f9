//! Pull-based decoder for the packed encoding.

use std::io::BufRead;
use std::mem;

use crate::codec::Decoder;
use crate::error::{DecoderError, Result};
use crate::format::{
    ATTRIBUTE, ELEMENT_END, ELEMENT_START, HEADER_EXTEND, HEADER_ID_MASK, HEADER_MASK,
    LENGTHCODE_MASK, MAX_INTEGER_BYTES, RAWDATA_BITS, RAWDATA_MASK, TYPECODE_ADDRESSSPACE,
    TYPECODE_BOOLEAN, TYPECODE_SHIFT, TYPECODE_SIGNEDINT_NEGATIVE, TYPECODE_SIGNEDINT_POSITIVE,
    TYPECODE_SPECIALSPACE, TYPECODE_STRING, TYPECODE_UNSIGNEDINT,
};
use crate::ident::{AttributeId, ElementId, UNKNOWN_ID};
use crate::space::{AddrSpace, SpaceManager, SpecialSpace};
use crate::stream::{ChunkedStream, Position};

/// Decoder over the packed byte encoding.
///
/// Owns its ingested input. The state machine keeps one frame per open
/// element: the span of the element's attribute records and a cursor into
/// them. Only the innermost frame is active; parent frames are restored as
/// elements close.
pub struct PackedDecoder<'a> {
    spaces: &'a dyn SpaceManager,
    stream: ChunkedStream,
    /// Read head for element records: always positioned at the next
    /// element start or end, never inside an attribute region.
    head: Position,
    frames: Vec<Frame>,
}

/// Cursor state for one open element.
#[derive(Debug)]
struct Frame {
    /// First attribute record of the element.
    start: Position,
    /// Sequential attribute cursor; rests on an attribute header, or on
    /// the type byte while a returned attribute's value is unread.
    cur: Position,
    /// First byte after the element's attribute records.
    end: Position,
    /// The id returned by the last cursor advance has an unread value at
    /// `cur`.
    value_pending: bool,
    /// Where the next bare read takes its value from.
    lookup: Lookup,
}

/// Pending result of a random-access attribute lookup.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    /// No lookup pending: reads consume the sequential cursor.
    Cursor,
    /// Lookup hit: reads decode the value at this position, leaving the
    /// sequential cursor alone.
    Hit(Position),
    /// Lookup missed: reads report the type's default.
    Miss,
}

impl<'a> PackedDecoder<'a> {
    /// Creates a decoder that resolves space references through `spaces`.
    ///
    /// Call [`ingest_stream`](Decoder::ingest_stream) before anything else.
    #[must_use]
    pub fn new(spaces: &'a dyn SpaceManager) -> Self {
        let stream = ChunkedStream::new();
        let head = stream.start();
        Self {
            spaces,
            stream,
            head,
            frames: Vec::new(),
        }
    }

    /// Runs one bare typed read against the frame's pending lookup state:
    /// a miss reports `default`, a hit decodes out-of-line, and otherwise
    /// the sequential cursor is consumed.
    fn read_value<T, F>(&mut self, default: T, decode: F) -> Result<T>
    where
        F: FnOnce(&ChunkedStream, &mut Position) -> Result<T>,
    {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        match mem::replace(&mut frame.lookup, Lookup::Cursor) {
            Lookup::Miss => Ok(default),
            Lookup::Hit(mut pos) => decode(&self.stream, &mut pos),
            Lookup::Cursor => {
                let value = decode(&self.stream, &mut frame.cur)?;
                frame.value_pending = false;
                Ok(value)
            }
        }
    }

    /// The position the next bare read would decode from, if any.
    fn pending_read_position(&self) -> Result<Option<Position>> {
        let frame = self
            .frames
            .last()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        Ok(match frame.lookup {
            Lookup::Miss => None,
            Lookup::Hit(pos) => Some(pos),
            Lookup::Cursor => Some(frame.cur),
        })
    }

    fn clear_lookup(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.lookup = Lookup::Cursor;
        }
    }
}

impl Decoder for PackedDecoder<'_> {
    fn ingest_stream(&mut self, source: &mut dyn BufRead) -> Result<()> {
        self.stream.ingest(source)?;
        // Guard record: a top-level peek after the final close must see an
        // element end, not run off the stream.
        self.stream.append(&[ELEMENT_END]);
        self.head = self.stream.start();
        Ok(())
    }

    fn peek_element(&mut self) -> Result<u32> {
        let header = self.stream.byte_at(self.head)?;
        if header & HEADER_MASK != ELEMENT_START {
            return Ok(UNKNOWN_ID);
        }
        let mut id = u32::from(header & HEADER_ID_MASK);
        if header & HEADER_EXTEND != 0 {
            let ext = self.stream.byte_after(self.head)?;
            id = (id << RAWDATA_BITS) | u32::from(ext & RAWDATA_MASK);
        }
        Ok(id)
    }

    fn open_element(&mut self) -> Result<u32> {
        let header = self.stream.byte_at(self.head)?;
        if header & HEADER_MASK != ELEMENT_START {
            return Ok(UNKNOWN_ID);
        }
        let id = take_id(&self.stream, &mut self.head)?;
        let start = self.head;
        let mut pos = start;
        while self.stream.byte_at(pos)? & HEADER_MASK == ATTRIBUTE {
            take_id(&self.stream, &mut pos)?;
            skip_value(&self.stream, &mut pos)?;
        }
        self.head = pos;
        self.frames.push(Frame {
            start,
            cur: start,
            end: pos,
            value_pending: false,
            lookup: Lookup::Cursor,
        });
        Ok(id)
    }

    fn open_element_expect(&mut self, elem: &ElementId) -> Result<u32> {
        let id = self.open_element()?;
        if id == UNKNOWN_ID {
            return Err(DecoderError::new(format!(
                "expected element <{}> but did not scan an element",
                elem.name()
            )));
        }
        if id != elem.id() {
            return Err(DecoderError::new(format!(
                "expected element <{}>",
                elem.name()
            )));
        }
        Ok(id)
    }

    fn close_element(&mut self, id: u32) -> Result<()> {
        if self.frames.is_empty() {
            return Err(DecoderError::new("no element is open"));
        }
        let header = self.stream.byte_at(self.head)?;
        if header & HEADER_MASK != ELEMENT_END {
            return Err(DecoderError::new("expecting element close"));
        }
        let close_id = take_id(&self.stream, &mut self.head)?;
        if close_id != id {
            return Err(DecoderError::new("did not see expected closing element"));
        }
        self.frames.pop();
        Ok(())
    }

    fn close_element_skipping(&mut self, id: u32) -> Result<()> {
        let mut pending = vec![id];
        while let Some(&innermost) = pending.last() {
            match self.stream.byte_at(self.head)? & HEADER_MASK {
                ELEMENT_END => {
                    self.close_element(innermost)?;
                    pending.pop();
                }
                ELEMENT_START => {
                    pending.push(self.open_element()?);
                }
                _ => return Err(DecoderError::new("corrupt stream")),
            }
        }
        Ok(())
    }

    fn rewind_attributes(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.cur = frame.start;
            frame.value_pending = false;
            frame.lookup = Lookup::Cursor;
        }
    }

    fn next_attribute_id(&mut self) -> Result<u32> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        frame.lookup = Lookup::Cursor;
        if frame.value_pending {
            skip_value(&self.stream, &mut frame.cur)?;
            frame.value_pending = false;
        }
        if frame.cur == frame.end {
            return Ok(UNKNOWN_ID);
        }
        let id = take_id(&self.stream, &mut frame.cur)?;
        frame.value_pending = true;
        Ok(id)
    }

    fn indexed_attribute_id(&mut self, attrib: &AttributeId) -> Result<u32> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        let mut pos = frame.start;
        while pos != frame.end {
            let id = take_id(&self.stream, &mut pos)?;
            if id == attrib.id() {
                frame.lookup = Lookup::Hit(pos);
                return Ok(id);
            }
            skip_value(&self.stream, &mut pos)?;
        }
        frame.lookup = Lookup::Miss;
        Ok(UNKNOWN_ID)
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.read_value(false, decode_bool)
    }

    fn read_bool_for(&mut self, attrib: &AttributeId) -> Result<bool> {
        self.indexed_attribute_id(attrib)?;
        self.read_bool()
    }

    fn read_signed_integer(&mut self) -> Result<i64> {
        self.read_value(0, decode_signed)
    }

    fn read_signed_integer_for(&mut self, attrib: &AttributeId) -> Result<i64> {
        self.indexed_attribute_id(attrib)?;
        self.read_signed_integer()
    }

    fn read_signed_integer_expect_string(
        &mut self,
        expect: &str,
        expect_val: i64,
    ) -> Result<i64> {
        let Some(pos) = self.pending_read_position()? else {
            self.clear_lookup();
            return Ok(0);
        };
        if self.stream.byte_at(pos)? >> TYPECODE_SHIFT == TYPECODE_STRING {
            let val = self.read_string()?;
            if val == expect {
                Ok(expect_val)
            } else {
                Err(DecoderError::new(format!(
                    "expected string \"{expect}\" but read \"{val}\""
                )))
            }
        } else {
            self.read_signed_integer()
        }
    }

    fn read_signed_integer_expect_string_for(
        &mut self,
        attrib: &AttributeId,
        expect: &str,
        expect_val: i64,
    ) -> Result<i64> {
        self.indexed_attribute_id(attrib)?;
        self.read_signed_integer_expect_string(expect, expect_val)
    }

    fn read_unsigned_integer(&mut self) -> Result<u64> {
        self.read_value(0, decode_unsigned)
    }

    fn read_unsigned_integer_for(&mut self, attrib: &AttributeId) -> Result<u64> {
        self.indexed_attribute_id(attrib)?;
        self.read_unsigned_integer()
    }

    fn read_string(&mut self) -> Result<String> {
        self.read_value(String::new(), decode_string)
    }

    fn read_string_for(&mut self, attrib: &AttributeId) -> Result<String> {
        self.indexed_attribute_id(attrib)?;
        self.read_string()
    }

    fn read_space(&mut self) -> Result<AddrSpace> {
        let spaces = self.spaces;
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        match mem::replace(&mut frame.lookup, Lookup::Cursor) {
            Lookup::Miss => Err(DecoderError::new("space attribute is missing")),
            Lookup::Hit(mut pos) => decode_space(&self.stream, &mut pos, spaces),
            Lookup::Cursor => {
                let space = decode_space(&self.stream, &mut frame.cur, spaces)?;
                frame.value_pending = false;
                Ok(space)
            }
        }
    }

    fn read_space_for(&mut self, attrib: &AttributeId) -> Result<Option<AddrSpace>> {
        if self.indexed_attribute_id(attrib)? == UNKNOWN_ID {
            self.clear_lookup();
            return Ok(None);
        }
        self.read_space().map(Some)
    }
}

/// Consumes a record header (and extension byte, if present), returning
/// the id. The caller has already checked the record kind.
fn take_id(stream: &ChunkedStream, pos: &mut Position) -> Result<u32> {
    let header = stream.take(pos)?;
    let mut id = u32::from(header & HEADER_ID_MASK);
    if header & HEADER_EXTEND != 0 {
        id = (id << RAWDATA_BITS) | u32::from(stream.take(pos)? & RAWDATA_MASK);
    }
    Ok(id)
}

/// Decodes a big-endian 7-bits-per-byte integer of `len` payload bytes.
fn read_integer(stream: &ChunkedStream, pos: &mut Position, len: u8) -> Result<u64> {
    if len > MAX_INTEGER_BYTES {
        return Err(DecoderError::new("integer length code out of range"));
    }
    let mut res: u64 = 0;
    for _ in 0..len {
        if res >> (u64::BITS - RAWDATA_BITS) != 0 {
            return Err(DecoderError::new("integer value overflows 64 bits"));
        }
        res = (res << RAWDATA_BITS) | u64::from(stream.take(pos)? & RAWDATA_MASK);
    }
    Ok(res)
}

/// Skips one attribute value, starting at its type byte.
fn skip_value(stream: &ChunkedStream, pos: &mut Position) -> Result<()> {
    let type_byte = stream.take(pos)?;
    let len = type_byte & LENGTHCODE_MASK;
    match type_byte >> TYPECODE_SHIFT {
        TYPECODE_BOOLEAN | TYPECODE_SPECIALSPACE => Ok(()),
        TYPECODE_SIGNEDINT_POSITIVE
        | TYPECODE_SIGNEDINT_NEGATIVE
        | TYPECODE_UNSIGNEDINT
        | TYPECODE_ADDRESSSPACE => {
            if len > MAX_INTEGER_BYTES {
                return Err(DecoderError::new("integer length code out of range"));
            }
            stream.advance(pos, usize::from(len))
        }
        TYPECODE_STRING => {
            let count = read_integer(stream, pos, len)?;
            let count = usize::try_from(count)
                .map_err(|_| DecoderError::new("string length out of range"))?;
            stream.advance(pos, count)
        }
        _ => Err(DecoderError::new("invalid attribute type code")),
    }
}

fn decode_bool(stream: &ChunkedStream, pos: &mut Position) -> Result<bool> {
    let type_byte = stream.take(pos)?;
    if type_byte >> TYPECODE_SHIFT != TYPECODE_BOOLEAN {
        return Err(DecoderError::new("expecting boolean attribute"));
    }
    match type_byte & LENGTHCODE_MASK {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DecoderError::new("boolean length code out of range")),
    }
}

fn decode_signed(stream: &ChunkedStream, pos: &mut Position) -> Result<i64> {
    let type_byte = stream.take(pos)?;
    let len = type_byte & LENGTHCODE_MASK;
    match type_byte >> TYPECODE_SHIFT {
        TYPECODE_SIGNEDINT_POSITIVE => {
            let magnitude = read_integer(stream, pos, len)?;
            i64::try_from(magnitude)
                .map_err(|_| DecoderError::new("signed integer magnitude out of range"))
        }
        TYPECODE_SIGNEDINT_NEGATIVE => {
            let magnitude = read_integer(stream, pos, len)?;
            if magnitude > i64::MAX.unsigned_abs() + 1 {
                return Err(DecoderError::new("signed integer magnitude out of range"));
            }
            Ok((magnitude as i64).wrapping_neg())
        }
        _ => Err(DecoderError::new("expecting signed integer attribute")),
    }
}

fn decode_unsigned(stream: &ChunkedStream, pos: &mut Position) -> Result<u64> {
    let type_byte = stream.take(pos)?;
    if type_byte >> TYPECODE_SHIFT != TYPECODE_UNSIGNEDINT {
        return Err(DecoderError::new("expecting unsigned integer attribute"));
    }
    read_integer(stream, pos, type_byte & LENGTHCODE_MASK)
}

fn decode_string(stream: &ChunkedStream, pos: &mut Position) -> Result<String> {
    let type_byte = stream.take(pos)?;
    if type_byte >> TYPECODE_SHIFT != TYPECODE_STRING {
        return Err(DecoderError::new("expecting string attribute"));
    }
    let count = read_integer(stream, pos, type_byte & LENGTHCODE_MASK)?;
    let count =
        usize::try_from(count).map_err(|_| DecoderError::new("string length out of range"))?;
    let bytes = stream.take_bytes(pos, count)?;
    String::from_utf8(bytes).map_err(|_| DecoderError::new("string attribute is not valid UTF-8"))
}

fn decode_space(
    stream: &ChunkedStream,
    pos: &mut Position,
    spaces: &dyn SpaceManager,
) -> Result<AddrSpace> {
    let type_byte = stream.take(pos)?;
    let len = type_byte & LENGTHCODE_MASK;
    match type_byte >> TYPECODE_SHIFT {
        TYPECODE_ADDRESSSPACE => {
            let index = read_integer(stream, pos, len)?;
            let index = usize::try_from(index)
                .map_err(|_| DecoderError::new("address space index out of range"))?;
            spaces
                .by_index(index)
                .ok_or_else(|| DecoderError::new("address space index out of range"))
        }
        TYPECODE_SPECIALSPACE => {
            let special = SpecialSpace::from_code(len)
                .ok_or_else(|| DecoderError::new("unknown special space code"))?;
            spaces
                .special(special)
                .ok_or_else(|| DecoderError::new("special address space is not registered"))
        }
        _ => Err(DecoderError::new("expecting space attribute")),
    }
}
