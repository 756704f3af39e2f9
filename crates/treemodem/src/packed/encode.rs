//! Push-based encoder for the packed encoding.

use std::io::{self, Write};

use crate::codec::Encoder;
use crate::format::{
    ATTRIBUTE, ELEMENT_END, ELEMENT_START, HEADER_EXTEND, HEADER_ID_MASK, MAX_INTEGER_BYTES,
    RAWDATA_BITS, RAWDATA_MARKER, RAWDATA_MASK, TYPECODE_ADDRESSSPACE, TYPECODE_BOOLEAN,
    TYPECODE_SHIFT, TYPECODE_SIGNEDINT_NEGATIVE, TYPECODE_SIGNEDINT_POSITIVE,
    TYPECODE_SPECIALSPACE, TYPECODE_STRING, TYPECODE_UNSIGNEDINT,
};
use crate::ident::{AttributeId, ElementId};
use crate::space::{AddrSpace, SpaceClass, SpaceManager};

/// Encoder producing the packed byte encoding.
///
/// Writes straight through to the sink with no buffering of its own; every
/// emitted byte is non-zero, so a transport can frame records with zero
/// bytes.
pub struct PackedEncoder<'a, W: Write> {
    out: W,
    spaces: &'a dyn SpaceManager,
}

impl<'a, W: Write> PackedEncoder<'a, W> {
    /// Creates an encoder writing to `out`, classifying space references
    /// through `spaces`.
    pub fn new(out: W, spaces: &'a dyn SpaceManager) -> Self {
        Self { out, spaces }
    }

    /// Emits an element or attribute header: one byte for ids below 32,
    /// two bytes for the rest of the 12-bit id range.
    fn write_header(&mut self, kind: u8, id: u32) -> io::Result<()> {
        debug_assert!(id < 1 << 12, "id {id} exceeds the 12-bit header range");
        if id > u32::from(HEADER_ID_MASK) {
            let header =
                kind | HEADER_EXTEND | ((id >> RAWDATA_BITS) as u8 & HEADER_ID_MASK);
            let extend = (id as u8 & RAWDATA_MASK) | RAWDATA_MARKER;
            self.out.write_all(&[header, extend])
        } else {
            self.out.write_all(&[kind | id as u8])
        }
    }

    /// Emits a type byte with the minimal length code for `val`, then the
    /// 7-bit payload bytes, most significant group first.
    fn write_integer(&mut self, type_code: u8, val: u64) -> io::Result<()> {
        let len = if val == 0 {
            0
        } else {
            (u64::BITS - val.leading_zeros()).div_ceil(RAWDATA_BITS) as u8
        };
        let mut buf = [0u8; 1 + MAX_INTEGER_BYTES as usize];
        buf[0] = (type_code << TYPECODE_SHIFT) | len;
        for (i, group) in (0..u32::from(len)).rev().enumerate() {
            buf[1 + i] = ((val >> (group * RAWDATA_BITS)) as u8 & RAWDATA_MASK) | RAWDATA_MARKER;
        }
        self.out.write_all(&buf[..1 + usize::from(len)])
    }
}

impl<W: Write> Encoder for PackedEncoder<'_, W> {
    fn open_element(&mut self, elem: &ElementId) -> io::Result<()> {
        self.write_header(ELEMENT_START, elem.id())
    }

    fn close_element(&mut self, elem: &ElementId) -> io::Result<()> {
        self.write_header(ELEMENT_END, elem.id())
    }

    fn write_bool(&mut self, attrib: &AttributeId, val: bool) -> io::Result<()> {
        self.write_header(ATTRIBUTE, attrib.id())?;
        let type_byte = (TYPECODE_BOOLEAN << TYPECODE_SHIFT) | u8::from(val);
        self.out.write_all(&[type_byte])
    }

    fn write_signed_integer(&mut self, attrib: &AttributeId, val: i64) -> io::Result<()> {
        self.write_header(ATTRIBUTE, attrib.id())?;
        if val < 0 {
            self.write_integer(TYPECODE_SIGNEDINT_NEGATIVE, val.unsigned_abs())
        } else {
            self.write_integer(TYPECODE_SIGNEDINT_POSITIVE, val as u64)
        }
    }

    fn write_unsigned_integer(&mut self, attrib: &AttributeId, val: u64) -> io::Result<()> {
        self.write_header(ATTRIBUTE, attrib.id())?;
        self.write_integer(TYPECODE_UNSIGNEDINT, val)
    }

    fn write_string(&mut self, attrib: &AttributeId, val: &str) -> io::Result<()> {
        self.write_header(ATTRIBUTE, attrib.id())?;
        self.write_integer(TYPECODE_STRING, val.len() as u64)?;
        self.out.write_all(val.as_bytes())
    }

    fn write_string_indexed(
        &mut self,
        attrib: &AttributeId,
        index: u32,
        val: &str,
    ) -> io::Result<()> {
        self.write_header(ATTRIBUTE, attrib.id() + index)?;
        self.write_integer(TYPECODE_STRING, val.len() as u64)?;
        self.out.write_all(val.as_bytes())
    }

    fn write_space(&mut self, attrib: &AttributeId, space: AddrSpace) -> io::Result<()> {
        self.write_header(ATTRIBUTE, attrib.id())?;
        match self.spaces.classify(space) {
            SpaceClass::Basic { index } => {
                self.write_integer(TYPECODE_ADDRESSSPACE, index as u64)
            }
            SpaceClass::Special(special) => {
                let type_byte = (TYPECODE_SPECIALSPACE << TYPECODE_SHIFT) | special.code();
                self.out.write_all(&[type_byte])
            }
        }
    }
}
