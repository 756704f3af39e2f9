//! Push-based encoder emitting minimal canonical XML.

use std::io::{self, Write};

use crate::codec::Encoder;
use crate::ident::{AttributeId, ElementId, ATTRIB_CONTENT};
use crate::space::{AddrSpace, SpaceManager};
use crate::xml::document::{escape_attr, escape_text};

/// Encoder producing the XML text encoding.
///
/// Emits no declaration, no indentation and no superfluous whitespace, so
/// output can be embedded in transport framing the same way the packed
/// form is. The closing `>` of a start tag is deferred until the first
/// non-attribute write, which is what lets attributes follow
/// [`open_element`](Encoder::open_element) through the push contract.
pub struct XmlEncoder<'a, W: Write> {
    out: W,
    spaces: &'a dyn SpaceManager,
    tag_open: bool,
}

impl<'a, W: Write> XmlEncoder<'a, W> {
    /// Creates an encoder writing to `out`, naming space references
    /// through `spaces`.
    pub fn new(out: W, spaces: &'a dyn SpaceManager) -> Self {
        Self {
            out,
            spaces,
            tag_open: false,
        }
    }

    /// Ends the pending start tag, if any, before content is written.
    fn settle_tag(&mut self) -> io::Result<()> {
        if self.tag_open {
            self.out.write_all(b">")?;
            self.tag_open = false;
        }
        Ok(())
    }

    /// Writes either an attribute or, for [`ATTRIB_CONTENT`], a text body.
    fn write_value(&mut self, attrib: &AttributeId, value: &str) -> io::Result<()> {
        if attrib.id() == ATTRIB_CONTENT.id() {
            self.settle_tag()?;
            self.out.write_all(escape_text(value).as_bytes())
        } else {
            write!(self.out, " {}=\"{}\"", attrib.name(), escape_attr(value))
        }
    }
}

impl<W: Write> Encoder for XmlEncoder<'_, W> {
    fn open_element(&mut self, elem: &ElementId) -> io::Result<()> {
        self.settle_tag()?;
        self.tag_open = true;
        write!(self.out, "<{}", elem.name())
    }

    fn close_element(&mut self, elem: &ElementId) -> io::Result<()> {
        if self.tag_open {
            self.tag_open = false;
            self.out.write_all(b"/>")
        } else {
            write!(self.out, "</{}>", elem.name())
        }
    }

    fn write_bool(&mut self, attrib: &AttributeId, val: bool) -> io::Result<()> {
        self.write_value(attrib, if val { "true" } else { "false" })
    }

    fn write_signed_integer(&mut self, attrib: &AttributeId, val: i64) -> io::Result<()> {
        self.write_value(attrib, &val.to_string())
    }

    fn write_unsigned_integer(&mut self, attrib: &AttributeId, val: u64) -> io::Result<()> {
        self.write_value(attrib, &format!("0x{val:x}"))
    }

    fn write_string(&mut self, attrib: &AttributeId, val: &str) -> io::Result<()> {
        self.write_value(attrib, val)
    }

    fn write_string_indexed(
        &mut self,
        attrib: &AttributeId,
        index: u32,
        val: &str,
    ) -> io::Result<()> {
        write!(
            self.out,
            " {}{}=\"{}\"",
            attrib.name(),
            index + 1,
            escape_attr(val)
        )
    }

    fn write_space(&mut self, attrib: &AttributeId, space: AddrSpace) -> io::Result<()> {
        let spaces = self.spaces;
        self.write_value(attrib, spaces.name(space))
    }
}
