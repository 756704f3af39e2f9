//! Pull-based decoder over a parsed XML document.

use std::io::BufRead;

use crate::codec::Decoder;
use crate::error::{DecoderError, Result};
use crate::ident::{AttributeId, ElementId, ATTRIB_CONTENT, UNKNOWN_ID};
use crate::space::{AddrSpace, SpaceManager};
use crate::xml::document::{Document, NodeId};

/// Decoder over the XML text encoding.
///
/// Either ingests and parses a document itself, or is handed one that was
/// parsed elsewhere. Elements are walked in document order through the
/// same contract the packed decoder implements; attribute values are
/// parsed from their text forms on demand.
pub struct XmlDecoder<'a> {
    spaces: &'a dyn SpaceManager,
    document: Option<Document>,
    root_pending: bool,
    stack: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    node: NodeId,
    next_child: usize,
    /// 1-based index of the current attribute; 0 before the first.
    cursor: usize,
    /// A random-access lookup missed; the next bare read reports a
    /// default.
    lookup_missed: bool,
}

impl<'a> XmlDecoder<'a> {
    /// Creates a decoder that resolves space references through `spaces`.
    ///
    /// Call [`ingest_stream`](Decoder::ingest_stream) before anything else.
    #[must_use]
    pub fn new(spaces: &'a dyn SpaceManager) -> Self {
        Self {
            spaces,
            document: None,
            root_pending: false,
            stack: Vec::new(),
        }
    }

    /// Creates a decoder over a document parsed elsewhere.
    #[must_use]
    pub fn from_document(spaces: &'a dyn SpaceManager, document: Document) -> Self {
        Self {
            spaces,
            document: Some(document),
            root_pending: true,
            stack: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))
    }

    /// The element the decoder would open next, if any.
    fn next_node(&self) -> Result<Option<NodeId>> {
        let doc = self.document()?;
        Ok(match self.stack.last() {
            None => {
                if self.root_pending {
                    Some(doc.root())
                } else {
                    None
                }
            }
            Some(frame) => doc.children(frame.node).get(frame.next_child).copied(),
        })
    }

    /// Commits the open of `node` and pushes its frame.
    fn push_open(&mut self, node: NodeId) {
        match self.stack.last_mut() {
            None => self.root_pending = false,
            Some(frame) => frame.next_child += 1,
        }
        self.stack.push(Frame {
            node,
            next_child: 0,
            cursor: 0,
            lookup_missed: false,
        });
    }

    /// Runs one bare typed read against the current attribute.
    fn read_current<T>(
        &mut self,
        default: T,
        parse: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))?;
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        if frame.lookup_missed {
            frame.lookup_missed = false;
            return Ok(default);
        }
        if frame.cursor == 0 {
            return Err(DecoderError::new("no current attribute"));
        }
        parse(&doc.attributes(frame.node)[frame.cursor - 1].value)
    }

    /// Runs one keyed typed read by attribute name, leaving the sequential
    /// cursor untouched. [`ATTRIB_CONTENT`] selects the element's text
    /// body; an absent attribute reports `default`.
    fn read_keyed<T>(
        &self,
        attrib: &AttributeId,
        default: T,
        parse: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        let doc = self.document()?;
        let frame = self
            .stack
            .last()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        if attrib.id() == ATTRIB_CONTENT.id() {
            return parse(doc.content(frame.node));
        }
        match doc
            .attributes(frame.node)
            .iter()
            .find(|attr| attr.name == attrib.name())
        {
            Some(attr) => parse(&attr.value),
            None => Ok(default),
        }
    }
}

impl Decoder for XmlDecoder<'_> {
    fn ingest_stream(&mut self, source: &mut dyn BufRead) -> Result<()> {
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        self.document = Some(Document::parse(&text)?);
        self.root_pending = true;
        Ok(())
    }

    fn peek_element(&mut self) -> Result<u32> {
        let next = self.next_node()?;
        let doc = self.document()?;
        Ok(match next {
            Some(node) => ElementId::find(doc.name(node)),
            None => UNKNOWN_ID,
        })
    }

    fn open_element(&mut self) -> Result<u32> {
        let Some(node) = self.next_node()? else {
            return Ok(UNKNOWN_ID);
        };
        let id = ElementId::find(self.document()?.name(node));
        self.push_open(node);
        Ok(id)
    }

    fn open_element_expect(&mut self, elem: &ElementId) -> Result<u32> {
        let Some(node) = self.next_node()? else {
            return Err(DecoderError::new(format!(
                "expected element <{}> but did not scan an element",
                elem.name()
            )));
        };
        if self.document()?.name(node) != elem.name() {
            return Err(DecoderError::new(format!(
                "expected element <{}>",
                elem.name()
            )));
        }
        self.push_open(node);
        Ok(elem.id())
    }

    fn close_element(&mut self, id: u32) -> Result<()> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))?;
        let frame = self
            .stack
            .last()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        if frame.next_child != doc.children(frame.node).len() {
            return Err(DecoderError::new("expecting element close"));
        }
        if ElementId::find(doc.name(frame.node)) != id {
            return Err(DecoderError::new("did not see expected closing element"));
        }
        self.stack.pop();
        Ok(())
    }

    fn close_element_skipping(&mut self, id: u32) -> Result<()> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))?;
        let frame = self
            .stack
            .last()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        if ElementId::find(doc.name(frame.node)) != id {
            return Err(DecoderError::new("did not see expected closing element"));
        }
        self.stack.pop();
        Ok(())
    }

    fn rewind_attributes(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.cursor = 0;
            frame.lookup_missed = false;
        }
    }

    fn next_attribute_id(&mut self) -> Result<u32> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))?;
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        frame.lookup_missed = false;
        let attrs = doc.attributes(frame.node);
        if frame.cursor < attrs.len() {
            frame.cursor += 1;
            Ok(AttributeId::find(&attrs[frame.cursor - 1].name))
        } else {
            Ok(UNKNOWN_ID)
        }
    }

    fn indexed_attribute_id(&mut self, attrib: &AttributeId) -> Result<u32> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))?;
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        // The XML rendering of an indexed attribute family is the base name
        // with a 1-based decimal suffix; the current cursor attribute is
        // the candidate.
        if frame.cursor > 0 {
            let name = &doc.attributes(frame.node)[frame.cursor - 1].name;
            if let Some(suffix) = name.strip_prefix(attrib.name()) {
                if suffix.is_empty() {
                    frame.lookup_missed = false;
                    return Ok(attrib.id());
                }
                if let Ok(index) = suffix.parse::<u32>() {
                    if index >= 1 {
                        frame.lookup_missed = false;
                        return Ok(attrib.id() + (index - 1));
                    }
                }
            }
        }
        frame.lookup_missed = true;
        Ok(UNKNOWN_ID)
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.read_current(false, parse_bool)
    }

    fn read_bool_for(&mut self, attrib: &AttributeId) -> Result<bool> {
        self.read_keyed(attrib, false, parse_bool)
    }

    fn read_signed_integer(&mut self) -> Result<i64> {
        self.read_current(0, parse_i64)
    }

    fn read_signed_integer_for(&mut self, attrib: &AttributeId) -> Result<i64> {
        self.read_keyed(attrib, 0, parse_i64)
    }

    fn read_signed_integer_expect_string(
        &mut self,
        expect: &str,
        expect_val: i64,
    ) -> Result<i64> {
        self.read_current(0, |value| {
            if value == expect {
                Ok(expect_val)
            } else {
                parse_i64(value)
            }
        })
    }

    fn read_signed_integer_expect_string_for(
        &mut self,
        attrib: &AttributeId,
        expect: &str,
        expect_val: i64,
    ) -> Result<i64> {
        self.read_keyed(attrib, 0, |value| {
            if value == expect {
                Ok(expect_val)
            } else {
                parse_i64(value)
            }
        })
    }

    fn read_unsigned_integer(&mut self) -> Result<u64> {
        self.read_current(0, parse_u64)
    }

    fn read_unsigned_integer_for(&mut self, attrib: &AttributeId) -> Result<u64> {
        self.read_keyed(attrib, 0, parse_u64)
    }

    fn read_string(&mut self) -> Result<String> {
        self.read_current(String::new(), |value| Ok(value.to_owned()))
    }

    fn read_string_for(&mut self, attrib: &AttributeId) -> Result<String> {
        self.read_keyed(attrib, String::new(), |value| Ok(value.to_owned()))
    }

    fn read_space(&mut self) -> Result<AddrSpace> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| DecoderError::new("no document has been ingested"))?;
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| DecoderError::new("no element is open"))?;
        if frame.lookup_missed {
            frame.lookup_missed = false;
            return Err(DecoderError::new("space attribute is missing"));
        }
        if frame.cursor == 0 {
            return Err(DecoderError::new("no current attribute"));
        }
        let name = &doc.attributes(frame.node)[frame.cursor - 1].value;
        self.spaces
            .by_name(name)
            .ok_or_else(|| DecoderError::new(format!("unknown address space name: {name}")))
    }

    fn read_space_for(&mut self, attrib: &AttributeId) -> Result<Option<AddrSpace>> {
        let spaces = self.spaces;
        self.read_keyed(attrib, None, |name| {
            spaces
                .by_name(name)
                .map(Some)
                .ok_or_else(|| DecoderError::new(format!("unknown address space name: {name}")))
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(DecoderError::new(format!("invalid boolean value \"{value}\""))),
    }
}

fn parse_u64(value: &str) -> Result<u64> {
    let value = value.trim();
    let (digits, radix) = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (value, 10),
    };
    u64::from_str_radix(digits, radix)
        .map_err(|_| DecoderError::new(format!("invalid integer value \"{value}\"")))
}

fn parse_i64(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    if let Some(rest) = trimmed.strip_prefix('-') {
        let magnitude = parse_u64(rest)?;
        if magnitude > i64::MAX.unsigned_abs() + 1 {
            return Err(DecoderError::new(format!(
                "invalid integer value \"{value}\""
            )));
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        let magnitude = parse_u64(trimmed)?;
        i64::try_from(magnitude)
            .map_err(|_| DecoderError::new(format!("invalid integer value \"{value}\"")))
    }
}
