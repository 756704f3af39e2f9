//! Owned XML document tree and the minimal parser that builds it.
//!
//! The XML transfer encoding only ever carries machine-generated documents:
//! elements, attributes, and text content. This model covers exactly that.
//! Prologs, comments, CDATA sections, and doctype declarations are consumed
//! and discarded; processing instructions are skipped; namespaces are not
//! interpreted.
//!
//! Nodes live in an arena indexed by [`NodeId`], so a decoder can own the
//! document and still hold cheap cursors into it.

use std::borrow::Cow;

use memchr::memchr;

use crate::error::{DecoderError, Result};

/// Index of an element node within its [`Document`].
pub type NodeId = usize;

/// One attribute of an element, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttr {
    pub name: String,
    pub value: String,
}

#[derive(Debug)]
struct Node {
    name: String,
    attrs: Vec<XmlAttr>,
    /// Concatenated character data of the element, entity-decoded.
    content: String,
    children: Vec<NodeId>,
}

/// A parsed XML document. The root element is node 0.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parses `text` as one XML document.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser {
            text: text.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
        };
        parser.skip_misc()?;
        if parser.peek() != Some(b'<') {
            return Err(DecoderError::new("expected a root element"));
        }
        parser.parse_element()?;
        parser.skip_misc()?;
        if parser.pos != parser.text.len() {
            return Err(DecoderError::new("trailing data after the root element"));
        }
        Ok(Document {
            nodes: parser.nodes,
        })
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        0
    }

    /// The element's tag name.
    #[must_use]
    pub fn name(&self, node: NodeId) -> &str {
        &self.nodes[node].name
    }

    /// The element's attributes in declared order.
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> &[XmlAttr] {
        &self.nodes[node].attrs
    }

    /// The element's character data, entity-decoded.
    #[must_use]
    pub fn content(&self, node: NodeId) -> &str {
        &self.nodes[node].content
    }

    /// The element's child elements in document order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }
}

struct Parser<'s> {
    text: &'s [u8],
    pos: usize,
    nodes: Vec<Node>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.text[self.pos..].starts_with(prefix)
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(DecoderError::new(format!(
                "malformed XML: expected '{}'",
                byte as char
            )))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skips whitespace, the prolog, processing instructions, comments and
    /// doctype declarations between markup of interest.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with(b"<?") {
                self.skip_until(b"?>")?;
            } else if self.starts_with(b"<!--") {
                self.skip_until(b"-->")?;
            } else if self.starts_with(b"<!") {
                self.skip_until(b">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_until(&mut self, close: &[u8]) -> Result<()> {
        let hay = &self.text[self.pos..];
        match hay.windows(close.len()).position(|w| w == close) {
            Some(found) => {
                self.pos += found + close.len();
                Ok(())
            }
            None => Err(DecoderError::new("unterminated markup")),
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b) if !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'<')
        ) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(DecoderError::new("malformed XML: expected a name"));
        }
        let name = std::str::from_utf8(&self.text[start..self.pos])
            .map_err(|_| DecoderError::new("malformed XML: name is not valid UTF-8"))?;
        Ok(name.to_owned())
    }

    /// Parses one element, assuming the cursor sits on its `<`.
    fn parse_element(&mut self) -> Result<NodeId> {
        self.expect(b'<')?;
        let name = self.parse_name()?;
        let node = self.nodes.len();
        self.nodes.push(Node {
            name,
            attrs: Vec::new(),
            content: String::new(),
            children: Vec::new(),
        });

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(node);
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let attr = self.parse_attribute()?;
                    let attrs = &mut self.nodes[node].attrs;
                    if attrs.iter().any(|a| a.name == attr.name) {
                        return Err(DecoderError::new(format!(
                            "duplicate attribute \"{}\"",
                            attr.name
                        )));
                    }
                    attrs.push(attr);
                }
                None => return Err(DecoderError::new("unterminated element tag")),
            }
        }

        // Content: text runs, comments, CDATA, children, then the end tag.
        loop {
            let text_start = self.pos;
            let rel = memchr(b'<', &self.text[self.pos..])
                .ok_or_else(|| DecoderError::new("unterminated element"))?;
            self.pos += rel;
            if self.pos > text_start {
                let raw = std::str::from_utf8(&self.text[text_start..self.pos])
                    .map_err(|_| DecoderError::new("malformed XML: text is not valid UTF-8"))?;
                let decoded = decode_entities(raw)?;
                self.nodes[node].content.push_str(&decoded);
            }
            if self.starts_with(b"</") {
                self.pos += 2;
                let close = self.parse_name()?;
                if close != self.nodes[node].name {
                    return Err(DecoderError::new(format!(
                        "mismatched end tag </{close}>"
                    )));
                }
                self.skip_whitespace();
                self.expect(b'>')?;
                return Ok(node);
            } else if self.starts_with(b"<!--") {
                self.skip_until(b"-->")?;
            } else if self.starts_with(b"<![CDATA[") {
                let data_start = self.pos + b"<![CDATA[".len();
                self.pos = data_start;
                self.skip_until(b"]]>")?;
                let raw = std::str::from_utf8(&self.text[data_start..self.pos - 3])
                    .map_err(|_| DecoderError::new("malformed XML: text is not valid UTF-8"))?;
                self.nodes[node].content.push_str(raw);
            } else if self.starts_with(b"<?") {
                self.skip_until(b"?>")?;
            } else {
                let child = self.parse_element()?;
                self.nodes[node].children.push(child);
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<XmlAttr> {
        let name = self.parse_name()?;
        self.skip_whitespace();
        self.expect(b'=')?;
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(DecoderError::new("attribute value must be quoted")),
        };
        self.pos += 1;
        let start = self.pos;
        let rel = memchr(quote, &self.text[self.pos..])
            .ok_or_else(|| DecoderError::new("unterminated attribute value"))?;
        self.pos += rel;
        let raw = std::str::from_utf8(&self.text[start..self.pos])
            .map_err(|_| DecoderError::new("malformed XML: value is not valid UTF-8"))?;
        let value = decode_entities(raw)?;
        self.pos += 1;
        Ok(XmlAttr { name, value })
    }
}

/// Decodes the predefined entities and numeric character references.
fn decode_entities(raw: &str) -> Result<String> {
    if memchr(b'&', raw.as_bytes()).is_none() {
        return Ok(raw.to_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .find(';')
            .ok_or_else(|| DecoderError::new("unterminated entity reference"))?;
        let entity = &rest[1..semi];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse))
                    .ok_or_else(|| {
                        DecoderError::new(format!("unknown entity reference &{entity};"))
                    })?
                    .map_err(|_| DecoderError::new("invalid character reference"))?;
                let ch = char::from_u32(code)
                    .ok_or_else(|| DecoderError::new("invalid character reference"))?;
                out.push(ch);
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Escapes character data for a text context.
pub(crate) fn escape_text(raw: &str) -> Cow<'_, str> {
    escape(raw, false)
}

/// Escapes character data for a quoted attribute value.
pub(crate) fn escape_attr(raw: &str) -> Cow<'_, str> {
    escape(raw, true)
}

fn escape(raw: &str, quotes: bool) -> Cow<'_, str> {
    let needs = raw
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&') || (quotes && matches!(b, b'"' | b'\'')));
    if !needs {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if quotes => out.push_str("&quot;"),
            '\'' if quotes => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
