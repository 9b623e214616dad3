//! XML parser producing owned [`XmlNode`] trees.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XmlError;
use crate::node::{Element, XmlNode};

/// Wrapper tag used when parsing markup fragments.
const FRAGMENT_ROOT: &str = "stencil-fragment";

/// A parsed XML document: optional declaration plus the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// Whether the source started with an `<?xml ...?>` declaration.
    pub declaration: bool,
    /// Root element.
    pub root: Element,
}

/// Parse XML markup into [`XmlNode`] trees.
///
/// Whitespace is preserved, comments and processing instructions are dropped.
pub struct XmlParser;

impl XmlParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse a complete document (one root element).
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is not well-formed or has no root element.
    pub fn parse(&self, xml: &str) -> Result<XmlDocument, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut declaration = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Decl(_) => declaration = true,
                Event::Start(e) => {
                    let mut root = self.decode_element(&reader, &e);
                    root.children = self.parse_children(&mut reader, &root.tag)?;
                    return Ok(XmlDocument { declaration, root });
                }
                Event::Empty(e) => {
                    let root = self.decode_element(&reader, &e);
                    return Ok(XmlDocument { declaration, root });
                }
                Event::Eof => return Err(XmlError::MissingRoot),
                // Prolog whitespace, comments, doctype
                _ => {}
            }
            buf.clear();
        }
    }

    /// Parse a markup fragment that may hold several top-level nodes.
    ///
    /// Namespace prefixes do not need to be declared.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is not well-formed.
    pub fn parse_fragment(&self, xml: &str) -> Result<Vec<XmlNode>, XmlError> {
        let wrapped = format!("<{FRAGMENT_ROOT}>{xml}</{FRAGMENT_ROOT}>");
        Ok(self.parse(&wrapped)?.root.children)
    }

    fn parse_children<R: BufRead>(
        &self,
        reader: &mut Reader<R>,
        parent_tag: &str,
    ) -> Result<Vec<XmlNode>, XmlError> {
        let mut buf = Vec::new();
        let mut children = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let mut child = self.decode_element(reader, &e);
                    child.children = self.parse_children(reader, &child.tag)?;
                    children.push(XmlNode::Element(child));
                }
                Event::Empty(e) => {
                    children.push(XmlNode::Element(self.decode_element(reader, &e)));
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?.into_owned();
                    append_text(&mut children, &text);
                }
                Event::GeneralRef(e) => {
                    let entity = reader.decoder().decode(&e)?.into_owned();
                    append_text(&mut children, &decode_entity(&entity));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    append_text(&mut children, &text);
                }
                Event::End(e) => {
                    let end_tag = self.decode_name(reader, e.name().as_ref());
                    if end_tag != parent_tag {
                        return Err(XmlError::MismatchedEnd {
                            expected: parent_tag.to_owned(),
                            found: end_tag,
                        });
                    }
                    return Ok(children);
                }
                Event::Eof => return Ok(children),
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }
    }

    fn decode_element<R: BufRead>(&self, reader: &Reader<R>, e: &BytesStart) -> Element {
        Element {
            tag: self.decode_name(reader, e.name().as_ref()),
            attrs: self.decode_attrs(reader, e),
            children: Vec::new(),
        }
    }

    fn decode_name<R: BufRead>(&self, reader: &Reader<R>, name: &[u8]) -> String {
        reader.decoder().decode(name).map_or_else(
            |_| String::from_utf8_lossy(name).into_owned(),
            std::borrow::Cow::into_owned,
        )
    }

    fn decode_attrs<R: BufRead>(&self, reader: &Reader<R>, e: &BytesStart) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        for attr in e.attributes().flatten() {
            let key = self.decode_name(reader, attr.key.as_ref());
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            attrs.push((key, value));
        }
        attrs
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Append text, merging with a preceding text node.
fn append_text(children: &mut Vec<XmlNode>, text: &str) {
    if let Some(XmlNode::Text(last)) = children.last_mut() {
        last.push_str(text);
    } else {
        children.push(XmlNode::Text(text.to_owned()));
    }
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}
