//! XML serializer for [`XmlNode`] trees.
//!
//! Output has no indentation: word processors treat whitespace between
//! run elements as content.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use crate::node::{Element, XmlNode};
use crate::parser::XmlDocument;

/// Declaration written for documents parsed with one.
const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Serialize trees back to markup.
pub struct XmlSerializer;

impl XmlSerializer {
    /// Create a new serializer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Serialize a whole document.
    pub fn serialize(&self, document: &XmlDocument) -> String {
        let mut out = String::with_capacity(4096);
        if document.declaration {
            out.push_str(DECLARATION);
        }
        serialize_element(&document.root, &mut out);
        out
    }

    /// Serialize a sequence of sibling nodes.
    pub fn serialize_nodes(&self, nodes: &[XmlNode]) -> String {
        let mut out = String::new();
        for node in nodes {
            serialize_node(node, &mut out);
        }
        out
    }
}

impl Default for XmlSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(element) => serialize_element(element, out),
        XmlNode::Text(text) => out.push_str(&escape_text(text)),
    }
}

fn serialize_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);

    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        serialize_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

/// Escape text for XML content.
fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

/// Escape text for XML attribute values.
fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

/// Escape XML special characters.
fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
