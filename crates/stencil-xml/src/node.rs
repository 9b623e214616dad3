//! Owned XML tree used for template parts and rendered fragments.
//!
//! Nodes are plain values: cloning a subtree yields an independent copy, which
//! is what loop duplication relies on.

/// A node in an XML tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Element with attributes and children.
    Element(Element),
    /// Unescaped character data.
    Text(String),
}

impl XmlNode {
    /// Borrow the element, if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Mutably borrow the element, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Whether this node is an element with the given local name.
    #[must_use]
    pub fn is(&self, local: &str) -> bool {
        self.as_element().is_some_and(|e| e.is(local))
    }

    /// Whether this node is whitespace-only text.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    /// Concatenated text content of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

impl From<Element> for XmlNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

fn collect_text(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Text(text) => out.push_str(text),
        XmlNode::Element(element) => {
            for child in &element.children {
                collect_text(child, out);
            }
        }
    }
}

/// XML element with a qualified tag name.
///
/// Attribute order is preserved so that serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name, e.g. `w:p`.
    pub tag: String,
    /// Attributes as `(qualified name, unescaped value)` pairs.
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<XmlNode>,
}

impl Element {
    /// Create an element with the given qualified tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder: append an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    /// Builder: append a child node.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<XmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Builder: append a text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Tag name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    /// Whether the local tag name equals `local`.
    #[must_use]
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Value of the attribute whose qualified name is `key`.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first attribute whose local name is `local`.
    #[must_use]
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_name(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute by local name, keeping the existing prefix and position.
    ///
    /// When no attribute with that local name exists, `qualified` is appended.
    pub fn set_attr_local(&mut self, local: &str, qualified: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| local_name(k) == local) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((qualified.to_owned(), value)),
        }
    }

    /// Iterate over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First child element with the given local name.
    #[must_use]
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(local))
    }

    /// First descendant element (depth-first, excluding self) with the given local name.
    #[must_use]
    pub fn descendant(&self, local: &str) -> Option<&Element> {
        for child in self.child_elements() {
            if child.is(local) {
                return Some(child);
            }
            if let Some(found) = child.descendant(local) {
                return Some(found);
            }
        }
        None
    }
}

/// Strip the namespace prefix from a qualified name.
#[must_use]
pub fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("w:p"), "p");
        assert_eq!(local_name("p"), "p");
        assert_eq!(local_name("xml:space"), "space");
    }

    #[test]
    fn test_set_attr_local_keeps_prefix() {
        let mut blip = Element::new("a:blip").with_attr("r:embed", "rId1");
        blip.set_attr_local("embed", "r:embed", "rId7");
        assert_eq!(blip.attrs, vec![("r:embed".to_owned(), "rId7".to_owned())]);
    }

    #[test]
    fn test_set_attr_local_appends_missing() {
        let mut doc_pr = Element::new("wp:docPr").with_attr("name", "Picture 1");
        doc_pr.set_attr_local("id", "id", "4");
        assert_eq!(doc_pr.attr("id"), Some("4"));
        assert_eq!(doc_pr.attrs.len(), 2);
    }

    #[test]
    fn test_text_content() {
        let run = Element::new("w:r")
            .with_child(Element::new("w:t").with_text("Hello "))
            .with_child(Element::new("w:t").with_text("World"));
        assert_eq!(XmlNode::from(run).text_content(), "Hello World");
    }

    #[test]
    fn test_descendant() {
        let drawing = Element::new("w:drawing").with_child(
            Element::new("wp:inline").with_child(Element::new("wp:docPr").with_attr("id", "1")),
        );
        assert_eq!(
            drawing.descendant("docPr").and_then(|e| e.attr("id")),
            Some("1")
        );
        assert!(drawing.descendant("blip").is_none());
    }
}
