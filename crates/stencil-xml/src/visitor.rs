//! Visitor framework over [`XmlNode`] trees.
//!
//! [`walk`] visits every node in document order. A [`Visitor`] dispatches by
//! [`NodeKind`]; kinds without a handler are ignored. Visitors that care
//! about arbitrary elements override [`Visitor::visit`] directly.

use crate::node::{Element, XmlNode};

/// Structural kind of a WordprocessingML node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `w:p`
    Paragraph,
    /// `w:r`
    Run,
    /// `w:br`
    Break,
    /// `w:t`
    Text,
    /// `w:tbl`
    Table,
    /// `w:drawing`
    Drawing,
    /// `w:fldSimple`
    Field,
    /// Any other element, or character data.
    Other,
}

impl NodeKind {
    /// Classify a node by its local tag name.
    #[must_use]
    pub fn of(node: &XmlNode) -> Self {
        let Some(element) = node.as_element() else {
            return Self::Other;
        };
        match element.local_name() {
            "p" => Self::Paragraph,
            "r" => Self::Run,
            "br" => Self::Break,
            "t" => Self::Text,
            "tbl" => Self::Table,
            "drawing" => Self::Drawing,
            "fldSimple" => Self::Field,
            _ => Self::Other,
        }
    }
}

/// Node visitor with per-kind handlers.
pub trait Visitor {
    /// Visit a single node. The default dispatches on [`NodeKind`].
    fn visit(&mut self, node: &mut XmlNode) {
        let kind = NodeKind::of(node);
        let Some(element) = node.as_element_mut() else {
            return;
        };
        match kind {
            NodeKind::Paragraph => self.visit_paragraph(element),
            NodeKind::Run => self.visit_run(element),
            NodeKind::Break => self.visit_break(element),
            NodeKind::Text => self.visit_text(element),
            NodeKind::Table => self.visit_table(element),
            NodeKind::Drawing => self.visit_drawing(element),
            NodeKind::Field => self.visit_field(element),
            NodeKind::Other => {}
        }
    }

    fn visit_paragraph(&mut self, _paragraph: &mut Element) {}
    fn visit_run(&mut self, _run: &mut Element) {}
    fn visit_break(&mut self, _br: &mut Element) {}
    fn visit_text(&mut self, _text: &mut Element) {}
    fn visit_table(&mut self, _table: &mut Element) {}
    fn visit_drawing(&mut self, _drawing: &mut Element) {}
    fn visit_field(&mut self, _field: &mut Element) {}
}

/// Visit `nodes` and all their descendants, parents before children.
pub fn walk<V: Visitor + ?Sized>(nodes: &mut [XmlNode], visitor: &mut V) {
    for node in nodes {
        visitor.visit(node);
        if let XmlNode::Element(element) = node {
            walk(&mut element.children, visitor);
        }
    }
}

/// Structural pattern matched against elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    local_name: String,
    attribute: Option<(String, Option<String>)>,
}

impl Pattern {
    /// Match elements with the given local tag name.
    #[must_use]
    pub fn element(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            attribute: None,
        }
    }

    /// Additionally require an attribute (by local name) to be present.
    #[must_use]
    pub fn with_attribute(mut self, local_name: impl Into<String>) -> Self {
        self.attribute = Some((local_name.into(), None));
        self
    }

    /// Additionally require an attribute whose value contains `needle`.
    #[must_use]
    pub fn with_attribute_containing(
        mut self,
        local_name: impl Into<String>,
        needle: impl Into<String>,
    ) -> Self {
        self.attribute = Some((local_name.into(), Some(needle.into())));
        self
    }

    /// Whether `node` matches this pattern.
    #[must_use]
    pub fn matches(&self, node: &XmlNode) -> bool {
        let Some(element) = node.as_element() else {
            return false;
        };
        if !element.is(&self.local_name) {
            return false;
        }
        match &self.attribute {
            None => true,
            Some((name, None)) => element.attr_local(name).is_some(),
            Some((name, Some(needle))) => element
                .attr_local(name)
                .is_some_and(|value| value.contains(needle.as_str())),
        }
    }
}

/// Collects every node matching a [`Pattern`], in visit order.
#[derive(Debug)]
pub struct GrepVisitor {
    pattern: Pattern,
    result: Vec<XmlNode>,
}

impl GrepVisitor {
    /// Create a collector for `pattern`.
    #[must_use]
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            result: Vec::new(),
        }
    }

    /// Matched nodes collected so far.
    #[must_use]
    pub fn result(&self) -> &[XmlNode] {
        &self.result
    }

    /// Consume the visitor, returning the matched nodes.
    #[must_use]
    pub fn into_result(self) -> Vec<XmlNode> {
        self.result
    }
}

impl Visitor for GrepVisitor {
    fn visit(&mut self, node: &mut XmlNode) {
        if self.pattern.matches(node) {
            self.result.push(node.clone());
        }
    }
}

/// Drops a trailing line break from each paragraph.
///
/// A paragraph ending in a run that only holds `w:br` would render an extra
/// blank line.
#[derive(Debug, Default)]
pub struct LastNewlineRemover;

impl Visitor for LastNewlineRemover {
    fn visit_paragraph(&mut self, paragraph: &mut Element) {
        let ends_with_break = paragraph
            .children
            .last()
            .and_then(XmlNode::as_element)
            .is_some_and(is_break_run);
        if ends_with_break {
            paragraph.children.pop();
        }
    }
}

/// A run whose only content (besides run properties) is a single `w:br`.
fn is_break_run(run: &Element) -> bool {
    if !run.is("r") {
        return false;
    }
    let mut content = run
        .children
        .iter()
        .filter(|child| !child.is("rPr") && !child.is_blank_text());
    matches!((content.next(), content.next()), (Some(node), None) if node.is("br"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::XmlParser;
    use pretty_assertions::assert_eq;

    fn fragment(xml: &str) -> Vec<XmlNode> {
        XmlParser::new().parse_fragment(xml).unwrap()
    }

    #[derive(Default)]
    struct KindCounter {
        paragraphs: usize,
        runs: usize,
    }

    impl Visitor for KindCounter {
        fn visit_paragraph(&mut self, _paragraph: &mut Element) {
            self.paragraphs += 1;
        }

        fn visit_run(&mut self, _run: &mut Element) {
            self.runs += 1;
        }
    }

    #[test]
    fn test_unhandled_kinds_are_ignored() {
        let mut nodes = fragment("<w:p><w:r><w:t>a</w:t></w:r><w:r><w:br/></w:r></w:p><w:tbl/>");
        let mut counter = KindCounter::default();
        walk(&mut nodes, &mut counter);
        assert_eq!((counter.paragraphs, counter.runs), (1, 2));
    }

    #[test]
    fn test_grep_collects_in_document_order() {
        let mut nodes = fragment(
            r#"<w:p><w:fldSimple w:instr=" MERGEFIELD =a "/></w:p><w:p><w:fldSimple w:instr=" PAGE "/><w:fldSimple w:instr=" MERGEFIELD =b "/></w:p>"#,
        );
        let mut grep = GrepVisitor::new(
            Pattern::element("fldSimple").with_attribute_containing("instr", "MERGEFIELD"),
        );
        walk(&mut nodes, &mut grep);

        let found: Vec<_> = grep
            .result()
            .iter()
            .filter_map(|node| node.as_element()?.attr("w:instr"))
            .collect();
        assert_eq!(found, vec![" MERGEFIELD =a ", " MERGEFIELD =b "]);
    }

    #[test]
    fn test_pattern_requires_attribute() {
        let node: XmlNode = Element::new("wp:docPr").with_attr("name", "x").into();
        assert!(Pattern::element("docPr").matches(&node));
        assert!(!Pattern::element("docPr").with_attribute("id").matches(&node));
    }

    #[test]
    fn test_last_newline_removed() {
        let mut nodes = fragment("<w:p><w:r><w:t>Text</w:t></w:r><w:r><w:br/></w:r></w:p>");
        walk(&mut nodes, &mut LastNewlineRemover);
        assert_eq!(nodes, fragment("<w:p><w:r><w:t>Text</w:t></w:r></w:p>"));
    }

    #[test]
    fn test_inner_newline_kept() {
        let xml = "<w:p><w:r><w:br/></w:r><w:r><w:t>Text</w:t></w:r></w:p>";
        let mut nodes = fragment(xml);
        walk(&mut nodes, &mut LastNewlineRemover);
        assert_eq!(nodes, fragment(xml));
    }
}
