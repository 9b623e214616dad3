//! Renumbering of identifier attributes in duplicated markup.
//!
//! Loop bodies are copied once per item, so drawing ids (`wp:docPr/@id`,
//! `pic:cNvPr/@id`) would repeat. Each configured element/attribute pair has
//! one counter per part, seeded from the largest value in the part's original
//! markup, and shared by every loop rendered in that part.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use stencil_config::UniqueIdConfig;
use stencil_xml::{Visitor, XmlNode, walk};

use crate::document::Document;
use crate::error::RenderError;

/// Per-render identifier counters.
#[derive(Debug)]
pub struct UniqueIds {
    rules: Vec<UniqueIdConfig>,
    counters: HashMap<(String, usize), u64>,
}

impl UniqueIds {
    #[must_use]
    pub fn new(rules: Vec<UniqueIdConfig>) -> Self {
        Self {
            rules,
            counters: HashMap::new(),
        }
    }

    /// Assign fresh values to every identifier in `fragments`, in document
    /// order. Returns the number of attributes rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is unknown, its markup is malformed, or a
    /// counter would pass `u64::MAX`.
    pub fn renumber(
        &mut self,
        document: &Document,
        part: &str,
        fragments: &mut [XmlNode],
    ) -> Result<usize, RenderError> {
        let mut rewritten = 0;
        for (index, rule) in self.rules.iter().enumerate() {
            let next = match self.counters.entry((part.to_owned(), index)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let seed = document.max_attribute_value(part, &rule.element, &rule.attribute)?;
                    entry.insert(seed)
                }
            };
            let mut renumberer = Renumberer {
                rule,
                last: next,
                rewritten: 0,
                exhausted: false,
            };
            walk(fragments, &mut renumberer);
            if renumberer.exhausted {
                return Err(RenderError::IdsExhausted {
                    part: part.to_owned(),
                    element: rule.element.clone(),
                    attribute: rule.attribute.clone(),
                });
            }
            rewritten += renumberer.rewritten;
        }
        Ok(rewritten)
    }
}

struct Renumberer<'a> {
    rule: &'a UniqueIdConfig,
    last: &'a mut u64,
    rewritten: usize,
    exhausted: bool,
}

impl Visitor for Renumberer<'_> {
    fn visit(&mut self, node: &mut XmlNode) {
        if self.exhausted {
            return;
        }
        if let Some(element) = node.as_element_mut()
            && element.is(&self.rule.element)
            && element.attr_local(&self.rule.attribute).is_some()
        {
            let Some(next) = self.last.checked_add(1) else {
                self.exhausted = true;
                return;
            };
            *self.last = next;
            element.set_attr_local(&self.rule.attribute, &self.rule.attribute, self.last.to_string());
            self.rewritten += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_xml::{GrepVisitor, Pattern, XmlParser};

    const PART: &str = "word/document.xml";

    fn document() -> Document {
        let mut document = Document::new("word/media");
        document.add_part(
            PART,
            r#"<w:body><wp:docPr id="10" name="a"/><wp:docPr id="3"/></w:body>"#,
        );
        document
    }

    fn drawings(count: usize) -> Vec<XmlNode> {
        let xml = r#"<w:r><wp:docPr id="10" name="a"/></w:r>"#.repeat(count);
        XmlParser::new().parse_fragment(&xml).unwrap()
    }

    fn ids(nodes: &mut [XmlNode]) -> Vec<String> {
        let mut grep = GrepVisitor::new(Pattern::element("docPr"));
        walk(nodes, &mut grep);
        grep.into_result()
            .iter()
            .filter_map(|node| node.as_element()?.attr("id").map(str::to_owned))
            .collect()
    }

    #[test]
    fn test_renumber_continues_after_source_maximum() {
        let document = document();
        let mut unique_ids = UniqueIds::new(vec![UniqueIdConfig::new("docPr", "id")]);
        let mut fragments = drawings(3);

        let rewritten = unique_ids.renumber(&document, PART, &mut fragments).unwrap();

        assert_eq!(rewritten, 3);
        assert_eq!(ids(&mut fragments), vec!["11", "12", "13"]);
    }

    #[test]
    fn test_counter_shared_between_loops() {
        let document = document();
        let mut unique_ids = UniqueIds::new(vec![UniqueIdConfig::new("docPr", "id")]);
        let mut first = drawings(2);
        let mut second = drawings(2);

        unique_ids.renumber(&document, PART, &mut first).unwrap();
        unique_ids.renumber(&document, PART, &mut second).unwrap();

        assert_eq!(ids(&mut first), vec!["11", "12"]);
        assert_eq!(ids(&mut second), vec!["13", "14"]);
    }

    #[test]
    fn test_elements_without_attribute_untouched() {
        let document = document();
        let mut unique_ids = UniqueIds::new(vec![UniqueIdConfig::new("docPr", "id")]);
        let mut fragments = XmlParser::new()
            .parse_fragment(r#"<wp:docPr name="x"/>"#)
            .unwrap();
        assert_eq!(unique_ids.renumber(&document, PART, &mut fragments).unwrap(), 0);
    }

    #[test]
    fn test_counter_at_largest_id_fails() {
        let mut document = Document::new("word/media");
        document.add_part(PART, r#"<w:body><wp:docPr id="18446744073709551615"/></w:body>"#);
        let mut unique_ids = UniqueIds::new(vec![UniqueIdConfig::new("docPr", "id")]);

        let result = unique_ids.renumber(&document, PART, &mut drawings(1));

        assert!(matches!(
            result,
            Err(RenderError::IdsExhausted { ref part, ref element, ref attribute })
                if part == PART && element == "docPr" && attribute == "id"
        ));
    }

    #[test]
    fn test_unknown_part() {
        let mut unique_ids = UniqueIds::new(vec![UniqueIdConfig::new("docPr", "id")]);
        let result = unique_ids.renumber(&document(), "word/missing.xml", &mut drawings(1));
        assert!(matches!(result, Err(RenderError::UnknownPart(_))));
    }
}
