//! HTML to WordprocessingML conversion.
//!
//! Supports the subset of HTML that rich-text editors emit: block elements
//! become paragraphs (headings, list items and quotes get paragraph styles),
//! inline formatting becomes run properties, and `<br>` becomes a break.
//! Unknown elements contribute their text.

use std::sync::LazyLock;

use regex::Regex;
use stencil_xml::{
    Element, LastNewlineRemover, XmlError, XmlNode, XmlParser, convert_html_entities, walk,
};

use crate::content::text_element;

/// Void elements that HTML writes without a closing slash.
static VOID_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(br|hr)\b([^>]*?)/?>").expect("invalid void tag regex"));

/// Collapsible HTML whitespace; excludes non-breaking spaces.
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n]+").expect("invalid whitespace regex"));

/// Convert an HTML fragment to a list of `w:p` paragraphs.
///
/// # Errors
///
/// Returns an error if the HTML is not well-formed once void elements are
/// closed and named entities are replaced.
pub fn convert(html: &str) -> Result<Vec<XmlNode>, XmlError> {
    let markup = convert_html_entities(&VOID_TAG.replace_all(html, "<$1$2/>"));
    let nodes = XmlParser::new().parse_fragment(&markup)?;

    let mut converter = HtmlConverter::default();
    converter.visit_nodes(&nodes, RunFormat::default());
    converter.finish_paragraph();

    let mut paragraphs: Vec<XmlNode> = converter
        .paragraphs
        .into_iter()
        .map(XmlNode::Element)
        .collect();
    walk(&mut paragraphs, &mut LastNewlineRemover);
    Ok(paragraphs)
}

/// Inline formatting in effect for a run.
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
struct RunFormat {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    superscript: bool,
    subscript: bool,
}

impl RunFormat {
    fn properties(self) -> Option<Element> {
        let mut properties = Element::new("w:rPr");
        if self.bold {
            properties.children.push(Element::new("w:b").into());
        }
        if self.italic {
            properties.children.push(Element::new("w:i").into());
        }
        if self.strike {
            properties.children.push(Element::new("w:strike").into());
        }
        if self.underline {
            properties
                .children
                .push(Element::new("w:u").with_attr("w:val", "single").into());
        }
        if self.superscript || self.subscript {
            let align = if self.superscript {
                "superscript"
            } else {
                "subscript"
            };
            properties
                .children
                .push(Element::new("w:vertAlign").with_attr("w:val", align).into());
        }
        (!properties.children.is_empty()).then_some(properties)
    }
}

#[derive(Debug)]
struct OpenParagraph {
    element: Element,
    explicit: bool,
    has_runs: bool,
}

#[derive(Debug, Default)]
struct HtmlConverter {
    paragraphs: Vec<Element>,
    current: Option<OpenParagraph>,
}

impl HtmlConverter {
    fn visit_nodes(&mut self, nodes: &[XmlNode], format: RunFormat) {
        for node in nodes {
            match node {
                XmlNode::Text(text) => self.push_text(text, format),
                XmlNode::Element(element) => self.visit_element(element, format),
            }
        }
    }

    fn visit_element(&mut self, element: &Element, format: RunFormat) {
        let tag = element.local_name().to_ascii_lowercase();
        match tag.as_str() {
            "p" | "div" => self.block(element, None, format),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let style = format!("Heading{}", &tag[1..]);
                self.block(element, Some(&style), format);
            }
            "blockquote" => self.block(element, Some("Quote"), format),
            "ul" => self.list(element, "ListBullet", format),
            "ol" => self.list(element, "ListNumber", format),
            "li" => self.block(element, Some("ListParagraph"), format),
            "br" => self.push_run(Element::new("w:br"), format),
            "b" | "strong" => self.visit_nodes(&element.children, RunFormat { bold: true, ..format }),
            "i" | "em" => self.visit_nodes(&element.children, RunFormat { italic: true, ..format }),
            "u" | "ins" => self.visit_nodes(
                &element.children,
                RunFormat {
                    underline: true,
                    ..format
                },
            ),
            "s" | "strike" | "del" => {
                self.visit_nodes(&element.children, RunFormat { strike: true, ..format });
            }
            "sup" => self.visit_nodes(
                &element.children,
                RunFormat {
                    superscript: true,
                    ..format
                },
            ),
            "sub" => self.visit_nodes(
                &element.children,
                RunFormat {
                    subscript: true,
                    ..format
                },
            ),
            "hr" => self.finish_paragraph(),
            _ => self.visit_nodes(&element.children, format),
        }
    }

    fn block(&mut self, element: &Element, style: Option<&str>, format: RunFormat) {
        self.finish_paragraph();
        self.start_paragraph(style);
        self.visit_nodes(&element.children, format);
        self.finish_paragraph();
    }

    fn list(&mut self, element: &Element, style: &str, format: RunFormat) {
        self.finish_paragraph();
        for child in element.child_elements() {
            if child.is("li") {
                self.block(child, Some(style), format);
            } else {
                self.visit_element(child, format);
            }
        }
    }

    fn start_paragraph(&mut self, style: Option<&str>) {
        let mut paragraph = Element::new("w:p");
        if let Some(style) = style {
            paragraph.children.push(
                Element::new("w:pPr")
                    .with_child(Element::new("w:pStyle").with_attr("w:val", style))
                    .into(),
            );
        }
        self.current = Some(OpenParagraph {
            element: paragraph,
            explicit: true,
            has_runs: false,
        });
    }

    fn finish_paragraph(&mut self) {
        if let Some(open) = self.current.take()
            && (open.explicit || open.has_runs)
        {
            self.paragraphs.push(open.element);
        }
    }

    fn push_text(&mut self, text: &str, format: RunFormat) {
        let collapsed = WHITESPACE.replace_all(text, " ");
        let starts_paragraph = self.current.as_ref().is_none_or(|open| !open.has_runs);
        let text: &str = if starts_paragraph {
            collapsed.trim_start()
        } else {
            &collapsed
        };
        if text.is_empty() {
            return;
        }
        self.push_run(text_element(text), format);
    }

    fn push_run(&mut self, content: Element, format: RunFormat) {
        let open = self.current.get_or_insert_with(|| OpenParagraph {
            element: Element::new("w:p"),
            explicit: false,
            has_runs: false,
        });
        let mut run = Element::new("w:r");
        if let Some(properties) = format.properties() {
            run.children.push(properties.into());
        }
        run.children.push(content.into());
        open.element.children.push(run.into());
        open.has_runs = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_xml::XmlSerializer;

    fn html(input: &str) -> String {
        XmlSerializer::new().serialize_nodes(&convert(input).unwrap())
    }

    #[test]
    fn test_paragraph_with_formatting() {
        assert_eq!(
            html("<p>Hello <b>bold</b> world</p>"),
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r>"#,
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">bold</w:t></w:r>"#,
                r#"<w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>"#,
            )
        );
    }

    #[test]
    fn test_heading_and_list_styles() {
        assert_eq!(
            html("<h2>Title</h2><ul><li>One</li></ul>"),
            concat!(
                r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t xml:space="preserve">Title</w:t></w:r></w:p>"#,
                r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t xml:space="preserve">One</w:t></w:r></w:p>"#,
            )
        );
    }

    #[test]
    fn test_unclosed_br_and_entities() {
        assert_eq!(
            html("<p>a<br>b&nbsp;c</p>"),
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">a</w:t></w:r><w:r><w:br/></w:r>"#,
                "<w:r><w:t xml:space=\"preserve\">b\u{a0}c</w:t></w:r></w:p>",
            )
        );
    }

    #[test]
    fn test_trailing_break_removed() {
        assert_eq!(
            html("<p>line<br/></p>"),
            r#"<w:p><w:r><w:t xml:space="preserve">line</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_bare_text_gets_implicit_paragraph() {
        assert_eq!(
            html("just <i>text</i>"),
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">just </w:t></w:r>"#,
                r#"<w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve">text</w:t></w:r></w:p>"#,
            )
        );
    }

    #[test]
    fn test_whitespace_between_blocks_ignored() {
        assert_eq!(html("<p>a</p>\n  <p>b</p>").matches("<w:p>").count(), 2);
    }

    #[test]
    fn test_nested_formatting_combines() {
        assert_eq!(
            html("<p><strong><em>x</em></strong></p>"),
            r#"<w:p><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t xml:space="preserve">x</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_malformed_html_is_an_error() {
        assert!(convert("<p>unclosed").is_err());
    }
}
