//! Tagged content and its conversion into document markup.
//!
//! Plain values become a text run; `word_ml` markup is inserted verbatim;
//! `html` is converted to paragraphs and runs. Fragments adapt to where the
//! directive sits: inline fields produce runs, whole-paragraph fields produce
//! paragraphs.

use std::sync::Arc;

use base64::Engine;
use sha2::{Digest, Sha256};
use stencil_xml::{Element, XmlNode, XmlParser};

use crate::document::media_file_name;
use crate::error::{ContextError, RenderError};
use crate::html;
use crate::value::Value;

/// Content with a known kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Plain text; newlines become line breaks.
    Text(String),
    /// Raw WordprocessingML fragment.
    Markup(String),
    /// HTML fragment.
    Html(String),
    /// Binary image.
    Image(Image),
}

impl Content {
    /// Build content of the registered `kind` for context key `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::UnknownContentKind`] for unregistered kinds and
    /// [`ContextError::InvalidContent`] when the value has the wrong shape.
    pub fn make(kind: &str, key: &str, value: Value) -> Result<Self, ContextError> {
        match kind {
            "string" => Ok(Self::Text(value.to_string())),
            "word_ml" => expect_string("word_ml", key, value).map(Self::Markup),
            "html" => expect_string("html", key, value).map(Self::Html),
            "image" => Image::from_value(key, &value).map(Self::Image),
            _ => Err(ContextError::UnknownContentKind {
                kind: kind.to_owned(),
                key: key.to_owned(),
            }),
        }
    }

    /// Wrap an evaluated value for insertion.
    #[must_use]
    pub fn wrap(value: Value) -> Self {
        match value {
            Value::Content(content) => content,
            other => Self::Text(other.to_string()),
        }
    }

    /// Registered kind name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Markup(_) => "word_ml",
            Self::Html(_) => "html",
            Self::Image(_) => "image",
        }
    }

    /// Source text of the content. Images yield their file name.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(s) | Self::Markup(s) | Self::Html(s) => s,
            Self::Image(image) => image.name(),
        }
    }

    /// Convert into fragments suitable for `placement`.
    ///
    /// # Errors
    ///
    /// Returns an error if markup or HTML content is not well-formed.
    pub fn to_fragments(&self, placement: &Placement) -> Result<Vec<XmlNode>, RenderError> {
        let nodes = match self {
            Self::Text(text) => vec![text_run(text, placement.run_properties())],
            Self::Markup(markup) => XmlParser::new().parse_fragment(markup)?,
            Self::Html(markup) => html::convert(markup)?,
            Self::Image(image) => {
                tracing::warn!(
                    image = image.name(),
                    "Image content needs an image block directive, skipping insertion"
                );
                return Ok(Vec::new());
            }
        };
        Ok(placement.fit(nodes))
    }
}

fn expect_string(kind: &'static str, key: &str, value: Value) -> Result<String, ContextError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ContextError::InvalidContent {
            kind,
            key: key.to_owned(),
            expected: "a string",
            actual: other.type_name(),
        }),
    }
}

/// Binary image with its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    name: String,
    data: Arc<[u8]>,
}

impl Image {
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Build from `{"name": ..., "data": <base64>}`; the name defaults to
    /// `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is missing or not valid base64, or if the
    /// name has no file name component.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, ContextError> {
        let invalid = || ContextError::InvalidContent {
            kind: "image",
            key: key.to_owned(),
            expected: "a map with base64 `data`",
            actual: value.type_name(),
        };
        let Value::Map(map) = value else {
            return Err(invalid());
        };
        let Some(Value::String(encoded)) = map.get("data") else {
            return Err(invalid());
        };
        let name = match map.get("name") {
            Some(Value::String(name)) => name.as_str(),
            _ => key,
        };
        let name = media_file_name(name)
            .ok_or_else(|| ContextError::InvalidContent {
                kind: "image",
                key: key.to_owned(),
                expected: "a name ending in a file name",
                actual: "a directory path",
            })?
            .to_owned();
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|source| ContextError::InvalidImageData {
                name: name.clone(),
                source,
            })?;
        Ok(Self::new(name, data))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the image bytes.
    #[must_use]
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Hex SHA-256 of the image bytes.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }
}

/// Where a directive's replacement content goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The field sits among other runs of a paragraph.
    Inline { run_properties: Option<Element> },
    /// The field is the only content of its paragraph.
    Paragraph {
        paragraph_properties: Option<Element>,
        run_properties: Option<Element>,
    },
}

impl Placement {
    /// Placement of a directive anchored at `anchor`: a paragraph (the field
    /// fills it) or the field element itself.
    #[must_use]
    pub fn of(anchor: &XmlNode) -> Self {
        let Some(element) = anchor.as_element() else {
            return Self::Inline {
                run_properties: None,
            };
        };
        if element.is("p") {
            let field = element.descendant("fldSimple");
            Self::Paragraph {
                paragraph_properties: element.child("pPr").cloned(),
                run_properties: field.and_then(|f| f.descendant("rPr")).cloned(),
            }
        } else {
            Self::Inline {
                run_properties: element.descendant("rPr").cloned(),
            }
        }
    }

    fn run_properties(&self) -> Option<&Element> {
        match self {
            Self::Inline { run_properties } | Self::Paragraph { run_properties, .. } => {
                run_properties.as_ref()
            }
        }
    }

    /// Adapt fragments: block content is flattened into runs for inline
    /// placement, inline content is wrapped in a paragraph otherwise.
    fn fit(&self, nodes: Vec<XmlNode>) -> Vec<XmlNode> {
        let is_block = nodes.iter().any(is_block_node);
        match self {
            Self::Inline { .. } if is_block => flatten_paragraphs(nodes),
            Self::Paragraph {
                paragraph_properties,
                ..
            } if !is_block => {
                let mut paragraph = Element::new("w:p");
                if let Some(properties) = paragraph_properties {
                    paragraph.children.push(properties.clone().into());
                }
                paragraph.children.extend(nodes);
                vec![paragraph.into()]
            }
            _ => nodes,
        }
    }
}

fn is_block_node(node: &XmlNode) -> bool {
    node.is("p") || node.is("tbl") || node.is("sdt")
}

/// Runs of consecutive paragraphs, joined by line breaks.
fn flatten_paragraphs(nodes: Vec<XmlNode>) -> Vec<XmlNode> {
    let mut runs = Vec::new();
    let mut first = true;
    for node in nodes {
        match node {
            XmlNode::Element(paragraph) if paragraph.is("p") => {
                if !first {
                    runs.push(Element::new("w:r").with_child(Element::new("w:br")).into());
                }
                first = false;
                runs.extend(
                    paragraph
                        .children
                        .into_iter()
                        .filter(|child| !child.is("pPr")),
                );
            }
            XmlNode::Element(block) if block.is("tbl") || block.is("sdt") => {
                tracing::warn!(element = %block.tag, "Dropping block element from inline content");
            }
            other => runs.push(other),
        }
    }
    runs
}

/// A run holding `text`, with newlines turned into breaks.
#[must_use]
pub fn text_run(text: &str, run_properties: Option<&Element>) -> XmlNode {
    let mut run = Element::new("w:r");
    if let Some(properties) = run_properties {
        run.children.push(properties.clone().into());
    }
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            run.children.push(Element::new("w:br").into());
        }
        if !line.is_empty() {
            run.children.push(text_element(line).into());
        }
    }
    run.into()
}

/// `<w:t xml:space="preserve">` holding `text`.
#[must_use]
pub fn text_element(text: &str) -> Element {
    Element::new("w:t")
        .with_attr("xml:space", "preserve")
        .with_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_xml::XmlSerializer;

    fn render(content: &Content, placement: &Placement) -> String {
        let nodes = content.to_fragments(placement).unwrap();
        XmlSerializer::new().serialize_nodes(&nodes)
    }

    fn inline() -> Placement {
        Placement::Inline {
            run_properties: None,
        }
    }

    fn bold() -> Element {
        Element::new("w:rPr").with_child(Element::new("w:b"))
    }

    #[test]
    fn test_make_unknown_kind() {
        let err = Content::make("pdf", "doc", Value::from("x")).unwrap_err();
        assert_eq!(err.to_string(), "unknown content kind `pdf` for key `doc`");
    }

    #[test]
    fn test_make_string_converts_value() {
        assert_eq!(
            Content::make("string", "n", Value::Float(3.0)).unwrap(),
            Content::Text("3.0".to_owned())
        );
    }

    #[test]
    fn test_make_html_requires_string() {
        let err = Content::make("html", "body", Value::Integer(1)).unwrap_err();
        assert!(matches!(err, ContextError::InvalidContent { kind: "html", .. }));
    }

    #[test]
    fn test_image_from_value() {
        let value = Value::Map(
            crate::Context::new()
                .with("name", "logo.png")
                .with("data", "iVBORw=="),
        );
        let image = Image::from_value("logo", &value).unwrap();
        assert_eq!(image.name(), "logo.png");
        assert_eq!(image.data(), &[0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(image.digest().len(), 64);
    }

    #[test]
    fn test_image_name_reduced_to_file_name() {
        let value = Value::Map(
            crate::Context::new()
                .with("name", "../../../outside.png")
                .with("data", "AQID"),
        );
        let image = Image::from_value("logo", &value).unwrap();
        assert_eq!(image.name(), "outside.png");

        let value = Value::Map(crate::Context::new().with("name", "..").with("data", "AQID"));
        let err = Image::from_value("logo", &value).unwrap_err();
        assert!(matches!(err, ContextError::InvalidContent { ref key, .. } if key == "logo"));
    }

    #[test]
    fn test_image_invalid_base64() {
        let value = Value::Map(crate::Context::new().with("data", "@@@"));
        let err = Image::from_value("logo", &value).unwrap_err();
        assert!(matches!(err, ContextError::InvalidImageData { ref name, .. } if name == "logo"));
    }

    #[test]
    fn test_text_inline_keeps_run_properties() {
        let placement = Placement::Inline {
            run_properties: Some(bold()),
        };
        assert_eq!(
            render(&Content::Text("Hi".to_owned()), &placement),
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Hi</w:t></w:r>"#
        );
    }

    #[test]
    fn test_text_newlines_become_breaks() {
        assert_eq!(
            render(&Content::Text("a\nb".to_owned()), &inline()),
            r#"<w:r><w:t xml:space="preserve">a</w:t><w:br/><w:t xml:space="preserve">b</w:t></w:r>"#
        );
    }

    #[test]
    fn test_text_in_paragraph_placement() {
        let placement = Placement::Paragraph {
            paragraph_properties: Some(
                Element::new("w:pPr").with_child(Element::new("w:jc").with_attr("w:val", "center")),
            ),
            run_properties: None,
        };
        assert_eq!(
            render(&Content::Text("x".to_owned()), &placement),
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">x</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_markup_paragraphs_flattened_inline() {
        let content = Content::Markup(
            "<w:p><w:pPr/><w:r><w:t>a</w:t></w:r></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p>"
                .to_owned(),
        );
        assert_eq!(
            render(&content, &inline()),
            "<w:r><w:t>a</w:t></w:r><w:r><w:br/></w:r><w:r><w:t>b</w:t></w:r>"
        );
    }

    #[test]
    fn test_markup_paragraphs_kept_for_paragraph_placement() {
        let markup = "<w:p><w:r><w:t>a</w:t></w:r></w:p>";
        let placement = Placement::Paragraph {
            paragraph_properties: None,
            run_properties: None,
        };
        assert_eq!(render(&Content::Markup(markup.to_owned()), &placement), markup);
    }

    #[test]
    fn test_image_insertion_produces_nothing() {
        let content = Content::Image(Image::new("a.png", vec![1_u8]));
        assert!(content.to_fragments(&inline()).unwrap().is_empty());
    }

    #[test]
    fn test_placement_of_paragraph_anchor() {
        let anchor: XmlNode = XmlParser::new()
            .parse_fragment(
                r#"<w:p><w:pPr><w:jc/></w:pPr><w:fldSimple w:instr=" MERGEFIELD =a "><w:r><w:rPr><w:i/></w:rPr><w:t>«a»</w:t></w:r></w:fldSimple></w:p>"#,
            )
            .unwrap()
            .remove(0);
        let Placement::Paragraph {
            paragraph_properties,
            run_properties,
        } = Placement::of(&anchor)
        else {
            panic!("expected paragraph placement");
        };
        assert!(paragraph_properties.is_some_and(|p| p.child("jc").is_some()));
        assert!(run_properties.is_some_and(|r| r.child("i").is_some()));
    }
}
