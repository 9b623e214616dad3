//! Directive evaluation for docx templates.
//!
//! Templates carry directives in `MERGEFIELD` fields: insertions (`=name`),
//! loops, conditions, comments and image blocks. A [`Template`] renders the
//! configured parts of a [`Document`] against a [`Context`] of JSON-like
//! values.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use stencil_engine::{Context, Document, Template};
//!
//! let mut document = Document::new("word/media");
//! document.add_part(
//!     "word/document.xml",
//!     r#"<w:document><w:body><w:p><w:fldSimple w:instr=" MERGEFIELD =name \* MERGEFORMAT "><w:r><w:t>«=name»</w:t></w:r></w:fldSimple></w:p></w:body></w:document>"#,
//! );
//!
//! let context = Context::from_json(json!({"name": "Ann"})).unwrap();
//! let rendered = Template::default().render(document, context).unwrap();
//!
//! let xml = rendered.part("word/document.xml").unwrap().xml();
//! assert!(xml.contains(">Ann</w:t>"));
//! ```
//!
//! Context keys of the form `kind:name` wrap their value as content:
//! `string`, `word_ml`, `html` and `image` (a map with base64 `data` and an
//! optional `name`).

mod block;
mod content;
mod context;
mod directive;
mod document;
mod environment;
mod error;
mod expression;
mod html;
mod images;
mod processor;
mod statement;
mod template;
mod unique_ids;
mod value;

pub use block::{Block, NodeBlock};
pub use content::{Content, Image, Placement, text_run};
pub use context::Context;
pub use directive::{BlockKind, Directive, Role, merge_field_text};
pub use document::{
    Document, IMAGE_RELATIONSHIP_TYPE, Part, Relationship, media_file_name, relationships_path,
};
pub use environment::{Environment, Scope, Session};
pub use error::{ContextError, RenderError, TemplateError};
pub use expression::{Expression, Lookup, Operand};
pub use images::ImageRegistry;
pub use statement::{
    Branch, Comment, Condition, ExpressiveCondition, ImageStatement, Insertion, Loop, Operator,
    Statement,
};
pub use template::Template;
pub use unique_ids::UniqueIds;
pub use value::{KNOWN_METHODS, Value};
