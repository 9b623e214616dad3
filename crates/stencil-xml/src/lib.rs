//! XML tree handling for Stencil.
//!
//! Template parts are parsed into owned [`XmlNode`] trees, rewritten by the
//! engine, and serialized back without reformatting.
//!
//! # Example
//!
//! ```
//! use stencil_xml::{GrepVisitor, Pattern, XmlParser, XmlSerializer, walk};
//!
//! let mut nodes = XmlParser::new()
//!     .parse_fragment("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>")
//!     .unwrap();
//!
//! let mut grep = GrepVisitor::new(Pattern::element("t"));
//! walk(&mut nodes, &mut grep);
//! assert_eq!(grep.result().len(), 1);
//!
//! let xml = XmlSerializer::new().serialize_nodes(&nodes);
//! assert_eq!(xml, "<w:p><w:r><w:t>Hello</w:t></w:r></w:p>");
//! ```

mod entities;
mod error;
mod node;
mod parser;
mod scan;
mod serializer;
mod visitor;

pub use entities::convert_html_entities;
pub use error::XmlError;
pub use node::{Element, XmlNode, local_name};
pub use parser::{XmlDocument, XmlParser};
pub use scan::max_attribute_value;
pub use serializer::XmlSerializer;
pub use visitor::{GrepVisitor, LastNewlineRemover, NodeKind, Pattern, Visitor, walk};
