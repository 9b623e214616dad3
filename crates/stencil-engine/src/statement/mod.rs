//! Directive statements.
//!
//! Each statement evaluates against an [`Environment`] and settles the fate
//! of its blocks by replacing or removing them.

mod comment;
mod condition;
mod each;
mod expressive;
mod image;
mod insertion;

pub use comment::Comment;
pub use condition::{Branch, Condition, ELSE_SUFFIX};
pub use each::Loop;
pub use expressive::{ExpressiveCondition, Operator};
pub use image::ImageStatement;
pub use insertion::Insertion;

use crate::block::Block;
use crate::environment::Environment;
use crate::error::RenderError;

/// A compiled directive with its blocks.
#[derive(Debug)]
pub enum Statement<B> {
    Insertion(Insertion<B>),
    Loop(Loop<B>),
    Condition(Condition<B>),
    ExpressiveCondition(ExpressiveCondition<B>),
    Comment(Comment<B>),
    Image(ImageStatement<B>),
}

impl<B: Block> Statement<B> {
    /// Evaluate the statement, settling all of its blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails; the blocks are then unspecified.
    pub fn evaluate(&mut self, env: &Environment<'_>) -> Result<(), RenderError> {
        match self {
            Self::Insertion(statement) => statement.evaluate(env),
            Self::Loop(statement) => statement.evaluate(env),
            Self::Condition(statement) => statement.evaluate(env),
            Self::ExpressiveCondition(statement) => statement.evaluate(env),
            Self::Comment(statement) => {
                statement.evaluate();
                Ok(())
            }
            Self::Image(statement) => statement.evaluate(env),
        }
    }

    /// Blocks in template order.
    pub fn into_blocks(self) -> Vec<B> {
        match self {
            Self::Insertion(statement) => vec![statement.into_block()],
            Self::Loop(statement) => vec![statement.into_block()],
            Self::Condition(statement) => statement.into_blocks(),
            Self::ExpressiveCondition(statement) => vec![statement.into_block()],
            Self::Comment(statement) => vec![statement.into_block()],
            Self::Image(statement) => vec![statement.into_block()],
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use stencil_config::RenderConfig;
    use stencil_xml::{Element, XmlNode};

    use crate::block::Block;
    use crate::content::Placement;
    use crate::context::Context;
    use crate::document::Document;
    use crate::environment::{Environment, Scope, Session};
    use crate::error::RenderError;
    use crate::expression::Expression;

    pub const PART: &str = "word/document.xml";

    /// Block whose body renders to a text run, either fixed text or the
    /// value of an expression in the processing environment.
    #[derive(Debug)]
    pub struct RecordingBlock {
        pub expression: String,
        pub body: Expression,
        pub output: Option<Vec<XmlNode>>,
    }

    impl RecordingBlock {
        pub fn new(expression: &str, body: &str) -> Self {
            Self {
                expression: expression.to_owned(),
                body: Expression::parse(body),
                output: None,
            }
        }

        /// Rendered text, `None` if never settled.
        pub fn text(&self) -> Option<String> {
            self.output
                .as_ref()
                .map(|nodes| nodes.iter().map(XmlNode::text_content).collect())
        }
    }

    impl Block for RecordingBlock {
        fn start_expression(&self) -> &str {
            &self.expression
        }

        fn placement(&self) -> Placement {
            Placement::Inline {
                run_properties: None,
            }
        }

        fn process(&self, env: &Environment<'_>) -> Result<Vec<XmlNode>, RenderError> {
            let text = self
                .body
                .evaluate(env)
                .map_or_else(|| format!("{}", self.body), |value| value.to_string());
            Ok(vec![Element::new("w:r").with_text(text).into()])
        }

        fn replace(&mut self, fragments: Vec<XmlNode>) {
            self.output = Some(fragments);
        }

        fn remove(&mut self) {
            self.output = Some(Vec::new());
        }
    }

    pub fn session() -> Session {
        let mut document = Document::new("word/media");
        document.add_part(PART, r#"<w:body><wp:docPr id="5"/></w:body>"#);
        document.add_part("word/header1.xml", "<w:hdr/>");
        Session::new(document, &RenderConfig::default())
    }

    pub fn env<'s>(session: &'s Session, context: serde_json::Value) -> Environment<'s> {
        let context = Context::from_json(context)
            .and_then(Context::normalize)
            .expect("valid test context");
        Environment::new(session, Scope::new(context), PART)
    }
}
