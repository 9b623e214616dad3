//! Blocks: the template region a directive controls.

use stencil_xml::XmlNode;

use crate::content::Placement;
use crate::environment::Environment;
use crate::error::RenderError;
use crate::processor;

/// Region between a directive's start marker and the next marker of the
/// same directive.
///
/// Statements evaluate through this interface: they render the body, then
/// either replace the region with fragments or remove it.
pub trait Block {
    /// Directive text of the start marker, e.g. `items:each(item)`.
    fn start_expression(&self) -> &str;

    /// Where replacement content goes.
    fn placement(&self) -> Placement;

    /// Render a fresh copy of the body in `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested directive fails.
    fn process(&self, env: &Environment<'_>) -> Result<Vec<XmlNode>, RenderError>;

    /// Replace the region, markers included, with `fragments`.
    fn replace(&mut self, fragments: Vec<XmlNode>);

    /// Remove the region, markers included.
    fn remove(&mut self);
}

/// Block over nodes cut out of a parent's child list.
#[derive(Debug)]
pub struct NodeBlock {
    expression: String,
    anchor: XmlNode,
    body: Vec<XmlNode>,
    output: Vec<XmlNode>,
}

impl NodeBlock {
    /// `anchor` is the node holding the start marker, `body` the siblings up
    /// to the next marker.
    #[must_use]
    pub fn new(expression: impl Into<String>, anchor: XmlNode, body: Vec<XmlNode>) -> Self {
        Self {
            expression: expression.into(),
            anchor,
            body,
            output: Vec::new(),
        }
    }

    /// Nodes that take the region's place.
    #[must_use]
    pub fn into_output(self) -> Vec<XmlNode> {
        self.output
    }
}

impl Block for NodeBlock {
    fn start_expression(&self) -> &str {
        &self.expression
    }

    fn placement(&self) -> Placement {
        Placement::of(&self.anchor)
    }

    fn process(&self, env: &Environment<'_>) -> Result<Vec<XmlNode>, RenderError> {
        processor::render_nodes(self.body.clone(), env)
    }

    fn replace(&mut self, fragments: Vec<XmlNode>) {
        self.output = fragments;
    }

    fn remove(&mut self) {
        self.output.clear();
    }
}
