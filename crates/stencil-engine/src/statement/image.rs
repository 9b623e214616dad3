use stencil_xml::{Element, Visitor, walk};

use crate::block::Block;
use crate::content::Content;
use crate::environment::Environment;
use crate::error::{ContextError, RenderError};
use crate::expression::Expression;
use crate::value::Value;

/// `@ref:start` ... `@ref:end`: point the drawings in the block at an image
/// from the context.
#[derive(Debug)]
pub struct ImageStatement<B> {
    reference: Expression,
    block: B,
}

impl<B: Block> ImageStatement<B> {
    pub fn new(reference: Expression, block: B) -> Self {
        Self { reference, block }
    }

    pub fn evaluate(&mut self, env: &Environment<'_>) -> Result<(), RenderError> {
        let image = match self.reference.evaluate(env) {
            None => {
                self.block.replace(Vec::new());
                return Ok(());
            }
            Some(Value::Content(Content::Image(image))) => image,
            Some(other) => {
                return Err(ContextError::NotAnImage {
                    expression: self.reference.to_string(),
                    value: other.inspect(),
                }
                .into());
            }
        };

        let id = env.session().register_image(env.current_part(), &image)?;
        let mut fragments = self.block.process(env)?;
        walk(&mut fragments, &mut BlipEmbedder { id: &id });
        self.block.replace(fragments);
        Ok(())
    }

    pub fn into_block(self) -> B {
        self.block
    }
}

/// Sets `r:embed` on every `a:blip`.
struct BlipEmbedder<'a> {
    id: &'a str,
}

impl Visitor for BlipEmbedder<'_> {
    fn visit_drawing(&mut self, drawing: &mut Element) {
        embed_blips(drawing, self.id);
    }
}

fn embed_blips(element: &mut Element, id: &str) {
    if element.is("blip") {
        element.set_attr_local("embed", "r:embed", id);
    }
    for child in &mut element.children {
        if let Some(child) = child.as_element_mut() {
            embed_blips(child, id);
        }
    }
}
