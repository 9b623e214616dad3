use crate::block::Block;
use crate::content::Content;
use crate::environment::Environment;
use crate::error::RenderError;
use crate::expression::Expression;
use crate::value::Value;

/// `=expr`: replace the field with the expression's value.
#[derive(Debug)]
pub struct Insertion<B> {
    expression: Expression,
    block: B,
}

impl<B: Block> Insertion<B> {
    pub fn new(expression: Expression, block: B) -> Self {
        Self { expression, block }
    }

    /// Nothing, null or `false` removes the field.
    pub fn evaluate(&mut self, env: &Environment<'_>) -> Result<(), RenderError> {
        match self.expression.evaluate(env).filter(Value::is_present) {
            Some(value) => {
                let fragments = Content::wrap(value).to_fragments(&self.block.placement())?;
                self.block.replace(fragments);
            }
            None => self.block.remove(),
        }
        Ok(())
    }

    pub fn into_block(self) -> B {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::testing::{RecordingBlock, env, session};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn insert(expression: &str, context: serde_json::Value) -> Option<String> {
        let session = session();
        let env = env(&session, context);
        let mut insertion = Insertion::new(
            Expression::parse(expression),
            RecordingBlock::new(&format!("={expression}"), "unused"),
        );
        insertion.evaluate(&env).unwrap();
        insertion.into_block().text()
    }

    #[test]
    fn test_inserts_value() {
        assert_eq!(insert("name", json!({"name": "Ann"})), Some("Ann".to_owned()));
        assert_eq!(insert("price", json!({"price": 2.0})), Some("2.0".to_owned()));
        assert_eq!(insert("a.b", json!({"a": {"b": 7}})), Some("7".to_owned()));
    }

    #[test]
    fn test_missing_null_and_false_remove_field() {
        assert_eq!(insert("missing", json!({})), Some(String::new()));
        assert_eq!(insert("n", json!({"n": null})), Some(String::new()));
        assert_eq!(insert("f", json!({"f": false})), Some(String::new()));
    }

    #[test]
    fn test_inserts_html_content() {
        assert_eq!(
            insert("body", json!({"html:body": "<p>Hi <b>there</b></p>"})),
            Some("Hi there".to_owned())
        );
    }
}
