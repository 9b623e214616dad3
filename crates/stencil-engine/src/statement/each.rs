use crate::block::Block;
use crate::environment::Environment;
use crate::error::{ContextError, RenderError};
use crate::expression::Expression;

/// `list:each(item)`: render the block once per item.
#[derive(Debug)]
pub struct Loop<B> {
    list: Expression,
    iterator: String,
    block: B,
}

impl<B: Block> Loop<B> {
    pub fn new(list: Expression, iterator: impl Into<String>, block: B) -> Self {
        Self {
            list,
            iterator: iterator.into(),
            block,
        }
    }

    /// Nothing iterates zero times. Maps iterate over `[key, value]` pairs.
    ///
    /// Identifiers in the concatenated output are renumbered so that copies
    /// stay unique within the part.
    pub fn evaluate(&mut self, env: &Environment<'_>) -> Result<(), RenderError> {
        let items = match self.list.evaluate(env) {
            None => Vec::new(),
            Some(value) => value.into_items().map_err(|value| ContextError::NotIterable {
                expression: self.list.to_string(),
                value: value.inspect(),
            })?,
        };

        let count = items.len();
        let mut content = Vec::new();
        for item in items {
            let iteration = env.alter_context(&self.iterator, item);
            content.extend(self.block.process(&iteration)?);
        }

        let renumbered = env.session().renumber(env.current_part(), &mut content)?;
        tracing::debug!(
            list = %self.list,
            iterations = count,
            renumbered,
            "Evaluated loop"
        );
        self.block.replace(content);
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

    fn run(list: &str, body: &str, context: serde_json::Value) -> Result<String, RenderError> {
        let session = session();
        let env = env(&session, context);
        let mut each = Loop::new(
            Expression::parse(list),
            "item",
            RecordingBlock::new(&format!("{list}:each(item)"), body),
        );
        each.evaluate(&env)?;
        Ok(each.into_block().text().unwrap_or_default())
    }

    #[test]
    fn test_renders_once_per_item() {
        let text = run("people", "item.name", json!({"people": [{"name": "A"}, {"name": "B"}]}));
        assert_eq!(text.unwrap(), "AB");
    }

    #[test]
    fn test_item_shadows_outer_name() {
        let text = run("list", "item", json!({"item": "outer", "list": [1, 2]}));
        assert_eq!(text.unwrap(), "12");
    }

    #[test]
    fn test_missing_list_renders_nothing() {
        assert_eq!(run("missing", "item", json!({})).unwrap(), "");
        assert_eq!(run("empty", "item", json!({"empty": []})).unwrap(), "");
    }

    #[test]
    fn test_map_iterates_pairs() {
        let text = run("scores", "item.last", json!({"scores": {"a": 1, "b": 2}}));
        assert_eq!(text.unwrap(), "12");
    }

    #[test]
    fn test_scalar_is_not_iterable() {
        let err = run("count", "item", json!({"count": 42})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the expression «count» should evaluate to a list but was: 42"
        );
    }
}
