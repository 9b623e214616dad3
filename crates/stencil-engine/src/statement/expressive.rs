use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::block::Block;
use crate::environment::Environment;
use crate::error::{ContextError, RenderError, TemplateError};
use crate::expression::Operand;
use crate::value::Value;

/// Comparison operator of an expressive condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Includes,
    Excludes,
}

impl Operator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Includes => "includes",
            Self::Excludes => "excludes",
        }
    }

    /// Apply to evaluated operands. Single-element lists collapse to their
    /// element first, except for membership operators; a missing or falsy
    /// operand then never holds.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Incomparable`] when an ordering operator is
    /// applied to values without an ordering.
    pub fn apply(self, left: Option<Value>, right: Option<Value>) -> Result<bool, ContextError> {
        let collapse = !matches!(self, Self::Includes | Self::Excludes);
        let prepare = |value: Option<Value>| {
            value
                .map(|value| if collapse { value.collapse_single() } else { value })
                .filter(Value::is_present)
        };
        let (Some(left), Some(right)) = (prepare(left), prepare(right)) else {
            return Ok(false);
        };

        let ordering = |left: &Value, right: &Value| {
            left.compare(right).ok_or_else(|| ContextError::Incomparable {
                left: left.inspect(),
                operator: self.as_str(),
                right: right.inspect(),
            })
        };
        Ok(match self {
            Self::Eq => left.loose_eq(&right),
            Self::Ne => !left.loose_eq(&right),
            Self::Lt => ordering(&left, &right)? == Ordering::Less,
            Self::Gt => ordering(&left, &right)? == Ordering::Greater,
            Self::Le => ordering(&left, &right)? != Ordering::Greater,
            Self::Ge => ordering(&left, &right)? != Ordering::Less,
            Self::Includes => contains(&left, &right),
            Self::Excludes => matches!(left, Value::List(_)) && !contains(&left, &right),
        })
    }
}

fn contains(collection: &Value, item: &Value) -> bool {
    match collection {
        Value::List(items) => items.iter().any(|candidate| candidate.loose_eq(item)),
        _ => false,
    }
}

impl FromStr for Operator {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            ">=" => Ok(Self::Ge),
            "includes" => Ok(Self::Includes),
            "excludes" => Ok(Self::Excludes),
            other => Err(TemplateError::UnknownOperator(other.to_owned())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `left op right:if` ... `:endIf`.
#[derive(Debug)]
pub struct ExpressiveCondition<B> {
    left: Operand,
    operator: Operator,
    right: Operand,
    block: B,
}

impl<B: Block> ExpressiveCondition<B> {
    /// # Errors
    ///
    /// Returns an error for an unknown operator or a malformed operand.
    pub fn new(left: &str, operator: &str, right: &str, block: B) -> Result<Self, TemplateError> {
        Ok(Self {
            left: Operand::parse(left)?,
            operator: operator.parse()?,
            right: Operand::parse(right)?,
            block,
        })
    }

    pub fn evaluate(&mut self, env: &Environment<'_>) -> Result<(), RenderError> {
        let left = self.left.evaluate(env);
        let right = self.right.evaluate(env);
        if self.operator.apply(left, right)? {
            let fragments = self.block.process(env)?;
            self.block.replace(fragments);
        } else {
            self.block.replace(Vec::new());
        }
        tracing::trace!(
            left = %self.left,
            operator = %self.operator,
            right = %self.right,
            "Evaluated comparison"
        );
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

    fn check(left: &str, operator: &str, right: &str, context: serde_json::Value) -> bool {
        let session = session();
        let mut condition = ExpressiveCondition::new(
            left,
            operator,
            right,
            RecordingBlock::new(&format!("{left} {operator} {right}:if"), "body"),
        )
        .unwrap();
        condition.evaluate(&env(&session, context)).unwrap();
        condition.into_block().text().is_some_and(|text| !text.is_empty())
    }

    #[test]
    fn test_numeric_comparison() {
        assert!(check("a", ">", "3", json!({"a": 5})));
        assert!(!check("a", "<", "3", json!({"a": 5})));
        assert!(check("a", ">=", "5", json!({"a": 5.0})));
        assert!(check("a", "==", "2.5", json!({"a": 2.5})));
    }

    #[test]
    fn test_string_literals() {
        assert!(check("status", "==", "\"open\"", json!({"status": "open"})));
        assert!(check("status", "!=", "'closed'", json!({"status": "open"})));
    }

    #[test]
    fn test_includes_and_excludes() {
        let context = json!({"xs": [1, 2]});
        assert!(check("xs", "includes", "2", context.clone()));
        assert!(!check("xs", "includes", "3", context.clone()));
        assert!(check("xs", "excludes", "3", context));
    }

    #[test]
    fn test_single_element_lists_collapse() {
        assert!(check("xs", "==", "4", json!({"xs": [4]})));
        assert!(check("xs", "includes", "4", json!({"xs": [4]})));
    }

    #[test]
    fn test_falsy_operand_never_holds() {
        assert!(!check("missing", "!=", "1", json!({})));
        assert!(!check("flag", "==", "flag", json!({"flag": false})));
    }

    #[test]
    fn test_collapsed_falsy_operand_never_holds() {
        let null = || Some(Value::List(vec![Value::Null]));
        let no = || Some(Value::List(vec![Value::Bool(false)]));

        assert_eq!(Operator::Ne.apply(null(), Some(Value::Integer(1))).ok(), Some(false));
        assert_eq!(Operator::Lt.apply(null(), Some(Value::Integer(3))).ok(), Some(false));
        assert_eq!(Operator::Ne.apply(no(), Some(Value::from("x"))).ok(), Some(false));
        assert_eq!(Operator::Lt.apply(Some(Value::Integer(3)), no()).ok(), Some(false));
        assert!(!check("choice", "!=", "1", json!({"choice": [null]})));
    }

    #[test]
    fn test_membership_keeps_single_element_list() {
        let list = Some(Value::List(vec![Value::Null]));
        assert_eq!(Operator::Excludes.apply(list, Some(Value::Integer(1))).ok(), Some(true));
    }

    #[test]
    fn test_unknown_operator() {
        let result = ExpressiveCondition::new("a", "=~", "b", RecordingBlock::new("", ""));
        assert!(matches!(result, Err(TemplateError::UnknownOperator(ref op)) if op == "=~"));
    }

    #[test]
    fn test_incomparable_values() {
        let err = Operator::Lt
            .apply(Some(Value::from("a")), Some(Value::Integer(1)))
            .unwrap_err();
        assert_eq!(err.to_string(), r#"cannot compare "a" < 1"#);
    }
}
