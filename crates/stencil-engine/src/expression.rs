//! Expressions inside directives.
//!
//! An expression is either a variable name (`title`) or a receiver followed
//! by a chain of member accesses (`order.customer.name`). Each member access
//! is a map lookup or an allow-listed method call.

use std::borrow::Cow;
use std::fmt;

use crate::context::Context;
use crate::error::TemplateError;
use crate::value::Value;

/// Name resolution for expression evaluation.
pub trait Lookup {
    /// Value bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Lookup for Context {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// A parsed variable or member-access chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Variable(String),
    Member { receiver: String, chain: Vec<String> },
}

impl Expression {
    /// Parse expression text. Text containing a `.` is split on its first
    /// dot into a receiver and the remaining dot-separated chain.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('.') {
            Some((receiver, rest)) => Self::Member {
                receiver: receiver.to_owned(),
                chain: rest.split('.').map(str::to_owned).collect(),
            },
            None => Self::Variable(text.to_owned()),
        }
    }

    /// Evaluate against `context`. Unbound names, missing members and null
    /// results all evaluate to `None`.
    pub fn evaluate<L: Lookup + ?Sized>(&self, context: &L) -> Option<Value> {
        match self {
            Self::Variable(name) => context.lookup(name).filter(|v| !matches!(v, Value::Null)).cloned(),
            Self::Member { receiver, chain } => {
                let receiver = context.lookup(receiver)?;
                if !receiver.is_present() {
                    return None;
                }
                let mut current = Cow::Borrowed(receiver);
                for name in chain {
                    current = match current {
                        Cow::Borrowed(value) => value.member(name).unwrap_or(Cow::Owned(Value::Null)),
                        Cow::Owned(value) => {
                            Cow::Owned(value.member(name).map_or(Value::Null, Cow::into_owned))
                        }
                    };
                }
                match current.into_owned() {
                    Value::Null => None,
                    value => Some(value),
                }
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "«{name}»"),
            Self::Member { receiver, chain } => write!(f, "«{receiver}.{}»", chain.join(".")),
        }
    }
}

/// One side of a comparison: a literal or an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Expression(Expression),
}

impl Operand {
    /// Parse operand text.
    ///
    /// Quoted text is a string literal, digits are an integer, digits with a
    /// single decimal point are a float; anything else is an expression.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MalformedOperand`] for a quoted operand
    /// without its closing quote.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let text = text.trim();
        if let Some(quote) = text.chars().next().filter(|c| matches!(c, '"' | '\'')) {
            let inner = text[1..]
                .strip_suffix(quote)
                .ok_or_else(|| TemplateError::MalformedOperand(text.to_owned()))?;
            return Ok(Self::Literal(Value::String(inner.to_owned())));
        }
        if is_digits(text)
            && let Ok(integer) = text.parse()
        {
            return Ok(Self::Literal(Value::Integer(integer)));
        }
        if let Some((whole, fraction)) = text.split_once('.')
            && is_digits(whole)
            && is_digits(fraction)
            && let Ok(float) = text.parse()
        {
            return Ok(Self::Literal(Value::Float(float)));
        }
        Ok(Self::Expression(Expression::parse(text)))
    }

    pub fn evaluate<L: Lookup + ?Sized>(&self, context: &L) -> Option<Value> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Expression(expression) => expression.evaluate(context),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(&value.inspect()),
            Self::Expression(expression) => expression.fmt(f),
        }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
