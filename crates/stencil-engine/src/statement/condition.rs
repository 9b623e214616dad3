use crate::block::Block;
use crate::environment::Environment;
use crate::error::RenderError;
use crate::expression::Expression;
use crate::value::Value;

/// Suffix of the marker that starts an else branch.
pub const ELSE_SUFFIX: &str = ":else";

/// One `if`/`elsif` arm.
#[derive(Debug)]
pub struct Branch<B> {
    pub condition: Expression,
    /// Member called on the condition's value before testing it.
    pub predicate: Option<String>,
    pub block: B,
}

impl<B> Branch<B> {
    pub fn new(condition: Expression, predicate: Option<String>, block: B) -> Self {
        Self {
            condition,
            predicate,
            block,
        }
    }
}

/// `cond:if` ... `other:elsif` ... `cond:else` ... `cond:endIf`.
///
/// The first truthy branch renders; all other blocks are cleared. A last
/// branch whose block starts with an `:else` marker renders when no branch
/// matched.
#[derive(Debug)]
pub struct Condition<B> {
    branches: Vec<Branch<B>>,
    otherwise: Option<B>,
}

impl<B: Block> Condition<B> {
    pub fn new(mut branches: Vec<Branch<B>>) -> Self {
        let has_else = branches.len() > 1
            && branches
                .last()
                .is_some_and(|branch| branch.block.start_expression().ends_with(ELSE_SUFFIX));
        let otherwise = if has_else {
            branches.pop().map(|branch| branch.block)
        } else {
            None
        };
        Self {
            branches,
            otherwise,
        }
    }

    pub fn evaluate(&mut self, env: &Environment<'_>) -> Result<(), RenderError> {
        let mut matched = false;
        for branch in &mut self.branches {
            if !matched && holds(branch, env) {
                let fragments = branch.block.process(env)?;
                branch.block.replace(fragments);
                matched = true;
            } else {
                branch.block.replace(Vec::new());
            }
        }
        if let Some(block) = &mut self.otherwise {
            if matched {
                block.replace(Vec::new());
            } else {
                let fragments = block.process(env)?;
                block.replace(fragments);
            }
        }
        Ok(())
    }

    pub fn into_blocks(self) -> Vec<B> {
        let mut blocks: Vec<B> = self.branches.into_iter().map(|branch| branch.block).collect();
        blocks.extend(self.otherwise);
        blocks
    }
}

fn holds<B>(branch: &Branch<B>, env: &Environment<'_>) -> bool {
    let value = branch.condition.evaluate(env);
    let value = match &branch.predicate {
        Some(predicate) => value.unwrap_or_default().method(predicate),
        None => value,
    };
    value.as_ref().is_some_and(Value::is_truthy)
}
