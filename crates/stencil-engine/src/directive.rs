//! Directive grammar of merge fields.
//!
//! Directives live in `MERGEFIELD` instructions:
//!
//! | Directive                     | Meaning                              |
//! |-------------------------------|--------------------------------------|
//! | `=expr`                       | insert a value                       |
//! | `expr:each(name)` / `expr:endEach` | loop                            |
//! | `expr:if`, `expr:if(pred)`    | condition start                      |
//! | `expr:elsif`, `expr:elsif(pred)` | further branch                    |
//! | `expr:else`                   | fallback branch                      |
//! | `left op right:if`            | comparison                           |
//! | `expr:endIf`                  | condition end                        |
//! | `comment` / `endComment`      | dropped region                       |
//! | `@expr:start` / `@expr:end`   | image block                          |

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;
use crate::statement::ELSE_SUFFIX;
use crate::value::KNOWN_METHODS;

static MERGEFIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*MERGEFIELD\s+(.*?)(?:\s+\\[*@#]\s*\S+)*\s*$").expect("invalid mergefield regex")
});

static LOOP_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+):each\(([^()]+)\)$").expect("invalid loop regex"));

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(if|elsif)(?:\(([^()]+)\))?$").expect("invalid condition regex")
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^("[^"]*"|'[^']*'|\S+)\s+(\S+)\s+("[^"]*"|'[^']*'|\S+)$"#)
        .expect("invalid comparison regex")
});

/// Directive text of a field instruction, if it is a merge field.
///
/// Formatting switches such as `\* MERGEFORMAT` are dropped, and a
/// directive Word wrapped in double quotes is unwrapped.
#[must_use]
pub fn merge_field_text(instruction: &str) -> Option<&str> {
    let text = MERGEFIELD.captures(instruction)?.get(1)?.as_str().trim();
    let unquoted = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|inner| !inner.contains('"'));
    Some(unquoted.unwrap_or(text))
}

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Insertion { expression: String },
    LoopStart { list: String, iterator: String },
    LoopEnd,
    If { condition: String, predicate: Option<String> },
    ElsIf { condition: String, predicate: Option<String> },
    Else,
    Comparison { left: String, operator: String, right: String },
    IfEnd,
    CommentStart,
    CommentEnd,
    ImageStart { reference: String },
    ImageEnd,
}

/// Kinds of multi-marker blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Loop,
    Condition,
    Comment,
    Image,
}

/// How a directive participates in block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Complete on its own.
    Single,
    /// Opens a block.
    Open(BlockKind),
    /// Starts another branch of the open condition.
    Branch,
    /// Closes a block.
    Close(BlockKind),
}

impl Directive {
    /// Parse directive text.
    ///
    /// # Errors
    ///
    /// Returns an error for text matching no directive form and for
    /// predicates outside the allowed member names.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let text = text.trim();
        let invalid = || TemplateError::InvalidDirective(text.to_owned());

        match text {
            "comment" => return Ok(Self::CommentStart),
            "endComment" => return Ok(Self::CommentEnd),
            _ => {}
        }
        if let Some(expression) = text.strip_prefix('=') {
            let expression = expression.trim();
            if expression.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Insertion {
                expression: expression.to_owned(),
            });
        }
        if let Some(reference) = text.strip_prefix('@') {
            if let Some(reference) = reference.strip_suffix(":start") {
                return Ok(Self::ImageStart {
                    reference: reference.trim().to_owned(),
                });
            }
            if reference.ends_with(":end") {
                return Ok(Self::ImageEnd);
            }
            return Err(invalid());
        }
        if text.ends_with(":endEach") {
            return Ok(Self::LoopEnd);
        }
        if text.ends_with(":endIf") {
            return Ok(Self::IfEnd);
        }
        if text.ends_with(ELSE_SUFFIX) {
            return Ok(Self::Else);
        }
        if let Some(caps) = LOOP_START.captures(text) {
            return Ok(Self::LoopStart {
                list: caps[1].trim().to_owned(),
                iterator: caps[2].trim().to_owned(),
            });
        }
        if let Some(caps) = CONDITION.captures(text) {
            let condition = caps[1].trim();
            let predicate = caps.get(3).map(|m| m.as_str().trim().to_owned());
            if let Some(predicate) = &predicate
                && !KNOWN_METHODS.contains(&predicate.as_str())
            {
                return Err(TemplateError::UnknownPredicate(predicate.clone()));
            }
            let is_elsif = &caps[2] == "elsif";
            if !is_elsif && predicate.is_none() && condition.contains(char::is_whitespace) {
                let parts = COMPARISON.captures(condition).ok_or_else(invalid)?;
                return Ok(Self::Comparison {
                    left: parts[1].to_owned(),
                    operator: parts[2].to_owned(),
                    right: parts[3].to_owned(),
                });
            }
            let condition = condition.to_owned();
            return Ok(if is_elsif {
                Self::ElsIf {
                    condition,
                    predicate,
                }
            } else {
                Self::If {
                    condition,
                    predicate,
                }
            });
        }
        Err(invalid())
    }

    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Insertion { .. } => Role::Single,
            Self::LoopStart { .. } => Role::Open(BlockKind::Loop),
            Self::LoopEnd => Role::Close(BlockKind::Loop),
            Self::If { .. } | Self::Comparison { .. } => Role::Open(BlockKind::Condition),
            Self::ElsIf { .. } | Self::Else => Role::Branch,
            Self::IfEnd => Role::Close(BlockKind::Condition),
            Self::CommentStart => Role::Open(BlockKind::Comment),
            Self::CommentEnd => Role::Close(BlockKind::Comment),
            Self::ImageStart { .. } => Role::Open(BlockKind::Image),
            Self::ImageEnd => Role::Close(BlockKind::Image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Directive {
        Directive::parse(text).unwrap()
    }

    #[test]
    fn test_merge_field_text() {
        assert_eq!(merge_field_text(" MERGEFIELD =name \\* MERGEFORMAT "), Some("=name"));
        assert_eq!(merge_field_text("MERGEFIELD items:each(item)"), Some("items:each(item)"));
        assert_eq!(
            merge_field_text(r#" MERGEFIELD  "a == 'x':if"  \* MERGEFORMAT "#),
            Some("a == 'x':if")
        );
        assert_eq!(merge_field_text(" PAGE "), None);
    }

    #[test]
    fn test_insertion() {
        assert_eq!(
            parse("=order.total"),
            Directive::Insertion {
                expression: "order.total".to_owned()
            }
        );
        assert!(Directive::parse("=").is_err());
    }

    #[test]
    fn test_loop() {
        assert_eq!(
            parse("people:each(person)"),
            Directive::LoopStart {
                list: "people".to_owned(),
                iterator: "person".to_owned()
            }
        );
        assert_eq!(parse("people:endEach"), Directive::LoopEnd);
    }

    #[test]
    fn test_conditions() {
        assert_eq!(
            parse("items:if(any?)"),
            Directive::If {
                condition: "items".to_owned(),
                predicate: Some("any?".to_owned())
            }
        );
        assert_eq!(
            parse("other:elsif"),
            Directive::ElsIf {
                condition: "other".to_owned(),
                predicate: None
            }
        );
        assert_eq!(parse("items:else"), Directive::Else);
        assert_eq!(parse("items:endIf"), Directive::IfEnd);
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            parse(r#"status == "in progress":if"#),
            Directive::Comparison {
                left: "status".to_owned(),
                operator: "==".to_owned(),
                right: "\"in progress\"".to_owned()
            }
        );
        assert_eq!(
            parse("5 > 3:if"),
            Directive::Comparison {
                left: "5".to_owned(),
                operator: ">".to_owned(),
                right: "3".to_owned()
            }
        );
    }

    #[test]
    fn test_comments_and_images() {
        assert_eq!(parse("comment"), Directive::CommentStart);
        assert_eq!(parse("endComment"), Directive::CommentEnd);
        assert_eq!(
            parse("@logo:start"),
            Directive::ImageStart {
                reference: "logo".to_owned()
            }
        );
        assert_eq!(parse("@logo:end"), Directive::ImageEnd);
    }

    #[test]
    fn test_unknown_predicate() {
        let err = Directive::parse("items:if(destroy!)").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPredicate(ref p) if p == "destroy!"));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            Directive::parse("just text"),
            Err(TemplateError::InvalidDirective(_))
        ));
        assert!(Directive::parse("a b c d:if").is_err());
    }

    #[test]
    fn test_roles() {
        assert_eq!(parse("=a").role(), Role::Single);
        assert_eq!(parse("a == 1:if").role(), Role::Open(BlockKind::Condition));
        assert_eq!(parse("a:else").role(), Role::Branch);
        assert_eq!(parse("@a:end").role(), Role::Close(BlockKind::Image));
    }
}
