//! Directive processing over node lists.
//!
//! Markers are merge fields whose instruction holds a directive. The markers
//! of one directive are grouped, and the group is anchored at the deepest
//! node list containing all of them: each marker's anchor is its ancestor
//! (or itself) in that list. A start marker in one table row and its end in
//! another anchor at the rows, so the block spans whole rows; markers inside
//! one paragraph anchor at the fields, so the block spans runs.
//!
//! An insertion field that is the only content of its paragraph anchors at
//! the paragraph, so its content replaces the whole paragraph.

use std::collections::{BTreeMap, BTreeSet};

use stencil_xml::{Element, XmlNode};

use crate::block::{Block, NodeBlock};
use crate::directive::{BlockKind, Directive, Role, merge_field_text};
use crate::environment::Environment;
use crate::error::{RenderError, TemplateError};
use crate::expression::Expression;
use crate::statement::{
    Branch, Comment, Condition, ExpressiveCondition, ImageStatement, Insertion, Loop, Statement,
};

/// A directive marker found in a node list.
#[derive(Debug)]
struct Marker {
    /// Child indices from the list being processed down to the marker.
    path: Vec<usize>,
    text: String,
    directive: Directive,
}

/// The markers of one top-level directive.
#[derive(Debug)]
struct Group {
    markers: Vec<Marker>,
}

/// Where a group is evaluated.
enum Level {
    /// In this list, with the given anchor indices.
    Here(Vec<usize>),
    /// Inside the child at this index.
    Child(usize),
}

impl Group {
    fn first_text(&self) -> &str {
        self.markers.first().map_or("", |marker| marker.text.as_str())
    }

    fn level(&self) -> Result<Level, TemplateError> {
        let paths: Vec<&[usize]> = self.markers.iter().map(|m| m.path.as_slice()).collect();
        let Some((first, rest)) = paths.split_first() else {
            return Ok(Level::Here(Vec::new()));
        };

        let shortest = paths.iter().map(|path| path.len()).min().unwrap_or(0);
        let shared = (0..shortest)
            .take_while(|&depth| rest.iter().all(|path| path[depth] == first[depth]))
            .count();

        if shared > 0 && !(rest.is_empty() && first.len() == 1) {
            return Ok(Level::Child(first[0]));
        }
        let anchors: Vec<usize> = paths.iter().map(|path| path[0]).collect();
        if anchors.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(overlapping(self));
        }
        Ok(Level::Here(anchors))
    }
}

/// Evaluate every directive in `nodes`, returning the rendered list.
///
/// # Errors
///
/// Returns an error for malformed directive structure or a failing
/// statement.
pub fn render_nodes(
    nodes: Vec<XmlNode>,
    env: &Environment<'_>,
) -> Result<Vec<XmlNode>, RenderError> {
    let mut markers = Vec::new();
    collect_markers(&nodes, &mut Vec::new(), &mut markers)?;
    if markers.is_empty() {
        return Ok(nodes);
    }

    let mut here = BTreeMap::new();
    let mut descend = BTreeSet::new();
    // Last claimed index, and whether it was claimed by a descent.
    let mut claimed: Option<(usize, bool)> = None;
    for group in group_markers(markers)? {
        match group.level()? {
            Level::Here(anchors) => {
                let (Some(&start), Some(&end)) = (anchors.first(), anchors.last()) else {
                    continue;
                };
                if claimed.is_some_and(|(last, _)| start <= last) {
                    return Err(overlapping(&group).into());
                }
                claimed = Some((end, false));
                here.insert(start, (anchors, group));
            }
            Level::Child(index) => {
                if claimed.is_some_and(|(last, nested)| index < last || (index == last && !nested)) {
                    return Err(overlapping(&group).into());
                }
                claimed = Some((index, true));
                descend.insert(index);
            }
        }
    }

    let mut slots: Vec<Option<XmlNode>> = nodes.into_iter().map(Some).collect();
    let mut output = Vec::with_capacity(slots.len());
    let mut index = 0;
    while index < slots.len() {
        if let Some((anchors, group)) = here.remove(&index) {
            let end = anchors.last().copied().unwrap_or(index);
            output.extend(evaluate_group(group, &anchors, &mut slots, env)?);
            index = end + 1;
            continue;
        }
        if let Some(mut node) = slots[index].take() {
            if descend.contains(&index)
                && let XmlNode::Element(element) = &mut node
            {
                element.children = render_nodes(std::mem::take(&mut element.children), env)?;
            }
            output.push(node);
        }
        index += 1;
    }
    Ok(output)
}

fn overlapping(group: &Group) -> TemplateError {
    TemplateError::OverlappingMarkers(group.first_text().to_owned())
}

/// Directive text of a merge field element.
fn field_text(element: &Element) -> Option<&str> {
    if !element.is("fldSimple") {
        return None;
    }
    merge_field_text(element.attr_local("instr")?)
}

/// The field filling `paragraph`, ignoring paragraph properties and
/// whitespace.
fn sole_field(paragraph: &Element) -> Option<&Element> {
    let mut content = paragraph
        .children
        .iter()
        .filter(|child| !child.is("pPr") && !child.is_blank_text());
    match (content.next(), content.next()) {
        (Some(XmlNode::Element(field)), None) if field.is("fldSimple") => Some(field),
        _ => None,
    }
}

fn collect_markers(
    nodes: &[XmlNode],
    path: &mut Vec<usize>,
    markers: &mut Vec<Marker>,
) -> Result<(), TemplateError> {
    for (index, node) in nodes.iter().enumerate() {
        let XmlNode::Element(element) = node else {
            continue;
        };
        path.push(index);

        if element.is("p")
            && let Some(text) = sole_field(element).and_then(field_text)
            && let directive @ Directive::Insertion { .. } = Directive::parse(text)?
        {
            markers.push(Marker {
                path: path.clone(),
                text: text.to_owned(),
                directive,
            });
        } else if let Some(text) = field_text(element) {
            markers.push(Marker {
                path: path.clone(),
                text: text.to_owned(),
                directive: Directive::parse(text)?,
            });
        } else {
            collect_markers(&element.children, path, markers)?;
        }

        path.pop();
    }
    Ok(())
}

#[derive(Debug)]
struct Open {
    kind: BlockKind,
    text: String,
    branches: bool,
    has_else: bool,
}

/// Group markers into top-level directives; nested markers stay inside the
/// group of their enclosing directive.
fn group_markers(markers: Vec<Marker>) -> Result<Vec<Group>, TemplateError> {
    let mut groups = Vec::new();
    let mut stack: Vec<Open> = Vec::new();
    let mut current = Vec::new();

    for marker in markers {
        match marker.directive.role() {
            Role::Single => {
                if stack.is_empty() {
                    groups.push(Group {
                        markers: vec![marker],
                    });
                }
            }
            Role::Open(kind) => {
                stack.push(Open {
                    kind,
                    text: marker.text.clone(),
                    branches: matches!(marker.directive, Directive::If { .. }),
                    has_else: false,
                });
                if stack.len() == 1 {
                    current.push(marker);
                }
            }
            Role::Branch => {
                let Some(open) = stack.last_mut() else {
                    return Err(TemplateError::UnexpectedMarker(marker.text));
                };
                if !open.branches || open.has_else {
                    return Err(TemplateError::Mismatched {
                        open: open.text.clone(),
                        found: marker.text,
                    });
                }
                open.has_else = matches!(marker.directive, Directive::Else);
                if stack.len() == 1 {
                    current.push(marker);
                }
            }
            Role::Close(kind) => {
                let Some(open) = stack.pop() else {
                    return Err(TemplateError::UnexpectedMarker(marker.text));
                };
                if open.kind != kind {
                    return Err(TemplateError::Mismatched {
                        open: open.text,
                        found: marker.text,
                    });
                }
                if stack.is_empty() {
                    current.push(marker);
                    groups.push(Group {
                        markers: std::mem::take(&mut current),
                    });
                }
            }
        }
    }

    match stack.into_iter().next() {
        Some(open) => Err(TemplateError::Unclosed(open.text)),
        None => Ok(groups),
    }
}

/// Cut the group's blocks out of `slots`, evaluate its statement, and return
/// the nodes replacing the region from the first to the last anchor.
fn evaluate_group(
    group: Group,
    anchors: &[usize],
    slots: &mut [Option<XmlNode>],
    env: &Environment<'_>,
) -> Result<Vec<XmlNode>, RenderError> {
    let mut blocks = Vec::with_capacity(anchors.len());
    let mut directives = Vec::with_capacity(anchors.len());
    let block_count = if anchors.len() == 1 { 1 } else { anchors.len() - 1 };

    for (position, marker) in group.markers.into_iter().enumerate() {
        let start = anchors[position];
        let anchor = slots[start].take();
        if position >= block_count {
            continue;
        }
        let end = anchors.get(position + 1).copied().unwrap_or(start + 1);
        let body = slots[start + 1..end].iter_mut().filter_map(Option::take).collect();
        let anchor = anchor.unwrap_or_else(|| XmlNode::Text(String::new()));
        blocks.push(NodeBlock::new(marker.text, anchor, body));
        directives.push(marker.directive);
    }

    tracing::debug!(
        directive = blocks.first().map_or("", |block| block.start_expression()),
        part = env.current_part(),
        blocks = blocks.len(),
        "Evaluating directive"
    );

    let mut statement = compile(directives, blocks)?;
    statement.evaluate(env)?;
    Ok(statement
        .into_blocks()
        .into_iter()
        .flat_map(NodeBlock::into_output)
        .collect())
}

/// Build the statement for a group from its directives and blocks, which
/// pair up in order.
fn compile(
    directives: Vec<Directive>,
    blocks: Vec<NodeBlock>,
) -> Result<Statement<NodeBlock>, TemplateError> {
    let mut pairs = directives.into_iter().zip(blocks);
    let Some((first, block)) = pairs.next() else {
        return Err(TemplateError::InvalidDirective(String::new()));
    };

    Ok(match first {
        Directive::Insertion { expression } => {
            Statement::Insertion(Insertion::new(Expression::parse(&expression), block))
        }
        Directive::LoopStart { list, iterator } => {
            Statement::Loop(Loop::new(Expression::parse(&list), iterator, block))
        }
        Directive::If {
            condition,
            predicate,
        } => {
            let mut branches = vec![Branch::new(Expression::parse(&condition), predicate, block)];
            for (directive, block) in pairs {
                let branch = match directive {
                    Directive::ElsIf {
                        condition,
                        predicate,
                    } => Branch::new(Expression::parse(&condition), predicate, block),
                    _ => {
                        let condition = block
                            .start_expression()
                            .trim_end_matches(crate::statement::ELSE_SUFFIX)
                            .to_owned();
                        Branch::new(Expression::parse(&condition), None, block)
                    }
                };
                branches.push(branch);
            }
            Statement::Condition(Condition::new(branches))
        }
        Directive::Comparison {
            left,
            operator,
            right,
        } => Statement::ExpressiveCondition(ExpressiveCondition::new(
            &left, &operator, &right, block,
        )?),
        Directive::CommentStart => Statement::Comment(Comment::new(block)),
        Directive::ImageStart { reference } => {
            Statement::Image(ImageStatement::new(Expression::parse(&reference), block))
        }
        other => return Err(TemplateError::InvalidDirective(format!("{other:?}"))),
    })
}
