//! Component extraction over a detection tree.

use indexmap::IndexSet;
use rulematch_core::{DetectionNode, ScalarValue};
use serde::Serialize;

use crate::normalize::Normalizer;

/// Reserved detection key holding the condition expression, not a matcher.
pub const CONDITION_KEY: &str = "condition";

/// Normalized components of one detection tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// Deduplicated field tokens, in first-seen order.
    pub fields: IndexSet<String>,
    /// Value tokens in traversal order, duplicates kept.
    pub values: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.values.is_empty()
    }
}

/// Pending traversal work. Sequences under a matcher key only contribute
/// scalars and nested mappings; free-standing sequences are walked fully.
enum Frame<'a> {
    Entries(indexmap::map::Iter<'a, String, DetectionNode>),
    MatcherItems(std::slice::Iter<'a, DetectionNode>),
    Nodes(std::slice::Iter<'a, DetectionNode>),
}

impl Normalizer {
    /// Walk a detection tree and collect cleaned field names and values.
    ///
    /// Never fails: scalars outside a mapping, nulls and nested sequences
    /// under a key carry nothing to extract and are skipped. Traversal uses
    /// an explicit stack, so nesting depth is bounded only by memory.
    pub fn extract(&self, tree: &DetectionNode) -> Extraction {
        let mut out = Extraction::default();
        let mut stack: Vec<Frame<'_>> = Vec::new();
        push_node(&mut stack, tree);

        while let Some(frame) = stack.last_mut() {
            let next = match frame {
                Frame::Entries(iter) => iter.next().map(|(key, value)| (Some(key), value)),
                Frame::MatcherItems(iter) | Frame::Nodes(iter) => {
                    iter.next().map(|value| (None, value))
                }
            };
            let in_matcher = matches!(frame, Frame::MatcherItems(_));

            let Some((key, node)) = next else {
                stack.pop();
                continue;
            };

            match key {
                Some(key) => {
                    if key == CONDITION_KEY {
                        continue;
                    }
                    let field = self.clean_field(key);
                    if !field.is_empty() {
                        out.fields.insert(field);
                    }
                    match node {
                        DetectionNode::Scalar(scalar) => self.push_value(scalar, &mut out),
                        DetectionNode::Sequence(items) => {
                            stack.push(Frame::MatcherItems(items.iter()))
                        }
                        DetectionNode::Mapping(map) => stack.push(Frame::Entries(map.iter())),
                    }
                }
                None if in_matcher => match node {
                    DetectionNode::Scalar(scalar) => self.push_value(scalar, &mut out),
                    DetectionNode::Mapping(map) => stack.push(Frame::Entries(map.iter())),
                    DetectionNode::Sequence(_) => {}
                },
                None => push_node(&mut stack, node),
            }
        }

        out
    }

    fn push_value(&self, scalar: &ScalarValue, out: &mut Extraction) {
        if let Some(text) = scalar.render() {
            let value = self.clean_value(&text);
            if !value.is_empty() {
                out.values.push(value);
            }
        }
    }
}

fn push_node<'a>(stack: &mut Vec<Frame<'a>>, node: &'a DetectionNode) {
    match node {
        DetectionNode::Mapping(map) => stack.push(Frame::Entries(map.iter())),
        DetectionNode::Sequence(items) => stack.push(Frame::Nodes(items.iter())),
        DetectionNode::Scalar(_) => {}
    }
}
