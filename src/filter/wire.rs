//! Conversion between the internal filter tree and the wire shapes.
//!
//! The remote compiler only accepts the bare-key form for groups:
//!
//! ```text
//! internal: { "kind": "and", "children": [...] }
//! wire:     { "and": [...] }
//! ```
//!
//! Inbound, three group shapes are accepted: `{ "and": [...] }`,
//! `{ "or": [...] }` and the tagged `{ "kind", "children" }` form found in
//! persisted snapshots. Anything else that is not a readable condition is
//! kept as a malformed leaf holding the original value, so that a later
//! check can report it.

use serde_json::{Map, Value};

use super::{FilterNode, GroupFilter, LogicalOp, SimpleFilter};

/// Rewrite groups into the bare-key form. Leaves pass through unchanged.
pub fn to_wire_format(nodes: &[FilterNode]) -> Vec<Value> {
    nodes.iter().map(node_to_value).collect()
}

fn node_to_value(node: &FilterNode) -> Value {
    match node {
        FilterNode::Simple(leaf) => match leaf.raw() {
            Some(raw) => raw.clone(),
            None => serde_json::to_value(leaf).unwrap_or(Value::Null),
        },
        FilterNode::Group(group) => {
            let mut object = Map::new();
            object.insert(
                group.kind.as_str().to_string(),
                Value::Array(to_wire_format(&group.children)),
            );
            Value::Object(object)
        }
    }
}

/// Read filters in any accepted shape into the internal tree.
pub fn from_wire_format(raw: &[Value]) -> Vec<FilterNode> {
    raw.iter().map(node_from_value).collect()
}

pub(crate) fn node_from_value(value: &Value) -> FilterNode {
    match group_from_value(value) {
        Some((kind, children)) => {
            FilterNode::Group(GroupFilter::new(kind, from_wire_format(children)))
        }
        None => FilterNode::Simple(leaf_from_value(value)),
    }
}

fn group_from_value(value: &Value) -> Option<(LogicalOp, &[Value])> {
    let object = value.as_object()?;

    if object.len() == 1 {
        if let Some(Value::Array(children)) = object.get("and") {
            return Some((LogicalOp::And, children));
        }
        if let Some(Value::Array(children)) = object.get("or") {
            return Some((LogicalOp::Or, children));
        }
    }

    let kind = match object.get("kind").and_then(Value::as_str) {
        Some("and") => LogicalOp::And,
        Some("or") => LogicalOp::Or,
        _ => return None,
    };
    match object.get("children") {
        Some(Value::Array(children)) => Some((kind, children)),
        _ => None,
    }
}

fn leaf_from_value(value: &Value) -> SimpleFilter {
    let readable = value
        .as_object()
        .is_some_and(|o| o.contains_key("member") || o.contains_key("dimension"));
    if readable {
        if let Ok(leaf) = serde_json::from_value::<SimpleFilter>(value.clone()) {
            return leaf;
        }
    }
    SimpleFilter::malformed(value.clone())
}
