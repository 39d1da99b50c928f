//! Local checks of a filter tree against the schema.

use std::fmt;

use super::SchemaDescription;
use crate::filter::{FilterNode, FilterOperator, FilterPath, SimpleFilter};

/// A problem found in one leaf of the filter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterIssue {
    pub path: FilterPath,
    pub kind: FilterIssueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterIssueKind {
    /// The node could not be read as a condition.
    Malformed,
    /// The member does not exist or cannot be filtered on.
    UnknownMember(String),
    /// The operator does not apply to the member's type.
    InvalidOperator {
        member: String,
        operator: FilterOperator,
    },
    /// Wrong number of values for the operator.
    ValueCount {
        operator: FilterOperator,
        found: usize,
    },
}

impl fmt::Display for FilterIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FilterIssueKind::Malformed => write!(f, "{}: unrecognized filter", self.path),
            FilterIssueKind::UnknownMember(member) => {
                write!(f, "{}: unknown member '{}'", self.path, member)
            }
            FilterIssueKind::InvalidOperator { member, operator } => write!(
                f,
                "{}: operator '{}' is not valid for '{}'",
                self.path, operator, member
            ),
            FilterIssueKind::ValueCount { operator, found } => write!(
                f,
                "{}: operator '{}' does not accept {} value(s)",
                self.path, operator, found
            ),
        }
    }
}

/// Check every leaf of the tree against the schema.
///
/// Unknown operators are left for the remote compiler to judge.
pub fn check_filters(schema: &SchemaDescription, nodes: &[FilterNode]) -> Vec<FilterIssue> {
    let mut issues = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        check_node(schema, node, FilterPath::root(index), &mut issues);
    }
    issues
}

fn check_node(
    schema: &SchemaDescription,
    node: &FilterNode,
    path: FilterPath,
    issues: &mut Vec<FilterIssue>,
) {
    match node {
        FilterNode::Group(group) => {
            for (index, child) in group.children.iter().enumerate() {
                check_node(schema, child, path.child(index), issues);
            }
        }
        FilterNode::Simple(leaf) => {
            if let Some(kind) = check_leaf(schema, leaf) {
                issues.push(FilterIssue { path, kind });
            }
        }
    }
}

fn check_leaf(schema: &SchemaDescription, leaf: &SimpleFilter) -> Option<FilterIssueKind> {
    if leaf.is_malformed() {
        return Some(FilterIssueKind::Malformed);
    }
    let Some(field_type) = schema.field_type(&leaf.member) else {
        return Some(FilterIssueKind::UnknownMember(leaf.member.clone()));
    };
    if leaf.operator.is_unknown() {
        return None;
    }
    if !leaf.operator.is_valid_for(field_type) {
        return Some(FilterIssueKind::InvalidOperator {
            member: leaf.member.clone(),
            operator: leaf.operator.clone(),
        });
    }
    match leaf.operator.arity() {
        Some(arity) if !arity.accepts(leaf.values.len()) => Some(FilterIssueKind::ValueCount {
            operator: leaf.operator.clone(),
            found: leaf.values.len(),
        }),
        _ => None,
    }
}
