//! Filter expression trees.
//!
//! A query's filters form a forest of [`FilterNode`]s: simple conditions
//! (`member operator values`) and AND/OR groups of further nodes. The
//! [`mutate`] functions keep the forest minimal: at most one top-level node,
//! and every group holding at least two children.
//!
//! ```text
//!   [ And ]                        filters: [
//!    ├── Orders.status equals        { "and": [
//!    └── [ Or ]                          { member, operator, values },
//!         ├── Orders.total gt            { "or": [ ... ] }
//!         └── Users.city set           ] }
//!                                    ]
//!       internal tree                    wire form
//! ```
//!
//! Nodes never reference their parent. Positions are addressed with a
//! [`FilterPath`] of child indexes, starting at the top-level list.

pub mod mutate;
pub mod operator;
pub mod wire;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use mutate::{
    add_node, add_simple_filter, add_to_group_at, remove_at, toggle_group_kind, update_leaf_at,
};
pub use operator::{FilterOperator, ValueArity};
pub use wire::{from_wire_format, to_wire_format};

/// A single `member operator values` condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleFilter {
    /// Fully qualified member name, e.g. `Orders.status`.
    pub member: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
    /// Original node when it could not be read as a condition.
    raw: Option<serde_json::Value>,
}

impl SimpleFilter {
    pub fn new(
        member: impl Into<String>,
        operator: impl Into<FilterOperator>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            member: member.into(),
            operator: operator.into(),
            values: values.into_iter().map(Into::into).collect(),
            raw: None,
        }
    }

    /// A leaf holding a node of unrecognized shape, kept verbatim.
    pub fn malformed(raw: serde_json::Value) -> Self {
        let member = raw
            .get("member")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            member,
            operator: FilterOperator::Unknown(String::new()),
            values: Vec::new(),
            raw: Some(raw),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.raw.is_some()
    }

    /// The original node of a malformed leaf.
    pub fn raw(&self) -> Option<&serde_json::Value> {
        self.raw.as_ref()
    }
}

#[derive(Serialize, Deserialize)]
struct LeafRepr {
    #[serde(alias = "dimension")]
    member: String,
    operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
}

impl Serialize for SimpleFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(raw) = &self.raw {
            return raw.serialize(serializer);
        }
        LeafRepr {
            member: self.member.clone(),
            operator: self.operator.clone(),
            values: self.values.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SimpleFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = LeafRepr::deserialize(deserializer)?;
        Ok(SimpleFilter::new(repr.member, repr.operator, repr.values))
    }
}

/// Logical connective of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn toggled(self) -> Self {
        match self {
            LogicalOp::And => LogicalOp::Or,
            LogicalOp::Or => LogicalOp::And,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conjunction or disjunction of child nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFilter {
    pub kind: LogicalOp,
    pub children: Vec<FilterNode>,
}

impl GroupFilter {
    pub fn new(kind: LogicalOp, children: Vec<FilterNode>) -> Self {
        Self { kind, children }
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        Self::new(LogicalOp::And, children)
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        Self::new(LogicalOp::Or, children)
    }
}

/// A node of the filter tree.
///
/// Serializes in the internal tagged form (`{ "kind", "children" }` for
/// groups). Deserialization accepts every shape [`wire::from_wire_format`]
/// accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Simple(SimpleFilter),
    Group(GroupFilter),
}

impl<'de> Deserialize<'de> for FilterNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(wire::node_from_value(&value))
    }
}

impl FilterNode {
    pub fn is_simple_filter(&self) -> bool {
        matches!(self, FilterNode::Simple(_))
    }

    pub fn is_group_filter(&self) -> bool {
        matches!(self, FilterNode::Group(_))
    }

    pub fn is_and_filter(&self) -> bool {
        matches!(self, FilterNode::Group(g) if g.kind == LogicalOp::And)
    }

    pub fn is_or_filter(&self) -> bool {
        matches!(self, FilterNode::Group(g) if g.kind == LogicalOp::Or)
    }

    pub fn as_simple(&self) -> Option<&SimpleFilter> {
        match self {
            FilterNode::Simple(leaf) => Some(leaf),
            FilterNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupFilter> {
        match self {
            FilterNode::Group(group) => Some(group),
            FilterNode::Simple(_) => None,
        }
    }
}

impl From<SimpleFilter> for FilterNode {
    fn from(leaf: SimpleFilter) -> Self {
        FilterNode::Simple(leaf)
    }
}

impl From<GroupFilter> for FilterNode {
    fn from(group: GroupFilter) -> Self {
        FilterNode::Group(group)
    }
}

/// Position of a node: child indexes from the top-level list downwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterPath(Vec<usize>);

impl FilterPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn new(indexes: impl Into<Vec<usize>>) -> Self {
        Self(indexes.into())
    }

    /// Path of the `index`th child of the node at this path.
    pub fn child(&self, index: usize) -> Self {
        let mut indexes = self.0.clone();
        indexes.push(index);
        Self(indexes)
    }

    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FilterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// Count every simple filter in the forest.
pub fn count_leaves(nodes: &[FilterNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            FilterNode::Simple(_) => 1,
            FilterNode::Group(group) => count_leaves(&group.children),
        })
        .sum()
}

/// Collect every simple filter depth-first, discarding group structure.
pub fn flatten_leaves(nodes: &[FilterNode]) -> Vec<&SimpleFilter> {
    let mut leaves = Vec::new();
    collect_leaves(nodes, &mut leaves);
    leaves
}

fn collect_leaves<'a>(nodes: &'a [FilterNode], out: &mut Vec<&'a SimpleFilter>) {
    for node in nodes {
        match node {
            FilterNode::Simple(leaf) => out.push(leaf),
            FilterNode::Group(group) => collect_leaves(&group.children, out),
        }
    }
}

/// Look up the node at `path`.
pub fn node_at<'a>(nodes: &'a [FilterNode], path: &FilterPath) -> Option<&'a FilterNode> {
    let (first, rest) = path.indexes().split_first()?;
    let mut node = nodes.get(*first)?;
    for index in rest {
        node = node.as_group()?.children.get(*index)?;
    }
    Some(node)
}

/// Check the shape maintained by the mutation functions: at most one
/// top-level node, and no group with fewer than two children.
pub fn satisfies_invariant(nodes: &[FilterNode]) -> bool {
    fn groups_well_formed(node: &FilterNode) -> bool {
        match node {
            FilterNode::Simple(_) => true,
            FilterNode::Group(group) => {
                group.children.len() >= 2 && group.children.iter().all(groups_well_formed)
            }
        }
    }
    nodes.len() <= 1 && nodes.iter().all(groups_well_formed)
}
