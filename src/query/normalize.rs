//! Pruning and trimming of queries before they leave the builder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CubeQuery, OrderEntry, TimeDimensionSpec};
use crate::filter::{from_wire_format, to_wire_format, FilterNode, GroupFilter};

/// The query as transmitted to the remote compiler.
///
/// Empty collections are omitted rather than sent as explicitly empty, and
/// filter groups use the bare-key `{ "and": [...] }` form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_dimensions: Vec<TimeDimensionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "super::deserialize_order"
    )]
    pub order: Vec<OrderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl WireQuery {
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Read a wire query back into the internal model.
    pub fn into_query(self) -> CubeQuery {
        CubeQuery {
            measures: self.measures,
            dimensions: self.dimensions,
            time_dimensions: self.time_dimensions,
            filters: from_wire_format(&self.filters),
            segments: self.segments,
            order: self.order,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Produce the transmitted form of a query.
pub fn normalize_query(query: &CubeQuery) -> WireQuery {
    WireQuery {
        measures: query.measures.clone(),
        dimensions: query.dimensions.clone(),
        time_dimensions: query.time_dimensions.clone(),
        filters: to_wire_format(&query.filters),
        segments: query.segments.clone(),
        order: query.order.clone(),
        limit: query.limit,
        offset: query.offset,
    }
}

/// Drop conditions on members the query no longer selects.
///
/// Groups emptied by pruning disappear. A group left with a single child is
/// kept as is; apply [`collapse_singletons`] to unwrap it. Malformed leaves
/// are kept so that validation can report them.
pub fn prune_orphaned_filters(filters: &[FilterNode], query: &CubeQuery) -> Vec<FilterNode> {
    let selected = query.selected_members();
    filters
        .iter()
        .filter_map(|node| prune_node(node, &selected))
        .collect()
}

fn prune_node(node: &FilterNode, selected: &HashSet<&str>) -> Option<FilterNode> {
    match node {
        FilterNode::Simple(leaf) => {
            if leaf.is_malformed() || selected.contains(leaf.member.as_str()) {
                Some(node.clone())
            } else {
                None
            }
        }
        FilterNode::Group(group) => {
            let children: Vec<FilterNode> = group
                .children
                .iter()
                .filter_map(|child| prune_node(child, selected))
                .collect();
            if children.is_empty() {
                None
            } else {
                Some(FilterNode::Group(GroupFilter::new(group.kind, children)))
            }
        }
    }
}

/// Unwrap every group with a single child and drop empty groups, bottom-up.
pub fn collapse_singletons(filters: &[FilterNode]) -> Vec<FilterNode> {
    filters.iter().filter_map(collapse_node).collect()
}

fn collapse_node(node: &FilterNode) -> Option<FilterNode> {
    match node {
        FilterNode::Simple(_) => Some(node.clone()),
        FilterNode::Group(group) => {
            let mut children = collapse_singletons(&group.children);
            match children.len() {
                0 => None,
                1 => children.pop(),
                _ => Some(FilterNode::Group(GroupFilter::new(group.kind, children))),
            }
        }
    }
}
