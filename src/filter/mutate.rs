//! Filter tree mutations.
//!
//! Every function takes the current forest and returns a complete
//! replacement. Starting from an empty forest, any sequence of these
//! operations keeps at most one top-level node and never leaves a group
//! with fewer than two children. Paths that do not name a suitable node
//! make the operation a no-op.

use super::{FilterNode, FilterOperator, FilterPath, GroupFilter, SimpleFilter};

/// Add a condition to the forest.
///
/// - empty forest: the leaf becomes the only node
/// - a single leaf: both are wrapped in an AND group
/// - a single group: the leaf is appended, keeping the group's kind
pub fn add_simple_filter(nodes: &[FilterNode], leaf: SimpleFilter) -> Vec<FilterNode> {
    add_node(nodes, FilterNode::Simple(leaf))
}

/// Add an arbitrary node (a leaf or a nested group) with the same rules as
/// [`add_simple_filter`].
pub fn add_node(nodes: &[FilterNode], node: FilterNode) -> Vec<FilterNode> {
    match nodes {
        [] => vec![node],
        [FilterNode::Simple(existing)] => vec![FilterNode::Group(GroupFilter::and(vec![
            FilterNode::Simple(existing.clone()),
            node,
        ]))],
        [FilterNode::Group(group)] => {
            let mut group = group.clone();
            group.children.push(node);
            vec![FilterNode::Group(group)]
        }
        _ => {
            let mut out = nodes.to_vec();
            out.push(node);
            out
        }
    }
}

/// Append a leaf to the group at `path`.
pub fn add_to_group_at(nodes: &[FilterNode], path: &FilterPath, leaf: SimpleFilter) -> Vec<FilterNode> {
    let mut out = nodes.to_vec();
    if let Some(FilterNode::Group(group)) = node_at_mut(&mut out, path.indexes()) {
        group.children.push(FilterNode::Simple(leaf));
    }
    out
}

/// Flip the top-level group between AND and OR. Children are untouched.
pub fn toggle_group_kind(nodes: &[FilterNode]) -> Vec<FilterNode> {
    match nodes {
        [FilterNode::Group(group)] => vec![FilterNode::Group(GroupFilter::new(
            group.kind.toggled(),
            group.children.clone(),
        ))],
        _ => nodes.to_vec(),
    }
}

/// Replace the leaf at `path`.
///
/// Operators impose different value rules, so a changed member resets the
/// operator to `equals` and clears the values, and a changed operator clears
/// the values.
pub fn update_leaf_at(
    nodes: &[FilterNode],
    path: &FilterPath,
    new_leaf: SimpleFilter,
) -> Vec<FilterNode> {
    let mut out = nodes.to_vec();
    if let Some(FilterNode::Simple(leaf)) = node_at_mut(&mut out, path.indexes()) {
        *leaf = reconcile_leaf(leaf, new_leaf);
    }
    out
}

fn reconcile_leaf(old: &SimpleFilter, new: SimpleFilter) -> SimpleFilter {
    if new.member != old.member {
        SimpleFilter::new(new.member, FilterOperator::default(), Vec::<String>::new())
    } else if new.operator != old.operator {
        SimpleFilter::new(new.member, new.operator, Vec::<String>::new())
    } else {
        new
    }
}

/// Remove the leaf or group at `path`.
///
/// A group left with a single child is replaced by that child; a group left
/// with two or more keeps its kind. Removing the last top-level node leaves an
/// empty forest.
pub fn remove_at(nodes: &[FilterNode], path: &FilterPath) -> Vec<FilterNode> {
    let mut out = nodes.to_vec();
    remove_in(&mut out, path.indexes());
    out
}

fn remove_in(nodes: &mut Vec<FilterNode>, path: &[usize]) -> bool {
    match path {
        [] => false,
        [index] => {
            if *index < nodes.len() {
                nodes.remove(*index);
                true
            } else {
                false
            }
        }
        [index, rest @ ..] => {
            let Some(FilterNode::Group(group)) = nodes.get_mut(*index) else {
                return false;
            };
            if !remove_in(&mut group.children, rest) {
                return false;
            }
            match group.children.len() {
                0 => {
                    nodes.remove(*index);
                }
                1 => {
                    if let Some(only) = group.children.pop() {
                        nodes[*index] = only;
                    }
                }
                _ => {}
            }
            true
        }
    }
}

fn node_at_mut<'a>(nodes: &'a mut [FilterNode], path: &[usize]) -> Option<&'a mut FilterNode> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get_mut(*first)?;
    for index in rest {
        node = match node {
            FilterNode::Group(group) => group.children.get_mut(*index)?,
            FilterNode::Simple(_) => return None,
        };
    }
    Some(node)
}
