// tests/filter/invariant_test.rs
//! Random edit sequences keep the filter forest minimal.

use cubeq::filter::*;
use proptest::prelude::*;

const MEMBERS: &[&str] = &["Orders.status", "Orders.amount", "Users.city", "Users.age"];

#[derive(Debug, Clone)]
enum EditOp {
    Add(usize),
    AddGroup(bool),
    AddToGroup(usize, usize),
    Toggle,
    Update(usize, usize),
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        4 => (0..MEMBERS.len()).prop_map(EditOp::Add),
        1 => any::<bool>().prop_map(EditOp::AddGroup),
        2 => (any::<usize>(), 0..MEMBERS.len()).prop_map(|(p, m)| EditOp::AddToGroup(p, m)),
        1 => Just(EditOp::Toggle),
        1 => (any::<usize>(), 0..MEMBERS.len()).prop_map(|(p, m)| EditOp::Update(p, m)),
        3 => any::<usize>().prop_map(EditOp::Remove),
    ]
}

fn leaf(member: usize) -> SimpleFilter {
    SimpleFilter::new(MEMBERS[member], FilterOperator::Equals, ["v"])
}

fn all_paths(nodes: &[FilterNode]) -> Vec<FilterPath> {
    fn walk(nodes: &[FilterNode], prefix: Option<&FilterPath>, out: &mut Vec<FilterPath>) {
        for (index, node) in nodes.iter().enumerate() {
            let path = match prefix {
                Some(prefix) => prefix.child(index),
                None => FilterPath::root(index),
            };
            if let FilterNode::Group(group) = node {
                walk(&group.children, Some(&path), out);
            }
            out.push(path);
        }
    }
    let mut out = Vec::new();
    walk(nodes, None, &mut out);
    out
}

fn group_paths(nodes: &[FilterNode]) -> Vec<FilterPath> {
    all_paths(nodes)
        .into_iter()
        .filter(|p| node_at(nodes, p).is_some_and(FilterNode::is_group_filter))
        .collect()
}

fn leaf_paths(nodes: &[FilterNode]) -> Vec<FilterPath> {
    all_paths(nodes)
        .into_iter()
        .filter(|p| node_at(nodes, p).is_some_and(FilterNode::is_simple_filter))
        .collect()
}

fn apply(nodes: &[FilterNode], op: &EditOp) -> Vec<FilterNode> {
    match op {
        EditOp::Add(m) => add_simple_filter(nodes, leaf(*m)),
        EditOp::AddGroup(or) => {
            let children = vec![leaf(0).into(), leaf(1).into()];
            let group = if *or {
                GroupFilter::or(children)
            } else {
                GroupFilter::and(children)
            };
            add_node(nodes, group.into())
        }
        EditOp::AddToGroup(pick, m) => {
            let groups = group_paths(nodes);
            if groups.is_empty() {
                return nodes.to_vec();
            }
            add_to_group_at(nodes, &groups[pick % groups.len()], leaf(*m))
        }
        EditOp::Toggle => toggle_group_kind(nodes),
        EditOp::Update(pick, m) => {
            let leaves = leaf_paths(nodes);
            if leaves.is_empty() {
                return nodes.to_vec();
            }
            update_leaf_at(nodes, &leaves[pick % leaves.len()], leaf(*m))
        }
        EditOp::Remove(pick) => {
            let paths = all_paths(nodes);
            if paths.is_empty() {
                return nodes.to_vec();
            }
            remove_at(nodes, &paths[pick % paths.len()])
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]
    #[test]
    fn edits_keep_forest_minimal(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut nodes: Vec<FilterNode> = Vec::new();
        for op in &ops {
            nodes = apply(&nodes, op);
            prop_assert!(
                satisfies_invariant(&nodes),
                "invariant broken after {:?}: {:?}", op, nodes
            );
            prop_assert_eq!(from_wire_format(&to_wire_format(&nodes)), nodes.clone());
        }
    }

    #[test]
    fn add_counts_one_leaf(ops in prop::collection::vec(op_strategy(), 0..20), m in 0..MEMBERS.len()) {
        let mut nodes: Vec<FilterNode> = Vec::new();
        for op in &ops {
            nodes = apply(&nodes, op);
        }
        let before = count_leaves(&nodes);
        let after = add_simple_filter(&nodes, leaf(m));
        prop_assert_eq!(count_leaves(&after), before + 1);
    }

    #[test]
    fn removing_leaf_drops_exactly_one(ops in prop::collection::vec(op_strategy(), 1..20), pick in any::<usize>()) {
        let mut nodes: Vec<FilterNode> = Vec::new();
        for op in &ops {
            nodes = apply(&nodes, op);
        }
        let leaves = leaf_paths(&nodes);
        prop_assume!(!leaves.is_empty());
        let after = remove_at(&nodes, &leaves[pick % leaves.len()]);
        prop_assert_eq!(count_leaves(&after), count_leaves(&nodes) - 1);
    }
}
