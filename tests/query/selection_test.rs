// tests/query/selection_test.rs
use cubeq::filter::{add_simple_filter, FilterNode, FilterOperator, GroupFilter, SimpleFilter};
use cubeq::query::selection::*;
use cubeq::query::*;

fn leaf(member: &str) -> SimpleFilter {
    SimpleFilter::new(member, FilterOperator::Equals, ["x"])
}

#[test]
fn test_add_members_once() {
    let query = add_measure(&CubeQuery::new(), "Orders.count");
    let query = add_measure(&query, "Orders.count");
    let query = add_dimension(&query, "Orders.status");
    let query = add_time_dimension(&query, "Orders.createdAt", Some(Granularity::Day));
    let query = add_time_dimension(&query, "Orders.createdAt", None);

    assert_eq!(query.measures, vec!["Orders.count"]);
    assert_eq!(query.dimensions, vec!["Orders.status"]);
    assert_eq!(query.time_dimensions.len(), 1);
    assert_eq!(query.time_dimensions[0].granularity, Some(Granularity::Day));
    assert!(query.is_selected("Orders.createdAt"));
}

#[test]
fn test_remove_member_drops_its_filters_and_order() {
    let query = add_dimension(&add_measure(&CubeQuery::new(), "Orders.count"), "Orders.status");
    let filters = add_simple_filter(&add_simple_filter(&[], leaf("Orders.status")), leaf("Orders.count"));
    let query = CubeQuery {
        filters,
        ..set_order(&query, "Orders.status", Some(SortDirection::Asc))
    };

    let query = remove_dimension(&query, "Orders.status");

    assert!(query.dimensions.is_empty());
    assert!(query.order.is_empty());
    assert_eq!(query.filters, vec![FilterNode::Simple(leaf("Orders.count"))]);
}

#[test]
fn test_remove_member_drops_nested_groups() {
    let query = CubeQuery {
        measures: vec!["Orders.count".to_string()],
        dimensions: vec!["Users.city".to_string()],
        filters: vec![GroupFilter::and(vec![
            leaf("Orders.count").into(),
            GroupFilter::or(vec![leaf("Users.city").into(), leaf("Users.city").into()]).into(),
        ])
        .into()],
        ..CubeQuery::default()
    };

    let query = remove_member(&query, "Users.city");
    assert_eq!(query.filters, vec![FilterNode::Simple(leaf("Orders.count"))]);
}

#[test]
fn test_remove_time_dimension() {
    let query = add_time_dimension(&CubeQuery::new(), "Orders.createdAt", None);
    let query = remove_time_dimension(&query, "Orders.createdAt");
    assert!(query.is_empty());
}

#[test]
fn test_remove_measure_keeps_other_order() {
    let query = add_dimension(&add_measure(&CubeQuery::new(), "Orders.count"), "Orders.status");
    let query = set_order(&query, "Orders.count", Some(SortDirection::Desc));
    let query = set_order(&query, "Orders.status", Some(SortDirection::Asc));

    let query = remove_measure(&query, "Orders.count");
    assert_eq!(query.order, vec![OrderEntry::new("Orders.status", SortDirection::Asc)]);
}

#[test]
fn test_toggle_order_cycles() {
    let query = add_measure(&CubeQuery::new(), "Orders.count");

    let query = toggle_order(&query, "Orders.count");
    assert_eq!(query.order, vec![OrderEntry::new("Orders.count", SortDirection::Asc)]);

    let query = toggle_order(&query, "Orders.count");
    assert_eq!(query.order, vec![OrderEntry::new("Orders.count", SortDirection::Desc)]);

    let query = toggle_order(&query, "Orders.count");
    assert!(query.order.is_empty());
}

#[test]
fn test_set_order_keeps_position() {
    let query = set_order(&CubeQuery::new(), "A.a", Some(SortDirection::Asc));
    let query = set_order(&query, "B.b", Some(SortDirection::Asc));
    let query = set_order(&query, "A.a", Some(SortDirection::Desc));

    assert_eq!(
        query.order,
        vec![
            OrderEntry::new("A.a", SortDirection::Desc),
            OrderEntry::new("B.b", SortDirection::Asc),
        ]
    );
}

#[test]
fn test_time_dimension_settings() {
    let query = add_time_dimension(&CubeQuery::new(), "Orders.createdAt", None);
    let query = set_granularity(&query, "Orders.createdAt", Some(Granularity::Week));
    let range = DateRange::Absolute(["2024-01-01".to_string(), "2024-01-31".to_string()]);
    let query = set_date_range(&query, "Orders.createdAt", Some(range.clone()));

    let spec = &query.time_dimensions[0];
    assert_eq!(spec.granularity, Some(Granularity::Week));
    assert_eq!(spec.date_range, Some(range));
}

#[test]
fn test_segments_limit_offset() {
    let query = add_segment(&CubeQuery::new(), "Orders.completed");
    let query = add_segment(&query, "Orders.completed");
    assert_eq!(query.segments, vec!["Orders.completed"]);

    let query = set_limit(&set_offset(&query, Some(20)), Some(10));
    assert_eq!((query.limit, query.offset), (Some(10), Some(20)));

    let query = remove_segment(&query, "Orders.completed");
    assert!(query.segments.is_empty());
}
