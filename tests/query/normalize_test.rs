// tests/query/normalize_test.rs
use cubeq::filter::{FilterNode, FilterOperator, GroupFilter, SimpleFilter};
use cubeq::query::*;
use serde_json::json;

fn leaf(member: &str) -> FilterNode {
    SimpleFilter::new(member, FilterOperator::Equals, ["x"]).into()
}

fn orders_query() -> CubeQuery {
    CubeQuery {
        measures: vec!["Orders.count".to_string()],
        dimensions: vec!["Orders.status".to_string()],
        ..CubeQuery::default()
    }
}

#[test]
fn test_empty_collections_are_omitted() {
    let wire = normalize_query(&orders_query());
    assert_eq!(
        serde_json::to_value(&wire).unwrap(),
        json!({
            "measures": ["Orders.count"],
            "dimensions": ["Orders.status"]
        })
    );
}

#[test]
fn test_normalized_query_snapshot() {
    let query = CubeQuery {
        time_dimensions: vec![TimeDimensionSpec::new("Orders.createdAt")
            .with_granularity(Granularity::Month)
            .with_date_range(DateRange::Relative("last 7 days".to_string()))],
        filters: vec![GroupFilter::or(vec![leaf("Orders.status"), leaf("Orders.status")]).into()],
        order: vec![OrderEntry::new("Orders.count", SortDirection::Desc)],
        limit: Some(50),
        ..orders_query()
    };

    insta::assert_json_snapshot!(normalize_query(&query), @r###"
    {
      "measures": [
        "Orders.count"
      ],
      "dimensions": [
        "Orders.status"
      ],
      "timeDimensions": [
        {
          "dimension": "Orders.createdAt",
          "granularity": "month",
          "dateRange": "last 7 days"
        }
      ],
      "filters": [
        {
          "or": [
            {
              "member": "Orders.status",
              "operator": "equals",
              "values": [
                "x"
              ]
            },
            {
              "member": "Orders.status",
              "operator": "equals",
              "values": [
                "x"
              ]
            }
          ]
        }
      ],
      "order": [
        [
          "Orders.count",
          "desc"
        ]
      ],
      "limit": 50
    }
    "###);
}

#[test]
fn test_wire_query_reads_back() {
    let wire: WireQuery = serde_json::from_value(json!({
        "measures": ["Orders.count"],
        "filters": [{"and": [
            {"member": "Orders.status", "operator": "equals", "values": ["a"]},
            {"member": "Orders.amount", "operator": "gt", "values": ["1"]}
        ]}],
        "order": {"Orders.count": "asc"}
    }))
    .unwrap();

    let query = wire.into_query();
    assert!(query.filters[0].is_and_filter());
    assert_eq!(query.order, vec![OrderEntry::new("Orders.count", SortDirection::Asc)]);
}

#[test]
fn test_prune_drops_unselected_members() {
    let query = orders_query();
    let filters = vec![GroupFilter::and(vec![
        leaf("Orders.status"),
        leaf("Users.city"),
        GroupFilter::or(vec![leaf("Users.city"), leaf("Users.age")]).into(),
    ])
    .into()];

    let pruned = prune_orphaned_filters(&filters, &query);

    // The nested group lost every child and is gone; the top group is left
    // with one child and kept as is.
    assert_eq!(pruned, vec![GroupFilter::and(vec![leaf("Orders.status")]).into()]);
    assert_eq!(collapse_singletons(&pruned), vec![leaf("Orders.status")]);
}

#[test]
fn test_prune_keeps_time_dimension_filters() {
    let query = CubeQuery {
        time_dimensions: vec![TimeDimensionSpec::new("Orders.createdAt")],
        ..CubeQuery::default()
    };
    let filters = vec![leaf("Orders.createdAt")];
    assert_eq!(prune_orphaned_filters(&filters, &query), filters);
}

#[test]
fn test_prune_keeps_malformed_leaves() {
    let query = orders_query();
    let odd: FilterNode = SimpleFilter::malformed(json!({"weird": true})).into();
    let filters = vec![GroupFilter::and(vec![odd.clone(), leaf("Users.city")]).into()];

    let pruned = collapse_singletons(&prune_orphaned_filters(&filters, &query));
    assert_eq!(pruned, vec![odd]);
}

#[test]
fn test_collapse_nested_singletons() {
    let filters = vec![GroupFilter::and(vec![GroupFilter::or(vec![leaf("A.a")]).into()]).into()];
    assert_eq!(collapse_singletons(&filters), vec![leaf("A.a")]);
}

#[test]
fn test_persisted_query_round_trip() {
    let query = CubeQuery {
        filters: vec![GroupFilter::and(vec![leaf("Orders.status"), leaf("Orders.count")]).into()],
        segments: vec!["Orders.completed".to_string()],
        offset: Some(10),
        ..orders_query()
    };

    let stored = serde_json::to_string(&query).unwrap();
    let restored: CubeQuery = serde_json::from_str(&stored).unwrap();
    assert_eq!(restored, query);
}
