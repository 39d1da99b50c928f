//! Field selection on a query.
//!
//! Each function returns a complete replacement query. Removing a field also
//! drops the filters and order entries that referenced it.

use super::{
    collapse_singletons, prune_orphaned_filters, CubeQuery, DateRange, Granularity, OrderEntry,
    SortDirection, TimeDimensionSpec,
};

pub fn add_measure(query: &CubeQuery, member: &str) -> CubeQuery {
    let mut next = query.clone();
    if !next.measures.iter().any(|m| m == member) {
        next.measures.push(member.to_string());
    }
    next
}

pub fn add_dimension(query: &CubeQuery, member: &str) -> CubeQuery {
    let mut next = query.clone();
    if !next.dimensions.iter().any(|d| d == member) {
        next.dimensions.push(member.to_string());
    }
    next
}

pub fn add_time_dimension(
    query: &CubeQuery,
    member: &str,
    granularity: Option<Granularity>,
) -> CubeQuery {
    let mut next = query.clone();
    if !next.time_dimensions.iter().any(|td| td.dimension == member) {
        let mut spec = TimeDimensionSpec::new(member);
        spec.granularity = granularity;
        next.time_dimensions.push(spec);
    }
    next
}

pub fn remove_measure(query: &CubeQuery, member: &str) -> CubeQuery {
    let mut next = query.clone();
    next.measures.retain(|m| m != member);
    drop_orphans(next)
}

pub fn remove_dimension(query: &CubeQuery, member: &str) -> CubeQuery {
    let mut next = query.clone();
    next.dimensions.retain(|d| d != member);
    drop_orphans(next)
}

pub fn remove_time_dimension(query: &CubeQuery, member: &str) -> CubeQuery {
    let mut next = query.clone();
    next.time_dimensions.retain(|td| td.dimension != member);
    drop_orphans(next)
}

/// Remove a member from whichever list selects it.
pub fn remove_member(query: &CubeQuery, member: &str) -> CubeQuery {
    let mut next = query.clone();
    next.measures.retain(|m| m != member);
    next.dimensions.retain(|d| d != member);
    next.time_dimensions.retain(|td| td.dimension != member);
    drop_orphans(next)
}

fn drop_orphans(mut query: CubeQuery) -> CubeQuery {
    let pruned = prune_orphaned_filters(&query.filters, &query);
    query.filters = collapse_singletons(&pruned);
    let selected = query.selected_members();
    let order = query
        .order
        .iter()
        .filter(|entry| selected.contains(entry.member.as_str()))
        .cloned()
        .collect();
    query.order = order;
    query
}

pub fn set_granularity(
    query: &CubeQuery,
    member: &str,
    granularity: Option<Granularity>,
) -> CubeQuery {
    let mut next = query.clone();
    for td in next.time_dimensions.iter_mut().filter(|td| td.dimension == member) {
        td.granularity = granularity;
    }
    next
}

pub fn set_date_range(query: &CubeQuery, member: &str, date_range: Option<DateRange>) -> CubeQuery {
    let mut next = query.clone();
    for td in next.time_dimensions.iter_mut().filter(|td| td.dimension == member) {
        td.date_range = date_range.clone();
    }
    next
}

pub fn add_segment(query: &CubeQuery, segment: &str) -> CubeQuery {
    let mut next = query.clone();
    if !next.segments.iter().any(|s| s == segment) {
        next.segments.push(segment.to_string());
    }
    next
}

pub fn remove_segment(query: &CubeQuery, segment: &str) -> CubeQuery {
    let mut next = query.clone();
    next.segments.retain(|s| s != segment);
    next
}

/// Set or clear the sort direction of a member, keeping its position.
pub fn set_order(query: &CubeQuery, member: &str, direction: Option<SortDirection>) -> CubeQuery {
    let mut next = query.clone();
    match direction {
        None => next.order.retain(|entry| entry.member != member),
        Some(direction) => match next.order.iter_mut().find(|entry| entry.member == member) {
            Some(entry) => entry.direction = direction,
            None => next.order.push(OrderEntry::new(member, direction)),
        },
    }
    next
}

/// Cycle a member's sort: unsorted, ascending, descending, unsorted.
pub fn toggle_order(query: &CubeQuery, member: &str) -> CubeQuery {
    let current = query
        .order
        .iter()
        .find(|entry| entry.member == member)
        .map(|entry| entry.direction);
    let next = match current {
        None => Some(SortDirection::Asc),
        Some(SortDirection::Asc) => Some(SortDirection::Desc),
        Some(SortDirection::Desc) => None,
    };
    set_order(query, member, next)
}

pub fn set_limit(query: &CubeQuery, limit: Option<u64>) -> CubeQuery {
    CubeQuery {
        limit,
        ..query.clone()
    }
}

pub fn set_offset(query: &CubeQuery, offset: Option<u64>) -> CubeQuery {
    CubeQuery {
        offset,
        ..query.clone()
    }
}
