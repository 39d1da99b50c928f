//! Query model.
//!
//! [`CubeQuery`] is the in-memory query owned by the builder. Its filters are
//! a tree of [`FilterNode`]s in the internal tagged form. Before anything is
//! sent or stored, [`normalize_query`] turns it into a [`WireQuery`]: empty
//! collections dropped, filter groups in the bare-key form.

mod normalize;
pub mod selection;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::filter::FilterNode;

pub use normalize::{collapse_singletons, normalize_query, prune_orphaned_filters, WireQuery};

/// A query against the semantic layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CubeQuery {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub time_dimensions: Vec<TimeDimensionSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_order"
    )]
    pub order: Vec<OrderEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl CubeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every selected measure, dimension and time dimension.
    pub fn selected_members(&self) -> HashSet<&str> {
        self.measures
            .iter()
            .chain(self.dimensions.iter())
            .map(String::as_str)
            .chain(self.time_dimensions.iter().map(|td| td.dimension.as_str()))
            .collect()
    }

    /// Whether `member` is selected as a measure, dimension or time dimension.
    pub fn is_selected(&self, member: &str) -> bool {
        self.measures.iter().any(|m| m == member)
            || self.dimensions.iter().any(|d| d == member)
            || self.time_dimensions.iter().any(|td| td.dimension == member)
    }

    /// A query with nothing selected cannot be validated or run.
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty() && self.dimensions.is_empty() && self.time_dimensions.is_empty()
    }
}

/// A time dimension with optional bucketing and range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDimensionSpec {
    pub dimension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl TimeDimensionSpec {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            granularity: None,
            date_range: None,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = Some(date_range);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Either a relative range (`"last 7 days"`) or two ISO dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateRange {
    Relative(String),
    Absolute([String; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// One `[member, direction]` pair of the query order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, SortDirection)", into = "(String, SortDirection)")]
pub struct OrderEntry {
    pub member: String,
    pub direction: SortDirection,
}

impl OrderEntry {
    pub fn new(member: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            member: member.into(),
            direction,
        }
    }
}

impl From<(String, SortDirection)> for OrderEntry {
    fn from((member, direction): (String, SortDirection)) -> Self {
        Self { member, direction }
    }
}

impl From<OrderEntry> for (String, SortDirection) {
    fn from(entry: OrderEntry) -> Self {
        (entry.member, entry.direction)
    }
}

/// Accepts both `[["A.x", "asc"]]` and the object form `{"A.x": "asc"}`.
pub(crate) fn deserialize_order<'de, D>(deserializer: D) -> Result<Vec<OrderEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OrderRepr {
        List(Vec<OrderEntry>),
        Map(serde_json::Map<String, serde_json::Value>),
    }

    match OrderRepr::deserialize(deserializer)? {
        OrderRepr::List(entries) => Ok(entries),
        OrderRepr::Map(map) => map
            .into_iter()
            .map(|(member, direction)| {
                serde_json::from_value(direction)
                    .map(|direction| OrderEntry { member, direction })
                    .map_err(serde::de::Error::custom)
            })
            .collect(),
    }
}
