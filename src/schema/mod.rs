//! Schema description returned by the remote `meta` endpoint.
//!
//! A schema is a list of cubes, each exposing measures, dimensions and
//! segments. Dimensions of type `time` are the time dimensions of the
//! query editor.

mod check;

use serde::{Deserialize, Serialize};

pub use check::{check_filters, FilterIssue, FilterIssueKind};

/// The full schema of the semantic layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDescription {
    #[serde(default)]
    pub cubes: Vec<CubeMeta>,
}

/// One cube (or view) of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeMeta {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub measures: Vec<MemberMeta>,
    #[serde(default)]
    pub dimensions: Vec<MemberMeta>,
    #[serde(default)]
    pub segments: Vec<MemberMeta>,
}

/// A measure, dimension or segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMeta {
    /// Fully qualified name, e.g. `Orders.count`.
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub short_title: Option<String>,
    #[serde(rename = "type", default)]
    pub member_type: MemberType,
    #[serde(default)]
    pub description: Option<String>,
}

/// Declared type of a member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberType {
    #[default]
    String,
    Number,
    Time,
    Boolean,
    Count,
    CountDistinct,
    CountDistinctApprox,
    Sum,
    Avg,
    Min,
    Max,
    RunningTotal,
    Other(String),
}

impl From<String> for MemberType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "string" => MemberType::String,
            "number" => MemberType::Number,
            "time" => MemberType::Time,
            "boolean" => MemberType::Boolean,
            "count" => MemberType::Count,
            "countDistinct" => MemberType::CountDistinct,
            "countDistinctApprox" => MemberType::CountDistinctApprox,
            "sum" => MemberType::Sum,
            "avg" => MemberType::Avg,
            "min" => MemberType::Min,
            "max" => MemberType::Max,
            "runningTotal" => MemberType::RunningTotal,
            _ => MemberType::Other(tag),
        }
    }
}

impl From<MemberType> for String {
    fn from(member_type: MemberType) -> Self {
        let tag = match member_type {
            MemberType::String => "string",
            MemberType::Number => "number",
            MemberType::Time => "time",
            MemberType::Boolean => "boolean",
            MemberType::Count => "count",
            MemberType::CountDistinct => "countDistinct",
            MemberType::CountDistinctApprox => "countDistinctApprox",
            MemberType::Sum => "sum",
            MemberType::Avg => "avg",
            MemberType::Min => "min",
            MemberType::Max => "max",
            MemberType::RunningTotal => "runningTotal",
            MemberType::Other(tag) => return tag,
        };
        tag.to_string()
    }
}

/// Field type that decides which filter operators apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Number,
    Time,
    Boolean,
}

impl MemberType {
    pub fn field_type(&self) -> FieldType {
        match self {
            MemberType::String | MemberType::Other(_) => FieldType::String,
            MemberType::Time => FieldType::Time,
            MemberType::Boolean => FieldType::Boolean,
            MemberType::Number
            | MemberType::Count
            | MemberType::CountDistinct
            | MemberType::CountDistinctApprox
            | MemberType::Sum
            | MemberType::Avg
            | MemberType::Min
            | MemberType::Max
            | MemberType::RunningTotal => FieldType::Number,
        }
    }
}

/// Role a member plays in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Measure,
    Dimension,
    TimeDimension,
    Segment,
}

impl SchemaDescription {
    /// Find a member by its fully qualified name.
    pub fn find_member(&self, name: &str) -> Option<(MemberKind, &MemberMeta)> {
        for cube in &self.cubes {
            if let Some(m) = cube.measures.iter().find(|m| m.name == name) {
                return Some((MemberKind::Measure, m));
            }
            if let Some(d) = cube.dimensions.iter().find(|d| d.name == name) {
                let kind = if d.member_type == MemberType::Time {
                    MemberKind::TimeDimension
                } else {
                    MemberKind::Dimension
                };
                return Some((kind, d));
            }
            if let Some(s) = cube.segments.iter().find(|s| s.name == name) {
                return Some((MemberKind::Segment, s));
            }
        }
        None
    }

    /// Field type of a filterable member (measures and dimensions).
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        match self.find_member(name)? {
            (MemberKind::Segment, _) => None,
            (_, member) => Some(member.member_type.field_type()),
        }
    }

    pub fn cube(&self, name: &str) -> Option<&CubeMeta> {
        self.cubes.iter().find(|c| c.name == name)
    }

    pub fn measures(&self) -> impl Iterator<Item = &MemberMeta> {
        self.cubes.iter().flat_map(|c| c.measures.iter())
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &MemberMeta> {
        self.cubes
            .iter()
            .flat_map(|c| c.dimensions.iter())
            .filter(|d| d.member_type != MemberType::Time)
    }

    pub fn time_dimensions(&self) -> impl Iterator<Item = &MemberMeta> {
        self.cubes
            .iter()
            .flat_map(|c| c.dimensions.iter())
            .filter(|d| d.member_type == MemberType::Time)
    }
}
