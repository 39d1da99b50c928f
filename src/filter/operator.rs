//! Filter operators and the value-arity rules they impose.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::FieldType;

/// Operator of a simple filter condition.
///
/// Unrecognized tags are kept in [`FilterOperator::Unknown`] and serialized
/// verbatim, so a newer server vocabulary survives a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    Set,
    NotSet,
    InDateRange,
    NotInDateRange,
    BeforeDate,
    BeforeOrOnDate,
    AfterDate,
    AfterOrOnDate,
    Unknown(String),
}

/// How many values an operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueArity {
    /// The operator takes no values (`set`, `notSet`).
    None,
    /// The operator takes exactly this many values.
    Exactly(usize),
    /// The operator takes one or more values.
    AtLeastOne,
}

impl ValueArity {
    /// Check whether `count` values satisfy this arity.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            ValueArity::None => count == 0,
            ValueArity::Exactly(n) => count == n,
            ValueArity::AtLeastOne => count >= 1,
        }
    }
}

const STRING_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::StartsWith,
    FilterOperator::NotStartsWith,
    FilterOperator::EndsWith,
    FilterOperator::NotEndsWith,
    FilterOperator::Set,
    FilterOperator::NotSet,
];

const NUMBER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Gt,
    FilterOperator::Gte,
    FilterOperator::Lt,
    FilterOperator::Lte,
    FilterOperator::Set,
    FilterOperator::NotSet,
];

const TIME_OPERATORS: &[FilterOperator] = &[
    FilterOperator::InDateRange,
    FilterOperator::NotInDateRange,
    FilterOperator::BeforeDate,
    FilterOperator::BeforeOrOnDate,
    FilterOperator::AfterDate,
    FilterOperator::AfterOrOnDate,
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Set,
    FilterOperator::NotSet,
];

const BOOLEAN_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Set,
    FilterOperator::NotSet,
];

impl FilterOperator {
    /// The wire tag of this operator.
    pub fn as_str(&self) -> &str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notEquals",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "notContains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::NotStartsWith => "notStartsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::NotEndsWith => "notEndsWith",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Set => "set",
            FilterOperator::NotSet => "notSet",
            FilterOperator::InDateRange => "inDateRange",
            FilterOperator::NotInDateRange => "notInDateRange",
            FilterOperator::BeforeDate => "beforeDate",
            FilterOperator::BeforeOrOnDate => "beforeOrOnDate",
            FilterOperator::AfterDate => "afterDate",
            FilterOperator::AfterOrOnDate => "afterOrOnDate",
            FilterOperator::Unknown(tag) => tag,
        }
    }

    /// Value cardinality accepted by this operator.
    ///
    /// Unknown operators accept any number of values; the remote compiler
    /// decides.
    pub fn arity(&self) -> Option<ValueArity> {
        let arity = match self {
            FilterOperator::Set | FilterOperator::NotSet => ValueArity::None,
            FilterOperator::Gt
            | FilterOperator::Gte
            | FilterOperator::Lt
            | FilterOperator::Lte
            | FilterOperator::BeforeDate
            | FilterOperator::BeforeOrOnDate
            | FilterOperator::AfterDate
            | FilterOperator::AfterOrOnDate => ValueArity::Exactly(1),
            FilterOperator::InDateRange | FilterOperator::NotInDateRange => {
                ValueArity::Exactly(2)
            }
            FilterOperator::Equals
            | FilterOperator::NotEquals
            | FilterOperator::Contains
            | FilterOperator::NotContains
            | FilterOperator::StartsWith
            | FilterOperator::NotStartsWith
            | FilterOperator::EndsWith
            | FilterOperator::NotEndsWith => ValueArity::AtLeastOne,
            FilterOperator::Unknown(_) => return None,
        };
        Some(arity)
    }

    /// Operators offered for a field of the given type.
    pub fn for_field_type(field_type: FieldType) -> &'static [FilterOperator] {
        match field_type {
            FieldType::String => STRING_OPERATORS,
            FieldType::Number => NUMBER_OPERATORS,
            FieldType::Time => TIME_OPERATORS,
            FieldType::Boolean => BOOLEAN_OPERATORS,
        }
    }

    /// Operator preselected when a field of the given type is picked.
    pub fn default_for(field_type: FieldType) -> FilterOperator {
        match field_type {
            FieldType::Time => FilterOperator::InDateRange,
            _ => FilterOperator::Equals,
        }
    }

    /// Check whether this operator may be applied to a field of the given type.
    pub fn is_valid_for(&self, field_type: FieldType) -> bool {
        Self::for_field_type(field_type).contains(self)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FilterOperator::Unknown(_))
    }
}

impl From<String> for FilterOperator {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "equals" => FilterOperator::Equals,
            "notEquals" => FilterOperator::NotEquals,
            "contains" => FilterOperator::Contains,
            "notContains" => FilterOperator::NotContains,
            "startsWith" => FilterOperator::StartsWith,
            "notStartsWith" => FilterOperator::NotStartsWith,
            "endsWith" => FilterOperator::EndsWith,
            "notEndsWith" => FilterOperator::NotEndsWith,
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "lt" => FilterOperator::Lt,
            "lte" => FilterOperator::Lte,
            "set" => FilterOperator::Set,
            "notSet" => FilterOperator::NotSet,
            "inDateRange" => FilterOperator::InDateRange,
            "notInDateRange" => FilterOperator::NotInDateRange,
            "beforeDate" => FilterOperator::BeforeDate,
            "beforeOrOnDate" => FilterOperator::BeforeOrOnDate,
            "afterDate" => FilterOperator::AfterDate,
            "afterOrOnDate" => FilterOperator::AfterOrOnDate,
            _ => FilterOperator::Unknown(tag),
        }
    }
}

impl From<&str> for FilterOperator {
    fn from(tag: &str) -> Self {
        FilterOperator::from(tag.to_string())
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        match op {
            FilterOperator::Unknown(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
