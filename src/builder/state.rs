//! Builder state record and its status axes.

use std::fmt;

use serde::Serialize;

use crate::client::ResultSet;
use crate::query::CubeQuery;
use crate::schema::SchemaDescription;

/// Progress of the schema fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Progress of the dry run of the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Idle,
    Validating,
    Valid,
    Invalid,
}

/// Progress of the current query's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl ValidationStatus {
    pub fn is_valid(self) -> bool {
        self == ValidationStatus::Valid
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaStatus::Idle => "idle",
            SchemaStatus::Loading => "loading",
            SchemaStatus::Success => "success",
            SchemaStatus::Error => "error",
        })
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationStatus::Idle => "idle",
            ValidationStatus::Validating => "validating",
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
        })
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Loading => "loading",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
        })
    }
}

/// Everything the presentation layer observes.
///
/// The record is always replaced as a whole, so a reader never sees a
/// validation result next to a query it was not computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBuilderState {
    pub query: CubeQuery,

    pub schema: Option<SchemaDescription>,
    pub schema_status: SchemaStatus,
    pub schema_error: Option<String>,

    pub validation_status: ValidationStatus,
    pub validation_error: Option<String>,
    /// SQL generated by the last successful dry run.
    pub validation_sql: Option<String>,

    pub execution_status: ExecutionStatus,
    pub execution_results: Option<ResultSet>,
    pub execution_error: Option<String>,
    /// Rows the query returns without the display limit.
    pub total_row_count: Option<usize>,

    pub display_limit: u64,
}

impl QueryBuilderState {
    pub fn new(query: CubeQuery, display_limit: u64) -> Self {
        Self {
            query,
            schema: None,
            schema_status: SchemaStatus::Idle,
            schema_error: None,
            validation_status: ValidationStatus::Idle,
            validation_error: None,
            validation_sql: None,
            execution_status: ExecutionStatus::Idle,
            execution_results: None,
            execution_error: None,
            total_row_count: None,
            display_limit,
        }
    }

    /// Forget validation and execution outcomes after the query changed.
    pub(crate) fn reset_outcomes(&mut self) {
        self.validation_status = ValidationStatus::Idle;
        self.validation_error = None;
        self.validation_sql = None;
        self.execution_status = ExecutionStatus::Idle;
        self.execution_results = None;
        self.execution_error = None;
        self.total_row_count = None;
    }

    /// Execution is allowed only for a validated query not already running.
    pub fn can_execute(&self) -> bool {
        self.validation_status == ValidationStatus::Valid
            && self.execution_status != ExecutionStatus::Loading
    }

    /// Whether more rows exist than are displayed.
    pub fn is_truncated(&self) -> bool {
        match (&self.execution_results, self.total_row_count) {
            (Some(results), Some(total)) => total > results.row_count(),
            _ => false,
        }
    }
}
