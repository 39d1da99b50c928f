//! Remote semantic layer API.
//!
//! The builder talks to the semantic layer through the [`CubeApi`] trait:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        QueryBuilder          │
//! └──────────────────────────────┘
//!        │ meta()   │ dry_run(q)   │ load(q)
//!        ▼          ▼              ▼
//! ┌──────────────────────────────┐
//! │   CubeApi (HttpCubeClient)   │
//! │   GET  {url}/meta            │
//! │   POST {url}/dry-run         │
//! │   POST {url}/load            │
//! └──────────────────────────────┘
//! ```
//!
//! Implementations return structured results or a [`ClientError`]; they never
//! update builder state themselves.

mod error;
mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::WireQuery;
use crate::schema::SchemaDescription;

pub use error::{ClientError, ClientResult};
pub use http::HttpCubeClient;

/// Query types reported by a successful dry run.
pub const QUERY_TYPES: &[&str] = &["regularQuery", "compareDateRangeQuery", "blendingQuery"];

/// Operations of the semantic layer used by the builder.
#[async_trait]
pub trait CubeApi: Send + Sync {
    /// Fetch the schema description.
    async fn meta(&self) -> ClientResult<SchemaDescription>;

    /// Compile a query without running it.
    async fn dry_run(&self, query: &WireQuery) -> ClientResult<DryRunResponse>;

    /// Run a query.
    async fn load(&self, query: &WireQuery) -> ClientResult<ResultSet>;
}

/// Response of a dry run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<DryRunSql>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_query: Option<PivotQuery>,
}

impl DryRunResponse {
    /// A dry run succeeds only when it carries no error and names a known
    /// query type. An empty body is not a success.
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
            && self
                .query_type
                .as_deref()
                .is_some_and(|t| QUERY_TYPES.contains(&t))
    }

    /// Message explaining why the dry run is not valid.
    pub fn failure_message(&self) -> Option<String> {
        if self.is_valid() {
            return None;
        }
        Some(match (&self.error, &self.query_type) {
            (Some(error), _) => error.clone(),
            (None, Some(other)) => format!("unrecognized query type '{}'", other),
            (None, None) => "dry run returned no query type".to_string(),
        })
    }
}

/// Generated SQL and its parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DryRunSql {
    #[serde(default)]
    pub sql: Vec<String>,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl DryRunSql {
    /// The statements joined into one text block.
    pub fn text(&self) -> String {
        self.sql.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotQuery {
    pub query: WireQuery,
}

/// One result row, keyed by member name.
pub type Row = Map<String, Value>;

/// Rows returned by `load`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Value>,
}

impl ResultSet {
    pub fn new(data: Vec<Row>) -> Self {
        Self {
            query: None,
            data,
            annotation: None,
        }
    }

    /// Rows in flat table form.
    pub fn table_pivot(&self) -> &[Row] {
        &self.data
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}
