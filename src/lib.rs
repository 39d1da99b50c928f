//! # cubeq
//!
//! Interactive query construction for cube semantic layers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        filter (tree model + mutation functions)          │
//! │   add / remove / update / toggle, unwrap on removal      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query]
//! ┌─────────────────────────────────────────────────────────┐
//! │       CubeQuery ──normalize──► WireQuery                 │
//! │   prune orphaned filters, strip empty collections        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │              QueryBuilder state machine                  │
//! │   schema load, debounced dry run, paired execution       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [client]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CubeApi: meta / dry-run / load (HTTP)             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod filter;
pub mod persist;
pub mod query;
pub mod schema;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::builder::{
        BuilderError, ExecutionStatus, QueryBuilder, QueryBuilderState, SchemaStatus,
        ValidationStatus,
    };
    pub use crate::client::{CubeApi, DryRunResponse, HttpCubeClient, ResultSet};
    pub use crate::filter::{
        FilterNode, FilterOperator, FilterPath, GroupFilter, LogicalOp, SimpleFilter,
    };
    pub use crate::query::{
        normalize_query, CubeQuery, DateRange, Granularity, SortDirection, TimeDimensionSpec,
        WireQuery,
    };
    pub use crate::schema::SchemaDescription;
}

pub use builder::QueryBuilder;
pub use filter::{FilterNode, GroupFilter, SimpleFilter};
pub use query::{CubeQuery, WireQuery};
