//! Builder error types.
//!
//! Remote failures never leave the builder as `Err`: they are rendered with
//! `Display` into the matching `*_error` field of the state. Only requests
//! the builder refuses to act on are returned to the caller.

use thiserror::Error;

use super::state::ValidationStatus;
use crate::client::ClientError;

pub type BuilderResult<T> = Result<T, BuilderError>;

#[derive(Error, Debug)]
pub enum BuilderError {
    /// Execution requested before the current query validated.
    #[error("query is not ready to run (validation is {0})")]
    NotReady(ValidationStatus),

    /// Execution requested while a previous run is still loading.
    #[error("query is already running")]
    AlreadyRunning,

    #[error("failed to load schema: {0}")]
    SchemaLoad(#[source] ClientError),

    #[error("{0}")]
    Validation(String),

    #[error("dry run failed: {0}")]
    DryRun(#[source] ClientError),

    #[error("failed to run query: {0}")]
    Execution(#[source] ClientError),
}
