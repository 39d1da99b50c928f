//! Local snapshot of the query being built.
//!
//! The snapshot is a JSON document of the form `{ "query": { ... } }`,
//! restored on the next session. A missing or corrupt snapshot is not an
//! error for the caller: the builder starts from an empty query.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::query::CubeQuery;

/// Errors that can occur reading or writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed persisted state: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// The persisted form of the builder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub query: CubeQuery,
}

/// Read a snapshot, reporting why it could not be read.
pub fn try_load_persisted(path: &Path) -> PersistResult<PersistedState> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(PersistError::Malformed)
}

/// Read a snapshot, falling back to an empty query.
pub fn load_persisted(path: &Path) -> CubeQuery {
    match try_load_persisted(path) {
        Ok(state) => state.query,
        Err(PersistError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            CubeQuery::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "discarding persisted query");
            CubeQuery::default()
        }
    }
}

/// Write a snapshot, creating parent directories as needed.
pub fn save_persisted(path: &Path, state: &PersistedState) -> PersistResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state).map_err(PersistError::Serialize)?;
    fs::write(path, json)?;
    Ok(())
}
