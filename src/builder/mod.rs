//! Query builder state machine.
//!
//! The builder owns the query being edited and drives three coupled status
//! axes against the remote API:
//!
//! ```text
//!  schema:      idle ──► loading ──► success | error
//!
//!  validation:  idle ──(debounce)──► validating ──► valid | invalid
//!                 ▲                                   │
//!                 └────────── query changed ◄─────────┘
//!
//!  execution:   idle ──► loading ──► success | error      (only from valid)
//! ```
//!
//! Every edit that changes the normalized query bumps a generation counter,
//! resets validation and execution to idle, and restarts the debounce timer.
//! Remote responses are committed only if the generation and the query
//! snapshot they were issued for are still current; otherwise they are
//! dropped. Requests already on the wire are never aborted.
//!
//! State lives in a [`tokio::sync::watch`] channel and is replaced as a
//! whole, so subscribers always observe a consistent record.
//!
//! # Example
//!
//! ```ignore
//! use cubeq::builder::QueryBuilder;
//! use cubeq::filter::SimpleFilter;
//!
//! let builder = QueryBuilder::new(client);
//! builder.load_schema().await;
//! builder.add_measure("Orders.count");
//! builder.add_filter(SimpleFilter::new("Orders.status", "equals", ["shipped"]));
//!
//! if builder.validate_now().await.is_valid() {
//!     builder.execute().await?;
//! }
//! ```

mod error;
mod state;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::CubeApi;
use crate::config::BuilderSettings;
use crate::filter::{self, FilterNode, FilterOperator, FilterPath, SimpleFilter};
use crate::persist::PersistedState;
use crate::query::{self, normalize_query, CubeQuery, Granularity};
use crate::schema::{check_filters, FilterIssue};

pub use error::{BuilderError, BuilderResult};
pub use state::{ExecutionStatus, QueryBuilderState, SchemaStatus, ValidationStatus};

/// A debounced validation task.
struct PendingValidation {
    handle: JoinHandle<()>,
    /// Set once the delay elapsed and the dry run is being issued.
    started: Arc<AtomicBool>,
}

struct Inner {
    client: RwLock<Arc<dyn CubeApi>>,
    state: watch::Sender<QueryBuilderState>,
    /// Bumped whenever the effective query changes.
    generation: AtomicU64,
    schema_generation: AtomicU64,
    run_generation: AtomicU64,
    pending: Mutex<Option<PendingValidation>>,
    debounce: Duration,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.handle.abort();
        }
    }
}

/// Interactive query builder.
///
/// Cloning yields another handle to the same builder.
#[derive(Clone)]
pub struct QueryBuilder {
    inner: Arc<Inner>,
}

impl QueryBuilder {
    /// Create a builder with default settings and an empty query.
    pub fn new(client: Arc<dyn CubeApi>) -> Self {
        Self::with_settings(client, &BuilderSettings::default())
    }

    pub fn with_settings(client: Arc<dyn CubeApi>, settings: &BuilderSettings) -> Self {
        let initial = QueryBuilderState::new(CubeQuery::default(), settings.display_limit);
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                client: RwLock::new(client),
                state,
                generation: AtomicU64::new(0),
                schema_generation: AtomicU64::new(0),
                run_generation: AtomicU64::new(0),
                pending: Mutex::new(None),
                debounce: settings.debounce(),
            }),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current state record.
    pub fn state(&self) -> QueryBuilderState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state replacement.
    pub fn subscribe(&self) -> watch::Receiver<QueryBuilderState> {
        self.inner.state.subscribe()
    }

    pub fn query(&self) -> CubeQuery {
        self.inner.state.borrow().query.clone()
    }

    /// Whether [`QueryBuilder::execute`] would be accepted now.
    pub fn can_execute(&self) -> bool {
        self.inner.state.borrow().can_execute()
    }

    /// Problems in the filter tree found against the loaded schema.
    pub fn filter_issues(&self) -> Vec<FilterIssue> {
        let state = self.inner.state.borrow();
        match &state.schema {
            Some(schema) => check_filters(schema, &state.query.filters),
            None => Vec::new(),
        }
    }

    /// Snapshot for local persistence.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            query: self.query(),
        }
    }

    fn client(&self) -> Arc<dyn CubeApi> {
        self.inner
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Fetch the schema. A response that arrives after a newer load started
    /// is discarded.
    pub async fn load_schema(&self) {
        let token = self.inner.schema_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|s| {
            s.schema_status = SchemaStatus::Loading;
            s.schema_error = None;
        });
        tracing::debug!(token, "loading schema");

        let result = self.client().meta().await;

        let committed = self.inner.state.send_if_modified(|s| {
            if self.inner.schema_generation.load(Ordering::SeqCst) != token {
                return false;
            }
            match result {
                Ok(schema) => {
                    s.schema = Some(schema);
                    s.schema_status = SchemaStatus::Success;
                    s.schema_error = None;
                }
                Err(e) => {
                    let message = BuilderError::SchemaLoad(e).to_string();
                    tracing::warn!(error = %message, "schema load failed");
                    s.schema = None;
                    s.schema_status = SchemaStatus::Error;
                    s.schema_error = Some(message);
                }
            }
            true
        });
        if !committed {
            tracing::debug!(token, "discarding stale schema response");
        }
    }

    /// Switch to another endpoint or credentials.
    ///
    /// Previous validation and execution results no longer apply: they are
    /// reset, validation is rescheduled, and the schema is fetched again.
    pub async fn set_client(&self, client: Arc<dyn CubeApi>) {
        *self
            .inner
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner) = client;
        self.inner.state.send_modify(|s| {
            s.reset_outcomes();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        });
        self.schedule_validation();
        self.load_schema().await;
    }

    // =========================================================================
    // Query edits
    // =========================================================================

    /// Replace the query with `edit(current)`.
    ///
    /// Returns `true` if the normalized query changed, in which case
    /// validation and execution are reset and a dry run is scheduled.
    pub fn update_query<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&CubeQuery) -> CubeQuery,
    {
        let mut changed = false;
        self.inner.state.send_if_modified(|s| {
            let next = edit(&s.query);
            if next == s.query {
                return false;
            }
            changed = normalize_query(&next) != normalize_query(&s.query);
            s.query = next;
            if changed {
                s.reset_outcomes();
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
            }
            true
        });
        if changed {
            self.schedule_validation();
        }
        changed
    }

    pub fn set_query(&self, query: CubeQuery) -> bool {
        self.update_query(|_| query)
    }

    /// Restore a persisted snapshot.
    pub fn restore(&self, snapshot: PersistedState) -> bool {
        self.set_query(snapshot.query)
    }

    pub fn add_measure(&self, member: &str) -> bool {
        self.update_query(|q| query::selection::add_measure(q, member))
    }

    pub fn add_dimension(&self, member: &str) -> bool {
        self.update_query(|q| query::selection::add_dimension(q, member))
    }

    pub fn add_time_dimension(&self, member: &str, granularity: Option<Granularity>) -> bool {
        self.update_query(|q| query::selection::add_time_dimension(q, member, granularity))
    }

    /// Deselect a member; filters and order entries on it go too.
    pub fn remove_member(&self, member: &str) -> bool {
        self.update_query(|q| query::selection::remove_member(q, member))
    }

    pub fn toggle_order(&self, member: &str) -> bool {
        self.update_query(|q| query::selection::toggle_order(q, member))
    }

    pub fn add_filter(&self, leaf: SimpleFilter) -> bool {
        self.edit_filters(|nodes| filter::add_simple_filter(nodes, leaf))
    }

    /// Add a nested group (or any node) under the top-level rules.
    pub fn add_filter_node(&self, node: FilterNode) -> bool {
        self.edit_filters(|nodes| filter::add_node(nodes, node))
    }

    pub fn add_filter_to_group(&self, path: &FilterPath, leaf: SimpleFilter) -> bool {
        self.edit_filters(|nodes| filter::add_to_group_at(nodes, path, leaf))
    }

    /// Edit the leaf at `path`.
    ///
    /// When the member changes and the schema knows its type, the operator
    /// resets to that type's default rather than `equals`.
    pub fn update_filter(&self, path: &FilterPath, leaf: SimpleFilter) -> bool {
        let default_operator = {
            let state = self.inner.state.borrow();
            let previous =
                filter::node_at(&state.query.filters, path).and_then(FilterNode::as_simple);
            match (previous, &state.schema) {
                (Some(previous), Some(schema)) if previous.member != leaf.member => schema
                    .field_type(&leaf.member)
                    .map(FilterOperator::default_for),
                _ => None,
            }
        };
        self.edit_filters(|nodes| {
            let next = filter::update_leaf_at(nodes, path, leaf);
            let current = filter::node_at(&next, path).and_then(FilterNode::as_simple);
            match (default_operator, current) {
                (Some(operator), Some(current)) => {
                    let reset =
                        SimpleFilter::new(current.member.clone(), operator, Vec::<String>::new());
                    filter::update_leaf_at(&next, path, reset)
                }
                _ => next,
            }
        })
    }

    pub fn remove_filter(&self, path: &FilterPath) -> bool {
        self.edit_filters(|nodes| filter::remove_at(nodes, path))
    }

    pub fn toggle_group_kind(&self) -> bool {
        self.edit_filters(filter::toggle_group_kind)
    }

    fn edit_filters<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&[FilterNode]) -> Vec<FilterNode>,
    {
        self.update_query(|q| CubeQuery {
            filters: edit(&q.filters),
            ..q.clone()
        })
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Restart the debounce timer for the current generation.
    ///
    /// A pending timer is cancelled. A dry run already issued keeps running;
    /// its result is discarded when it resolves.
    fn schedule_validation(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, validation not scheduled");
            return;
        };
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let debounce = self.inner.debounce;
        let started = Arc::new(AtomicBool::new(false));
        let task_started = started.clone();

        let handle = runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            task_started.store(true, Ordering::SeqCst);
            if let Some(inner) = weak.upgrade() {
                QueryBuilder { inner }.validate_generation(generation).await;
            }
        });

        let previous = lock(&self.inner.pending).replace(PendingValidation { handle, started });
        if let Some(previous) = previous {
            cancel_if_waiting(previous);
        }
    }

    /// Validate the current query immediately, skipping the debounce delay.
    pub async fn validate_now(&self) -> ValidationStatus {
        if let Some(pending) = lock(&self.inner.pending).take() {
            cancel_if_waiting(pending);
        }
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.validate_generation(generation).await;
        self.inner.state.borrow().validation_status
    }

    fn is_current(&self, generation: u64, snapshot: &CubeQuery, state: &QueryBuilderState) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation && state.query == *snapshot
    }

    async fn validate_generation(&self, generation: u64) {
        let snapshot = {
            let state = self.inner.state.borrow();
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            state.query.clone()
        };
        if snapshot.is_empty() {
            return;
        }

        if filter::flatten_leaves(&snapshot.filters)
            .iter()
            .any(|leaf| leaf.is_malformed())
        {
            let message =
                BuilderError::Validation("query contains an unrecognized filter".to_string())
                    .to_string();
            self.inner.state.send_if_modified(|s| {
                if !self.is_current(generation, &snapshot, s) {
                    return false;
                }
                s.validation_status = ValidationStatus::Invalid;
                s.validation_error = Some(message);
                true
            });
            return;
        }

        let began = self.inner.state.send_if_modified(|s| {
            if !self.is_current(generation, &snapshot, s) {
                return false;
            }
            s.validation_status = ValidationStatus::Validating;
            s.validation_error = None;
            s.validation_sql = None;
            true
        });
        if !began {
            return;
        }
        tracing::debug!(generation, "issuing dry run");

        let outcome = self.client().dry_run(&normalize_query(&snapshot)).await;
        let (status, error, sql) = match outcome {
            Ok(response) if response.is_valid() => (
                ValidationStatus::Valid,
                None,
                response.sql.map(|sql| sql.text()),
            ),
            Ok(response) => (
                ValidationStatus::Invalid,
                response
                    .failure_message()
                    .map(|m| BuilderError::Validation(m).to_string()),
                None,
            ),
            Err(e) => (
                ValidationStatus::Invalid,
                Some(BuilderError::DryRun(e).to_string()),
                None,
            ),
        };

        let committed = self.inner.state.send_if_modified(|s| {
            if !self.is_current(generation, &snapshot, s) {
                return false;
            }
            s.validation_status = status;
            s.validation_error = error;
            s.validation_sql = sql;
            true
        });
        if committed {
            tracing::debug!(generation, %status, "dry run finished");
        } else {
            tracing::debug!(generation, "discarding stale dry run");
        }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run the validated query.
    ///
    /// Issues two loads of the same normalized query concurrently: one capped
    /// at the display limit (or the query's own smaller limit) for the
    /// results, one without any limit for the total row count. State moves
    /// to success only if both succeed; if either fails it moves to error and
    /// no results are kept.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NotReady`] without any remote call when the
    /// current query is not validated, and [`BuilderError::AlreadyRunning`]
    /// while a previous run is loading. Remote failures are reported through
    /// the state, not here.
    pub async fn execute(&self) -> BuilderResult<()> {
        let mut refusal = None;
        let mut accepted = None;
        self.inner.state.send_if_modified(|s| {
            if s.validation_status != ValidationStatus::Valid {
                refusal = Some(BuilderError::NotReady(s.validation_status));
                return false;
            }
            if s.execution_status == ExecutionStatus::Loading {
                refusal = Some(BuilderError::AlreadyRunning);
                return false;
            }
            let run = self.inner.run_generation.fetch_add(1, Ordering::SeqCst) + 1;
            let generation = self.inner.generation.load(Ordering::SeqCst);
            accepted = Some((s.query.clone(), s.display_limit, generation, run));
            s.execution_status = ExecutionStatus::Loading;
            s.execution_error = None;
            s.execution_results = None;
            s.total_row_count = None;
            true
        });
        if let Some(refusal) = refusal {
            return Err(refusal);
        }
        let Some((snapshot, display_limit, generation, run)) = accepted else {
            return Ok(());
        };

        let wire = normalize_query(&snapshot);
        let page_limit = snapshot.limit.map_or(display_limit, |l| l.min(display_limit));
        let limited = wire.clone().with_limit(Some(page_limit));
        let counting = wire.with_limit(None);
        tracing::debug!(generation, run, page_limit, "executing query");

        let client = self.client();
        let outcome =
            futures::future::try_join(client.load(&limited), client.load(&counting)).await;

        let committed = self.inner.state.send_if_modified(|s| {
            if !self.is_current(generation, &snapshot, s)
                || self.inner.run_generation.load(Ordering::SeqCst) != run
            {
                return false;
            }
            match outcome {
                Ok((page, all)) => {
                    s.execution_status = ExecutionStatus::Success;
                    s.total_row_count = Some(all.row_count());
                    s.execution_results = Some(page);
                    s.execution_error = None;
                }
                Err(e) => {
                    let message = BuilderError::Execution(e).to_string();
                    tracing::warn!(error = %message, "query execution failed");
                    s.execution_status = ExecutionStatus::Error;
                    s.execution_results = None;
                    s.total_row_count = None;
                    s.execution_error = Some(message);
                }
            }
            true
        });
        if !committed {
            tracing::debug!(generation, run, "discarding stale execution result");
        }
        Ok(())
    }

    /// Change the number of displayed rows. A successful result is refreshed
    /// with the new limit.
    pub async fn set_display_limit(&self, limit: u64) -> BuilderResult<()> {
        let mut rerun = false;
        self.inner.state.send_if_modified(|s| {
            if s.display_limit == limit {
                return false;
            }
            s.display_limit = limit;
            rerun = s.execution_status == ExecutionStatus::Success;
            true
        });
        if rerun {
            self.execute().await
        } else {
            Ok(())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn cancel_if_waiting(pending: PendingValidation) {
    if !pending.started.load(Ordering::SeqCst) {
        pending.handle.abort();
    }
}
