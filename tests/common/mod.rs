// tests/common/mod.rs
//! In-memory semantic layer used by the builder tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map};

use cubeq::client::{ClientError, ClientResult, CubeApi, DryRunResponse, DryRunSql, ResultSet};
use cubeq::query::WireQuery;
use cubeq::schema::SchemaDescription;

type DryRunFn = Box<dyn Fn(&WireQuery) -> DryRunResponse + Send + Sync>;

/// Mock API with configurable responses, delays and call recording.
pub struct MockCubeApi {
    schema: Option<SchemaDescription>,
    meta_delay: Duration,
    dry_run: DryRunFn,
    dry_run_delay: Duration,
    total_rows: usize,
    load_delay: Duration,
    fail_unlimited_load: bool,

    pub meta_calls: AtomicUsize,
    pub dry_run_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
    pub dry_run_queries: Mutex<Vec<WireQuery>>,
    pub load_queries: Mutex<Vec<WireQuery>>,
}

impl MockCubeApi {
    pub fn new() -> Self {
        Self {
            schema: Some(sample_schema()),
            meta_delay: Duration::ZERO,
            dry_run: Box::new(|_| valid_dry_run()),
            dry_run_delay: Duration::ZERO,
            total_rows: 0,
            load_delay: Duration::ZERO,
            fail_unlimited_load: false,
            meta_calls: AtomicUsize::new(0),
            dry_run_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            dry_run_queries: Mutex::new(Vec::new()),
            load_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_schema(mut self, schema: Option<SchemaDescription>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_meta_delay(mut self, delay: Duration) -> Self {
        self.meta_delay = delay;
        self
    }

    pub fn with_dry_run<F>(mut self, respond: F) -> Self
    where
        F: Fn(&WireQuery) -> DryRunResponse + Send + Sync + 'static,
    {
        self.dry_run = Box::new(respond);
        self
    }

    pub fn with_dry_run_delay(mut self, delay: Duration) -> Self {
        self.dry_run_delay = delay;
        self
    }

    pub fn with_rows(mut self, total_rows: usize) -> Self {
        self.total_rows = total_rows;
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Make the load without a limit (the counting load) fail.
    pub fn failing_unlimited_load(mut self) -> Self {
        self.fail_unlimited_load = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn dry_runs(&self) -> usize {
        self.dry_run_calls.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn metas(&self) -> usize {
        self.meta_calls.load(Ordering::SeqCst)
    }

    pub fn last_dry_run(&self) -> Option<WireQuery> {
        self.dry_run_queries.lock().unwrap().last().cloned()
    }

    pub fn load_limits(&self) -> Vec<Option<u64>> {
        self.load_queries
            .lock()
            .unwrap()
            .iter()
            .map(|q| q.limit)
            .collect()
    }
}

#[async_trait]
impl CubeApi for MockCubeApi {
    async fn meta(&self) -> ClientResult<SchemaDescription> {
        self.meta_calls.fetch_add(1, Ordering::SeqCst);
        if !self.meta_delay.is_zero() {
            tokio::time::sleep(self.meta_delay).await;
        }
        self.schema
            .clone()
            .ok_or_else(|| ClientError::Remote("meta unavailable".to_string()))
    }

    async fn dry_run(&self, query: &WireQuery) -> ClientResult<DryRunResponse> {
        self.dry_run_calls.fetch_add(1, Ordering::SeqCst);
        self.dry_run_queries.lock().unwrap().push(query.clone());
        if !self.dry_run_delay.is_zero() {
            tokio::time::sleep(self.dry_run_delay).await;
        }
        Ok((self.dry_run)(query))
    }

    async fn load(&self, query: &WireQuery) -> ClientResult<ResultSet> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.load_queries.lock().unwrap().push(query.clone());
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail_unlimited_load && query.limit.is_none() {
            return Err(ClientError::Remote("count query timed out".to_string()));
        }
        let count = match query.limit {
            Some(limit) => self.total_rows.min(limit as usize),
            None => self.total_rows,
        };
        Ok(ResultSet::new((0..count).map(row).collect()))
    }
}

fn row(index: usize) -> Map<String, serde_json::Value> {
    let mut row = Map::new();
    row.insert("Orders.count".to_string(), json!(index.to_string()));
    row
}

pub fn valid_dry_run() -> DryRunResponse {
    DryRunResponse {
        query_type: Some("regularQuery".to_string()),
        sql: Some(DryRunSql {
            sql: vec!["SELECT count(*) FROM orders".to_string()],
            params: Vec::new(),
        }),
        ..DryRunResponse::default()
    }
}

pub fn failed_dry_run(message: &str) -> DryRunResponse {
    DryRunResponse {
        error: Some(message.to_string()),
        ..DryRunResponse::default()
    }
}

/// Orders and Users cubes with one member of every field type.
pub fn sample_schema() -> SchemaDescription {
    serde_json::from_value(json!({
        "cubes": [
            {
                "name": "Orders",
                "title": "Orders",
                "measures": [
                    {"name": "Orders.count", "title": "Orders Count", "type": "count"},
                    {"name": "Orders.total", "title": "Orders Total", "type": "sum"}
                ],
                "dimensions": [
                    {"name": "Orders.status", "title": "Orders Status", "type": "string"},
                    {"name": "Orders.amount", "title": "Orders Amount", "type": "number"},
                    {"name": "Orders.createdAt", "title": "Orders Created At", "type": "time"},
                    {"name": "Orders.isPaid", "title": "Orders Is Paid", "type": "boolean"}
                ],
                "segments": [
                    {"name": "Orders.completed", "title": "Completed"}
                ]
            },
            {
                "name": "Users",
                "measures": [
                    {"name": "Users.count", "type": "count"}
                ],
                "dimensions": [
                    {"name": "Users.city", "type": "string"}
                ]
            }
        ]
    }))
    .unwrap()
}
