//! REST transport for the semantic layer API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::{ClientError, ClientResult};
use super::{CubeApi, DryRunResponse, ResultSet};
use crate::config::ApiSettings;
use crate::query::WireQuery;
use crate::schema::SchemaDescription;

/// Error text the API uses while a query is still being computed.
const CONTINUE_WAIT: &str = "Continue wait";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a WireQuery,
}

/// HTTP client for the `/meta`, `/dry-run` and `/load` endpoints.
///
/// # Example
///
/// ```ignore
/// use cubeq::client::{CubeApi, HttpCubeClient};
/// use cubeq::config::Settings;
///
/// let settings = Settings::load()?;
/// let client = HttpCubeClient::new(&settings.api)?;
/// let schema = client.meta().await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpCubeClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    continue_wait_attempts: u32,
    continue_wait_interval: Duration,
}

impl HttpCubeClient {
    /// Build a client from API settings.
    ///
    /// The token is resolved (environment variables expanded) here, so a
    /// missing variable surfaces before any request is made.
    pub fn new(settings: &ApiSettings) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        let token = settings
            .resolved_token()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            token,
            continue_wait_attempts: settings.continue_wait_attempts.max(1),
            continue_wait_interval: Duration::from_millis(settings.continue_wait_interval_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut builder = self
            .client
            .request(method, url)
            .header("x-request-id", uuid::Uuid::new_v4().to_string());
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, token);
        }
        builder
    }

    /// Send a request and return the parsed JSON body.
    ///
    /// Error statuses with a `{"error": "..."}` body become
    /// [`ClientError::Remote`].
    async fn send(&self, builder: RequestBuilder) -> ClientResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Some(message) = error_message(&text) {
                return Err(ClientError::Remote(message));
            }
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        serde_json::from_str(&text).map_err(ClientError::Deserialize)
    }

    fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
        serde_json::from_value(value).map_err(ClientError::Deserialize)
    }
}

#[async_trait]
impl CubeApi for HttpCubeClient {
    async fn meta(&self) -> ClientResult<SchemaDescription> {
        tracing::debug!(url = %self.base_url, "fetching meta");
        let value = self.send(self.request(Method::GET, "meta")).await?;
        Self::decode(value)
    }

    async fn dry_run(&self, query: &WireQuery) -> ClientResult<DryRunResponse> {
        let builder = self
            .request(Method::POST, "dry-run")
            .json(&QueryBody { query });
        match self.send(builder).await {
            Ok(value) => Self::decode(value),
            // A compile error is a dry-run outcome, not a transport failure.
            Err(ClientError::Remote(message)) => Ok(DryRunResponse {
                error: Some(message),
                ..Default::default()
            }),
            Err(e) => Err(e),
        }
    }

    async fn load(&self, query: &WireQuery) -> ClientResult<ResultSet> {
        let attempts = self.continue_wait_attempts;
        for attempt in 1..=attempts {
            let builder = self.request(Method::POST, "load").json(&QueryBody { query });
            match load_step(self.send(builder).await, attempt, attempts) {
                LoadStep::Done(value) => return Self::decode(value),
                LoadStep::Failed(e) => return Err(e),
                LoadStep::Wait => {
                    tracing::debug!(attempt, "load not ready, waiting");
                    tokio::time::sleep(self.continue_wait_interval).await;
                }
            }
        }
        Err(ClientError::ContinueWaitExhausted(attempts))
    }
}

/// What to do with one `/load` response.
#[derive(Debug)]
enum LoadStep {
    Done(Value),
    Wait,
    Failed(ClientError),
}

/// Classify a `/load` response.
///
/// "Continue wait" answers are polled again. Retriable failures are retried
/// while attempts remain; the last one is returned as is.
fn load_step(result: ClientResult<Value>, attempt: u32, attempts: u32) -> LoadStep {
    match result {
        Err(ClientError::Remote(message)) if message == CONTINUE_WAIT => LoadStep::Wait,
        Err(e) if e.is_retriable() && attempt < attempts => {
            tracing::warn!(attempt, error = %e, "load failed, retrying");
            LoadStep::Wait
        }
        Err(e) => LoadStep::Failed(e),
        Ok(value) => match value.get("error").and_then(Value::as_str) {
            Some(CONTINUE_WAIT) => LoadStep::Wait,
            Some(message) => LoadStep::Failed(ClientError::Remote(message.to_string())),
            None => LoadStep::Done(value),
        },
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
