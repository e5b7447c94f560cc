use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

use crate::cache::token::Credential;
use crate::cache::token_manager::TokenManager;
use crate::config::upstream::UpstreamConfig;
use crate::error::{FacadeError, FacadeResult};
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::{RetrySettings, RetryState};

const RATE_LIMITED_MSG: &str = "rate_limited";
const NETWORK_MSG: &str = "network";
const UNAUTHORIZED_MSG: &str = "unauthorized";

/// A single call against the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// absolute path below the configured base URL, e.g. `/utility/serviceTypes`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Upstream answer with its parsed body.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Outcome of one HTTP exchange, classified for the retry loop.
enum Attempt {
    Success(UpstreamResponse),
    RateLimited(HeaderMap),
    Unauthorized,
    Rejected(UpstreamResponse),
    Network(reqwest::Error),
}

/// Executes upstream calls, absorbing rate limiting, network failures and
/// one credential expiry per call.
pub struct Dispatcher {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    retry: RetrySettings,
}

impl Dispatcher {
    pub fn new(client: Client, upstream: &UpstreamConfig, tokens: Arc<TokenManager>, retry: RetrySettings) -> Self {
        Self {
            client,
            base_url: upstream.base_url.trim_end_matches('/').to_owned(),
            tokens,
            retry,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn dispatch(&self, request: &UpstreamRequest) -> FacadeResult<UpstreamResponse> {
        let metrics = get_metrics().await;
        let start = Instant::now();
        let method = request.method.as_str();

        let result = self.run(request).await;

        metrics
            .upstream_duration
            .with_label_values(&[method])
            .observe(start.elapsed().as_secs_f64());
        metrics
            .upstream_requests
            .with_label_values(&[method, outcome_label(&result)])
            .inc();
        result
    }

    async fn run(&self, request: &UpstreamRequest) -> FacadeResult<UpstreamResponse> {
        let metrics = get_metrics().await;
        let mut state = RetryState::default();
        let mut credential = self.tokens.get_token().await?;

        loop {
            match self.attempt(request, &credential).await {
                Attempt::Success(response) => return Ok(response),
                Attempt::Rejected(response) => {
                    debug!(path = %request.path, status = %response.status, "upstream rejected request");
                    return Err(FacadeError::Upstream { status: response.status, body: response.body });
                }
                Attempt::Unauthorized => {
                    if state.token_refreshed {
                        return Err(FacadeError::Authentication(
                            "upstream rejected a freshly issued credential".to_owned(),
                        ));
                    }
                    state.token_refreshed = true;
                    metrics.upstream_retries.with_label_values(&[UNAUTHORIZED_MSG]).inc();
                    warn!(path = %request.path, "token expired, refreshing and retrying");
                    self.tokens.invalidate_rejected(&credential).await;
                    credential = self.tokens.get_token().await?;
                }
                Attempt::RateLimited(headers) => {
                    let failed = state.record_transient("rate limited (429)".to_owned());
                    let Some(wait) = self.retry.rate_limit_wait(&headers, failed) else {
                        warn!(path = %request.path, "upstream Retry-After exceeds the allowed wait");
                        return Err(FacadeError::RetryExhausted {
                            attempts: state.attempt,
                            last_failure: format!(
                                "rate limited (429), Retry-After beyond {}s",
                                self.retry.max_retry_after_seconds
                            ),
                        });
                    };
                    metrics.upstream_retries.with_label_values(&[RATE_LIMITED_MSG]).inc();
                    self.wait_or_exhaust(request, &state, wait).await?;
                }
                Attempt::Network(err) => {
                    let failed = state.record_transient(err.to_string());
                    let wait = self.retry.backoff(failed);
                    metrics.upstream_retries.with_label_values(&[NETWORK_MSG]).inc();
                    self.wait_or_exhaust(request, &state, wait).await?;
                }
            }
        }
    }

    async fn wait_or_exhaust(&self, request: &UpstreamRequest, state: &RetryState, wait: Duration) -> FacadeResult<()> {
        let last_failure = state.last_failure.clone().unwrap_or_default();
        if state.attempt >= self.retry.attempts {
            warn!(path = %request.path, attempts = state.attempt, last_failure = %last_failure, "max retries reached");
            return Err(FacadeError::RetryExhausted { attempts: state.attempt, last_failure });
        }

        warn!(
            path = %request.path,
            attempt = state.attempt,
            wait_ms = wait.as_millis() as u64,
            failure = %last_failure,
            "transient upstream failure, retrying"
        );
        sleep(wait).await;
        Ok(())
    }

    async fn attempt(&self, request: &UpstreamRequest, credential: &Credential) -> Attempt {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, credential.bearer());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return Attempt::Network(err),
        };

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => return Attempt::RateLimited(response.headers().clone()),
            StatusCode::UNAUTHORIZED => return Attempt::Unauthorized,
            _ => {}
        }

        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(text) => parse_body(&text),
            Err(err) => return Attempt::Network(err),
        };
        let response = UpstreamResponse { status, headers, body };

        if status.is_success() {
            Attempt::Success(response)
        } else {
            Attempt::Rejected(response)
        }
    }
}

/// JSON when possible; empty body is `null`, anything else a JSON string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

fn outcome_label(result: &FacadeResult<UpstreamResponse>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(FacadeError::Authentication(_)) => "auth_failure",
        Err(FacadeError::RetryExhausted { .. }) => "retry_exhausted",
        Err(FacadeError::Upstream { .. }) => "upstream_error",
        Err(_) => "error",
    }
}
