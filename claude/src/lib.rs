//! Minimal Anthropic Claude API client.
//!
//! Built for one-shot structured decisions: a single user turn goes out with
//! a forced tool, and the tool input comes back. Transient failures are
//! retried with backoff.

mod retry;
mod types;

pub use retry::{is_retryable, RetryPolicy};
pub use types::{
    ContentBlock, Message, Request, Response, Role, StopReason, Tool, ToolChoice, Usage,
};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug, Error)]
pub enum Error {
    #[error("ANTHROPIC_API_KEY is not set")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether sending the same request again might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout => true,
            Error::Api { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(e.to_string())
        }
    }
}

/// Claude API client. Cheap to clone.
#[derive(Clone)]
pub struct Claude {
    http: reqwest::Client,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl Claude {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: http_client(Duration::from_secs(120)),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Read the key from `ANTHROPIC_API_KEY`. An optional `ANTHROPIC_MODEL`
    /// overrides the default model.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::NoApiKey)?;
        let client = Self::new(api_key);
        Ok(match std::env::var("ANTHROPIC_MODEL") {
            Ok(model) if !model.trim().is_empty() => client.with_model(model),
            _ => client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Per-attempt HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `request`, retrying transient failures per the client's policy.
    pub async fn complete(&self, mut request: Request) -> Result<Response, Error> {
        if request.model.is_none() {
            request.model = Some(self.model.clone());
        }
        let headers = self.headers()?;

        let mut attempt = 0;
        loop {
            let (error, retry_headers) = match self.send_once(&request, &headers).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };
            if attempt >= self.retry.max_retries || !error.is_transient() {
                return Err(error);
            }
            let delay = self.retry.delay(attempt, retry_headers.as_ref());
            warn!(
                error = %error,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying Claude request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        request: &Request,
        headers: &HeaderMap,
    ) -> Result<Response, (Error, Option<HeaderMap>)> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .headers(headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| (Error::from(e), None))?;

        let status = response.status();
        if !status.is_success() {
            let retry_headers = response.headers().clone();
            let message = response.text().await.unwrap_or_default();
            return Err((
                Error::Api {
                    status: status.as_u16(),
                    message,
                },
                Some(retry_headers),
            ));
        }

        response
            .json::<Response>()
            .await
            .map_err(|e| (Error::Parse(e.to_string()), None))
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}
