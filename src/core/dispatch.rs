//! One logical request to the generation endpoint, retried on rate limiting.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::core::retry::{
    retry_with_backoff, RetryError, RetryPolicy, Retryable, Sleeper, TokioSleeper,
};

pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a JSON POST and returns whatever the server answered. Only failures
/// to complete the exchange (connect, timeout, unreadable body) are errors;
/// non-2xx statuses are returned as replies.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, String>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, String> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("Request timeout: {}", e.without_url())
                } else if e.is_connect() {
                    format!("Connection failed: {}", e.without_url())
                } else {
                    format!("Request failed: {}", e.without_url())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e.without_url()))?;
        Ok(HttpReply { status, body })
    }
}

/// Why a dispatch did not produce a decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// HTTP 429. Retried inside the dispatcher and only seen by callers
    /// wrapped in [`DispatchError::ExhaustedRetries`].
    RateLimited { body: String },
    /// Any other non-2xx status. Never retried.
    Http { status: u16, body: String },
    /// The attempt budget ran out; `last` describes the final failure.
    ExhaustedRetries { attempts: u32, last: Box<DispatchError> },
    /// The exchange itself failed before a status was received.
    Transport(String),
    /// 2xx with a body that is not JSON.
    Decode(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RateLimited { .. } => write!(f, "Rate limit exceeded"),
            DispatchError::Http { status, body } => {
                write!(f, "HTTP error! status: {status} - {}", body.trim())
            }
            DispatchError::ExhaustedRetries { attempts, last } => {
                write!(f, "Gave up after {attempts} attempts: {last}")
            }
            DispatchError::Transport(message) => write!(f, "{message}"),
            DispatchError::Decode(message) => write!(f, "Failed to parse response: {message}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl Retryable for DispatchError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::RateLimited { .. } | DispatchError::Transport(_)
        )
    }
}

impl From<RetryError<DispatchError>> for DispatchError {
    fn from(err: RetryError<DispatchError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => DispatchError::ExhaustedRetries {
                attempts,
                last: Box::new(last),
            },
            RetryError::Aborted(err) => err,
        }
    }
}

/// Maps a finished exchange onto success or a classified failure.
pub fn classify_reply(reply: HttpReply) -> Result<Value, DispatchError> {
    if reply.status == STATUS_TOO_MANY_REQUESTS {
        return Err(DispatchError::RateLimited { body: reply.body });
    }
    if !reply.is_success() {
        return Err(DispatchError::Http {
            status: reply.status,
            body: reply.body,
        });
    }
    serde_json::from_str(&reply.body).map_err(|e| DispatchError::Decode(e.to_string()))
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Dispatcher backed by reqwest and the tokio timer.
    pub fn http(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self::new(
            Arc::new(ReqwestTransport::new(client)),
            Arc::new(TokioSleeper),
            policy,
        )
    }

    pub async fn dispatch(&self, url: &str, payload: &Value) -> Result<Value, DispatchError> {
        let transport = self.transport.as_ref();
        let result = retry_with_backoff(&self.policy, self.sleeper.as_ref(), |attempt| async move {
            debug!(attempt, "sending generation request");
            let reply = transport
                .post_json(url, payload)
                .await
                .map_err(DispatchError::Transport)?;
            classify_reply(reply)
        })
        .await;
        result.map_err(DispatchError::from)
    }
}
