//! Upstream call contract and transports.
//!
//! The orchestrator is generic over the upstream operation: anything that can
//! turn a target identifier into a raw status-plus-body response. Production
//! callers hand it [`ReqwestUpstream`]; offline tests use [`NoopUpstream`] or
//! an ad-hoc closure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cancel::CancelToken;

/// Raw upstream response before payload decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Where in the transport a call failed. All kinds belong to the transient
/// failure class for retry and breaker purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Io,
}

/// Network-level failure raised before an HTTP status was observed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connect,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Io,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Async upstream operation contract.
///
/// `target` is an opaque resource identifier owned by the caller (for
/// [`ReqwestUpstream`] it is the request URL). Implementations should honor
/// the token where they can; the retry layer additionally races every call
/// against it, so a cancelled fetch never reaches failure accounting.
pub trait UpstreamCall: Send + Sync {
    fn call<'a>(
        &'a self,
        target: &'a str,
        token: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;
}

/// Deterministic offline transport: always 200 with an empty JSON object.
#[derive(Debug, Default)]
pub struct NoopUpstream;

impl UpstreamCall for NoopUpstream {
    fn call<'a>(
        &'a self,
        target: &'a str,
        token: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        let _ = (target, token);
        Box::pin(async move { Ok(RawResponse::ok_json("{}")) })
    }
}

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: Arc<reqwest::Client>,
    timeout: Duration,
}

impl ReqwestUpstream {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(3))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent("tickshield/0.1.0")
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
            timeout,
        }
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client: Arc::new(client),
            timeout,
        }
    }
}

impl Default for ReqwestUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamCall for ReqwestUpstream {
    fn call<'a>(
        &'a self,
        target: &'a str,
        token: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.client.get(target).timeout(self.timeout);

            let send = async move {
                let response = request.send().await.map_err(|e| {
                    if e.is_timeout() {
                        TransportError::timeout(format!("request timeout: {e}"))
                    } else if e.is_connect() {
                        TransportError::connect(format!("connection failed: {e}"))
                    } else {
                        TransportError::io(format!("request failed: {e}"))
                    }
                })?;

                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .map_err(|e| TransportError::io(format!("failed to read response body: {e}")))?;

                Ok(RawResponse { status, body })
            };

            tokio::select! {
                _ = token.cancelled() => Err(TransportError::io("request abandoned by caller")),
                result = send => result,
            }
        })
    }
}
