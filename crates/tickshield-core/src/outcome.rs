//! Typed fetch outcomes returned at the orchestrator boundary.
//!
//! Every failure the core can produce is data, not stack unwinding: transport
//! faults, upstream status codes, undecodable payloads, breaker rejections,
//! and cooperative cancellation each map to one [`FetchError`] variant. No
//! transport or decoding error crosses the module boundary raw.

use thiserror::Error;

/// Failure classification used by callers to branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    UpstreamStatus,
    PayloadInvalid,
    BreakerOpen,
    Cancelled,
}

/// Structured failure returned by [`FetchOrchestrator::execute`].
///
/// [`FetchOrchestrator::execute`]: crate::orchestrator::FetchOrchestrator::execute
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network-level failure before a status code was observed.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// Upstream answered with a non-success status code.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, retryable: bool },

    /// Upstream answered 2xx but the body was empty or undecodable.
    #[error("invalid upstream payload: {message}")]
    PayloadInvalid { message: String },

    /// The circuit for this target is open; upstream was not contacted.
    #[error("circuit open for target '{target}'")]
    BreakerOpen { target: String },

    /// The caller's cancellation signal fired. Not a failure category:
    /// never retried and never counted toward the breaker.
    #[error("fetch cancelled by caller")]
    Cancelled,
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn payload_invalid(message: impl Into<String>) -> Self {
        Self::PayloadInvalid {
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Transport { .. } => FetchErrorKind::Transport,
            Self::UpstreamStatus { .. } => FetchErrorKind::UpstreamStatus,
            Self::PayloadInvalid { .. } => FetchErrorKind::PayloadInvalid,
            Self::BreakerOpen { .. } => FetchErrorKind::BreakerOpen,
            Self::Cancelled => FetchErrorKind::Cancelled,
        }
    }

    /// Whether the retry policy may re-issue the call for this failure.
    ///
    /// This is also the "qualifying" class for breaker accounting: only
    /// retryable failures count toward the open threshold.
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::UpstreamStatus { retryable, .. } => *retryable,
            Self::PayloadInvalid { .. } | Self::BreakerOpen { .. } | Self::Cancelled => false,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "fetch.transport",
            Self::UpstreamStatus { .. } => "fetch.upstream_status",
            Self::PayloadInvalid { .. } => "fetch.payload_invalid",
            Self::BreakerOpen { .. } => "fetch.breaker_open",
            Self::Cancelled => "fetch.cancelled",
        }
    }
}

/// Result alias returned to callers of the orchestrator.
pub type FetchOutcome<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable_and_qualifying() {
        let error = FetchError::UpstreamStatus {
            status: 503,
            retryable: true,
        };

        assert_eq!(error.kind(), FetchErrorKind::UpstreamStatus);
        assert!(error.retryable());
        assert_eq!(error.code(), "fetch.upstream_status");
    }

    #[test]
    fn payload_and_cancellation_never_qualify() {
        assert!(!FetchError::payload_invalid("empty body").retryable());
        assert!(!FetchError::Cancelled.retryable());
        assert!(!FetchError::BreakerOpen {
            target: String::from("quote"),
        }
        .retryable());
    }

    #[test]
    fn display_includes_status_code() {
        let error = FetchError::UpstreamStatus {
            status: 404,
            retryable: false,
        };

        assert_eq!(error.to_string(), "upstream returned status 404");
    }
}
