//! Aggregate fetch policy: every tunable of the call path in one place.

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::gate::DEFAULT_GATE_CAPACITY;
use crate::retry::RetryConfig;

/// Configuration for a [`FetchOrchestrator`].
///
/// Cache TTL is deliberately absent: it belongs to the call site and is
/// passed to every `execute` call.
///
/// [`FetchOrchestrator`]: crate::orchestrator::FetchOrchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    /// Maximum simultaneous in-flight upstream calls.
    pub gate_capacity: usize,
    /// Retry budget and backoff between attempts.
    pub retry: RetryConfig,
    /// Per-target circuit breaker thresholds.
    pub breaker: CircuitBreakerConfig,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            gate_capacity: DEFAULT_GATE_CAPACITY,
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl FetchPolicy {
    pub fn with_gate_capacity(mut self, capacity: usize) -> Self {
        self.gate_capacity = capacity;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }
}
