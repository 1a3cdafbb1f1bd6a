//! Fetch orchestrator: the single call path fronting the upstream provider.
//!
//! `execute` owns the cache-check → gate-acquire → breaker(retry(call)) →
//! cache-populate sequence and translates every failure into a typed
//! [`FetchError`] at the boundary. Policies compose as plain functions: the
//! breaker wraps the retry runner, which wraps the raw call, so each layer is
//! independently testable with a fake inner call.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::cache::CacheStore;
use crate::cancel::CancelToken;
use crate::circuit_breaker::BreakerRegistry;
use crate::gate::ConcurrencyGate;
use crate::outcome::{FetchError, FetchOutcome};
use crate::policy::FetchPolicy;
use crate::retry::{run_with_retry, RetryConfig};
use crate::upstream::{RawResponse, TransportError};

/// Resilient fetch front for one upstream provider.
///
/// Cache, gate, and breaker state are explicit injected instances scoped to
/// this orchestrator; sharing happens by cloning handles, not through hidden
/// globals.
#[derive(Debug)]
pub struct FetchOrchestrator {
    cache: CacheStore,
    gate: ConcurrencyGate,
    breakers: BreakerRegistry,
    retry: RetryConfig,
}

impl FetchOrchestrator {
    pub fn new(policy: FetchPolicy) -> Self {
        Self {
            cache: CacheStore::new(),
            gate: ConcurrencyGate::new(policy.gate_capacity),
            breakers: BreakerRegistry::new(policy.breaker),
            retry: policy.retry,
        }
    }

    /// Build from pre-constructed components, for sharing a cache or gate
    /// across orchestrators.
    pub fn with_components(
        cache: CacheStore,
        gate: ConcurrencyGate,
        breakers: BreakerRegistry,
        retry: RetryConfig,
    ) -> Self {
        Self {
            cache,
            gate,
            breakers,
            retry,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Execute one resilient fetch.
    ///
    /// * `cache_key` — opaque key for the TTL cache.
    /// * `ttl` — how long a fetched body stays servable from cache.
    /// * `target` — upstream target identifier; keys the circuit breaker.
    /// * `call` — the raw upstream operation, re-invoked per retry attempt.
    /// * `token` — cooperative cancellation signal, honored at every
    ///   suspension point.
    ///
    /// A cache hit returns without touching the gate or the upstream. On a
    /// miss the call runs under a gate permit, wrapped by the breaker and the
    /// retry policy; a validated body is cached for `ttl`. Concurrent misses
    /// for the same key are not coalesced: each issues its own upstream call
    /// and the last writer's TTL wins.
    pub async fn execute<T, F, Fut>(
        &self,
        cache_key: &str,
        ttl: Duration,
        target: &str,
        mut call: F,
        token: &CancelToken,
    ) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawResponse, TransportError>>,
    {
        if let Some(body) = self.cache.get(cache_key).await {
            debug!(key = cache_key, "cache hit");
            return decode_payload(&body);
        }
        debug!(key = cache_key, "cache miss");

        // Held for the rest of the call; drop releases it on every exit path.
        let _permit = self.gate.acquire(token).await?;

        let breaker = self.breakers.breaker(target);
        if !breaker.allow_request() {
            warn!(upstream = target, "circuit open, rejecting without upstream call");
            return Err(FetchError::BreakerOpen {
                target: target.to_string(),
            });
        }

        match run_with_retry(&self.retry, token, &mut call).await {
            Ok(response) => match decode_payload::<T>(&response.body) {
                Ok(value) => {
                    breaker.record_success();
                    self.cache
                        .put(cache_key.to_string(), response.body, ttl)
                        .await;
                    Ok(value)
                }
                Err(payload_error) => {
                    // 2xx with an unusable body is a contract violation, not
                    // a transient fault: no retry, no cache, no breaker hit.
                    error!(
                        upstream = target,
                        key = cache_key,
                        error = %payload_error,
                        "fetch failed"
                    );
                    Err(payload_error)
                }
            },
            Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
            Err(failure) => {
                if failure.retryable() {
                    breaker.record_failure();
                }
                error!(
                    upstream = target,
                    key = cache_key,
                    code = failure.code(),
                    error = %failure,
                    "fetch failed"
                );
                Err(failure)
            }
        }
    }
}

impl Default for FetchOrchestrator {
    fn default() -> Self {
        Self::new(FetchPolicy::default())
    }
}

fn decode_payload<T: DeserializeOwned>(body: &str) -> FetchOutcome<T> {
    if body.trim().is_empty() {
        return Err(FetchError::payload_invalid("upstream returned an empty body"));
    }
    serde_json::from_str(body).map_err(|e| FetchError::payload_invalid(e.to_string()))
}
