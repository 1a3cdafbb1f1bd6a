//! # Tickshield Core
//!
//! Resilient fetch core fronting an unreliable third-party market-data HTTP
//! provider.
//!
//! ## Overview
//!
//! Every upstream read goes through one call path that composes:
//!
//! - **TTL cache** with lazy check-on-read expiry
//! - **Bounded-concurrency gate** over in-flight upstream calls
//! - **Exponential-backoff retry** with jitter and transient classification
//! - **Per-target circuit breaker** that fails fast during cooldown
//!
//! Callers supply the upstream call and get back a typed payload or a typed
//! failure; no transport or decoding error escapes the core, and cooperative
//! cancellation surfaces as its own outcome category.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL cache for validated response bodies |
//! | [`cancel`] | Cooperative cancellation token |
//! | [`circuit_breaker`] | Per-target circuit breaker and registry |
//! | [`gate`] | Bounded-concurrency admission gate |
//! | [`orchestrator`] | The composed fetch call path |
//! | [`outcome`] | Typed failure taxonomy |
//! | [`policy`] | Aggregate fetch policy |
//! | [`retry`] | Backoff strategy and retry runner |
//! | [`upstream`] | Upstream call contract and transports |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tickshield_core::{
//!     CancelToken, FetchOrchestrator, FetchPolicy, ReqwestUpstream, UpstreamCall,
//! };
//!
//! #[derive(serde::Deserialize)]
//! struct Quote {
//!     price: f64,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = FetchOrchestrator::new(FetchPolicy::default());
//!     let upstream = ReqwestUpstream::new();
//!     let token = CancelToken::new();
//!
//!     let url = "https://provider.test/v1/quote/AAPL";
//!     let quote: Quote = orchestrator
//!         .execute(
//!             "quote:AAPL",
//!             Duration::from_secs(30),
//!             "quote",
//!             || upstream.call(url, &token),
//!             &token,
//!         )
//!         .await
//!         .expect("fetch succeeds");
//!
//!     println!("AAPL price: ${:.2}", quote.price);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Caller         │
//! └────────┬────────┘
//!          │ execute(key, ttl, target, call, token)
//!          ▼
//! ┌─────────────────┐  hit   ┌──────────────────┐
//! │  Cache Store    │───────▶│ decode → return  │
//! └────────┬────────┘        └──────────────────┘
//!          │ miss
//!          ▼
//! ┌─────────────────┐        ┌──────────────────┐
//! │ Concurrency Gate│───────▶│ Circuit Breaker  │
//! └─────────────────┘        └────────┬─────────┘
//!                                     │
//!                                     ▼
//!                            ┌──────────────────┐
//!                            │ Retry Runner     │
//!                            │ (raw call inside)│
//!                            └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! All failures are data at the boundary:
//!
//! ```rust
//! use tickshield_core::{FetchError, FetchErrorKind};
//!
//! fn handle_error(error: FetchError) {
//!     match error.kind() {
//!         FetchErrorKind::BreakerOpen => {
//!             // Upstream is down; serve degraded data
//!         }
//!         FetchErrorKind::Cancelled => {
//!             // Caller gave up; unwind quietly
//!         }
//!         _ => {
//!             // Surface a user-facing error
//!         }
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The core emits `tracing` events: cache hit/miss (`debug`), each retry
//! attempt with its computed delay (`warn`), circuit transitions
//! (`info`/`warn`), and terminal failures (`error`). Install any
//! `tracing` subscriber to consume them.

pub mod cache;
pub mod cancel;
pub mod circuit_breaker;
pub mod gate;
pub mod orchestrator;
pub mod outcome;
pub mod policy;
pub mod retry;
pub mod upstream;

// Re-export commonly used types at crate root for convenience

pub use cache::CacheStore;
pub use cancel::CancelToken;
pub use circuit_breaker::{BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use gate::{ConcurrencyGate, GatePermit, DEFAULT_GATE_CAPACITY};
pub use orchestrator::FetchOrchestrator;
pub use outcome::{FetchError, FetchErrorKind, FetchOutcome};
pub use policy::FetchPolicy;
pub use retry::{run_with_retry, transient_status, Backoff, RetryConfig};
pub use upstream::{
    NoopUpstream, RawResponse, ReqwestUpstream, TransportError, TransportErrorKind, UpstreamCall,
};
