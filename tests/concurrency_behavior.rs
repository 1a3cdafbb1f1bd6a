//! Behavior-driven tests for shared-state safety under concurrent callers.
//!
//! These tests hammer the orchestrator from many tasks at once and verify the
//! gate bound, permit accounting under cancellation, and the documented
//! duplicate-fetch behavior for concurrent same-key misses.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tickshield_core::{
    CancelToken, FetchError, FetchOrchestrator, FetchPolicy, RawResponse, RetryConfig,
};

const TTL: Duration = Duration::from_secs(60);

// =============================================================================
// Gate bound under burst
// =============================================================================

#[tokio::test]
async fn gate_never_exceeds_capacity_under_a_burst_of_callers() {
    // Given: a gate of capacity 3 and a slow upstream
    let policy = FetchPolicy::default()
        .with_gate_capacity(3)
        .with_retry(RetryConfig::no_retry());
    let orchestrator = Arc::new(FetchOrchestrator::new(policy));

    let in_flight = Arc::new(AtomicU32::new(0));
    let max_in_flight = Arc::new(AtomicU32::new(0));

    // When: twenty callers fetch distinct keys at once
    let mut handles = Vec::new();
    for i in 0..20 {
        let orchestrator = Arc::clone(&orchestrator);
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        handles.push(tokio::spawn(async move {
            let token = CancelToken::new();
            let upstream = move || {
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(RawResponse::ok_json(r#"{"price":1.0}"#))
                }
            };
            orchestrator
                .execute::<Value, _, _>(&format!("quote:{i}"), TTL, "quote", upstream, &token)
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("caller task should not panic")
            .expect("every fetch succeeds");
    }

    // Then: the in-flight count never passed the gate capacity
    assert!(
        max_in_flight.load(Ordering::SeqCst) <= 3,
        "observed {} simultaneous upstream calls",
        max_in_flight.load(Ordering::SeqCst)
    );
    assert_eq!(orchestrator.gate().available(), 3);
}

// =============================================================================
// Permit accounting under cancellation
// =============================================================================

#[tokio::test]
async fn cancelling_while_queued_for_a_permit_leaks_nothing() {
    // Given: a gate of capacity 1 whose only slot is held by a slow fetch
    let policy = FetchPolicy::default()
        .with_gate_capacity(1)
        .with_retry(RetryConfig::no_retry());
    let orchestrator = Arc::new(FetchOrchestrator::new(policy));

    let holder = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let token = CancelToken::new();
            let upstream = || async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(RawResponse::ok_json(r#"{"price":1.0}"#))
            };
            orchestrator
                .execute::<Value, _, _>("quote:slow", TTL, "quote", upstream, &token)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(orchestrator.gate().available(), 0);

    // When: a second caller queues for the gate and then cancels
    let token = CancelToken::new();
    let waiter = {
        let orchestrator = Arc::clone(&orchestrator);
        let token = token.clone();
        tokio::spawn(async move {
            let upstream = || async { Ok(RawResponse::ok_json(r#"{"price":2.0}"#)) };
            orchestrator
                .execute::<Value, _, _>("quote:queued", TTL, "quote", upstream, &token)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    // Then: the waiter unwinds with a cancellation outcome
    let outcome = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("cancelled waiter should return promptly")
        .expect("waiter task should not panic");
    assert_eq!(outcome.expect_err("queued caller was cancelled"), FetchError::Cancelled);

    // And: the holder completes and the permit pool is whole again
    holder
        .await
        .expect("holder task should not panic")
        .expect("slow fetch succeeds");
    assert_eq!(orchestrator.gate().available(), 1);
    // And: the cancelled caller never invoked the upstream
    assert!(orchestrator.cache().get("quote:queued").await.is_none());
}

// =============================================================================
// Concurrent same-key misses
// =============================================================================

#[tokio::test]
async fn concurrent_same_key_misses_each_fetch_upstream() {
    // Given: two callers miss on the same key at the same time
    let orchestrator = Arc::new(FetchOrchestrator::new(
        FetchPolicy::default().with_retry(RetryConfig::no_retry()),
    ));
    let calls = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let orchestrator = Arc::clone(&orchestrator);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            let token = CancelToken::new();
            let upstream = move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(RawResponse::ok_json(r#"{"price":5.0}"#))
                }
            };
            orchestrator
                .execute::<Value, _, _>("quote:AAPL", TTL, "quote", upstream, &token)
                .await
        }));
    }

    // When: both complete
    for handle in handles {
        handle
            .await
            .expect("caller task should not panic")
            .expect("both fetches succeed");
    }

    // Then: requests were not coalesced; each miss paid its own upstream call
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // And: the racers converged on one cached body
    assert_eq!(
        orchestrator.cache().get("quote:AAPL").await.as_deref(),
        Some(r#"{"price":5.0}"#)
    );
}

// =============================================================================
// Cache read/write races
// =============================================================================

#[tokio::test]
async fn readers_racing_writers_observe_whole_entries() {
    // Given: many writers overwriting one key with self-consistent bodies
    let orchestrator = Arc::new(FetchOrchestrator::new(FetchPolicy::default()));
    let cache = orchestrator.cache().clone();

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move {
            for i in 0..100u32 {
                let body = format!(r#"{{"seq":{i},"echo":{i}}}"#);
                cache.put(String::from("quote:AAPL"), body, TTL).await;
            }
        })
    };

    // When: a reader polls the same key throughout
    while !writer.is_finished() {
        if let Some(body) = cache.get("quote:AAPL").await {
            // Then: every observed body is one writer's entry in full
            let value: Value = serde_json::from_str(&body).expect("body is never torn");
            assert_eq!(value["seq"], value["echo"]);
        }
        tokio::task::yield_now().await;
    }
    writer.await.expect("writer task should not panic");

    // And: the settled entry is the last writer's, whole
    let body = cache.get("quote:AAPL").await.expect("entry is live");
    let value: Value = serde_json::from_str(&body).expect("body is never torn");
    assert_eq!(value["seq"], 99);
}
