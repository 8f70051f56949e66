// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Fixed-window request rate limiting.
//!
//! One counter per `(subject, minute)` pair, kept in a durable key-value
//! store with a per-entry TTL. This is a plain fixed-window limiter: a
//! burst straddling a window boundary can admit up to twice the nominal
//! cap across the two adjacent windows.
//!
//! The check-then-increment must not race with itself for the same key,
//! so the [`CounterStore`] contract is a single conditional primitive
//! ([`CounterStore::try_increment`]) that implementations execute
//! atomically: redb inside one write transaction (redb serializes
//! writers), the in-memory store under one mutex guard.

pub mod counters;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{error, warn};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

pub use counters::{CounterSweeper, InMemoryCounterStore, RedbCounterStore};

/// Window size: one calendar minute.
pub const WINDOW_MILLIS: i64 = 60_000;

/// Counter entry lifetime. Outlives the window by 10 seconds to cover
/// clock skew between writers.
pub const COUNTER_TTL_MILLIS: i64 = 70_000;

#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("counter store mutex poisoned")]
    LockPoisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("counter store unavailable: {0}")]
    Store(#[from] CounterStoreError),
}

/// Durable per-key counter capability.
///
/// Keys are opaque strings; entries carry an absolute expiry and count as
/// absent once it passes. Entries are only ever removed by expiry, never
/// by an explicit delete from the limiter.
pub trait CounterStore: Send + Sync {
    /// Atomically read the live count for `key` and, when it is below
    /// `cap`, record `count + 1` with the given expiry.
    ///
    /// Returns `Some(new_count)` when the request was admitted, `None`
    /// when the cap was already reached (the counter is left untouched).
    fn try_increment(
        &self,
        key: &str,
        cap: u64,
        expires_at_millis: i64,
        now_millis: i64,
    ) -> Result<Option<u64>, CounterStoreError>;

    /// Remove entries whose expiry has passed. Returns how many were
    /// dropped.
    fn purge_expired(&self, now_millis: i64) -> Result<u64, CounterStoreError>;
}

/// Fixed-window limiter over a [`CounterStore`].
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u64) -> Self {
        Self {
            store,
            max_requests,
        }
    }

    /// Consume one rate-limit unit for `subject` at the current time.
    pub fn consume(&self, subject: &str) -> Result<(), RateLimitError> {
        self.consume_at(subject, Utc::now().timestamp_millis())
    }

    /// Consume one unit at an explicit clock reading.
    pub fn consume_at(&self, subject: &str, now_millis: i64) -> Result<(), RateLimitError> {
        let window = now_millis.div_euclid(WINDOW_MILLIS);
        let key = format!("{subject}:{window}");

        match self.store.try_increment(
            &key,
            self.max_requests,
            now_millis + COUNTER_TTL_MILLIS,
            now_millis,
        )? {
            Some(_count) => Ok(()),
            None => Err(RateLimitError::RateLimited),
        }
    }
}

/// Middleware that charges one unit against the authenticated subject.
///
/// Must be layered inside the auth guard: it reads the [`AuthContext`]
/// extension the guard inserted.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(context) = request.extensions().get::<AuthContext>() else {
        error!("rate limit middleware reached without an authenticated context");
        return ApiError::internal("request context missing").into_response();
    };

    match state.limiter.consume(&context.user_id) {
        Ok(()) => next.run(request).await,
        Err(err @ RateLimitError::RateLimited) => {
            warn!(
                user_id = %context.user_id,
                path = %request.uri().path(),
                "request rejected by rate limiter"
            );
            ApiError::from(err).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(cap: u64) -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryCounterStore::new()), cap)
    }

    #[test]
    fn admits_up_to_cap_within_one_window() {
        let limiter = limiter(100);
        let now = 1_750_000_000_000;

        for _ in 0..100 {
            limiter.consume_at("user_123", now).unwrap();
        }
        let err = limiter.consume_at("user_123", now).unwrap_err();
        assert!(matches!(err, RateLimitError::RateLimited));
    }

    #[test]
    fn next_window_admits_regardless_of_previous_count() {
        let limiter = limiter(5);
        let now = 1_750_000_000_000;

        for _ in 0..5 {
            limiter.consume_at("user_123", now).unwrap();
        }
        assert!(limiter.consume_at("user_123", now).is_err());

        // First request of the following minute bucket.
        let next_window = (now.div_euclid(WINDOW_MILLIS) + 1) * WINDOW_MILLIS;
        assert!(limiter.consume_at("user_123", next_window).is_ok());
    }

    #[test]
    fn subjects_are_counted_independently() {
        let limiter = limiter(1);
        let now = 1_750_000_000_000;

        limiter.consume_at("user_a", now).unwrap();
        assert!(limiter.consume_at("user_a", now).is_err());
        assert!(limiter.consume_at("user_b", now).is_ok());
    }

    #[test]
    fn rejected_requests_do_not_advance_the_counter() {
        let store = Arc::new(InMemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone(), 2);
        let now = 1_750_000_000_000;

        limiter.consume_at("user_123", now).unwrap();
        limiter.consume_at("user_123", now).unwrap();
        for _ in 0..10 {
            assert!(limiter.consume_at("user_123", now).is_err());
        }

        let window = now.div_euclid(WINDOW_MILLIS);
        let count = store.peek(&format!("user_123:{window}"), now).unwrap();
        assert_eq!(count, 2);
    }
}
