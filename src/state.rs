// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Shared application state.
//!
//! Everything here is either immutable after startup or internally
//! synchronized; request handlers never hold mutable state across
//! requests. The rate-limit counter store (inside the limiter) is the
//! only shared mutable resource, and it is serialized per key by its
//! backing store.

use std::sync::Arc;

use crate::ai::AiClient;
use crate::auth::TokenExpectations;
use crate::rate_limit::RateLimiter;
use crate::secrets::SecretProvider;
use crate::storage::{ObjectStore, Presigner};

#[derive(Clone)]
pub struct AppState {
    /// Secret retrieval capability (signing secret, provider tokens).
    pub secrets: Arc<dyn SecretProvider>,
    /// Issuer/audience the auth guard enforces.
    pub expectations: Arc<TokenExpectations>,
    /// Per-subject fixed-window rate limiter.
    pub limiter: Arc<RateLimiter>,
    /// Object storage capability.
    pub objects: Arc<dyn ObjectStore>,
    /// SigV4 presigner for direct-to-storage uploads.
    pub presigner: Arc<Presigner>,
    /// Upstream AI provider client.
    pub ai: Arc<AiClient>,
}

impl AppState {
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        expectations: Arc<TokenExpectations>,
        limiter: Arc<RateLimiter>,
        objects: Arc<dyn ObjectStore>,
        presigner: Arc<Presigner>,
        ai: Arc<AiClient>,
    ) -> Self {
        Self {
            secrets,
            expectations,
            limiter,
            objects,
            presigner,
            ai,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::SESSION_SIGNING_SECRET_ENV;
    use crate::rate_limit::InMemoryCounterStore;
    use crate::secrets::StaticSecrets;
    use crate::storage::InMemoryObjectStore;

    pub(crate) const TEST_SIGNING_SECRET: &str = "test-signing-secret";

    /// Hermetic state: in-memory stores, static secrets, no issuer or
    /// audience expectations.
    pub(crate) fn test_state(max_requests: u64) -> AppState {
        let secrets: Arc<dyn SecretProvider> = Arc::new(StaticSecrets::new([(
            SESSION_SIGNING_SECRET_ENV,
            TEST_SIGNING_SECRET,
        )]));

        let limiter = Arc::new(RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            max_requests,
        ));

        let presigner = Presigner::new("test-account", "test-bucket", "AKIA_TEST", "sk_test");

        AppState::new(
            secrets.clone(),
            Arc::new(TokenExpectations::default()),
            limiter,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(presigner),
            Arc::new(AiClient::new(secrets, None, "test-account").expect("build AI client")),
        )
    }
}
