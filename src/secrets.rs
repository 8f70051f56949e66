// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Opaque secret retrieval.
//!
//! Every credential the gateway consumes (signing secret, storage keys,
//! upstream provider tokens) flows through the [`SecretProvider`] trait so
//! handlers never read the process environment directly. Production uses
//! [`EnvSecrets`]; tests inject [`StaticSecrets`].

use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret not configured: {0}")]
    Missing(String),
}

/// Capability for retrieving named secrets.
///
/// Implementations return the secret value or fail; callers decide how a
/// retrieval failure maps to their own error taxonomy (the auth guard folds
/// it into 401, configuration loading fails startup).
pub trait SecretProvider: Send + Sync {
    fn get(&self, name: &str) -> Result<String, SecretError>;

    /// Like [`get`](Self::get), but absence is not an error.
    fn get_optional(&self, name: &str) -> Option<String> {
        self.get(name).ok()
    }
}

/// Secret provider backed by process environment variables.
///
/// Values are trimmed; empty or whitespace-only values count as missing.
pub struct EnvSecrets;

impl SecretProvider for EnvSecrets {
    fn get(&self, name: &str) -> Result<String, SecretError> {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretError::Missing(name.to_string()))
    }
}

/// Fixed in-memory secret set for tests and local tooling.
#[derive(Debug, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new<K, V, I>(values: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretProvider for StaticSecrets {
    fn get(&self, name: &str) -> Result<String, SecretError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::Missing(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_secrets_returns_configured_value() {
        let secrets = StaticSecrets::new([("API_KEY", "abc123")]);
        assert_eq!(secrets.get("API_KEY").unwrap(), "abc123");
    }

    #[test]
    fn static_secrets_missing_is_an_error() {
        let secrets = StaticSecrets::new([("API_KEY", "abc123")]);
        let err = secrets.get("OTHER").unwrap_err();
        assert!(matches!(err, SecretError::Missing(name) if name == "OTHER"));
    }

    #[test]
    fn env_secrets_treats_blank_values_as_missing() {
        std::env::set_var("EDGE_GATEWAY_TEST_BLANK_SECRET", "   ");
        let secrets = EnvSecrets;
        assert!(secrets.get("EDGE_GATEWAY_TEST_BLANK_SECRET").is_err());
        std::env::remove_var("EDGE_GATEWAY_TEST_BLANK_SECRET");
    }

    #[test]
    fn get_optional_swallows_absence() {
        let secrets = StaticSecrets::default();
        assert!(secrets.get_optional("ANYTHING").is_none());
    }
}
