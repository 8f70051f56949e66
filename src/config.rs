// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! # Runtime Configuration
//!
//! This module defines environment variable names and the startup
//! configuration loader. All values are read through the
//! [`SecretProvider`](crate::secrets::SecretProvider) capability at startup;
//! only the session signing secret and the AI provider tokens are fetched
//! lazily per request.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SESSION_SIGNING_SECRET` | HS256 key for bearer token verification | Required |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Optional |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `R2_ACCOUNT_ID` | Storage account id (presign host prefix) | Required |
//! | `R2_BUCKET` | Storage bucket name | Required |
//! | `R2_ACCESS_KEY_ID` | Storage access key id | Required |
//! | `R2_SECRET_ACCESS_KEY` | Storage secret access key | Required |
//! | `R2_REGION` | SigV4 region | `auto` |
//! | `AI_GATEWAY_ID` | Route AI traffic through an AI gateway | Optional |
//! | `OPENAI_API_KEY` | OpenAI token | Optional |
//! | `ANTHROPIC_API_KEY` | Anthropic token | Optional |
//! | `GROQ_API_KEY` | Groq token | Optional |
//! | `STABILITY_API_KEY` | Stability token | Optional |
//! | `RATE_LIMIT_MAX_REQUESTS` | Per-subject requests per minute | `100` |
//! | `DATA_DIR` | Directory for the durable counter store | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use crate::secrets::SecretProvider;

/// HS256 signing secret for session bearer tokens.
pub const SESSION_SIGNING_SECRET_ENV: &str = "SESSION_SIGNING_SECRET";

/// Expected `iss` claim; issuer checking is skipped when unset.
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";

/// Expected `aud` claim; audience checking is skipped when unset.
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";

/// Storage account id, used as the host prefix for presigned URLs.
pub const R2_ACCOUNT_ID_ENV: &str = "R2_ACCOUNT_ID";

/// Bucket all gateway object keys live in.
pub const R2_BUCKET_ENV: &str = "R2_BUCKET";

/// Access key id for SigV4 signing.
pub const R2_ACCESS_KEY_ID_ENV: &str = "R2_ACCESS_KEY_ID";

/// Secret access key for SigV4 signing.
pub const R2_SECRET_ACCESS_KEY_ENV: &str = "R2_SECRET_ACCESS_KEY";

/// SigV4 region. R2-style endpoints use the literal region `auto`.
pub const R2_REGION_ENV: &str = "R2_REGION";

/// Optional AI gateway id; when set, provider traffic is routed through it.
pub const AI_GATEWAY_ID_ENV: &str = "AI_GATEWAY_ID";

/// Upstream provider tokens, fetched lazily per request.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const STABILITY_API_KEY_ENV: &str = "STABILITY_API_KEY";

/// Per-subject fixed-window request cap.
pub const RATE_LIMIT_MAX_REQUESTS_ENV: &str = "RATE_LIMIT_MAX_REQUESTS";

/// Directory holding the durable rate-limit counter database.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Server bind address and port.
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Logging format selector (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default per-subject requests-per-minute cap.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    Missing(String),

    #[error("configuration invalid: {0}")]
    Invalid(String),
}

/// Startup configuration resolved from the secret provider.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Expected token issuer (`iss`), when enforced.
    pub issuer: Option<String>,
    /// Expected token audience (`aud`), when enforced.
    pub audience: Option<String>,
    /// Storage account id.
    pub account_id: String,
    /// Storage bucket.
    pub bucket: String,
    /// Storage access key id.
    pub access_key_id: String,
    /// Storage secret access key.
    pub secret_access_key: String,
    /// SigV4 region.
    pub region: String,
    /// Optional AI gateway id.
    pub ai_gateway_id: Option<String>,
    /// Per-subject requests-per-minute cap.
    pub max_requests_per_minute: u64,
}

impl GatewayConfig {
    /// Load the gateway configuration.
    ///
    /// The signing secret itself is not cached here: the auth guard fetches
    /// it per request so rotation does not require a restart. Startup only
    /// checks that it is present.
    pub fn from_secrets(secrets: &dyn SecretProvider) -> Result<Self, ConfigError> {
        secrets
            .get(SESSION_SIGNING_SECRET_ENV)
            .map_err(|_| ConfigError::Missing(SESSION_SIGNING_SECRET_ENV.to_string()))?;

        let required = |name: &str| {
            secrets
                .get(name)
                .map_err(|_| ConfigError::Missing(name.to_string()))
        };

        let max_requests_per_minute = match secrets.get_optional(RATE_LIMIT_MAX_REQUESTS_ENV) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{RATE_LIMIT_MAX_REQUESTS_ENV} must be a positive integer, got {raw:?}"
                ))
            })?,
            None => DEFAULT_MAX_REQUESTS,
        };

        Ok(Self {
            issuer: secrets.get_optional(AUTH_ISSUER_ENV),
            audience: secrets.get_optional(AUTH_AUDIENCE_ENV),
            account_id: required(R2_ACCOUNT_ID_ENV)?,
            bucket: required(R2_BUCKET_ENV)?,
            access_key_id: required(R2_ACCESS_KEY_ID_ENV)?,
            secret_access_key: required(R2_SECRET_ACCESS_KEY_ENV)?,
            region: secrets
                .get_optional(R2_REGION_ENV)
                .unwrap_or_else(|| "auto".to_string()),
            ai_gateway_id: secrets.get_optional(AI_GATEWAY_ID_ENV),
            max_requests_per_minute,
        })
    }
}
