// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! AI inference proxying.
//!
//! The gateway forwards text and image generation requests to upstream
//! providers and normalizes their response shapes into one wire format,
//! so client apps never carry per-provider parsing. Provider tokens are
//! fetched through the secret provider per request; nothing upstream is
//! cached here.

pub mod client;
pub mod providers;

pub use client::{
    AiClient, ImageGenerateRequest, ImageGeneration, TextGenerateRequest, TextGeneration, Usage,
};
pub use providers::{catalog, Provider, ProviderInfo};

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("provider does not support {0}")]
    UnsupportedCapability(&'static str),

    #[error("provider credentials missing: {0}")]
    MissingCredentials(String),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider response was invalid: {0}")]
    InvalidResponse(String),
}
