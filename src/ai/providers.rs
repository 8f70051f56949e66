// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Supported inference providers and the static catalog.

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{
    ANTHROPIC_API_KEY_ENV, GROQ_API_KEY_ENV, OPENAI_API_KEY_ENV, STABILITY_API_KEY_ENV,
};

/// Upstream inference providers the gateway can proxy to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Groq,
    Stability,
}

impl Provider {
    /// Parse a provider id from a request body (case-insensitive).
    pub fn parse(s: &str) -> Option<Provider> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAi),
            "anthropic" => Some(Provider::Anthropic),
            "groq" => Some(Provider::Groq),
            "stability" => Some(Provider::Stability),
            _ => None,
        }
    }

    /// Wire id, as echoed in normalized responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Groq => "groq",
            Provider::Stability => "stability",
        }
    }

    /// Environment variable carrying this provider's API token.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_API_KEY_ENV,
            Provider::Anthropic => ANTHROPIC_API_KEY_ENV,
            Provider::Groq => GROQ_API_KEY_ENV,
            Provider::Stability => STABILITY_API_KEY_ENV,
        }
    }

    /// Path segment under the AI gateway base URL.
    pub fn gateway_segment(&self) -> &'static str {
        self.as_str()
    }

    /// Default model for text generation; `None` when the provider has
    /// no text capability.
    pub fn default_text_model(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("gpt-4o-mini"),
            Provider::Anthropic => Some("claude-3-5-haiku-latest"),
            Provider::Groq => Some("llama-3.1-8b-instant"),
            Provider::Stability => None,
        }
    }

    /// Default model for image generation; `None` when the provider has
    /// no image capability.
    pub fn default_image_model(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("dall-e-3"),
            Provider::Stability => Some("stable-diffusion-xl-1024-v1-0"),
            Provider::Anthropic | Provider::Groq => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One catalog entry of the `/v1/ai/providers` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub models: Vec<String>,
    pub capabilities: Vec<String>,
}

/// Static catalog of supported providers and their known models.
pub fn catalog() -> Vec<ProviderInfo> {
    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    vec![
        ProviderInfo {
            id: "openai".to_string(),
            name: "OpenAI".to_string(),
            models: owned(&["gpt-4o", "gpt-4o-mini", "dall-e-3"]),
            capabilities: owned(&["text", "image"]),
        },
        ProviderInfo {
            id: "anthropic".to_string(),
            name: "Anthropic".to_string(),
            models: owned(&["claude-3-5-sonnet-latest", "claude-3-5-haiku-latest"]),
            capabilities: owned(&["text"]),
        },
        ProviderInfo {
            id: "groq".to_string(),
            name: "Groq".to_string(),
            models: owned(&["llama-3.1-8b-instant", "llama-3.3-70b-versatile"]),
            capabilities: owned(&["text"]),
        },
        ProviderInfo {
            id: "stability".to_string(),
            name: "Stability AI".to_string(),
            models: owned(&["stable-diffusion-xl-1024-v1-0"]),
            capabilities: owned(&["image"]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Provider::parse("openai"), Some(Provider::OpenAi));
        assert_eq!(Provider::parse("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::parse("ANTHROPIC"), Some(Provider::Anthropic));
        assert_eq!(Provider::parse("unknown"), None);
    }

    #[test]
    fn text_defaults_cover_text_providers_only() {
        assert!(Provider::OpenAi.default_text_model().is_some());
        assert!(Provider::Anthropic.default_text_model().is_some());
        assert!(Provider::Groq.default_text_model().is_some());
        assert!(Provider::Stability.default_text_model().is_none());
    }

    #[test]
    fn image_defaults_cover_image_providers_only() {
        assert!(Provider::OpenAi.default_image_model().is_some());
        assert!(Provider::Stability.default_image_model().is_some());
        assert!(Provider::Anthropic.default_image_model().is_none());
        assert!(Provider::Groq.default_image_model().is_none());
    }

    #[test]
    fn catalog_ids_match_parseable_providers() {
        for info in catalog() {
            assert!(
                Provider::parse(&info.id).is_some(),
                "catalog id {} must parse",
                info.id
            );
            assert!(!info.models.is_empty());
            assert!(!info.capabilities.is_empty());
        }
    }
}
