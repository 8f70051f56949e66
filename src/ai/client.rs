// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Upstream provider client and response normalization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use utoipa::ToSchema;

use super::providers::Provider;
use super::AiError;
use crate::secrets::SecretProvider;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const STABILITY_BASE_URL: &str = "https://api.stability.ai";
const AI_GATEWAY_BASE_URL: &str = "https://gateway.ai.cloudflare.com/v1";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Header the AI gateway honors to bypass its response cache.
const GATEWAY_SKIP_CACHE_HEADER: &str = "cf-aig-skip-cache";

/// Anthropic requires `max_tokens`; applied when the caller omits it.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TextGenerateRequest {
    /// Model override; each provider has a default.
    pub model: Option<String>,
    pub prompt: String,
    /// Provider id; defaults to `openai`.
    pub provider: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Set `false` to bypass the AI gateway cache. Ignored when no
    /// gateway is configured.
    pub cache: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImageGenerateRequest {
    pub model: Option<String>,
    pub prompt: String,
    pub provider: Option<String>,
}

/// Token accounting, normalized across provider shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TextGeneration {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageGeneration {
    /// Base64 image data or a provider-hosted URL, depending on the
    /// provider.
    pub result: String,
    pub provider: String,
}

/// Client for upstream inference providers.
///
/// When an AI gateway id is configured, provider traffic routes through
/// the gateway base URL; otherwise it goes direct. Either way the
/// provider's own API token authenticates the call.
pub struct AiClient {
    http: Client,
    secrets: Arc<dyn SecretProvider>,
    gateway_base: Option<String>,
}

impl AiClient {
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        gateway_id: Option<String>,
        account_id: &str,
    ) -> Result<Self, AiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AiError::Request(format!("failed to build HTTP client: {e}")))?;

        let gateway_base =
            gateway_id.map(|gateway| format!("{AI_GATEWAY_BASE_URL}/{account_id}/{gateway}"));

        Ok(Self {
            http,
            secrets,
            gateway_base,
        })
    }

    /// Base URL for a provider, honoring the configured gateway.
    ///
    /// Stability is not fronted by the gateway and always goes direct.
    fn provider_base(&self, provider: Provider) -> String {
        if provider != Provider::Stability {
            if let Some(ref base) = self.gateway_base {
                return format!("{base}/{}", provider.gateway_segment());
            }
        }
        match provider {
            Provider::OpenAi => OPENAI_BASE_URL.to_string(),
            Provider::Anthropic => ANTHROPIC_BASE_URL.to_string(),
            Provider::Groq => GROQ_BASE_URL.to_string(),
            Provider::Stability => STABILITY_BASE_URL.to_string(),
        }
    }

    fn api_key(&self, provider: Provider) -> Result<String, AiError> {
        self.secrets
            .get(provider.api_key_env())
            .map_err(|_| AiError::MissingCredentials(provider.api_key_env().to_string()))
    }

    pub async fn text_generate(
        &self,
        request: TextGenerateRequest,
    ) -> Result<TextGeneration, AiError> {
        if request.prompt.trim().is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        let provider = resolve_provider(request.provider.as_deref(), Provider::OpenAi)?;
        let default_model = provider
            .default_text_model()
            .ok_or(AiError::UnsupportedCapability("text generation"))?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string());
        let key = self.api_key(provider)?;
        let skip_cache = request.cache == Some(false);

        info!(provider = %provider, model = %model, "proxying text generation");

        match provider {
            Provider::OpenAi | Provider::Groq => {
                let mut payload = json!({
                    "model": model,
                    "messages": [{"role": "user", "content": request.prompt}],
                });
                if let Some(max_tokens) = request.max_tokens {
                    payload["max_tokens"] = json!(max_tokens);
                }
                if let Some(temperature) = request.temperature {
                    payload["temperature"] = json!(temperature);
                }

                let url = format!("{}/chat/completions", self.provider_base(provider));
                let headers = [("authorization", format!("Bearer {key}"))];
                let value = self.post_json(&url, &headers, &payload, skip_cache).await?;

                Ok(TextGeneration {
                    response: normalize_openai_text(&value)?,
                    usage: normalize_openai_usage(value.get("usage")),
                    provider: provider.as_str().to_string(),
                })
            }
            Provider::Anthropic => {
                let mut payload = json!({
                    "model": model,
                    "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                    "messages": [{"role": "user", "content": request.prompt}],
                });
                if let Some(temperature) = request.temperature {
                    payload["temperature"] = json!(temperature);
                }

                let url = format!("{}/v1/messages", self.provider_base(provider));
                let headers = [
                    ("x-api-key", key),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ];
                let value = self.post_json(&url, &headers, &payload, skip_cache).await?;

                Ok(TextGeneration {
                    response: normalize_anthropic_text(&value)?,
                    usage: normalize_anthropic_usage(value.get("usage")),
                    provider: provider.as_str().to_string(),
                })
            }
            // Text capability was checked above via default_text_model.
            Provider::Stability => unreachable!("stability has no text capability"),
        }
    }

    pub async fn image_generate(
        &self,
        request: ImageGenerateRequest,
    ) -> Result<ImageGeneration, AiError> {
        if request.prompt.trim().is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        let provider = resolve_provider(request.provider.as_deref(), Provider::OpenAi)?;
        let default_model = provider
            .default_image_model()
            .ok_or(AiError::UnsupportedCapability("image generation"))?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string());
        let key = self.api_key(provider)?;

        info!(provider = %provider, model = %model, "proxying image generation");

        let result = match provider {
            Provider::OpenAi => {
                let payload = json!({
                    "model": model,
                    "prompt": request.prompt,
                    "n": 1,
                    "response_format": "b64_json",
                });
                let url = format!("{}/images/generations", self.provider_base(provider));
                let headers = [("authorization", format!("Bearer {key}"))];
                let value = self.post_json(&url, &headers, &payload, false).await?;
                normalize_openai_image(&value)?
            }
            Provider::Stability => {
                let payload = json!({
                    "text_prompts": [{"text": request.prompt}],
                });
                let url = format!(
                    "{}/v1/generation/{model}/text-to-image",
                    self.provider_base(provider)
                );
                let headers = [
                    ("authorization", format!("Bearer {key}")),
                    ("accept", "application/json".to_string()),
                ];
                let value = self.post_json(&url, &headers, &payload, false).await?;
                normalize_stability_image(&value)?
            }
            Provider::Anthropic | Provider::Groq => {
                unreachable!("no image default for text-only providers")
            }
        };

        Ok(ImageGeneration {
            result,
            provider: provider.as_str().to_string(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        payload: &Value,
        skip_cache: bool,
    ) -> Result<Value, AiError> {
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        if skip_cache && self.gateway_base.is_some() {
            request = request.header(GATEWAY_SKIP_CACHE_HEADER, "true");
        }

        let response = request
            .send()
            .await
            .map_err(|e| AiError::Request(format!("POST {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Request(format!(
                "POST {url} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("POST {url} invalid JSON: {e}")))
    }
}

/// Resolve the requested provider id, falling back to `default`.
pub(crate) fn resolve_provider(
    requested: Option<&str>,
    default: Provider,
) -> Result<Provider, AiError> {
    match requested {
        Some(id) => Provider::parse(id).ok_or_else(|| AiError::UnknownProvider(id.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn normalize_openai_text(value: &Value) -> Result<String, AiError> {
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AiError::InvalidResponse("missing choices[0].message.content".to_string()))
}

pub(crate) fn normalize_anthropic_text(value: &Value) -> Result<String, AiError> {
    value
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AiError::InvalidResponse("missing content[0].text".to_string()))
}

pub(crate) fn normalize_openai_usage(usage: Option<&Value>) -> Option<Usage> {
    let usage = usage?;
    let prompt_tokens = usage.get("prompt_tokens").and_then(Value::as_u64);
    let completion_tokens = usage.get("completion_tokens").and_then(Value::as_u64);
    let total_tokens = usage.get("total_tokens").and_then(Value::as_u64);
    if prompt_tokens.is_none() && completion_tokens.is_none() && total_tokens.is_none() {
        return None;
    }
    Some(Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}

pub(crate) fn normalize_anthropic_usage(usage: Option<&Value>) -> Option<Usage> {
    let usage = usage?;
    let prompt_tokens = usage.get("input_tokens").and_then(Value::as_u64);
    let completion_tokens = usage.get("output_tokens").and_then(Value::as_u64);
    let total_tokens = match (prompt_tokens, completion_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };
    if prompt_tokens.is_none() && completion_tokens.is_none() {
        return None;
    }
    Some(Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}

pub(crate) fn normalize_openai_image(value: &Value) -> Result<String, AiError> {
    value
        .pointer("/data/0/b64_json")
        .or_else(|| value.pointer("/data/0/url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AiError::InvalidResponse("missing data[0] image payload".to_string()))
}

pub(crate) fn normalize_stability_image(value: &Value) -> Result<String, AiError> {
    value
        .pointer("/artifacts/0/base64")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AiError::InvalidResponse("missing artifacts[0].base64".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OPENAI_API_KEY_ENV;
    use crate::secrets::StaticSecrets;

    fn client_with(secrets: StaticSecrets, gateway_id: Option<&str>) -> AiClient {
        AiClient::new(
            Arc::new(secrets),
            gateway_id.map(str::to_string),
            "acct-123",
        )
        .unwrap()
    }

    #[test]
    fn resolve_provider_defaults_and_rejects() {
        assert_eq!(
            resolve_provider(None, Provider::OpenAi).unwrap(),
            Provider::OpenAi
        );
        assert_eq!(
            resolve_provider(Some("anthropic"), Provider::OpenAi).unwrap(),
            Provider::Anthropic
        );
        assert!(matches!(
            resolve_provider(Some("bogus"), Provider::OpenAi),
            Err(AiError::UnknownProvider(id)) if id == "bogus"
        ));
    }

    #[test]
    fn provider_base_routes_through_gateway_when_configured() {
        let direct = client_with(StaticSecrets::default(), None);
        assert_eq!(direct.provider_base(Provider::OpenAi), OPENAI_BASE_URL);
        assert_eq!(direct.provider_base(Provider::Groq), GROQ_BASE_URL);

        let gatewayed = client_with(StaticSecrets::default(), Some("gw-1"));
        assert_eq!(
            gatewayed.provider_base(Provider::OpenAi),
            "https://gateway.ai.cloudflare.com/v1/acct-123/gw-1/openai"
        );
        assert_eq!(
            gatewayed.provider_base(Provider::Anthropic),
            "https://gateway.ai.cloudflare.com/v1/acct-123/gw-1/anthropic"
        );
        // Stability is never gatewayed.
        assert_eq!(
            gatewayed.provider_base(Provider::Stability),
            STABILITY_BASE_URL
        );
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_any_upstream_call() {
        let client = client_with(StaticSecrets::default(), None);
        let err = client
            .text_generate(TextGenerateRequest {
                model: None,
                prompt: "   ".to_string(),
                provider: None,
                max_tokens: None,
                temperature: None,
                cache: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyPrompt));
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let client = client_with(StaticSecrets::default(), None);
        let err = client
            .text_generate(TextGenerateRequest {
                model: None,
                prompt: "hello".to_string(),
                provider: Some("bogus".to_string()),
                max_tokens: None,
                temperature: None,
                cache: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn text_on_image_only_provider_is_rejected() {
        let client = client_with(StaticSecrets::default(), None);
        let err = client
            .text_generate(TextGenerateRequest {
                model: None,
                prompt: "hello".to_string(),
                provider: Some("stability".to_string()),
                max_tokens: None,
                temperature: None,
                cache: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::UnsupportedCapability(_)));
    }

    #[tokio::test]
    async fn image_on_text_only_provider_is_rejected() {
        let client = client_with(StaticSecrets::default(), None);
        let err = client
            .image_generate(ImageGenerateRequest {
                model: None,
                prompt: "a lighthouse".to_string(),
                provider: Some("anthropic".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::UnsupportedCapability(_)));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_upstream_call() {
        let client = client_with(StaticSecrets::default(), None);
        let err = client
            .text_generate(TextGenerateRequest {
                model: None,
                prompt: "hello".to_string(),
                provider: None,
                max_tokens: None,
                temperature: None,
                cache: None,
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, AiError::MissingCredentials(name) if name == OPENAI_API_KEY_ENV)
        );
    }

    #[test]
    fn openai_text_normalization() {
        let value = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "hi there"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        });
        assert_eq!(normalize_openai_text(&value).unwrap(), "hi there");
        assert_eq!(
            normalize_openai_usage(value.get("usage")),
            Some(Usage {
                prompt_tokens: Some(12),
                completion_tokens: Some(3),
                total_tokens: Some(15),
            })
        );
    }

    #[test]
    fn openai_text_missing_content_is_invalid() {
        let value = serde_json::json!({"choices": []});
        assert!(matches!(
            normalize_openai_text(&value),
            Err(AiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn anthropic_text_normalization_sums_usage() {
        let value = serde_json::json!({
            "content": [{"type": "text", "text": "hello from claude"}],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        assert_eq!(normalize_anthropic_text(&value).unwrap(), "hello from claude");
        assert_eq!(
            normalize_anthropic_usage(value.get("usage")),
            Some(Usage {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                total_tokens: Some(15),
            })
        );
    }

    #[test]
    fn absent_usage_normalizes_to_none() {
        assert_eq!(normalize_openai_usage(None), None);
        assert_eq!(
            normalize_openai_usage(Some(&serde_json::json!({}))),
            None
        );
        assert_eq!(normalize_anthropic_usage(None), None);
    }

    #[test]
    fn image_normalization_prefers_b64_then_url() {
        let b64 = serde_json::json!({"data": [{"b64_json": "aW1n"}]});
        assert_eq!(normalize_openai_image(&b64).unwrap(), "aW1n");

        let url = serde_json::json!({"data": [{"url": "https://cdn.example.com/img.png"}]});
        assert_eq!(
            normalize_openai_image(&url).unwrap(),
            "https://cdn.example.com/img.png"
        );

        let stability = serde_json::json!({"artifacts": [{"base64": "c3RhYmxl"}]});
        assert_eq!(normalize_stability_image(&stability).unwrap(), "c3RhYmxl");

        assert!(normalize_openai_image(&serde_json::json!({})).is_err());
    }
}
