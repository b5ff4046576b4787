//! OpenRouter / OpenAI-compatible completion client.

use std::time::Instant;

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenRouter and compatible endpoints
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenRouterProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base
            .unwrap_or_else(|| {
                if is_openrouter {
                    OPENROUTER_API_BASE.to_string()
                } else {
                    OPENAI_API_BASE.to_string()
                }
            })
            .trim_end_matches('/')
            .to_string();

        let default_model = default_model.unwrap_or_else(|| {
            if is_openrouter {
                "anthropic/claude-3.5-sonnet".to_string()
            } else {
                "gpt-4".to_string()
            }
        });

        Self {
            client: Client::new(),
            api_key,
            api_base,
            default_model,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": &m.content }))
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }

    fn parse_response(&self, json: serde_json::Value, requested_model: &str) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let content = choice["message"]["content"]
            .as_str()
            .ok_or(ProviderError::InvalidResponse)?
            .to_string();

        let model = json["model"]
            .as_str()
            .filter(|m| !m.is_empty())
            .unwrap_or(requested_model)
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            let field = |name: &str| usage.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: field("prompt_tokens"),
                completion_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            model,
            latency: Default::default(),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OpenRouterProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        trace!("◆ COMPLETION REQUEST TO {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);
        let model = body["model"].as_str().unwrap_or_default().to_string();

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let latency = started.elapsed();

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        let response = self.parse_response(json, &model)?.with_latency(latency);

        debug!(
            "◆ COMPLETION FROM {} IN {:?} ({} CHARS)",
            response.model,
            latency,
            response.content.len()
        );

        Ok(response)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
