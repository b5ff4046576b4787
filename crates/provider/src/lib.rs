//! Completion service client
//!
//! Role-tagged chat messages in, generated text plus latency out.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod openrouter;

pub use openrouter::OpenRouterProvider;

/// Completion backend errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("COMPLETION TRANSPORT FAILED: {0}")]
    Request(#[from] reqwest::Error),

    #[error("UNREADABLE RESPONSE: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BACKEND REJECTED REQUEST ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("NO API KEY CONFIGURED")]
    NoApiKey,

    #[error("RESPONSE MISSING CONTENT")]
    InvalidResponse,

    #[error("RATE LIMITED")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Generated text for one completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    /// Model that served the request.
    pub model: String,
    /// Wall-clock time of the round trip.
    pub latency: Duration,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            latency: Duration::ZERO,
            usage: Usage::default(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl ChatParams {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }
}

/// Text-completion backend
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}
