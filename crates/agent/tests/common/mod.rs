//! Shared fakes for agent integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;

use metaagent_agent::executor::{CommandExecutor, ExecError, ExecOutput};
use metaagent_agent::AgentSettings;
use metaagent_provider::{ChatParams, ChatResponse, Provider, ProviderError};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

mock! {
    pub Executor {}

    #[async_trait]
    impl CommandExecutor for Executor {
        async fn execute(&self, command: &str) -> Result<ExecOutput, ExecError>;
        fn describe(&self) -> String;
    }
}

/// Which component issued a completion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Plan,
    Summary,
    Digest,
    Aggregate,
    Expert,
}

pub fn call_kind(params: &ChatParams) -> CallKind {
    let system = &params.messages[0].content;
    if system.starts_with("# Meta-Expert") {
        CallKind::Plan
    } else if system.contains("summarizes command executions") {
        CallKind::Summary
    } else if system.contains("pruned history items") {
        CallKind::Digest
    } else if system.starts_with("You combine") {
        CallKind::Aggregate
    } else {
        CallKind::Expert
    }
}

pub fn user_text(params: &ChatParams) -> String {
    params.messages.last().map(|m| m.content.clone()).unwrap_or_default()
}

pub fn reply(params: &ChatParams, content: &str) -> Result<ChatResponse, ProviderError> {
    Ok(ChatResponse::text(params.model.clone(), content))
}

pub fn settings(max_depth: u32, max_history_items: usize) -> AgentSettings {
    AgentSettings {
        model: "planner".to_string(),
        summary_model: "summarizer".to_string(),
        max_depth,
        max_history_items,
        max_tokens: 1024,
        temperature: 0.0,
    }
}

/// Executor returning canned outputs and remembering what it ran
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    outputs: Arc<Mutex<HashMap<String, ExecOutput>>>,
    calls: Arc<Mutex<Vec<String>>>,
    unavailable: bool,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command fails to spawn
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn on(self, command: &str, output: ExecOutput) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .insert(command.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &str) -> Result<ExecOutput, ExecError> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.unavailable {
            return Err(ExecError::Spawn {
                program: "docker".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_else(|| ExecOutput::completed(0, "", "")))
    }

    fn describe(&self) -> String {
        "scripted test executor".to_string()
    }
}
