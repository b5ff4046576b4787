//! Bounded, self-compacting history of shell actions
//!
//! Every recorded action is summarized by a separate (usually cheaper) model.
//! When the store is full, the oldest summary is condensed into a digest that
//! rides along in the new entry instead of being thrown away.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use metaagent_provider::{ChatParams, Message, Provider};

use crate::stats::RunStats;

pub const PRUNED_PREFIX: &str = "[Pruned History Summary:";

const SUMMARIZER_PROMPT: &str =
    "You are a helpful AI assistant that summarizes command executions.";
const DIGEST_PROMPT: &str =
    "You are a helpful AI assistant that creates concise summaries of pruned history items.";

/// One recorded shell action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: String,
    pub output: String,
    pub reasoning: String,
    /// Model-written summary, possibly prefixed with a pruned digest.
    pub summary: String,
}

impl HistoryEntry {
    pub fn is_pruned(&self) -> bool {
        self.summary.starts_with(PRUNED_PREFIX)
    }
}

pub struct HistoryStore<P: Provider> {
    provider: Arc<P>,
    model: String,
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl<P: Provider> HistoryStore<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>, capacity: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Summaries, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.summary.clone()).collect()
    }

    /// Summarize and store one action, folding the oldest entry when full
    pub async fn record(
        &mut self,
        command: &str,
        output: &str,
        reasoning: &str,
        stats: &mut RunStats,
    ) -> crate::Result<()> {
        if self.capacity == 0 {
            debug!("◆ HISTORY DISABLED, NOT RECORDING `{}`", command);
            return Ok(());
        }

        let mut summary = self.summarize(command, output, reasoning, stats).await?;

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.entries.front() {
                let digest = self.digest(&oldest.summary, stats).await?;
                summary = format!("{} {}] {}", PRUNED_PREFIX, digest, summary);
            }
            while self.entries.len() >= self.capacity {
                self.entries.pop_front();
            }
            info!("◆ HISTORY FULL ({}), OLDEST ENTRY FOLDED", self.capacity);
        }

        self.entries.push_back(HistoryEntry {
            command: command.to_string(),
            output: output.to_string(),
            reasoning: reasoning.to_string(),
            summary,
        });

        Ok(())
    }

    async fn summarize(
        &self,
        command: &str,
        output: &str,
        reasoning: &str,
        stats: &mut RunStats,
    ) -> crate::Result<String> {
        let prompt = format!(
            "Summarize the following command execution in a concise manner:\n\
             Command: {}\n\
             Output: {}\n\
             Reasoning: {}\n\
             Provide a brief summary that captures the essence of the command, its output, and the reasoning behind it.",
            command, output, reasoning
        );
        self.complete(SUMMARIZER_PROMPT, prompt, stats).await
    }

    async fn digest(&self, oldest: &str, stats: &mut RunStats) -> crate::Result<String> {
        let prompt = format!(
            "Summarize the following pruned history item in a very concise manner:\n\
             {}\n\
             Provide a brief summary that captures the key points of this pruned history item.",
            oldest
        );
        self.complete(DIGEST_PROMPT, prompt, stats).await
    }

    async fn complete(
        &self,
        system: &str,
        prompt: String,
        stats: &mut RunStats,
    ) -> crate::Result<String> {
        let params = ChatParams::new(
            self.model.clone(),
            vec![Message::system(system), Message::user(prompt)],
        );
        let response = self.provider.chat(params).await?;
        stats.record(&response);
        Ok(response.content.trim().to_string())
    }
}
