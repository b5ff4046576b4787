//! Per-query completion accounting

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use metaagent_provider::ChatResponse;

/// Counters accumulated over one `run`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Completion calls of every kind (plan, expert, aggregation, summary).
    pub calls: u32,
    pub total_latency: Duration,
    pub models_used: BTreeSet<String>,
    /// Plan rounds started.
    pub rounds: u32,
    pub depth_exhausted: bool,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, response: &ChatResponse) {
        self.calls += 1;
        self.total_latency += response.latency;
        self.models_used.insert(response.model.clone());
    }

    pub fn report(&self) -> StatsReport {
        StatsReport {
            calls: self.calls,
            total_latency: self.total_latency.as_secs_f64(),
            models_used: self.models_used.iter().cloned().collect(),
            rounds: self.rounds,
            depth_exhausted: self.depth_exhausted,
        }
    }
}

/// Wire shape of [`RunStats`]; latency in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub calls: u32,
    pub total_latency: f64,
    pub models_used: Vec<String>,
    pub rounds: u32,
    pub depth_exhausted: bool,
}
