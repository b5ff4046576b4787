//! Feedback controller - the top-level plan/dispatch/aggregate loop

use std::sync::Arc;

use tracing::{debug, info, warn};

use metaagent_config::Config;
use metaagent_provider::{ChatParams, Provider};

use crate::aggregator::Aggregator;
use crate::context::ContextBuilder;
use crate::dispatcher::Dispatcher;
use crate::executor::CommandExecutor;
use crate::history::HistoryStore;
use crate::plan::{self, RoundOutcome};
use crate::stats::RunStats;

/// Static loop parameters, read once at startup
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub summary_model: String,
    /// Maximum plan rounds per query (D).
    pub max_depth: u32,
    /// History capacity (C).
    pub max_history_items: usize,
    /// Applied to the planning request.
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model(),
            summary_model: config.summary_model(),
            max_depth: config.max_recursion_depth(),
            max_history_items: config.max_history_items(),
            max_tokens: config.agent.max_tokens,
            temperature: config.agent.temperature,
        }
    }
}

/// Per-query loop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursionState {
    pub original_query: String,
    pub current_query: String,
    pub depth: u32,
}

impl RecursionState {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            original_query: query.clone(),
            current_query: query,
            depth: 0,
        }
    }

    /// State for the next round; depth grows by exactly one
    pub fn next(&self, current_query: String) -> Self {
        Self {
            original_query: self.original_query.clone(),
            current_query,
            depth: self.depth + 1,
        }
    }
}

/// Query for a refinement round
pub fn refinement_query(original_query: &str, latest: &str) -> String {
    format!(
        "Original query: {}\n\n\
         Latest result:\n{}\n\n\
         The latest result was marked as needing refinement. Improve it: fill gaps, \
         verify claims, and run further actions if needed.",
        original_query, latest
    )
}

/// Final answer plus accounting
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub answer: String,
    pub stats: RunStats,
}

pub struct FeedbackController<P: Provider> {
    provider: Arc<P>,
    settings: AgentSettings,
    context: ContextBuilder,
    dispatcher: Dispatcher<P>,
    aggregator: Aggregator<P>,
}

impl<P: Provider> FeedbackController<P> {
    pub fn new(provider: P, executor: Arc<dyn CommandExecutor>, settings: AgentSettings) -> Self {
        Self::with_shared_provider(Arc::new(provider), executor, settings)
    }

    pub fn with_shared_provider(
        provider: Arc<P>,
        executor: Arc<dyn CommandExecutor>,
        settings: AgentSettings,
    ) -> Self {
        let history = HistoryStore::new(
            Arc::clone(&provider),
            settings.summary_model.clone(),
            settings.max_history_items,
        );
        let dispatcher = Dispatcher::new(
            Arc::clone(&provider),
            settings.model.clone(),
            executor,
            history,
        );
        let aggregator = Aggregator::new(Arc::clone(&provider), settings.model.clone());

        Self {
            provider,
            settings,
            context: ContextBuilder::default(),
            dispatcher,
            aggregator,
        }
    }

    /// Replace the static instructions
    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore<P> {
        self.dispatcher.history()
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    /// Answer a query. Only completion/executor backend failures are errors.
    pub async fn run(&mut self, query: &str) -> crate::Result<RunOutput> {
        let mut stats = RunStats::new();
        let mut state = RecursionState::new(query);
        let mut latest: Option<String> = None;

        info!(
            "◆ QUERY RECEIVED ({} CHARS, MAX DEPTH {})",
            query.len(),
            self.settings.max_depth
        );

        loop {
            if state.depth >= self.settings.max_depth {
                warn!("◆ MAX RECURSION DEPTH {} REACHED", self.settings.max_depth);
                stats.depth_exhausted = true;
                let answer = latest.unwrap_or_else(|| state.current_query.clone());
                return Ok(RunOutput { answer, stats });
            }

            match self.round(&state, &mut stats).await? {
                RoundOutcome::Continue(answer) => {
                    debug!("◆ REFINEMENT REQUESTED AT DEPTH {}", state.depth);
                    state = state.next(refinement_query(&state.original_query, &answer));
                    latest = Some(answer);
                }
                RoundOutcome::Complete(answer) | RoundOutcome::Plain(answer) => {
                    info!(
                        "◆ ANSWER READY AFTER {} ROUND(S), {} CALL(S)",
                        stats.rounds, stats.calls
                    );
                    return Ok(RunOutput { answer, stats });
                }
            }
        }
    }

    /// One plan -> dispatch -> aggregate pass
    async fn round(&mut self, state: &RecursionState, stats: &mut RunStats) -> crate::Result<RoundOutcome> {
        stats.rounds += 1;
        info!("◆ ROUND {} (DEPTH {})", stats.rounds, state.depth);

        let history = self.dispatcher.history().snapshot();
        let snapshot = self.context.snapshot(
            &self.dispatcher.environment(),
            self.dispatcher.inventory().names(),
            &history,
        );

        let params = ChatParams {
            model: self.settings.model.clone(),
            messages: snapshot.messages(&state.current_query),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let response = self.provider.chat(params).await?;
        stats.record(&response);
        let plan_text = response.content;

        let parsed = plan::parse(&plan_text);
        if parsed.is_empty() {
            debug!("◆ PLAN HAS NO DIRECTIVES, PASSING THROUGH");
            return Ok(plan::classify(&plan_text));
        }

        info!("◆ PLAN HAS {} DIRECTIVE(S)", parsed.steps.len());
        let mut outputs = Vec::with_capacity(parsed.steps.len());
        for step in &parsed.steps {
            let result = self.dispatcher.dispatch(step, stats).await?;
            outputs.push(result.render());
        }

        match self
            .aggregator
            .aggregate(&outputs, &state.original_query, stats)
            .await
        {
            Ok(result) => {
                // Markers the aggregator dropped still count if the plan had them.
                let signal =
                    plan::detect_signal(&result).or_else(|| plan::detect_signal(&parsed.remainder));
                Ok(RoundOutcome::from_signal(signal, plan::strip_markers(&result)))
            }
            Err(e) => {
                warn!("◆ AGGREGATION FAILED, RETURNING PLAN TEXT: {}", e);
                Ok(plan::classify(&plan_text))
            }
        }
    }
}
