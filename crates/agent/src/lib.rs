//! Meta-agent core
//!
//! Plans with a completion model, runs the directives it emits, folds the
//! results into one answer and loops while the model asks for refinement.

use thiserror::Error;

pub mod aggregator;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod feedback;
pub mod history;
pub mod plan;
pub mod stats;

pub use aggregator::Aggregator;
pub use context::{ContextBuilder, PromptSnapshot};
pub use dispatcher::{ActionResult, Dispatcher, ToolInventory};
pub use executor::{CommandExecutor, CommandPolicy, ExecError, ExecOutput, GuardedExecutor};
pub use feedback::{AgentSettings, FeedbackController, RunOutput};
pub use history::{HistoryEntry, HistoryStore};
pub use plan::{parse, Directive, ParsedPlan, RoundOutcome, Step};
pub use stats::{RunStats, StatsReport};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ COMPLETION BACKEND FAILURE: {0}")]
    Provider(#[from] metaagent_provider::ProviderError),

    #[error(transparent)]
    Executor(#[from] ExecError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
