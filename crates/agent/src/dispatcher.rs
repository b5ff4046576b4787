//! Action dispatch
//!
//! Runs parsed directives one at a time. Command failures come back as
//! unsuccessful [`ActionResult`]s; only an unreachable backend is an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use metaagent_provider::{ChatParams, Message, Provider};

use crate::executor::CommandExecutor;
use crate::history::HistoryStore;
use crate::plan::{Directive, Step};
use crate::stats::RunStats;

/// Outcome of one directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub directive: Directive,
    pub raw_output: String,
    pub success: bool,
}

impl ActionResult {
    /// Labelled text handed to the aggregator
    pub fn render(&self) -> String {
        let status = if self.success { "" } else { " (FAILED)" };
        match &self.directive {
            Directive::ShellCommand(cmd) => {
                format!("Command `{}` output{}:\n{}", cmd, status, self.raw_output)
            }
            Directive::ExpertDelegation { name, .. } => {
                format!("{}{}: {}", name, status, self.raw_output)
            }
            Directive::InstallTool(name) => {
                format!("Tool installation ({}){}: {}", name, status, self.raw_output)
            }
        }
    }
}

/// Packages installed during this process, in install order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolInventory {
    tools: Vec<String>,
}

impl ToolInventory {
    pub fn add(&mut self, name: &str) {
        if !self.contains(name) {
            self.tools.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    pub fn names(&self) -> &[String] {
        &self.tools
    }
}

/// Package names are passed to the shell, so only plain names are accepted
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_' | ':'))
}

pub fn install_command(name: &str) -> String {
    format!("apt-get update && apt-get install -y {}", name)
}

pub struct Dispatcher<P: Provider> {
    provider: Arc<P>,
    model: String,
    executor: Arc<dyn CommandExecutor>,
    history: HistoryStore<P>,
    inventory: ToolInventory,
}

impl<P: Provider> Dispatcher<P> {
    pub fn new(
        provider: Arc<P>,
        model: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
        history: HistoryStore<P>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            executor,
            history,
            inventory: ToolInventory::default(),
        }
    }

    pub fn history(&self) -> &HistoryStore<P> {
        &self.history
    }

    pub fn inventory(&self) -> &ToolInventory {
        &self.inventory
    }

    pub fn environment(&self) -> String {
        self.executor.describe()
    }

    /// Run one step
    pub async fn dispatch(&mut self, step: &Step, stats: &mut RunStats) -> crate::Result<ActionResult> {
        info!("◆ DISPATCHING: {}", step.directive);

        let result = match &step.directive {
            Directive::ShellCommand(command) => {
                let output = self.executor.execute(command).await?;
                let success = output.success();
                if !success {
                    warn!("◆ COMMAND `{}` FAILED: {}", command, output.status);
                }
                let raw_output = output.report();
                self.history
                    .record(command, &raw_output, &step.reasoning, stats)
                    .await?;
                ActionResult {
                    directive: step.directive.clone(),
                    raw_output,
                    success,
                }
            }
            Directive::ExpertDelegation { name, instruction } => {
                let raw_output = self.consult_expert(name, instruction, stats).await?;
                ActionResult {
                    directive: step.directive.clone(),
                    raw_output,
                    success: true,
                }
            }
            Directive::InstallTool(name) => self.install(name, &step.reasoning, stats).await?,
        };

        debug!(
            "◆ RESULT ({}): {}",
            if result.success { "ok" } else { "failed" },
            &result.raw_output.chars().take(100).collect::<String>()
        );

        Ok(result)
    }

    /// Stateless completion under a fresh persona
    async fn consult_expert(
        &self,
        name: &str,
        instruction: &str,
        stats: &mut RunStats,
    ) -> crate::Result<String> {
        let params = ChatParams::new(
            self.model.clone(),
            vec![
                Message::system(format!("You are {}. {}", name, instruction)),
                Message::user(instruction),
            ],
        );
        let response = self.provider.chat(params).await?;
        stats.record(&response);
        Ok(response.content)
    }

    async fn install(
        &mut self,
        name: &str,
        reasoning: &str,
        stats: &mut RunStats,
    ) -> crate::Result<ActionResult> {
        let directive = Directive::InstallTool(name.to_string());

        if !is_valid_package_name(name) {
            warn!("◆ REFUSING TO INSTALL {:?}", name);
            return Ok(ActionResult {
                directive,
                raw_output: format!("Failed to install {}. Invalid package name.", name),
                success: false,
            });
        }

        let command = install_command(name);
        let output = self.executor.execute(&command).await?;
        let combined = format!("{}\n{}", output.stdout, output.stderr);

        let (raw_output, success) = if combined.contains("Unable to locate package") {
            (format!("Failed to install {}. Package not found.", name), false)
        } else if combined.contains("0 newly installed") {
            self.inventory.add(name);
            (format!("{} is already installed.", name), true)
        } else if output.success() {
            self.inventory.add(name);
            (format!("Successfully installed {}.", name), true)
        } else {
            (
                format!("Failed to install {}. {}", name, output.report().trim()),
                false,
            )
        };

        self.history
            .record(&command, &raw_output, reasoning, stats)
            .await?;

        Ok(ActionResult {
            directive,
            raw_output,
            success,
        })
    }
}
