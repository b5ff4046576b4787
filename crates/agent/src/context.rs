//! System prompt assembly
//!
//! The prompt is rebuilt for every round from static instructions plus the
//! facts that may have changed: execution environment, installed tools and
//! the history snapshot. Nothing is appended to a long-lived string.

use chrono::Local;

use metaagent_provider::Message;

use crate::plan::{COMPLETE_MARKER, CONTINUE_MARKER};

/// Default instructions for the planning model
pub fn default_instructions() -> String {
    format!(
        r#"# Meta-Expert

You are Meta-Expert, an agent that answers queries by planning and running actions inside a containerized environment, consulting expert personas, and synthesizing the results.

## Actions

Write actions as tags. They run one at a time, in the order written, so later actions can rely on earlier ones.
- Run a shell command: <Execute>ls -la</Execute>
- Consult an expert: <Expert>Expert Name: the instruction for the expert</Expert>
- Install a package: <Install>package-name</Install>

Text before an action is kept as the reasoning for it. Do not nest tags.

## Answering

If no action is needed, answer directly without tags.
If the answer is final, include {complete}.
If the answer needs another pass of refinement, include {required}.

Be careful with commands: respect the allowed command list, and never run destructive commands the user did not ask for."#,
        complete = COMPLETE_MARKER,
        required = CONTINUE_MARKER,
    )
}

/// Immutable system prompt for one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSnapshot {
    text: String,
}

impl PromptSnapshot {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// `[system, user(query)]`
    pub fn messages(&self, query: &str) -> Vec<Message> {
        vec![Message::system(self.text.clone()), Message::user(query)]
    }
}

/// Builds prompt snapshots around fixed instructions
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    instructions: String,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(default_instructions())
    }
}

impl ContextBuilder {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn snapshot(
        &self,
        environment: &str,
        installed_tools: &[String],
        history: &[String],
    ) -> PromptSnapshot {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");

        let mut parts = vec![
            self.instructions.clone(),
            format!("## Current Time\n{}", now),
            format!("## Environment\n{}", environment),
        ];

        let tools = if installed_tools.is_empty() {
            "none".to_string()
        } else {
            installed_tools.join(", ")
        };
        parts.push(format!("## Installed Tools\n{}", tools));

        if !history.is_empty() {
            let lines: Vec<String> = history
                .iter()
                .enumerate()
                .map(|(i, summary)| format!("{}. {}", i + 1, summary))
                .collect();
            parts.push(format!("## Recent History\n{}", lines.join("\n")));
        }

        PromptSnapshot {
            text: parts.join("\n\n"),
        }
    }
}
