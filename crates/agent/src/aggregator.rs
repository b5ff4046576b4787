//! Result aggregation: many raw outputs in, one answer out.

use std::sync::Arc;

use metaagent_provider::{ChatParams, Message, Provider};

use crate::plan::CONTINUE_MARKER;
use crate::stats::RunStats;

/// Returned for an empty result set, without calling the model
pub const NO_RESULTS: &str = "No results were produced.";

pub struct Aggregator<P: Provider> {
    provider: Arc<P>,
    model: String,
}

impl<P: Provider> Aggregator<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn aggregate(
        &self,
        outputs: &[String],
        original_query: &str,
        stats: &mut RunStats,
    ) -> crate::Result<String> {
        if outputs.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }

        let params = ChatParams::new(
            self.model.clone(),
            vec![
                Message::system(format!(
                    "You combine the results of executed actions into a single answer for the user. \
                     Answer the user's query in natural language, grounded only in the results provided. \
                     If an action failed, say so and explain what that means for the answer. \
                     If the query cannot be fully answered yet and another round of actions would help, \
                     end your answer with {}.",
                    CONTINUE_MARKER
                )),
                Message::user(format!(
                    "Query: {}\n\nResults:\n{}",
                    original_query,
                    serialize_outputs(outputs)
                )),
            ],
        );

        let response = self.provider.chat(params).await?;
        stats.record(&response);
        Ok(response.content.trim().to_string())
    }
}

/// Numbered sections, one per output
pub fn serialize_outputs(outputs: &[String]) -> String {
    outputs
        .iter()
        .enumerate()
        .map(|(i, output)| format!("### Result {}\n{}", i + 1, output.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
