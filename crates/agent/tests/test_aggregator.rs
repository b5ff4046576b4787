//! Tests for result aggregation

mod common;

use std::sync::Arc;

use common::{call_kind, reply, user_text, CallKind, MockProvider};
use metaagent_agent::aggregator::NO_RESULTS;
use metaagent_agent::{Aggregator, RunStats};

#[tokio::test]
async fn test_empty_outputs_return_sentinel_without_a_call() {
    let mut mock = MockProvider::new();
    mock.expect_chat().times(0);

    let aggregator = Aggregator::new(Arc::new(mock), "planner");
    let mut stats = RunStats::new();

    let answer = aggregator.aggregate(&[], "q", &mut stats).await.unwrap();

    assert_eq!(answer, NO_RESULTS);
    assert_eq!(stats.calls, 0);
    assert!(stats.models_used.is_empty());
}

#[tokio::test]
async fn test_outputs_are_numbered_and_answer_trimmed() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .withf(|params| call_kind(params) == CallKind::Aggregate)
        .times(1)
        .returning(|params| {
            let text = user_text(&params);
            assert!(text.starts_with("Query: which files?"));
            assert!(text.contains("### Result 1\na.txt"));
            assert!(text.contains("### Result 2\nb.txt"));
            reply(&params, "  a.txt and b.txt\n")
        });

    let aggregator = Aggregator::new(Arc::new(mock), "planner");
    let mut stats = RunStats::new();
    let outputs = vec!["a.txt\n".to_string(), "b.txt".to_string()];

    let answer = aggregator
        .aggregate(&outputs, "which files?", &mut stats)
        .await
        .unwrap();

    assert_eq!(answer, "a.txt and b.txt");
    assert_eq!(stats.calls, 1);
}
