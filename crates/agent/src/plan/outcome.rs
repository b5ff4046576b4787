//! Round outcome classification from control markers.

use super::tokenizer::{Signal, Token, Tokenizer};

/// What the controller should do with a round's result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Final answer, marker removed.
    Complete(String),
    /// Refinement requested; carries the latest answer with markers removed.
    Continue(String),
    /// No marker present; treated as final.
    Plain(String),
}

impl RoundOutcome {
    pub fn from_signal(signal: Option<Signal>, answer: String) -> Self {
        match signal {
            Some(Signal::Complete) => RoundOutcome::Complete(answer),
            Some(Signal::Continue) => RoundOutcome::Continue(answer),
            None => RoundOutcome::Plain(answer),
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            RoundOutcome::Complete(a) | RoundOutcome::Continue(a) | RoundOutcome::Plain(a) => a,
        }
    }

    pub fn into_answer(self) -> String {
        match self {
            RoundOutcome::Complete(a) | RoundOutcome::Continue(a) | RoundOutcome::Plain(a) => a,
        }
    }

    pub fn wants_more(&self) -> bool {
        matches!(self, RoundOutcome::Continue(_))
    }
}

/// First control marker in document order. The two markers are mutually
/// exclusive; when both appear the earlier one decides.
pub fn detect_signal(text: &str) -> Option<Signal> {
    Tokenizer::recovering(text).find_map(|token| match token {
        Token::Marker(signal) => Some(signal),
        _ => None,
    })
}

/// Text with every control marker removed. Trimmed only when a marker was
/// actually removed; marker-free text comes back unchanged.
pub fn strip_markers(text: &str) -> String {
    let mut removed = false;
    let mut stripped = String::with_capacity(text.len());
    for token in Tokenizer::recovering(text) {
        match token {
            Token::Marker(_) => removed = true,
            other => stripped.push_str(other.raw()),
        }
    }
    if removed {
        stripped.trim().to_string()
    } else {
        stripped
    }
}

/// Classify a round's result text
pub fn classify(text: &str) -> RoundOutcome {
    RoundOutcome::from_signal(detect_signal(text), strip_markers(text))
}
