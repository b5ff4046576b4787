//! Plan parsing
//!
//! Turns raw plan text into ordered directives. Directive order is execution
//! order; untagged text is kept as remainder and as per-step reasoning.

use std::fmt;

use tracing::warn;

pub mod outcome;
pub mod tokenizer;

pub use outcome::{classify, detect_signal, strip_markers, RoundOutcome};
pub use tokenizer::{Signal, TagKind, Token, Tokenizer, COMPLETE_MARKER, CONTINUE_MARKER};

/// A unit of work requested by the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ShellCommand(String),
    ExpertDelegation { name: String, instruction: String },
    InstallTool(String),
}

impl Directive {
    /// Build a directive from a tag payload
    fn from_payload(kind: TagKind, payload: &str) -> Result<Self, String> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err("empty payload".to_string());
        }
        match kind {
            TagKind::Execute => Ok(Directive::ShellCommand(payload.to_string())),
            TagKind::Install => Ok(Directive::InstallTool(payload.to_string())),
            TagKind::Expert => {
                // Split at the first colon only: instructions may contain colons.
                let (name, instruction) = payload
                    .split_once(':')
                    .ok_or_else(|| "expected `name: instruction`".to_string())?;
                let name = name.trim();
                let instruction = instruction.trim();
                if name.is_empty() || instruction.is_empty() {
                    return Err("expert name and instruction must be non-empty".to_string());
                }
                Ok(Directive::ExpertDelegation {
                    name: name.to_string(),
                    instruction: instruction.to_string(),
                })
            }
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, Directive::ShellCommand(_) | Directive::InstallTool(_))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::ShellCommand(cmd) => write!(f, "execute `{}`", cmd),
            Directive::ExpertDelegation { name, .. } => write!(f, "consult {}", name),
            Directive::InstallTool(name) => write!(f, "install {}", name),
        }
    }
}

/// A directive plus the untagged text that led up to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub directive: Directive,
    pub reasoning: String,
}

/// Problems found while parsing. None of them abort the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanIssue {
    /// Opening tag without a closing tag; parsing stopped here.
    Unterminated { tag: &'static str, offset: usize },
    /// Complete tag whose payload could not be used; the tag was skipped.
    InvalidPayload {
        tag: &'static str,
        offset: usize,
        reason: String,
    },
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanIssue::Unterminated { tag, offset } => {
                write!(f, "unterminated <{}> at byte {}", tag, offset)
            }
            PlanIssue::InvalidPayload {
                tag,
                offset,
                reason,
            } => write!(f, "invalid <{}> at byte {}: {}", tag, offset, reason),
        }
    }
}

/// Result of parsing one plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPlan {
    pub steps: Vec<Step>,
    /// All text outside successfully parsed directives.
    pub remainder: String,
    pub issues: Vec<PlanIssue>,
}

impl ParsedPlan {
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.steps.iter().map(|s| &s.directive)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// True when parsing stopped at an unterminated tag
    pub fn is_truncated(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, PlanIssue::Unterminated { .. }))
    }
}

/// Parse plan text into ordered steps
pub fn parse(plan: &str) -> ParsedPlan {
    let mut parsed = ParsedPlan::default();
    let mut reasoning = String::new();

    for token in Tokenizer::new(plan) {
        match token {
            Token::Text(text) => {
                parsed.remainder.push_str(text);
                reasoning.push_str(text);
            }
            Token::Marker(signal) => parsed.remainder.push_str(signal.marker()),
            Token::Directive {
                kind,
                payload,
                raw,
                offset,
            } => match Directive::from_payload(kind, payload) {
                Ok(directive) => parsed.steps.push(Step {
                    directive,
                    reasoning: std::mem::take(&mut reasoning).trim().to_string(),
                }),
                Err(reason) => {
                    warn!("◆ SKIPPING <{}> AT {}: {}", kind.name(), offset, reason);
                    parsed.remainder.push_str(raw);
                    parsed.issues.push(PlanIssue::InvalidPayload {
                        tag: kind.name(),
                        offset,
                        reason,
                    });
                }
            },
            Token::Unterminated { kind, raw, offset } => {
                warn!("◆ MALFORMED PLAN: UNTERMINATED <{}> AT {}", kind.name(), offset);
                parsed.remainder.push_str(raw);
                parsed.issues.push(PlanIssue::Unterminated {
                    tag: kind.name(),
                    offset,
                });
            }
        }
    }

    parsed
}
