// Moderation domain models - data structures for the contact-sharing gate.
//
// These are pure domain types with no transport dependencies.
// The gateway layer serializes `Verdict` straight onto the wire, so its field
// names are part of the external contract.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Text that replaces a blocked message. Must match byte for byte.
pub const REDACTION_NOTICE: &str =
    "⚠️ [تم حجب معلومات التواصل] - يرجى الالتزام ببروتوكول التواصل المرحلي حفاظاً على الخصوصية والجدية.";

/// Reason attached to every fast-path block.
pub const PATTERN_MATCH_REASON: &str = "Detected via pattern match";

/// Used when the semantic stage blocks but gives no usable reason.
pub const SEMANTIC_FALLBACK_REASON: &str = "Flagged by semantic analysis";

pub const MAX_RISK_SCORE: i64 = 10;

/// The moderation decision returned to the caller.
///
/// Construct through `Verdict::blocked` / `Verdict::allowed` so that
/// `clean_text` always agrees with `is_blocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_blocked: bool,
    pub reason: String,
    pub clean_text: String,
    pub risk_score: u8,
}

impl Verdict {
    /// A blocking verdict. An empty reason is replaced so blocked verdicts
    /// always explain themselves.
    pub fn blocked(reason: impl Into<String>, risk_score: i64) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            SEMANTIC_FALLBACK_REASON.to_string()
        } else {
            reason
        };

        Self {
            is_blocked: true,
            reason,
            clean_text: REDACTION_NOTICE.to_string(),
            risk_score: clamp_risk_score(risk_score),
        }
    }

    /// A non-blocking verdict that passes the original message through.
    pub fn allowed(original: &str, reason: impl Into<String>, risk_score: i64) -> Self {
        Self {
            is_blocked: false,
            reason: reason.into(),
            clean_text: original.to_string(),
            risk_score: clamp_risk_score(risk_score),
        }
    }

    /// The fail-open default: not blocked, no reason, zero risk.
    pub fn safe_default(original: &str) -> Self {
        Self::allowed(original, String::new(), 0)
    }
}

/// Clamp any integer into the `[0, 10]` risk range.
pub fn clamp_risk_score(score: i64) -> u8 {
    score.clamp(0, MAX_RISK_SCORE) as u8
}

/// Which stage produced the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Blocked by a deterministic pattern rule.
    FastPath { rule: &'static str },
    /// Decided by a successfully parsed semantic-stage response.
    Semantic,
    /// The semantic stage could not deliver a decision; the verdict is the
    /// fail-open default.
    Degraded(DegradedReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedReason {
    /// The capability call failed or timed out.
    CapabilityFailure(String),
    /// The capability answered but nothing usable could be parsed.
    MalformedOutput(String),
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::CapabilityFailure(e) => write!(f, "capability failure: {}", e),
            DegradedReason::MalformedOutput(e) => write!(f, "malformed analyzer output: {}", e),
        }
    }
}

/// A verdict plus the stage that produced it.
///
/// Only `verdict` crosses the wire; `stage` lets in-process callers tell a
/// genuinely clean message apart from a fail-open one.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub verdict: Verdict,
    pub stage: Stage,
}

impl ModerationOutcome {
    // No in-tree caller branches on this yet; the service logs the stage instead.
    #[allow(dead_code)]
    pub fn is_degraded(&self) -> bool {
        matches!(self.stage, Stage::Degraded(_))
    }
}

/// Inbound request at the boundary. `text` is optional so a missing field
/// surfaces as a client error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Tunables for the moderation pipeline.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Minimum number of digits in a run before the digit rule fires.
    pub digit_run_threshold: usize,
    /// Hard upper bound on a single semantic-stage call.
    pub semantic_timeout: Duration,
    /// Adds link and indirect-phrase detectors to the fast path.
    pub extended_rules: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            digit_run_threshold: 8,
            semantic_timeout: Duration::from_secs(10),
            extended_rules: false,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    /// The request carried no message to moderate.
    #[error("No text provided")]
    MissingText,

    #[error("Invalid detection pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Failure of the semantic capability. Callers treat every variant the same;
/// the split only exists so logs say what happened.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Semantic analysis timed out after {0:?}")]
    Timeout(Duration),
}
