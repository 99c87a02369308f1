// Moderation service - the single entry point of the moderation core.
//
// Pipeline:
//   fast filter --hit--> blocked (no model call)
//        |
//       miss
//        v
//   semantic analyzer --error/timeout--> fail-open default
//        |
//       text
//        v
//   verdict extractor --> verdict
//
// NO transport dependencies here - the gateway layer owns request parsing and
// response framing.

use super::fast_filter::FastFilter;
use super::moderation_models::{
    DegradedReason, ModerationError, ModerationOutcome, ModerationRequest, Stage, Verdict,
};
use super::semantic_analyzer::SemanticAnalyzer;
use super::verdict_extractor;
use crate::core::ai::AiProvider;

/// Sequences the two moderation stages. Holds no per-request state, so one
/// instance can serve any number of concurrent tasks.
pub struct ModerationService<P: AiProvider> {
    fast_filter: FastFilter,
    analyzer: SemanticAnalyzer<P>,
}

impl<P: AiProvider> ModerationService<P> {
    pub fn new(fast_filter: FastFilter, analyzer: SemanticAnalyzer<P>) -> Self {
        Self {
            fast_filter,
            analyzer,
        }
    }

    /// Moderate one message. Always yields a well-formed verdict.
    pub async fn moderate(&self, message: &str) -> Verdict {
        self.moderate_detailed(message).await.verdict
    }

    /// Moderate one message and report which stage decided it.
    pub async fn moderate_detailed(&self, message: &str) -> ModerationOutcome {
        if let Some((verdict, rule)) = self.fast_filter.check_with_rule(message) {
            return ModerationOutcome {
                verdict,
                stage: Stage::FastPath { rule },
            };
        }

        let raw = match self.analyzer.analyze(message).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    model = self.analyzer.model(),
                    error = %e,
                    "Semantic stage unavailable, failing open"
                );
                return ModerationOutcome {
                    verdict: Verdict::safe_default(message),
                    stage: Stage::Degraded(DegradedReason::CapabilityFailure(e.to_string())),
                };
            }
        };

        let outcome = verdict_extractor::extract_outcome(&raw, message);

        match &outcome.stage {
            Stage::Degraded(reason) => {
                tracing::warn!(%reason, "Semantic stage output unusable, failing open");
            }
            _ => {
                tracing::debug!(
                    is_blocked = outcome.verdict.is_blocked,
                    risk_score = outcome.verdict.risk_score,
                    "Semantic stage decided"
                );
            }
        }

        outcome
    }

    /// Boundary entry: validate the request, then moderate.
    ///
    /// A missing or blank `text` is the only error; the pipeline is not run.
    pub async fn handle_request(
        &self,
        request: &ModerationRequest,
    ) -> Result<Verdict, ModerationError> {
        let text = request
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ModerationError::MissingText)?;

        Ok(self.moderate(text).await)
    }
}

// ============================================================================
// TESTS
// ============================================================================
