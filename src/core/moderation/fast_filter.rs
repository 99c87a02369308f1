// Fast path: run the pattern rules and block immediately on a hit.

use super::detection_rules::RuleSet;
use super::moderation_models::{Verdict, MAX_RISK_SCORE, PATTERN_MATCH_REASON};

/// Deterministic first stage of the pipeline.
pub struct FastFilter {
    rules: RuleSet,
}

impl FastFilter {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// `Some` blocking verdict if any rule matches, `None` if inconclusive.
    ///
    /// Pattern hits always score the maximum; these rules are picked for a
    /// low false-positive rate.
    // The service goes through `check_with_rule`; this is the plain form.
    #[allow(dead_code)]
    pub fn check(&self, message: &str) -> Option<Verdict> {
        self.check_with_rule(message).map(|(verdict, _)| verdict)
    }

    /// Same as `check`, also naming the rule that fired.
    pub fn check_with_rule(&self, message: &str) -> Option<(Verdict, &'static str)> {
        let rule = self.rules.first_match(message)?;

        tracing::debug!(rule = rule.name(), "Fast path matched");

        Some((
            Verdict::blocked(PATTERN_MATCH_REASON, MAX_RISK_SCORE),
            rule.name(),
        ))
    }
}
