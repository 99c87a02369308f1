// Verdict extraction - turns the semantic stage's free-form reply into a
// trustworthy `Verdict`.
//
// The reply is untrusted. It's parsed into `ParsedVerdict` first, and nothing
// outside this module ever sees an unvalidated shape. `extract` can't fail:
// anything unusable becomes the fail-open default.

use super::moderation_models::{DegradedReason, ModerationOutcome, Stage, Verdict};
use serde::Deserialize;

/// The four fields the model is asked for, exactly as it sent them.
///
/// `risk_score` is kept as a raw JSON number so out-of-range or fractional
/// values can still be clamped instead of rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerVerdict {
    pub is_blocked: bool,
    pub reason: String,
    /// Required for the record to count as well-formed, but never copied into
    /// the verdict.
    #[allow(dead_code)]
    pub clean_text: String,
    pub risk_score: serde_json::Number,
}

impl AnalyzerVerdict {
    fn risk_score_i64(&self) -> Option<i64> {
        self.risk_score.as_i64().or_else(|| {
            self.risk_score
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        })
    }
}

/// Outcome of parsing the raw reply.
#[derive(Debug, Clone)]
pub enum ParsedVerdict {
    Parsed(AnalyzerVerdict),
    Unparseable(String),
}

/// Locate the first balanced `{ ... }` block in `raw`.
///
/// Braces inside JSON string literals are ignored, so a reason such as
/// `"uses {curly} text"` doesn't end the object early.
pub fn find_json_object(raw: &str) -> Option<&str> {
    json_candidates(raw).next()
}

/// Every balanced block in `raw`, in order of where it opens.
fn json_candidates(raw: &str) -> impl Iterator<Item = &str> {
    raw.match_indices('{')
        .filter_map(move |(start, _)| balanced_block_at(raw, start))
}

fn balanced_block_at(raw: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&raw[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_candidate(candidate: &str) -> Result<AnalyzerVerdict, String> {
    let parsed: AnalyzerVerdict = serde_json::from_str(candidate)
        .map_err(|e| format!("invalid verdict object: {}", e))?;

    if parsed.risk_score_i64().is_none() {
        return Err("risk_score is not a finite number".to_string());
    }

    Ok(parsed)
}

/// Parse the raw reply into the expected record, or explain why not.
///
/// Blocks are tried in order and the first one shaped like a verdict wins, so
/// prose such as `checked {message}` ahead of the real object is skipped.
pub fn parse_analyzer_output(raw: &str) -> ParsedVerdict {
    let mut first_error = None;

    for candidate in json_candidates(raw) {
        match parse_candidate(candidate) {
            Ok(parsed) => return ParsedVerdict::Parsed(parsed),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    ParsedVerdict::Unparseable(
        first_error.unwrap_or_else(|| "no JSON object in response".to_string()),
    )
}

/// Validate a parsed record and rebuild it so the verdict invariants hold:
/// `risk_score` clamped to `[0, 10]`, and `clean_text` taken from the
/// redaction notice or the original message rather than from the model.
pub fn normalize(parsed: &AnalyzerVerdict, original: &str) -> Verdict {
    let score = parsed.risk_score_i64().unwrap_or(0);

    if parsed.is_blocked {
        Verdict::blocked(parsed.reason.trim(), score)
    } else {
        Verdict::allowed(original, parsed.reason.trim(), score)
    }
}

/// Raw reply to `Verdict`. Never fails.
// The service needs the stage too and calls `extract_outcome` directly.
#[allow(dead_code)]
pub fn extract(raw: &str, original: &str) -> Verdict {
    extract_outcome(raw, original).verdict
}

/// Like `extract`, but records whether the reply was usable.
pub fn extract_outcome(raw: &str, original: &str) -> ModerationOutcome {
    match parse_analyzer_output(raw) {
        ParsedVerdict::Parsed(parsed) => ModerationOutcome {
            verdict: normalize(&parsed, original),
            stage: Stage::Semantic,
        },
        ParsedVerdict::Unparseable(why) => ModerationOutcome {
            verdict: Verdict::safe_default(original),
            stage: Stage::Degraded(DegradedReason::MalformedOutput(why)),
        },
    }
}
