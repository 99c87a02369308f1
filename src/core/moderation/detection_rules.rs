// Fast-path detection rules.
//
// Each rule is a cheap, deterministic predicate over the raw message. The rule
// set is an ordered list evaluated until the first match; adding a detector
// means implementing `DetectionRule` and appending it, nothing else changes.

use super::moderation_models::{ModerationConfig, ModerationError};
use regex::Regex;

/// A named predicate over a message.
pub trait DetectionRule: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether the message trips this rule.
    fn matches(&self, message: &str) -> bool;
}

// ============================================================================
// DIGIT RUNS
// ============================================================================

/// Flags phone numbers, including ones split with spaces or separators and
/// ones written in Arabic-Indic numerals.
pub struct DigitRunRule {
    threshold: usize,
}

impl DigitRunRule {
    pub fn new(threshold: usize) -> Self {
        // A zero threshold would match every message.
        Self {
            threshold: threshold.max(1),
        }
    }

    /// Western, Arabic-Indic (U+0660..U+0669) and Extended Arabic-Indic
    /// (U+06F0..U+06F9) digits.
    fn is_digit(c: char) -> bool {
        c.is_ascii_digit()
            || ('\u{0660}'..='\u{0669}').contains(&c)
            || ('\u{06F0}'..='\u{06F9}').contains(&c)
    }

    /// Characters that may sit between digits without breaking a run.
    fn is_separator(c: char) -> bool {
        c.is_whitespace() || matches!(c, '-' | '.' | '(' | ')' | '+')
    }
}

impl DetectionRule for DigitRunRule {
    fn name(&self) -> &'static str {
        "digit_run"
    }

    fn matches(&self, message: &str) -> bool {
        let mut run = 0usize;

        for c in message.chars() {
            if Self::is_digit(c) {
                run += 1;
                if run >= self.threshold {
                    return true;
                }
            } else if !Self::is_separator(c) {
                run = 0;
            }
        }

        false
    }
}

// ============================================================================
// HANDLE MENTIONS
// ============================================================================

/// Flags `@name` style social handles.
pub struct HandleMentionRule {
    pattern: Regex,
}

impl HandleMentionRule {
    pub fn new() -> Result<Self, ModerationError> {
        Ok(Self {
            pattern: Regex::new(r"@\w+")?,
        })
    }
}

impl DetectionRule for HandleMentionRule {
    fn name(&self) -> &'static str {
        "handle_mention"
    }

    fn matches(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

// ============================================================================
// LINKS
// ============================================================================

/// Flags URLs and bare domains.
pub struct LinkRule {
    pattern: Regex,
}

impl LinkRule {
    pub fn new() -> Result<Self, ModerationError> {
        Ok(Self {
            pattern: Regex::new(
                r"(?i)(?:https?://|www\.)\S+|\b[a-z0-9][a-z0-9-]*\.(?:com|net|org|io|me|co|sa|app|ly|gg|link)\b",
            )?,
        })
    }
}

impl DetectionRule for LinkRule {
    fn name(&self) -> &'static str {
        "link"
    }

    fn matches(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

// ============================================================================
// INDIRECT PHRASES
// ============================================================================

/// Phrases that point the other person at an off-platform channel.
const CONTACT_PHRASES: &[&str] = &[
    "find me on",
    "add me on",
    "dm me on",
    "text me on",
    "hit me up on",
    "my number",
    "my phone",
    "my snap",
    "snapchat",
    "whatsapp",
    "whats app",
    "telegram",
    "instagram",
    "رقمي",
    "واتساب",
    "واتس",
    "سناب",
    "تيليجرام",
    "تلجرام",
    "انستقرام",
    "انستا",
    "كلمني على",
    "ضيفني",
];

/// Flags indirect requests to move the conversation elsewhere.
pub struct ContactPhraseRule {
    phrases: Vec<String>,
}

impl ContactPhraseRule {
    pub fn new() -> Self {
        Self {
            phrases: CONTACT_PHRASES.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl DetectionRule for ContactPhraseRule {
    fn name(&self) -> &'static str {
        "contact_phrase"
    }

    fn matches(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Ordered collection of detectors. Built once at startup and shared
/// read-only between requests.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn DetectionRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Digit runs and handle mentions, plus links and contact phrases when
    /// `extended_rules` is on.
    pub fn standard(config: &ModerationConfig) -> Result<Self, ModerationError> {
        let mut rules = Self::new()
            .with_rule(DigitRunRule::new(config.digit_run_threshold))
            .with_rule(HandleMentionRule::new()?);

        if config.extended_rules {
            rules = rules
                .with_rule(LinkRule::new()?)
                .with_rule(ContactPhraseRule::new());
        }

        Ok(rules)
    }

    /// Append a rule. It runs after every rule already in the set.
    pub fn with_rule(mut self, rule: impl DetectionRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// The first rule that matches, if any. Later rules are not evaluated.
    pub fn first_match(&self, message: &str) -> Option<&dyn DetectionRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map(|rule| rule.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}
