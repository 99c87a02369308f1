// Core moderation module - the two-stage contact-sharing gate.
// Leaves first: rules -> fast filter / analyzer / extractor -> service.

pub mod detection_rules;
pub mod fast_filter;
pub mod moderation_models;
pub mod moderation_service;
pub mod semantic_analyzer;
pub mod verdict_extractor;

pub use detection_rules::RuleSet;
pub use fast_filter::FastFilter;
pub use moderation_models::*;
pub use moderation_service::ModerationService;
pub use semantic_analyzer::{default_moderation_prompt, SemanticAnalyzer};
