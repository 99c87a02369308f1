// This is the entry point of the contact-sharing moderation gate.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (model APIs, databases)
// - `gateway/` = Request boundary adapters
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Hand stdin/stdout to the gateway, or run a one-shot account deletion

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "gateway/gateway_layer.rs"]
mod gateway;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::accounts::AccountService;
use crate::core::ai::{AiConfig, AiProvider};
use crate::core::moderation::{
    default_moderation_prompt, FastFilter, ModerationConfig, ModerationService, RuleSet,
    SemanticAnalyzer,
};
use crate::gateway::stdio;
use crate::infra::accounts::SqliteAccountStore;
use crate::infra::ai::{GeminiClient, OpenRouterClient};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_MAX_IN_FLIGHT: usize = 64;
const DEFAULT_ACCOUNTS_DATABASE: &str = "accounts.db";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate JSON Lines requests from stdin (the default)
    Serve,
    /// Delete a member's records and identity. The id must already be verified.
    DeleteAccount {
        /// Verified user id
        user_id: String,
        /// SQLite database path (falls back to ACCOUNTS_DATABASE_PATH)
        #[arg(long)]
        database: Option<String>,
    },
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Parse one variable through `lookup`, ignoring it if it's malformed.
fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn moderation_config_from<F>(lookup: F) -> ModerationConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ModerationConfig::default();

    ModerationConfig {
        digit_run_threshold: parse_var(&lookup, "MODERATION_DIGIT_RUN_THRESHOLD")
            .unwrap_or(defaults.digit_run_threshold),
        semantic_timeout: parse_var::<u64, _>(&lookup, "MODERATION_SEMANTIC_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.semantic_timeout),
        extended_rules: parse_var(&lookup, "MODERATION_EXTENDED_RULES")
            .unwrap_or(defaults.extended_rules),
    }
}

fn max_in_flight_from<F>(lookup: F) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    parse_var(&lookup, "MODERATION_MAX_IN_FLIGHT").unwrap_or(DEFAULT_MAX_IN_FLIGHT)
}

fn load_system_prompt() -> String {
    match std::env::var("MODERATION_SYSTEM_PROMPT_FILE") {
        Ok(path) => std::fs::read_to_string(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to read system prompt file at {}: {}", path, e);
            default_moderation_prompt()
        }),
        Err(_) => default_moderation_prompt(),
    }
}

/// Build the semantic-stage client once; it's shared read-only afterwards.
fn build_provider() -> anyhow::Result<(Box<dyn AiProvider>, String)> {
    let provider = std::env::var("MODERATION_PROVIDER").unwrap_or_else(|_| "gemini".to_string());

    let (client, default_model): (Box<dyn AiProvider>, &str) =
        match provider.to_lowercase().as_str() {
            "gemini" => {
                let api_key = std::env::var("GEMINI_API_KEY")
                    .context("Missing GEMINI_API_KEY environment variable!")?;
                (Box::new(GeminiClient::new(api_key)), DEFAULT_GEMINI_MODEL)
            }
            "openrouter" => {
                let api_key = std::env::var("OPENROUTER_API_KEY")
                    .context("Missing OPENROUTER_API_KEY environment variable!")?;
                (
                    Box::new(OpenRouterClient::new(api_key)),
                    DEFAULT_OPENROUTER_MODEL,
                )
            }
            other => anyhow::bail!(
                "Unknown MODERATION_PROVIDER '{}' (expected 'gemini' or 'openrouter')",
                other
            ),
        };

    let model = std::env::var("MODERATION_MODEL").unwrap_or_else(|_| default_model.to_string());
    tracing::info!(provider = %provider, model = %model, "Semantic stage configured");

    Ok((client, model))
}

// ============================================================================
// COMMANDS
// ============================================================================

async fn serve() -> anyhow::Result<()> {
    let moderation_config = moderation_config_from(env_lookup);

    let rules = RuleSet::standard(&moderation_config)?;
    tracing::info!(
        rules = ?rules.names(),
        digit_run_threshold = moderation_config.digit_run_threshold,
        "Fast-path rules loaded"
    );
    let fast_filter = FastFilter::new(rules);

    let (provider, model) = build_provider()?;
    let ai_config = AiConfig {
        model,
        temperature: 0.0,
        max_tokens: None,
        top_p: None,
        json_output: true,
    };
    let analyzer = SemanticAnalyzer::new(
        provider,
        load_system_prompt(),
        ai_config,
        moderation_config.semantic_timeout,
    );

    let service = Arc::new(ModerationService::new(fast_filter, analyzer));
    let max_in_flight = max_in_flight_from(env_lookup);

    tracing::info!("🛡️ Moderation gate ready, reading requests from stdin");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    stdio::run(service, stdin, &mut stdout, max_in_flight).await?;

    tracing::info!("Input closed, shutting down");
    Ok(())
}

async fn delete_account(user_id: &str, database: Option<String>) -> anyhow::Result<()> {
    let database = database
        .or_else(|| env_lookup("ACCOUNTS_DATABASE_PATH"))
        .unwrap_or_else(|| DEFAULT_ACCOUNTS_DATABASE.to_string());

    let store = SqliteAccountStore::new(&database)
        .await
        .context("Failed to open accounts database")?;
    let service = AccountService::new(store);

    let report = service.delete_account(user_id).await?;
    println!(
        "{}",
        serde_json::json!({
            "deleted": true,
            "profiles_removed": report.profiles_removed,
            "private_records_removed": report.private_records_removed,
        })
    );

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries responses
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::DeleteAccount { user_id, database } => {
            delete_account(&user_id, database).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let config = moderation_config_from(lookup_from(&[]));

        assert_eq!(config.digit_run_threshold, 8);
        assert_eq!(config.semantic_timeout, Duration::from_secs(10));
        assert!(!config.extended_rules);
        assert_eq!(max_in_flight_from(lookup_from(&[])), DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn test_config_reads_values() {
        let lookup = lookup_from(&[
            ("MODERATION_DIGIT_RUN_THRESHOLD", " 10 "),
            ("MODERATION_SEMANTIC_TIMEOUT_SECS", "3"),
            ("MODERATION_EXTENDED_RULES", "true"),
            ("MODERATION_MAX_IN_FLIGHT", "4"),
        ]);

        let config = moderation_config_from(&lookup);

        assert_eq!(config.digit_run_threshold, 10);
        assert_eq!(config.semantic_timeout, Duration::from_secs(3));
        assert!(config.extended_rules);
        assert_eq!(max_in_flight_from(&lookup), 4);
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let lookup = lookup_from(&[
            ("MODERATION_DIGIT_RUN_THRESHOLD", "eight"),
            ("MODERATION_SEMANTIC_TIMEOUT_SECS", "-1"),
            ("MODERATION_EXTENDED_RULES", "yes"),
            ("MODERATION_MAX_IN_FLIGHT", ""),
        ]);

        let config = moderation_config_from(&lookup);

        assert_eq!(config.digit_run_threshold, 8);
        assert_eq!(config.semantic_timeout, Duration::from_secs(10));
        assert!(!config.extended_rules);
        assert_eq!(max_in_flight_from(&lookup), DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["contact_guard"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["contact_guard", "delete-account", "u1"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::DeleteAccount { ref user_id, database: None }) if user_id == "u1"
        ));
    }
}
