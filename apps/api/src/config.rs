use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Loaded once at startup and injected into `AppState` — no module reads
/// the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    pub hf_api_key: String,
    /// Ordered candidate model identifiers: primary first, then fallbacks.
    /// A 404 ("model not found") on one candidate advances to the next.
    pub models: Vec<String>,
    pub provider_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

const DEFAULT_MODEL: &str = "meta-llama/Llama-3-8b-chat";
const DEFAULT_FALLBACK_MODELS: &str = "distilgpt2";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let primary = std::env::var("HF_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let fallbacks = std::env::var("HF_FALLBACK_MODELS")
            .unwrap_or_else(|_| DEFAULT_FALLBACK_MODELS.to_string());

        Ok(Config {
            hf_api_key: require_env("HF_API_KEY")?,
            models: model_candidates(&primary, &fallbacks),
            provider_timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("PROVIDER_TIMEOUT_SECS must be a number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Builds the ordered candidate list: primary model, then the comma-separated
/// fallback list with blanks and duplicates of the primary removed.
fn model_candidates(primary: &str, fallbacks: &str) -> Vec<String> {
    let mut models = vec![primary.trim().to_string()];
    for fallback in fallbacks.split(',') {
        let fallback = fallback.trim();
        if !fallback.is_empty() && fallback != primary.trim() {
            models.push(fallback.to_string());
        }
    }
    models
}
