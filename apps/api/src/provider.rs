//! Text-generation provider client — the single point of entry for all
//! Hugging Face Inference API calls.
//!
//! ARCHITECTURAL RULE: no other module may call the provider directly.
//! Handlers depend on the `TextGenerator` trait so they can be tested
//! against a stub without a network.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const HF_API_BASE: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_TOP_K: u32 = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / completion types
// ────────────────────────────────────────────────────────────────────────────

/// A single generation call. Immutable; constructed per request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: u32,
    /// Sampling temperature, clamped to [0.0, 1.0] at construction.
    pub temperature: f32,
    pub top_k: u32,
}

impl GenerationRequest {
    pub fn new(prompt: String, max_new_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt,
            max_new_tokens,
            temperature: temperature.clamp(0.0, 1.0),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Opaque provider output. May contain prose, fences, or commentary around
/// the JSON the prompt asked for — resolution is the resolver's job.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Status-coded provider failure. `ModelNotFound` is the only class that is
/// retryable with a fallback model; everything else propagates immediately.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid provider API key")]
    Unauthorized,

    #[error("Model '{model}' not found or inaccessible")]
    ModelNotFound { model: String },

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Provider error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

/// Coarse error category surfaced to callers for retry/abort decisions
/// and diagnostics. Network errors (including timeouts) are one bucket —
/// the transport does not distinguish them further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    Unauthorized,
    ModelNotFound,
    RateLimited,
    ServerError,
    Network,
}

impl ProviderError {
    pub fn category(&self) -> ProviderCategory {
        match self {
            ProviderError::Unauthorized => ProviderCategory::Unauthorized,
            ProviderError::ModelNotFound { .. } => ProviderCategory::ModelNotFound,
            ProviderError::RateLimited => ProviderCategory::RateLimited,
            ProviderError::Upstream { .. } | ProviderError::EmptyCompletion => {
                ProviderCategory::ServerError
            }
            ProviderError::Http(_) => ProviderCategory::Network,
        }
    }

    /// Whether the caller may retry this failure with a fallback model.
    pub fn retryable_with_fallback(&self) -> bool {
        matches!(self, ProviderError::ModelNotFound { .. })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TextGenerator trait + fallback loop
// ────────────────────────────────────────────────────────────────────────────

/// The provider seam. `AppState` carries an `Arc<dyn TextGenerator>` so the
/// HTTP client can be swapped for a stub in handler tests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<RawCompletion, ProviderError>;
}

/// Tries each candidate model in order, short-circuiting on the first
/// success. A 404 ("model not found") advances to the next candidate;
/// every other error class propagates immediately without trying further
/// fallbacks. There is no retry of the same candidate.
pub async fn generate_with_fallback(
    generator: &dyn TextGenerator,
    models: &[String],
    request: &GenerationRequest,
) -> Result<RawCompletion, ProviderError> {
    debug_assert!(!models.is_empty(), "candidate model list must be non-empty");

    let mut last_error = ProviderError::EmptyCompletion;

    for model in models {
        match generator.generate(model, request).await {
            Ok(completion) => {
                debug!("Generation succeeded with model {model}");
                return Ok(completion);
            }
            Err(e) if e.retryable_with_fallback() => {
                warn!("Model {model} unavailable, trying next candidate: {e}");
                last_error = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error)
}

// ────────────────────────────────────────────────────────────────────────────
// Hugging Face Inference API client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
    parameters: HfParameters,
    options: HfOptions,
}

#[derive(Debug, Serialize)]
struct HfParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

/// The inference API returns different shapes depending on the model:
/// a bare string, an object with `generated_text`, or an array of such
/// objects. All normalize to the generated text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfCompletion {
    Text(String),
    Single(HfGenerated),
    Many(Vec<HfGenerated>),
}

#[derive(Debug, Deserialize)]
struct HfGenerated {
    generated_text: String,
}

impl HfCompletion {
    fn into_text(self) -> Result<String, ProviderError> {
        match self {
            HfCompletion::Text(text) => Ok(text),
            HfCompletion::Single(g) => Ok(g.generated_text),
            HfCompletion::Many(mut items) => {
                if items.is_empty() {
                    Err(ProviderError::EmptyCompletion)
                } else {
                    Ok(items.swap_remove(0).generated_text)
                }
            }
        }
    }
}

/// Hugging Face Inference API client with a bounded request timeout.
/// A call exceeding the timeout surfaces as `ProviderError::Http`.
#[derive(Clone)]
pub struct HfClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HfClient {
    pub fn new(api_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()?,
            api_key,
            base_url: HF_API_BASE.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for HfClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<RawCompletion, ProviderError> {
        let body = HfRequest {
            inputs: request.prompt.as_str(),
            parameters: HfParameters {
                max_new_tokens: request.max_new_tokens,
                temperature: request.temperature,
                top_k: request.top_k,
            },
            options: HfOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(format!("{}/{model}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Provider returned {status} for model {model}: {message}");
            return Err(match status.as_u16() {
                401 => ProviderError::Unauthorized,
                404 => ProviderError::ModelNotFound {
                    model: model.to_string(),
                },
                429 => ProviderError::RateLimited,
                code => ProviderError::Upstream {
                    status: code,
                    message,
                },
            });
        }

        let text = response.json::<HfCompletion>().await?.into_text()?;

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }

        debug!("Provider completion: {} chars from model {model}", text.len());

        Ok(RawCompletion { text })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
