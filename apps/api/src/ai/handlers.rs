//! Axum route handlers for the AI endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::ai::prompts::{build_ats_prompt, build_resume_prompt};
use crate::errors::AppError;
use crate::provider::{generate_with_fallback, GenerationRequest};
use crate::resolver::{resolve, ATS_REPORT_SCHEMA, RESUME_SCHEMA};
use crate::state::AppState;

/// Provider parameters per endpoint. ATS checks are shorter and stricter
/// than full resume generation.
const RESUME_MAX_NEW_TOKENS: u32 = 600;
const RESUME_TEMPERATURE: f32 = 0.3;
const ATS_MAX_NEW_TOKENS: u32 = 400;
const ATS_TEMPERATURE: f32 = 0.2;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceInput {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationInput {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub year: String,
}

/// Candidate profile for resume generation. Field names are camelCase to
/// match the frontend contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResumeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub experience: Vec<ExperienceInput>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<EducationInput>,
    #[serde(default)]
    pub target_role: Option<String>,
}

fn default_title() -> String {
    "Software Engineer".to_string()
}

impl GenerateResumeRequest {
    /// Role to optimize for; falls back to the current title.
    pub fn target_role(&self) -> &str {
        self.target_role.as_deref().unwrap_or(&self.title)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsCheckRequest {
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub resume_fields: Option<Value>,
    #[serde(default)]
    pub job_description: String,
}

/// 200-level outcome for resume generation: either the resolved resume or a
/// graceful parse-failure diagnosis carrying the raw completion.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerateResumeResponse {
    Resolved { ok: bool, resume: Value },
    Unresolved { ok: bool, raw: String, message: String },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AtsCheckResponse {
    Resolved { ok: bool, result: Value },
    Unresolved { ok: bool, raw: String, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/ai/generate-resume
///
/// Builds an instruction prompt from the candidate profile, calls the
/// text-generation provider (iterating fallback models on 404), and resolves
/// the completion against the resume schema.
///
/// A completion that fails to resolve is still a 200: the client gets
/// `ok: false` with the raw text for diagnosis. Only input validation (400)
/// and provider transport failures (500) are error responses.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    Json(request): Json<GenerateResumeRequest>,
) -> Result<Json<GenerateResumeResponse>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let prompt = build_resume_prompt(&request);
    let generation = GenerationRequest::new(prompt, RESUME_MAX_NEW_TOKENS, RESUME_TEMPERATURE);

    let completion =
        generate_with_fallback(state.generator.as_ref(), &state.config.models, &generation)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Resume generation provider call failed ({:?}): {e}",
                    e.category()
                );
                AppError::Provider("Failed to generate resume".to_string())
            })?;

    match resolve(&completion.text, &RESUME_SCHEMA) {
        Ok(payload) => {
            info!("Generated resume for candidate '{}'", request.name);
            Ok(Json(GenerateResumeResponse::Resolved {
                ok: true,
                resume: payload.into_value(),
            }))
        }
        Err(failure) => {
            warn!(
                "Resume completion did not resolve: {}",
                failure.reason.message()
            );
            Ok(Json(GenerateResumeResponse::Unresolved {
                ok: false,
                message: failure.reason.message(),
                raw: failure.raw_text,
            }))
        }
    }
}

/// POST /api/ai/ats-check
///
/// Scores a resume (structured fields or plain text) against a job
/// description. Same outcome contract as resume generation.
pub async fn handle_ats_check(
    State(state): State<AppState>,
    Json(request): Json<AtsCheckRequest>,
) -> Result<Json<AtsCheckResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "jobDescription is required".to_string(),
        ));
    }

    let has_resume = request.resume_fields.is_some()
        || request
            .resume_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
    if !has_resume {
        return Err(AppError::Validation(
            "resumeText or resumeFields is required".to_string(),
        ));
    }

    let prompt = build_ats_prompt(&request);
    let generation = GenerationRequest::new(prompt, ATS_MAX_NEW_TOKENS, ATS_TEMPERATURE);

    let completion =
        generate_with_fallback(state.generator.as_ref(), &state.config.models, &generation)
            .await
            .map_err(|e| {
                tracing::error!("ATS check provider call failed ({:?}): {e}", e.category());
                AppError::Provider("Failed to run ATS check".to_string())
            })?;

    match resolve(&completion.text, &ATS_REPORT_SCHEMA) {
        Ok(payload) => Ok(Json(AtsCheckResponse::Resolved {
            ok: true,
            result: payload.into_value(),
        })),
        Err(failure) => {
            warn!(
                "ATS completion did not resolve: {}",
                failure.reason.message()
            );
            Ok(Json(AtsCheckResponse::Unresolved {
                ok: false,
                message: failure.reason.message(),
                raw: failure.raw_text,
            }))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
