//! Prompt construction for the AI endpoints.
//!
//! Templates embed the same schema snippet the resolver validates against
//! (`ExpectedSchema::prompt_schema`), so prompt and validation cannot drift.

use serde_json::json;

use crate::ai::handlers::{AtsCheckRequest, GenerateResumeRequest};
use crate::resolver::{ATS_REPORT_SCHEMA, RESUME_SCHEMA};

/// Resume generation prompt template.
/// Replace: {schema}, {name}, {title}, {target_role}, {skills}, {education}, {experience}
const RESUME_PROMPT_TEMPLATE: &str = r#"You are a professional resume writer.
Create an ATS-friendly, concise resume JSON for the candidate described below.
Return ONLY valid JSON (no extra commentary). The JSON schema must be:

{schema}

Candidate data:
Name: {name}
Current title: {title}
Target role: {target_role}
Skills: {skills}
Education: {education}
Experience entries: {experience}

Make summary 2-3 sentences focusing on achievements and metrics if possible.
Choose keywords that recruiters would search for (return as array).
Use short action-oriented bullets for experiences.
Make output compact and valid JSON."#;

/// ATS check prompt template.
/// Replace: {schema}, {job_description}, {resume}
const ATS_PROMPT_TEMPLATE: &str = r#"You are an expert recruiter and ATS consultant. Compare the candidate resume below with the Job Description.
Return ONLY valid JSON with fields:
{schema}

Job Description:
{job_description}

Resume:
{resume}

Instructions:
- Compute score 0-100 based on keyword match, role fit, and formatting suggestions.
- List missing keywords that appear in JD but not in resume.
- Provide short actionable suggestions tailored to the resume (3-6 items).
- Return valid JSON only."#;

/// Builds the resume generation prompt from the candidate profile.
/// Optional sections render as "Not provided" rather than being omitted, so
/// the model never invents data for an absent section.
pub fn build_resume_prompt(request: &GenerateResumeRequest) -> String {
    let skills = if request.skills.is_empty() {
        "Not provided".to_string()
    } else {
        request.skills.join(", ")
    };
    let education = if request.education.is_empty() {
        "Not provided".to_string()
    } else {
        json!(request.education).to_string()
    };
    let experience = if request.experience.is_empty() {
        "Not provided".to_string()
    } else {
        json!(request.experience).to_string()
    };

    RESUME_PROMPT_TEMPLATE
        .replace("{schema}", RESUME_SCHEMA.prompt_schema)
        .replace("{name}", &request.name)
        .replace("{title}", &request.title)
        .replace("{target_role}", request.target_role())
        .replace("{skills}", &skills)
        .replace("{education}", &education)
        .replace("{experience}", &experience)
}

/// Builds the ATS check prompt. Structured resume fields take precedence
/// over free text when both are supplied.
pub fn build_ats_prompt(request: &AtsCheckRequest) -> String {
    let resume = match &request.resume_fields {
        Some(fields) => fields.to_string(),
        None => request.resume_text.clone().unwrap_or_default(),
    };

    ATS_PROMPT_TEMPLATE
        .replace("{schema}", ATS_REPORT_SCHEMA.prompt_schema)
        .replace("{job_description}", &request.job_description)
        .replace("{resume}", &resume)
}
