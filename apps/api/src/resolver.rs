#![allow(dead_code)]

//! Generation Response Resolver — converts raw model output into a
//! schema-tagged payload or a typed failure.
//!
//! Generative models are not guaranteed to emit pure JSON even when
//! instructed to, so resolution is two-phase: strict parse first, then
//! extraction of the embedded object span. A resolver call is a pure
//! function of its input text plus schema — no I/O, no retries (fallback
//! across models is caller policy in the provider module).

use serde_json::{Map, Value};

use crate::provider::{ProviderCategory, ProviderError};

// ────────────────────────────────────────────────────────────────────────────
// Schemas
// ────────────────────────────────────────────────────────────────────────────

/// Which consumer contract a resolved payload conforms to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Resume,
    AtsReport,
}

/// A consumer contract: the required top-level fields, plus the JSON shape
/// shown to the model in the prompt. Keeping both here means the schema the
/// model is asked for and the schema the resolver checks cannot drift apart.
///
/// Field PRESENCE only — deep type validation (score ranges, array element
/// shapes) is caller policy, not resolver contract.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedSchema {
    pub kind: SchemaKind,
    pub required_fields: &'static [&'static str],
    /// The schema block embedded verbatim in instruction prompts.
    pub prompt_schema: &'static str,
}

pub const RESUME_SCHEMA: ExpectedSchema = ExpectedSchema {
    kind: SchemaKind::Resume,
    required_fields: &[
        "name",
        "title",
        "summary",
        "experiences",
        "skills",
        "education",
        "keywords",
    ],
    prompt_schema: r#"{
  "name": string,
  "title": string,
  "summary": string,
  "experiences": [
    { "company": string, "title": string, "start": string, "end": string, "bullets": [string] }
  ],
  "skills": [string],
  "education": [
    { "degree": string, "institute": string, "year": string }
  ],
  "keywords": [string]
}"#,
};

pub const ATS_REPORT_SCHEMA: ExpectedSchema = ExpectedSchema {
    kind: SchemaKind::AtsReport,
    // score and matchPercentage are independent caller-defined fields;
    // no relationship between them is enforced here.
    required_fields: &[
        "score",
        "matchPercentage",
        "missingKeywords",
        "topMatchedKeywords",
        "suggestions",
    ],
    prompt_schema: r#"{
  "score": number,
  "matchPercentage": number,
  "missingKeywords": [string],
  "topMatchedKeywords": [string],
  "suggestions": [string]
}"#,
};

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

/// A schema-conformant object extracted from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPayload {
    pub schema: SchemaKind,
    pub fields: Map<String, Value>,
}

impl ResolvedPayload {
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Why resolution failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// No parseable JSON object anywhere in the completion.
    NotJson,
    /// Parsed, but required top-level fields are absent.
    SchemaMismatch { missing: Vec<String> },
    /// Transport-level failure — short-circuits before any parsing.
    Provider(ProviderCategory),
}

impl FailureReason {
    /// Short diagnostic message surfaced to clients in `ok: false` bodies.
    pub fn message(&self) -> String {
        match self {
            FailureReason::NotJson => "Model output not valid JSON".to_string(),
            FailureReason::SchemaMismatch { missing } => {
                format!("Model output missing required fields: {}", missing.join(", "))
            }
            FailureReason::Provider(category) => {
                format!("Provider call failed ({category:?})")
            }
        }
    }
}

/// A failed resolution attempt. `raw_text` preserves the completion
/// verbatim so callers can surface it for diagnosis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub raw_text: String,
    pub reason: FailureReason,
}

impl ResolutionFailure {
    /// Wraps a provider-level error. There is no completion text in this
    /// case, so `raw_text` is empty.
    pub fn from_provider(error: &ProviderError) -> Self {
        Self {
            raw_text: String::new(),
            reason: FailureReason::Provider(error.category()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// Resolves raw model output against an expected schema.
///
/// 1. Strip markdown code fences, then strict-parse.
/// 2. On parse failure, extract the top-level object span (greedy first `{`
///    to last `}`, then a balanced-brace scan) and retry.
/// 3. A parsed object missing required fields is `SchemaMismatch`; no
///    parseable object at all is `NotJson` with the input preserved verbatim.
///
/// Always returns exactly one of payload or failure; never panics on
/// arbitrary input.
pub fn resolve(
    raw_text: &str,
    schema: &ExpectedSchema,
) -> Result<ResolvedPayload, ResolutionFailure> {
    let candidate = strip_json_fences(raw_text);

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return check_fields(value, schema).map_err(|reason| ResolutionFailure {
            raw_text: raw_text.to_string(),
            reason,
        });
    }

    for span in object_spans(candidate) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return check_fields(value, schema).map_err(|reason| ResolutionFailure {
                raw_text: raw_text.to_string(),
                reason,
            });
        }
    }

    Err(ResolutionFailure {
        raw_text: raw_text.to_string(),
        reason: FailureReason::NotJson,
    })
}

/// Validates required top-level field presence. A parsed value that is not
/// an object (e.g. a bare number or array) has no fields, so every required
/// field is missing.
fn check_fields(value: Value, schema: &ExpectedSchema) -> Result<ResolvedPayload, FailureReason> {
    let fields = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let missing: Vec<String> = schema
        .required_fields
        .iter()
        .filter(|field| !fields.contains_key(**field))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(ResolvedPayload {
            schema: schema.kind,
            fields,
        })
    } else {
        Err(FailureReason::SchemaMismatch { missing })
    }
}

/// Candidate object spans for the lenient pass, in order of preference:
/// greedy (first `{` to last `}`, tolerating trailing commentary), then the
/// balanced span (needed when the trailing commentary itself contains `}`).
fn object_spans(text: &str) -> Vec<&str> {
    let Some(start) = text.find('{') else {
        return Vec::new();
    };

    let mut spans = Vec::new();

    if let Some(end) = text.rfind('}') {
        if end > start {
            spans.push(&text[start..=end]);
        }
    }

    if let Some(balanced) = balanced_object_span(&text[start..]) {
        if spans.first() != Some(&balanced) {
            spans.push(balanced);
        }
    }

    spans
}

/// Scans forward from a leading `{` for the matching close brace, tracking
/// string and escape state so braces inside string values don't miscount.
fn balanced_object_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
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
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESUME: &str = r#"{
        "name": "Jane Doe",
        "title": "Engineer",
        "summary": "Backend engineer with 5 years of distributed systems work.",
        "experiences": [],
        "skills": ["Go"],
        "education": [],
        "keywords": ["backend"]
    }"#;

    #[test]
    fn test_strict_parse_returns_payload() {
        let payload = resolve(FULL_RESUME, &RESUME_SCHEMA).unwrap();
        assert_eq!(payload.schema, SchemaKind::Resume);
        assert_eq!(payload.fields["name"], "Jane Doe");
        assert_eq!(payload.fields["skills"], serde_json::json!(["Go"]));
    }

    #[test]
    fn test_prose_wrapped_object_is_extracted_unchanged() {
        let raw = format!("Here is the resume:\n{FULL_RESUME}\nHope this helps!");
        let payload = resolve(&raw, &RESUME_SCHEMA).unwrap();

        let direct = resolve(FULL_RESUME, &RESUME_SCHEMA).unwrap();
        assert_eq!(payload, direct);
    }

    #[test]
    fn test_jane_doe_completion_with_surrounding_prose() {
        let raw = "Here is the resume:\n{\"name\":\"Jane Doe\",\"title\":\"Engineer\",\"summary\":\"...\",\"experiences\":[],\"skills\":[\"Go\"],\"education\":[],\"keywords\":[\"backend\"]}\nHope this helps!";
        let payload = resolve(raw, &RESUME_SCHEMA).unwrap();
        assert_eq!(payload.fields["name"], "Jane Doe");
        assert_eq!(payload.fields["skills"], serde_json::json!(["Go"]));
    }

    #[test]
    fn test_fenced_output_parses() {
        let raw = format!("```json\n{FULL_RESUME}\n```");
        assert!(resolve(&raw, &RESUME_SCHEMA).is_ok());
    }

    #[test]
    fn test_trailing_commentary_with_braces() {
        let raw = format!("{FULL_RESUME}\nNote: wrap usage in {{curly braces}} if needed.");
        // The greedy span swallows the commentary brace; the balanced scan
        // recovers the object.
        let payload = resolve(&raw, &RESUME_SCHEMA).unwrap();
        assert_eq!(payload.fields["name"], "Jane Doe");
    }

    #[test]
    fn test_not_json_preserves_raw_text_verbatim() {
        let raw = "not json at all";
        let failure = resolve(raw, &RESUME_SCHEMA).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NotJson);
        assert_eq!(failure.raw_text, raw);
    }

    #[test]
    fn test_prose_with_unparseable_braces_is_not_json() {
        let raw = "I could not comply { sorry";
        let failure = resolve(raw, &RESUME_SCHEMA).unwrap_err();
        assert_eq!(failure.reason, FailureReason::NotJson);
        assert_eq!(failure.raw_text, raw);
    }

    #[test]
    fn test_missing_field_is_schema_mismatch() {
        let raw = r#"{
            "name": "Jane Doe",
            "title": "Engineer",
            "summary": "...",
            "experiences": [],
            "education": [],
            "keywords": []
        }"#;
        let failure = resolve(raw, &RESUME_SCHEMA).unwrap_err();
        assert_eq!(
            failure.reason,
            FailureReason::SchemaMismatch {
                missing: vec!["skills".to_string()]
            }
        );
    }

    #[test]
    fn test_non_object_json_is_schema_mismatch() {
        let failure = resolve("42", &RESUME_SCHEMA).unwrap_err();
        match failure.reason {
            FailureReason::SchemaMismatch { missing } => {
                assert_eq!(missing.len(), RESUME_SCHEMA.required_fields.len());
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        let raw = r#"{
            "name": "Jane Doe", "title": "Engineer", "summary": "s",
            "experiences": [], "skills": [], "education": [], "keywords": [],
            "confidence": 0.93
        }"#;
        let payload = resolve(raw, &RESUME_SCHEMA).unwrap();
        assert!(payload.fields.contains_key("confidence"));
    }

    #[test]
    fn test_ats_report_schema() {
        let raw = r#"Sure!
        {
            "score": 72,
            "matchPercentage": 68,
            "missingKeywords": ["Kubernetes"],
            "topMatchedKeywords": ["Rust", "distributed systems"],
            "suggestions": ["Add Kubernetes experience to the skills section"]
        }"#;
        let payload = resolve(raw, &ATS_REPORT_SCHEMA).unwrap();
        assert_eq!(payload.schema, SchemaKind::AtsReport);
        assert_eq!(payload.fields["score"], 72);
        // score and matchPercentage may legitimately differ
        assert_eq!(payload.fields["matchPercentage"], 68);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let raw = format!("prefix {FULL_RESUME} suffix");
        assert_eq!(
            resolve(&raw, &RESUME_SCHEMA),
            resolve(&raw, &RESUME_SCHEMA)
        );

        let bad = "still not json";
        assert_eq!(
            resolve(bad, &RESUME_SCHEMA),
            resolve(bad, &RESUME_SCHEMA)
        );
    }

    #[test]
    fn test_into_value_round_trips_fields() {
        let payload = resolve(FULL_RESUME, &RESUME_SCHEMA).unwrap();
        let value = payload.into_value();
        assert_eq!(value["title"], "Engineer");
    }

    #[test]
    fn test_from_provider_carries_category() {
        let failure = ResolutionFailure::from_provider(&ProviderError::RateLimited);
        assert_eq!(
            failure.reason,
            FailureReason::Provider(ProviderCategory::RateLimited)
        );
        assert!(failure.raw_text.is_empty());
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            FailureReason::NotJson.message(),
            "Model output not valid JSON"
        );
        assert_eq!(
            FailureReason::SchemaMismatch {
                missing: vec!["skills".to_string(), "keywords".to_string()]
            }
            .message(),
            "Model output missing required fields: skills, keywords"
        );
    }

    #[test]
    fn test_balanced_span_ignores_braces_inside_strings() {
        let text = r#"{"note": "a } inside a string", "n": 1} trailing"#;
        let span = balanced_object_span(text).unwrap();
        assert_eq!(span, r#"{"note": "a } inside a string", "n": 1}"#);
    }

    #[test]
    fn test_balanced_span_handles_escaped_quotes() {
        let text = r#"{"quote": "she said \"hi\""} extra"#;
        let span = balanced_object_span(text).unwrap();
        assert!(span.ends_with("\"}"));
        assert!(serde_json::from_str::<Value>(span).is_ok());
    }

    #[test]
    fn test_truncated_object_has_no_balanced_span() {
        assert!(balanced_object_span(r#"{"name": "Jane", "skills": ["#).is_none());
    }
}
