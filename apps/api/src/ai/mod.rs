//! AI endpoints: resume generation and ATS checking.
//!
//! Flow per request: validate input → build instruction prompt embedding the
//! expected JSON schema → provider call (with model fallback) → resolver →
//! `{ok: true, ...}` payload or `{ok: false, raw, message}` diagnosis.

pub mod handlers;
pub mod prompts;
