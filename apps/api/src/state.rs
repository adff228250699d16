use std::sync::Arc;

use crate::config::Config;
use crate::provider::TextGenerator;

/// Shared application state injected into all route handlers via Axum
/// extractors. No mutable state: every request is independent.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable text-generation provider. `HfClient` in production,
    /// a stub in handler tests.
    pub generator: Arc<dyn TextGenerator>,
    pub config: Config,
}
