//! Model selection.
//!
//! An explicit model always wins. Otherwise the first preferred model the
//! provider reports as available is used, falling back to [`DEFAULT_MODEL`]
//! when the catalog cannot be fetched or lists none of them.

use super::ModelCatalog;

/// Model used when nothing better can be determined.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Tool-calling models in order of preference.
pub const PREFERRED_MODELS: &[&str] = &[
    "anthropic/claude-sonnet-4",
    "anthropic/claude-3.7-sonnet",
    "openai/gpt-4.1",
    "google/gemini-2.5-pro",
];

/// First entry of [`PREFERRED_MODELS`] present in `available`.
pub fn pick_preferred(available: &[String]) -> Option<&'static str> {
    PREFERRED_MODELS
        .iter()
        .copied()
        .find(|preferred| available.iter().any(|id| id == preferred))
}

/// Resolve the model to use for an invocation.
pub async fn resolve_model(explicit: Option<&str>, catalog: &dyn ModelCatalog) -> String {
    if let Some(model) = explicit.map(str::trim).filter(|m| !m.is_empty()) {
        return model.to_string();
    }

    match catalog.list_models().await {
        Ok(available) => match pick_preferred(&available) {
            Some(model) => {
                tracing::debug!(model, available = available.len(), "Selected preferred model");
                model.to_string()
            }
            None => {
                tracing::warn!(
                    available = available.len(),
                    default = DEFAULT_MODEL,
                    "No preferred model available, using default"
                );
                DEFAULT_MODEL.to_string()
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, default = DEFAULT_MODEL, "Failed to list models, using default");
            DEFAULT_MODEL.to_string()
        }
    }
}
