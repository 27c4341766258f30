//! Backend selection from application config.

use sessiongraph_core::{
    extraction::{AnthropicConfig, BackendConfig, ExtractionBackend, ExtractionError},
    SessionGraphConfig,
};

/// Create an extraction backend from the application config.
///
/// `offline` (or `[extraction] backend = "offline"`) selects the replay-only
/// backend, which needs no credential. Anything else builds the live
/// Anthropic client and fails with `MissingApiKey` when `ANTHROPIC_API_KEY`
/// is unset.
pub fn create_backend_from_config(
    config: &SessionGraphConfig,
    offline: bool,
) -> Result<Box<dyn ExtractionBackend>, ExtractionError> {
    let settings = &config.extraction;

    let backend_cfg = if offline || settings.backend == "offline" {
        BackendConfig::Offline {
            model: settings.model.clone(),
        }
    } else {
        if settings.backend != "anthropic" {
            tracing::warn!(backend = %settings.backend, "Unknown extraction backend, using anthropic");
        }
        BackendConfig::Anthropic {
            config: AnthropicConfig::from_settings(None, settings),
            base_url: settings.base_url.clone(),
        }
    };

    sessiongraph_core::extraction::create_backend(backend_cfg)
}
