//! Shared helpers used by the subcommands.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use deskflow_kernel::{ActionRegistry, Dispatcher, IntentParser, ResultEnvelope};

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Build the parser and the production registry.
pub fn build_dispatcher(config: &AppConfig) -> Result<Dispatcher> {
    let parser = IntentParser::new().context("failed to build intent parser")?;
    let registry = deskflow_adapters::register_all(ActionRegistry::builder(), &config.adapters)
        .build()
        .context("failed to build action registry")?;
    tracing::debug!(actions = registry.len(), "dispatcher ready");
    Ok(Dispatcher::new(parser, registry))
}

/// Render an envelope as pretty JSON.
pub fn render_envelope(envelope: &ResultEnvelope) -> String {
    serde_json::to_string_pretty(&envelope.to_json())
        .unwrap_or_else(|_| envelope.to_json().to_string())
}

/// Render the action catalog as an aligned text listing.
pub fn render_catalog(registry: &ActionRegistry) -> String {
    let mut out = String::new();
    for spec in registry.specs() {
        out.push_str(&format!("{:<28} {}\n", spec.name().as_str(), spec.description()));
        for param in &spec.schema().required {
            out.push_str(&format!("    {} ({}, required)\n", param.name, param.kind));
        }
        for opt in &spec.schema().optional {
            out.push_str(&format!(
                "    {} ({}, default {})\n",
                opt.param.name, opt.param.kind, opt.default
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_the_full_catalog() {
        let dispatcher = build_dispatcher(&AppConfig::default()).unwrap();
        assert_eq!(dispatcher.registry().len(), 8);
    }

    #[test]
    fn catalog_lists_parameters_with_defaults() {
        let dispatcher = build_dispatcher(&AppConfig::default()).unwrap();
        let listing = render_catalog(dispatcher.registry());
        assert!(listing.starts_with("summarize_emails"));
        assert!(listing.contains("    email_count (integer, default 5)"));
        assert!(listing.contains("    x (number, required)"));
        assert!(listing.contains("execute_terminator_command"));
    }

    #[test]
    fn envelope_renders_as_json() {
        let envelope = ResultEnvelope::failure(
            deskflow_kernel::ErrorKind::HandlerError,
            "boom",
            None,
        );
        let rendered = render_envelope(&envelope);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, serde_json::json!({"error": "boom"}));
    }
}
