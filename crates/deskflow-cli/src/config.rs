//! Application configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults.
//! 2. A TOML file: `--config <path>`, else `config/default.toml` if present.
//! 3. Environment variables (after `.env` is loaded): `DESKFLOW_BIND`,
//!    `DESKFLOW_PORT`, `EMAIL_IMAP_HOST`, `EMAIL_IMAP_PORT`.
//!
//! Mail credentials are never part of the configuration; the email handler
//! reads them from the variables named by `email.user_env` and
//! `email.password_env` on each call.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use deskflow_adapters::AdaptersConfig;
use deskflow_web::WebConfig;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// The complete configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[server]`
    pub server: WebConfig,
    /// `[email]`, `[desktop]` and `[shell]`.
    #[serde(flatten)]
    pub adapters: AdaptersConfig,
}

impl AppConfig {
    /// Load configuration for this process.
    ///
    /// An explicit `path` must exist.  Without one, a missing
    /// [`DEFAULT_CONFIG_PATH`] silently means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    tracing::debug!("no config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup("DESKFLOW_BIND") {
            self.server.bind_addr = bind;
        }
        if let Some(port) = lookup("DESKFLOW_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("DESKFLOW_PORT is not a valid port: {port}"))?;
        }
        if let Some(host) = lookup("EMAIL_IMAP_HOST") {
            self.adapters.email.imap_host = host;
        }
        if let Some(port) = lookup("EMAIL_IMAP_PORT") {
            self.adapters.email.imap_port = port
                .parse()
                .with_context(|| format!("EMAIL_IMAP_PORT is not a valid port: {port}"))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
