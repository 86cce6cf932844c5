//! HTTP transport for Deskflow.
//!
//! This crate exposes the kernel [`Dispatcher`](deskflow_kernel::Dispatcher)
//! over HTTP:
//!
//! - `POST /assistant` -- dispatch `{"command": "..."}` and return the result
//!   envelope.
//! - `GET /api/actions` -- the action catalog with parameter schemas.
//! - `GET /api/status` -- version, action count, uptime.

pub mod api;
pub mod error;
pub mod server;
pub mod state;

use serde::Deserialize;

pub use error::WebError;
pub use server::WebServer;
pub use state::AppState;

/// Web server configuration (`[server]` section).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    #[serde(rename = "bind")]
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Origins allowed by CORS.  `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8000,
            allowed_origins: vec!["http://localhost:3000".into()],
        }
    }
}
