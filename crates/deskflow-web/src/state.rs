//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers.  Everything in it is read-only, so requests never contend.

use std::time::Instant;

use deskflow_kernel::Dispatcher;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Parses and runs commands.
    pub dispatcher: Dispatcher,

    /// Web server configuration.
    pub config: WebConfig,

    /// When the server state was created, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, config: WebConfig) -> Self {
        Self {
            dispatcher,
            config,
            started_at: Instant::now(),
        }
    }
}
