//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, and starts
//! the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

use deskflow_kernel::Dispatcher;

use crate::WebConfig;
use crate::api;
use crate::error::WebError;
use crate::state::AppState;

/// The Deskflow web server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server around a ready dispatcher.
    pub fn new(config: WebConfig, dispatcher: Dispatcher) -> Self {
        let state = Arc::new(AppState::new(dispatcher, config.clone()));
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Listed origins may send credentials and any request header.  A `"*"`
    /// entry allows every origin, without credentials.
    fn cors(&self) -> Result<CorsLayer, WebError> {
        let layer =
            CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

        let origins = &self.config.allowed_origins;
        if origins.iter().any(|o| o == "*") {
            return Ok(layer.allow_origin(AllowOrigin::any()).allow_headers(Any));
        }

        let values = origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|_| WebError::InvalidOrigin {
                        origin: origin.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(layer
            .allow_origin(AllowOrigin::list(values))
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true))
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Result<Router, WebError> {
        Ok(Router::new()
            .route("/assistant", post(api::assistant))
            .route("/api/actions", get(api::actions))
            .route("/api/status", get(api::status))
            .layer(self.cors()?)
            .with_state(Arc::clone(&self.state)))
    }

    /// Bind the configured address and serve until shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the CORS configuration is invalid or the TCP
    /// listener cannot be bound.
    pub async fn start(self) -> Result<(), WebError> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| WebError::Bind {
                addr: addr.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), WebError> {
        let router = self.router()?;
        let local = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            actions = self.state.dispatcher.registry().len(),
            "starting web server"
        );
        axum::serve(listener, router).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origin_is_rejected() {
        let server = WebServer {
            config: WebConfig {
                allowed_origins: vec!["http://bad\norigin".into()],
                ..WebConfig::default()
            },
            state: Arc::new(AppState::new(
                test_dispatcher(),
                WebConfig::default(),
            )),
        };
        assert!(matches!(
            server.router(),
            Err(WebError::InvalidOrigin { .. })
        ));
    }

    #[test]
    fn addr_joins_bind_and_port() {
        let server = WebServer::new(
            WebConfig {
                bind_addr: "0.0.0.0".into(),
                port: 9090,
                ..WebConfig::default()
            },
            test_dispatcher(),
        );
        assert_eq!(server.addr(), "0.0.0.0:9090");
    }

    fn test_dispatcher() -> Dispatcher {
        use deskflow_kernel::{
            ActionHandler, ActionName, ActionRegistry, HandlerResult, IntentParser, Parameters,
            ValidatedParameters,
        };

        struct Noop;

        #[async_trait::async_trait]
        impl ActionHandler for Noop {
            async fn handle(&self, _params: ValidatedParameters) -> HandlerResult {
                Ok(Parameters::new())
            }
        }

        let builder = ActionName::REGISTRABLE
            .into_iter()
            .fold(ActionRegistry::builder(), |b, a| b.register(a, Noop));
        Dispatcher::new(IntentParser::new().unwrap(), builder.build().unwrap())
    }
}
