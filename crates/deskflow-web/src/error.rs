//! Web server error types.

/// Errors raised while building or running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// A configured CORS origin is not a valid header value.
    #[error("invalid CORS origin `{origin}`")]
    InvalidOrigin { origin: String },

    /// The TCP listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
