//! Adapter error types.
//!
//! Handler internals surface failures through [`AdapterError`].  At the
//! handler boundary every variant converts into a declared
//! [`HandlerError`], so the message reaches the caller unchanged.

use deskflow_kernel::HandlerError;

/// Unified error type for Deskflow adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed within the adapter.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Mail credentials are not present in the environment.
    #[error("Email credentials not found in environment variables")]
    MissingCredentials,

    /// Connecting to a remote service failed.
    #[error("connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    /// The mail server answered with something other than `OK`.
    #[error("{reason}")]
    Protocol { reason: String },

    /// An operation exceeded its time limit.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// An external program exited unsuccessfully.
    #[error("`{program}` exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    /// Invalid input provided to an adapter.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<AdapterError> for HandlerError {
    fn from(err: AdapterError) -> Self {
        HandlerError::declared(err.to_string())
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
