//! Handler capability trait.
//!
//! Every side-effecting collaborator (email, desktop automation, shell, ...)
//! implements [`ActionHandler`].  The dispatcher only depends on this
//! `(parameters) -> payload | error` contract, so tests can substitute stubs.

use async_trait::async_trait;

use crate::action::Parameters;
use crate::validator::ValidatedParameters;

/// Failure returned by a handler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// A failure that is part of the handler's contract (missing credentials,
    /// resource not found, OS call failed).  The message reaches the caller
    /// verbatim.
    #[error("{message}")]
    Declared {
        message: String,
        details: Option<Parameters>,
    },

    /// Anything outside the handler's contract.  Surfaces as an internal
    /// error.
    #[error("unexpected handler fault: {0}")]
    Fault(String),
}

impl HandlerError {
    pub fn declared(message: impl Into<String>) -> Self {
        Self::Declared {
            message: message.into(),
            details: None,
        }
    }

    pub fn declared_with_details(message: impl Into<String>, details: Parameters) -> Self {
        Self::Declared {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn fault(reason: impl Into<String>) -> Self {
        Self::Fault(reason.into())
    }
}

/// Result of one handler invocation.  `Ok` carries the success payload.
pub type HandlerResult = std::result::Result<Parameters, HandlerError>;

/// A capability that performs one action.
///
/// Implementations may block on I/O; the dispatcher runs each invocation on
/// its own task and never holds shared state across it.  Bounding execution
/// time is the handler's responsibility.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Perform the action with parameters that already passed validation.
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult;
}
