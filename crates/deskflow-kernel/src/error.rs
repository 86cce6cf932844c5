//! Kernel error types.
//!
//! Everything that can go wrong while *building* the pipeline (parser rules,
//! registry wiring) or while looking an action up surfaces through
//! [`KernelError`].  Per-request failures never use this type directly; the
//! dispatcher folds them into a [`crate::ResultEnvelope`].

use crate::action::ActionName;

/// Unified error type for the Deskflow kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Catalog errors -----------------------------------------------------
    /// A string did not name any action in the catalog.
    #[error("unknown action name: {name}")]
    UnknownActionName { name: String },

    // -- Parser errors ------------------------------------------------------
    /// Building the trigger automaton failed.
    #[error("parser build error: {reason}")]
    ParserBuildError { reason: String },

    /// A regex pattern used for parameter extraction is invalid.
    #[error("invalid regex pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // -- Registry errors ----------------------------------------------------
    /// The action has no entry in the registry.
    #[error("action not found: {action}")]
    ActionNotFound { action: ActionName },

    /// The same action was registered more than once.
    #[error("action registered more than once: {action}")]
    DuplicateAction { action: ActionName },

    /// A catalog action was left without a handler.
    #[error("no handler registered for action: {action}")]
    MissingHandler { action: ActionName },

    /// The action is a sentinel and can never carry a handler.
    #[error("action `{action}` cannot be registered")]
    NotRegistrable { action: ActionName },
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
