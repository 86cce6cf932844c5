//! Deskflow kernel.
//!
//! This crate turns a free-text command into exactly one action invocation
//! and a uniform result:
//!
//! - **[`action`]** -- The closed [`ActionName`] catalog, parameter schemas,
//!   and the [`Intent`] value produced by parsing.
//! - **[`parser`]** -- Ordered substring-trigger intent parser backed by
//!   [`aho_corasick`], with [`regex`] extraction for coordinates.
//! - **[`registry`]** -- Read-only table mapping each action to its schema and
//!   handler, built once at startup.
//! - **[`validator`]** -- Schema checks, default injection, and the
//!   [`ValidatedParameters`] handed to handlers.
//! - **[`handler`]** -- The [`ActionHandler`] capability trait every side
//!   effecting collaborator implements.
//! - **[`dispatcher`]** -- Parse, look up, validate, invoke, and normalize into
//!   a [`ResultEnvelope`].
//! - **[`error`]** -- Kernel error types via [`thiserror`].
//!
//! All public types are `Send + Sync`; a single [`Dispatcher`] can serve any
//! number of concurrent requests.

pub mod action;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod parser;
pub mod registry;
pub mod validator;

pub use action::{ActionName, ActionSchema, Intent, OptionalParam, ParamSpec, ParamType, Parameters};
pub use dispatcher::Dispatcher;
pub use envelope::{ErrorKind, ResultEnvelope};
pub use error::{KernelError, Result};
pub use handler::{ActionHandler, HandlerError, HandlerResult};
pub use parser::{Extraction, IntentParser, TriggerRule};
pub use registry::{ActionRegistry, ActionSpec, RegistryBuilder};
pub use validator::{ValidatedParameters, ValidationError, validate};
