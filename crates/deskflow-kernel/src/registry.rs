//! Action registry.
//!
//! The registry pairs every catalog action with its parameter schema and the
//! handler that performs it.  It is assembled once through
//! [`RegistryBuilder`], which refuses to build unless each action in
//! [`ActionName::REGISTRABLE`] has exactly one handler, and is read-only
//! afterwards.  Share it behind an `Arc`; lookups need no locking.
//!
//! # Example
//!
//! ```rust
//! # use deskflow_kernel::{ActionHandler, ActionName, ActionRegistry, HandlerResult, ValidatedParameters};
//! # struct Noop;
//! # #[async_trait::async_trait]
//! # impl ActionHandler for Noop {
//! #     async fn handle(&self, _: ValidatedParameters) -> HandlerResult { Ok(Default::default()) }
//! # }
//! let mut builder = ActionRegistry::builder();
//! for action in ActionName::REGISTRABLE {
//!     builder = builder.register(action, Noop);
//! }
//! let registry = builder.build().unwrap();
//!
//! assert!(registry.lookup(ActionName::OpenApp).is_ok());
//! assert!(registry.lookup(ActionName::Unknown).is_err());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::action::{ActionName, ActionSchema, Parameters};
use crate::error::{KernelError, Result};
use crate::handler::ActionHandler;
use crate::validator::{ValidatedParameters, ValidationError, validate};

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// The registered contract for one action.
#[derive(Clone)]
pub struct ActionSpec {
    name: ActionName,
    schema: ActionSchema,
    handler: Arc<dyn ActionHandler>,
}

impl ActionSpec {
    pub fn name(&self) -> ActionName {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.name.description()
    }

    pub fn schema(&self) -> &ActionSchema {
        &self.schema
    }

    pub fn handler(&self) -> &Arc<dyn ActionHandler> {
        &self.handler
    }

    /// Validate `parameters` against this action's schema.
    pub fn validate(
        &self,
        parameters: Parameters,
    ) -> std::result::Result<ValidatedParameters, ValidationError> {
        validate(&self.schema, parameters)
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only action table.
#[derive(Debug)]
pub struct ActionRegistry {
    specs: HashMap<ActionName, ActionSpec>,
}

impl ActionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Find the spec for `action`.  [`ActionName::Unknown`] is never present.
    pub fn lookup(&self, action: ActionName) -> Result<&ActionSpec> {
        self.specs
            .get(&action)
            .ok_or(KernelError::ActionNotFound { action })
    }

    /// All specs in catalog order.
    pub fn specs(&self) -> impl Iterator<Item = &ActionSpec> {
        ActionName::REGISTRABLE
            .iter()
            .filter_map(|action| self.specs.get(action))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects handlers and checks catalog coverage on [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<ActionName, Arc<dyn ActionHandler>>,
    rejected: Option<KernelError>,
}

impl RegistryBuilder {
    /// Register the handler for `action`.
    #[must_use]
    pub fn register(self, action: ActionName, handler: impl ActionHandler + 'static) -> Self {
        self.register_arc(action, Arc::new(handler))
    }

    /// Register a shared handler, e.g. one object serving several actions.
    #[must_use]
    pub fn register_arc(mut self, action: ActionName, handler: Arc<dyn ActionHandler>) -> Self {
        if self.rejected.is_some() {
            return self;
        }
        if action == ActionName::Unknown {
            self.rejected = Some(KernelError::NotRegistrable { action });
            return self;
        }
        if self.handlers.insert(action, handler).is_some() {
            self.rejected = Some(KernelError::DuplicateAction { action });
        }
        self
    }

    /// Finish the registry.
    ///
    /// Fails on the first registration problem, or if any catalog action was
    /// left without a handler.
    pub fn build(mut self) -> Result<ActionRegistry> {
        if let Some(err) = self.rejected {
            return Err(err);
        }

        let mut specs = HashMap::with_capacity(ActionName::REGISTRABLE.len());
        for action in ActionName::REGISTRABLE {
            let handler = self
                .handlers
                .remove(&action)
                .ok_or(KernelError::MissingHandler { action })?;
            let schema = action.schema().ok_or(KernelError::NotRegistrable { action })?;
            specs.insert(
                action,
                ActionSpec {
                    name: action,
                    schema,
                    handler,
                },
            );
            tracing::debug!(action = %action, "action registered");
        }

        tracing::info!(actions = specs.len(), "action registry built");

        Ok(ActionRegistry { specs })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerResult;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl ActionHandler for Noop {
        async fn handle(&self, _params: ValidatedParameters) -> HandlerResult {
            Ok(Parameters::new())
        }
    }

    fn full_builder() -> RegistryBuilder {
        ActionName::REGISTRABLE
            .into_iter()
            .fold(ActionRegistry::builder(), |b, action| b.register(action, Noop))
    }

    #[test]
    fn every_action_has_exactly_one_spec() {
        let registry = full_builder().build().expect("complete registry");
        assert_eq!(registry.len(), ActionName::REGISTRABLE.len());
        for action in ActionName::REGISTRABLE {
            let spec = registry.lookup(action).expect("registered");
            assert_eq!(spec.name(), action);
            assert_eq!(Some(spec.schema().clone()), action.schema());
        }
    }

    #[test]
    fn unknown_is_not_found() {
        let registry = full_builder().build().unwrap();
        let result = registry.lookup(ActionName::Unknown);
        assert!(matches!(
            result,
            Err(KernelError::ActionNotFound {
                action: ActionName::Unknown
            })
        ));
    }

    #[test]
    fn missing_handler_fails_build() {
        let builder = ActionName::REGISTRABLE
            .into_iter()
            .filter(|a| *a != ActionName::TypeText)
            .fold(ActionRegistry::builder(), |b, action| b.register(action, Noop));
        let result = builder.build();
        assert!(matches!(
            result,
            Err(KernelError::MissingHandler {
                action: ActionName::TypeText
            })
        ));
    }

    #[test]
    fn duplicate_registration_fails_build() {
        let result = full_builder().register(ActionName::OpenApp, Noop).build();
        assert!(matches!(
            result,
            Err(KernelError::DuplicateAction {
                action: ActionName::OpenApp
            })
        ));
    }

    #[test]
    fn unknown_cannot_be_registered() {
        let result = full_builder().register(ActionName::Unknown, Noop).build();
        assert!(matches!(result, Err(KernelError::NotRegistrable { .. })));
    }

    #[test]
    fn specs_iterate_in_catalog_order() {
        let registry = full_builder().build().unwrap();
        let names: Vec<ActionName> = registry.specs().map(ActionSpec::name).collect();
        assert_eq!(names, ActionName::REGISTRABLE.to_vec());
    }
}
