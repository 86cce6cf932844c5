//! Command dispatcher.
//!
//! [`Dispatcher::dispatch`] is the single entry point a transport calls.  It
//! walks a linear state machine and always returns a [`ResultEnvelope`]:
//!
//! | Stage | On failure |
//! |-------|------------|
//! | Parsing | never fails |
//! | Lookup | [`ErrorKind::UnsupportedAction`] with the raw command |
//! | Validating | [`ErrorKind::InvalidParameters`] naming the field |
//! | Invoking | [`ErrorKind::HandlerError`] (declared) or [`ErrorKind::InternalError`] (fault or panic) |
//!
//! The handler runs on its own tokio task so that a panic inside it is
//! contained and reported instead of unwinding through the caller.  Each
//! handler is invoked at most once; there are no retries and no deadline.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::action::{Intent, Parameters};
use crate::envelope::{ErrorKind, ResultEnvelope};
use crate::handler::HandlerError;
use crate::parser::IntentParser;
use crate::registry::ActionRegistry;

/// Message used for every unsupported-action failure.
pub const UNSUPPORTED_ACTION_MESSAGE: &str = "Invalid or unsupported action";

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Parsing,
    Lookup,
    Validating,
    Invoking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsing => write!(f, "parsing"),
            Self::Lookup => write!(f, "lookup"),
            Self::Validating => write!(f, "validating"),
            Self::Invoking => write!(f, "invoking"),
        }
    }
}

/// Stateless dispatcher over a shared parser and registry.
///
/// Cloning is cheap (two `Arc`s).  Calls share nothing mutable, so any number
/// may run concurrently.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    parser: Arc<IntentParser>,
    registry: Arc<ActionRegistry>,
}

impl Dispatcher {
    pub fn new(parser: IntentParser, registry: ActionRegistry) -> Self {
        Self {
            parser: Arc::new(parser),
            registry: Arc::new(registry),
        }
    }

    pub fn parser(&self) -> &IntentParser {
        &self.parser
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Parse `command` and run it to a result envelope.
    pub async fn dispatch(&self, command: &str) -> ResultEnvelope {
        let span = tracing::info_span!("dispatch", request_id = %Uuid::now_v7());
        async {
            debug!(stage = %Stage::Parsing, command = %command, "dispatch started");
            let intent = self.parser.parse(command);
            self.run(intent, Some(command)).await
        }
        .instrument(span)
        .await
    }

    /// Run an already-parsed intent through lookup, validation and
    /// invocation.
    pub async fn dispatch_intent(&self, intent: Intent) -> ResultEnvelope {
        let span = tracing::info_span!("dispatch", request_id = %Uuid::now_v7());
        self.run(intent, None).instrument(span).await
    }

    async fn run(&self, intent: Intent, raw_command: Option<&str>) -> ResultEnvelope {
        let (action, parameters) = intent.into_parts();

        debug!(stage = %Stage::Lookup, action = %action, "looking up action");
        let spec = match self.registry.lookup(action) {
            Ok(spec) => spec,
            Err(e) => {
                info!(action = %action, error = %e, "unsupported action");
                let raw = raw_command
                    .map(str::to_string)
                    .or_else(|| {
                        parameters
                            .get("raw_command")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| action.to_string());
                let mut details = Parameters::new();
                details.insert("raw_command".into(), Value::String(raw));
                return ResultEnvelope::failure(
                    ErrorKind::UnsupportedAction,
                    UNSUPPORTED_ACTION_MESSAGE,
                    Some(details),
                );
            }
        };

        debug!(stage = %Stage::Validating, action = %action, "validating parameters");
        let params = match spec.validate(parameters) {
            Ok(params) => params,
            Err(e) => {
                info!(action = %action, field = e.field(), error = %e, "invalid parameters");
                return ResultEnvelope::failure(
                    ErrorKind::InvalidParameters,
                    format!("{e} for action `{action}`"),
                    Some(e.details()),
                );
            }
        };

        debug!(stage = %Stage::Invoking, action = %action, "invoking handler");
        let handler = Arc::clone(spec.handler());
        let joined = tokio::spawn(async move { handler.handle(params).await }).await;

        match joined {
            Ok(Ok(payload)) => {
                info!(action = %action, "action succeeded");
                ResultEnvelope::success(payload)
            }
            Ok(Err(HandlerError::Declared { message, details })) => {
                warn!(action = %action, error = %message, "handler reported failure");
                ResultEnvelope::failure(ErrorKind::HandlerError, message, details)
            }
            Ok(Err(HandlerError::Fault(reason))) => {
                error!(action = %action, reason = %reason, "handler fault");
                ResultEnvelope::failure(
                    ErrorKind::InternalError,
                    format!("handler for `{action}` failed unexpectedly: {reason}"),
                    None,
                )
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    format!("panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "task was cancelled".to_string()
                };
                error!(action = %action, reason = %reason, "handler task aborted");
                ResultEnvelope::failure(
                    ErrorKind::InternalError,
                    format!("handler for `{action}` {reason}"),
                    None,
                )
            }
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionName;
    use crate::handler::{ActionHandler, HandlerResult};
    use crate::validator::ValidatedParameters;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ActionHandler for Echo {
        async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
            Ok(params.into_inner())
        }
    }

    struct Panics;

    #[async_trait]
    impl ActionHandler for Panics {
        async fn handle(&self, _params: ValidatedParameters) -> HandlerResult {
            panic!("driver exploded");
        }
    }

    struct Faults;

    #[async_trait]
    impl ActionHandler for Faults {
        async fn handle(&self, _params: ValidatedParameters) -> HandlerResult {
            Err(HandlerError::fault("schema drift"))
        }
    }

    fn dispatcher_with(type_text: impl ActionHandler + 'static) -> Dispatcher {
        let builder = ActionName::REGISTRABLE
            .into_iter()
            .filter(|a| *a != ActionName::TypeText)
            .fold(ActionRegistry::builder(), |b, a| b.register(a, Echo))
            .register(ActionName::TypeText, type_text);
        Dispatcher::new(IntentParser::new().unwrap(), builder.build().unwrap())
    }

    #[tokio::test]
    async fn echo_receives_defaults() {
        let dispatcher = dispatcher_with(Echo);
        let envelope = dispatcher.dispatch("click at 5 6").await;
        assert_eq!(
            envelope,
            ResultEnvelope::success(
                json!({"x": 5, "y": 6, "button": "left"})
                    .as_object()
                    .cloned()
                    .unwrap()
            )
        );
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let dispatcher = dispatcher_with(Panics);
        let envelope = dispatcher.dispatch("type anything").await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::InternalError));
        assert!(envelope.message().unwrap().contains("driver exploded"));
    }

    #[tokio::test]
    async fn fault_becomes_internal_error() {
        let dispatcher = dispatcher_with(Faults);
        let envelope = dispatcher.dispatch("type anything").await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::InternalError));
        assert!(envelope.message().unwrap().contains("schema drift"));
    }

    #[tokio::test]
    async fn unknown_intent_reports_its_raw_command() {
        let dispatcher = dispatcher_with(Echo);
        let envelope = dispatcher.dispatch_intent(Intent::unknown("Do A Backflip")).await;
        assert_eq!(
            envelope.to_json(),
            json!({
                "error": UNSUPPORTED_ACTION_MESSAGE,
                "details": {"raw_command": "Do A Backflip"}
            })
        );
    }

    #[test]
    fn stage_names() {
        let names: Vec<String> = [Stage::Parsing, Stage::Lookup, Stage::Validating, Stage::Invoking]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["parsing", "lookup", "validating", "invoking"]);
    }
}
