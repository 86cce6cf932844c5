//! Result envelope.
//!
//! Every dispatch ends in exactly one [`ResultEnvelope`].  On the wire a
//! success is the bare payload object and a failure is
//! `{"error": message, "details"?: {...}}`.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::action::Parameters;

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The action is not in the registry, including the parser's `unknown`.
    UnsupportedAction,
    /// A required parameter is missing or a parameter has the wrong type.
    InvalidParameters,
    /// The handler reported one of its declared failures.
    HandlerError,
    /// Anything unexpected.
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedAction => write!(f, "unsupported_action"),
            Self::InvalidParameters => write!(f, "invalid_parameters"),
            Self::HandlerError => write!(f, "handler_error"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// The uniform outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Success {
        payload: Parameters,
    },
    Failure {
        kind: ErrorKind,
        message: String,
        details: Option<Parameters>,
    },
}

impl ResultEnvelope {
    pub fn success(payload: Parameters) -> Self {
        Self::Success { payload }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, details: Option<Parameters>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, or `None` for a success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// The failure message, or `None` for a success.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    /// Render the wire representation.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Success { payload } => Value::Object(payload.clone()),
            Self::Failure {
                message, details, ..
            } => {
                let mut body = Parameters::new();
                body.insert("error".into(), Value::String(message.clone()));
                if let Some(details) = details {
                    body.insert("details".into(), Value::Object(details.clone()));
                }
                Value::Object(body)
            }
        }
    }
}

impl Serialize for ResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_as_bare_payload() {
        let mut payload = Parameters::new();
        payload.insert("status".into(), json!("Typed: hi"));
        let envelope = ResultEnvelope::success(payload);
        assert!(envelope.is_success());
        assert_eq!(envelope.error_kind(), None);
        assert_eq!(serde_json::to_value(&envelope).unwrap(), json!({"status": "Typed: hi"}));
    }

    #[test]
    fn failure_serializes_error_and_details() {
        let mut details = Parameters::new();
        details.insert("missing".into(), json!("x"));
        let envelope = ResultEnvelope::failure(
            ErrorKind::InvalidParameters,
            "missing required parameter `x`",
            Some(details),
        );
        assert!(!envelope.is_success());
        assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
        assert_eq!(
            envelope.to_json(),
            json!({"error": "missing required parameter `x`", "details": {"missing": "x"}})
        );
    }

    #[test]
    fn failure_without_details_omits_the_key() {
        let envelope = ResultEnvelope::failure(ErrorKind::InternalError, "boom", None);
        assert_eq!(envelope.to_json(), json!({"error": "boom"}));
        assert_eq!(envelope.message(), Some("boom"));
    }
}
