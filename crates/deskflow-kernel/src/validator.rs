//! Parameter validation.
//!
//! [`validate`] checks a parameter map against an [`ActionSchema`]:
//!
//! 1. Every required parameter must be present.  `null` counts as absent, and
//!    so does a blank string for a required `string` parameter.
//! 2. Every present declared parameter must satisfy its [`ParamType`].
//! 3. Absent optional parameters receive their declared default.
//! 4. Undeclared keys pass through untouched.
//!
//! The function is pure: the same schema and input always produce the same
//! result.

use serde_json::{Value, json};

use crate::action::{ActionSchema, ParamType, Parameters};
use crate::handler::HandlerError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a parameter map was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required parameter `{name}`")]
    Missing { name: String },

    #[error("parameter `{name}` must be of type {expected}")]
    InvalidType { name: String, expected: ParamType },
}

impl ValidationError {
    /// The offending parameter name.
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { name } | Self::InvalidType { name, .. } => name,
        }
    }

    /// Structured details for the failure envelope: `{"missing": name}` or
    /// `{"invalid_type": name, "expected": type}`.
    pub fn details(&self) -> Parameters {
        let value = match self {
            Self::Missing { name } => json!({ "missing": name }),
            Self::InvalidType { name, expected } => {
                json!({ "invalid_type": name, "expected": expected.to_string() })
            }
        };
        match value {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidatedParameters
// ---------------------------------------------------------------------------

/// Parameters that passed [`validate`].
///
/// Every declared parameter is present with the declared type, so the typed
/// getters only return `None` for names the schema does not declare.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParameters(Parameters);

impl ValidatedParameters {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Fetch a string the handler relies on.  Absence here means the handler
    /// and its schema disagree, which is a fault rather than a user error.
    pub fn require_str(&self, name: &str) -> Result<&str, HandlerError> {
        self.get_str(name)
            .ok_or_else(|| HandlerError::fault(format!("validated parameter `{name}` is not a string")))
    }

    pub fn require_i64(&self, name: &str) -> Result<i64, HandlerError> {
        self.get_i64(name)
            .ok_or_else(|| HandlerError::fault(format!("validated parameter `{name}` is not an integer")))
    }

    pub fn require_f64(&self, name: &str) -> Result<f64, HandlerError> {
        self.get_f64(name)
            .ok_or_else(|| HandlerError::fault(format!("validated parameter `{name}` is not a number")))
    }

    pub fn require_bool(&self, name: &str) -> Result<bool, HandlerError> {
        self.get_bool(name)
            .ok_or_else(|| HandlerError::fault(format!("validated parameter `{name}` is not a boolean")))
    }

    pub fn as_map(&self) -> &Parameters {
        &self.0
    }

    pub fn into_inner(self) -> Parameters {
        self.0
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Validate `parameters` against `schema`.
///
/// Required parameters are checked in declaration order, so the first missing
/// one is reported.
pub fn validate(
    schema: &ActionSchema,
    mut parameters: Parameters,
) -> Result<ValidatedParameters, ValidationError> {
    for param in &schema.required {
        let value = match parameters.get(param.name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if param.kind == ParamType::String && s.trim().is_empty() => None,
            Some(v) => Some(v),
        };
        let Some(value) = value else {
            return Err(ValidationError::Missing {
                name: param.name.to_string(),
            });
        };
        if !param.kind.accepts(value) {
            return Err(ValidationError::InvalidType {
                name: param.name.to_string(),
                expected: param.kind,
            });
        }
    }

    for optional in &schema.optional {
        let name = optional.param.name;
        match parameters.get(name) {
            None | Some(Value::Null) => {
                parameters.insert(name.to_string(), optional.default.clone());
            }
            Some(value) if !optional.param.kind.accepts(value) => {
                return Err(ValidationError::InvalidType {
                    name: name.to_string(),
                    expected: optional.param.kind,
                });
            }
            Some(_) => {}
        }
    }

    Ok(ValidatedParameters(parameters))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionName;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_is_reported_first_in_order() {
        let schema = ActionName::ClickMouse.schema().unwrap();
        let err = validate(&schema, Parameters::new()).unwrap_err();
        assert_eq!(err, ValidationError::Missing { name: "x".into() });
        assert_eq!(err.details(), params(json!({"missing": "x"})));

        let err = validate(&schema, params(json!({"x": 10}))).unwrap_err();
        assert_eq!(err.field(), "y");
    }

    #[test]
    fn null_and_blank_strings_count_as_missing() {
        let schema = ActionName::OpenApp.schema().unwrap();
        let err = validate(&schema, params(json!({"app_path": null}))).unwrap_err();
        assert!(matches!(err, ValidationError::Missing { .. }));

        let err = validate(&schema, params(json!({"app_path": "   "}))).unwrap_err();
        assert!(matches!(err, ValidationError::Missing { .. }));
    }

    #[test]
    fn numeric_strings_are_rejected() {
        let schema = ActionName::MoveMouse.schema().unwrap();
        let err = validate(&schema, params(json!({"x": "100", "y": 200}))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidType {
                name: "x".into(),
                expected: ParamType::Number
            }
        );
        assert_eq!(err.details()["invalid_type"], json!("x"));
        assert_eq!(err.details()["expected"], json!("number"));
    }

    #[test]
    fn wrongly_typed_optional_is_rejected() {
        let schema = ActionName::SummarizeEmails.schema().unwrap();
        let err = validate(&schema, params(json!({"email_count": "ten"}))).unwrap_err();
        assert_eq!(err.field(), "email_count");
    }

    #[test]
    fn defaults_are_injected() {
        let schema = ActionName::SummarizeEmails.schema().unwrap();
        let validated = validate(&schema, Parameters::new()).unwrap();
        assert_eq!(validated.get_i64("email_count"), Some(5));
        assert_eq!(validated.get_str("folder"), Some("inbox"));
        assert_eq!(validated.get_bool("mark_as_read"), Some(false));
    }

    #[test]
    fn provided_optionals_win_over_defaults() {
        let schema = ActionName::SummarizeEmails.schema().unwrap();
        let validated =
            validate(&schema, params(json!({"email_count": 2, "folder": "work"}))).unwrap();
        assert_eq!(validated.get_i64("email_count"), Some(2));
        assert_eq!(validated.get_str("folder"), Some("work"));
    }

    #[test]
    fn undeclared_keys_pass_through() {
        let schema = ActionName::TypeText.schema().unwrap();
        let validated =
            validate(&schema, params(json!({"text": "hi", "interval": 0.1}))).unwrap();
        assert_eq!(validated.get("interval"), Some(&json!(0.1)));
        assert_eq!(validated.as_map().len(), 2);
    }

    #[test]
    fn validation_is_deterministic() {
        let schema = ActionName::ClickMouse.schema().unwrap();
        let input = params(json!({"x": 1, "y": 2.5}));
        let a = validate(&schema, input.clone()).unwrap();
        let b = validate(&schema, input).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get_str("button"), Some("left"));
    }

    #[test]
    fn require_getters_fault_on_undeclared_names() {
        let validated = validate(&ActionSchema::new(), Parameters::new()).unwrap();
        assert!(matches!(
            validated.require_str("nope"),
            Err(HandlerError::Fault(_))
        ));
    }
}
