//! Action catalog and intent values.
//!
//! [`ActionName`] is the closed set of actions Deskflow can perform, plus the
//! [`ActionName::Unknown`] sentinel the parser falls back to.  Every
//! registrable action declares its parameter contract via
//! [`ActionName::schema`]; the registry pairs that contract with a handler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::KernelError;

/// Parameter mapping carried by intents, handed to handlers, and returned as
/// success payloads.
pub type Parameters = Map<String, Value>;

// ---------------------------------------------------------------------------
// ActionName
// ---------------------------------------------------------------------------

/// Canonical action identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    SummarizeEmails,
    FetchCrmInteractions,
    FetchCalendarEvents,
    OpenApp,
    TypeText,
    MoveMouse,
    ClickMouse,
    ExecuteTerminatorCommand,
    /// Parser fallback.  Never registered; always unsupported at lookup.
    Unknown,
}

impl ActionName {
    /// Every action that must have exactly one registry entry, in catalog
    /// order.
    pub const REGISTRABLE: [ActionName; 8] = [
        ActionName::SummarizeEmails,
        ActionName::FetchCrmInteractions,
        ActionName::FetchCalendarEvents,
        ActionName::OpenApp,
        ActionName::TypeText,
        ActionName::MoveMouse,
        ActionName::ClickMouse,
        ActionName::ExecuteTerminatorCommand,
    ];

    /// The wire name of the action (e.g. `summarize_emails`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SummarizeEmails => "summarize_emails",
            Self::FetchCrmInteractions => "fetch_crm_interactions",
            Self::FetchCalendarEvents => "fetch_calendar_events",
            Self::OpenApp => "open_app",
            Self::TypeText => "type_text",
            Self::MoveMouse => "move_mouse",
            Self::ClickMouse => "click_mouse",
            Self::ExecuteTerminatorCommand => "execute_terminator_command",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable summary shown by the action listing endpoints.
    pub fn description(self) -> &'static str {
        match self {
            Self::SummarizeEmails => "Fetch and summarize the most recent emails from a mailbox folder",
            Self::FetchCrmInteractions => "Fetch recent customer interactions from the CRM",
            Self::FetchCalendarEvents => "Fetch upcoming calendar events",
            Self::OpenApp => "Launch an application by executable path",
            Self::TypeText => "Type text into the focused window",
            Self::MoveMouse => "Move the mouse pointer to screen coordinates",
            Self::ClickMouse => "Click the mouse at screen coordinates",
            Self::ExecuteTerminatorCommand => "Run a shell command and capture its output",
            Self::Unknown => "Command that matched no trigger phrase",
        }
    }

    /// The parameter contract of this action, or `None` for
    /// [`ActionName::Unknown`].
    pub fn schema(self) -> Option<ActionSchema> {
        let schema = match self {
            Self::SummarizeEmails => ActionSchema::new()
                .optional("email_count", ParamType::Integer, json!(5))
                .optional("folder", ParamType::String, json!("inbox"))
                .optional("mark_as_read", ParamType::Boolean, json!(false)),
            Self::FetchCrmInteractions | Self::FetchCalendarEvents => ActionSchema::new(),
            Self::OpenApp => ActionSchema::new().require("app_path", ParamType::String),
            Self::TypeText => ActionSchema::new().require("text", ParamType::String),
            Self::MoveMouse => ActionSchema::new()
                .require("x", ParamType::Number)
                .require("y", ParamType::Number)
                .optional("duration", ParamType::Number, json!(1)),
            Self::ClickMouse => ActionSchema::new()
                .require("x", ParamType::Number)
                .require("y", ParamType::Number)
                .optional("button", ParamType::String, json!("left")),
            Self::ExecuteTerminatorCommand => {
                ActionSchema::new().require("command", ParamType::String)
            }
            Self::Unknown => return None,
        };
        Some(schema)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::REGISTRABLE
            .into_iter()
            .chain(std::iter::once(ActionName::Unknown))
            .find(|action| action.as_str() == s)
            .ok_or_else(|| KernelError::UnknownActionName { name: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Parameter schema
// ---------------------------------------------------------------------------

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    /// A JSON integer.  Floats are rejected even when integral.
    Integer,
    /// Any JSON number.
    Number,
    Boolean,
}

impl ParamType {
    /// Whether `value` satisfies this type.  No coercion is performed:
    /// `"12"` is not a number.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// A named, typed parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamType,
}

/// An optional parameter and the value injected when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionalParam {
    #[serde(flatten)]
    pub param: ParamSpec,
    pub default: Value,
}

/// Required and optional parameters of one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionSchema {
    pub required: Vec<ParamSpec>,
    pub optional: Vec<OptionalParam>,
}

impl ActionSchema {
    /// An empty schema: no parameters declared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required parameter.
    #[must_use]
    pub fn require(mut self, name: &'static str, kind: ParamType) -> Self {
        self.required.push(ParamSpec { name, kind });
        self
    }

    /// Declare an optional parameter with its default.
    #[must_use]
    pub fn optional(mut self, name: &'static str, kind: ParamType, default: Value) -> Self {
        self.optional.push(OptionalParam {
            param: ParamSpec { name, kind },
            default,
        });
        self
    }

    /// Whether `name` is declared, required or optional.
    pub fn declares(&self, name: &str) -> bool {
        self.required.iter().any(|p| p.name == name)
            || self.optional.iter().any(|o| o.param.name == name)
    }
}

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// The parsed `(action, parameters)` pair for one command.
///
/// Intents are immutable once built; use [`Intent::into_parts`] to take
/// ownership of the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    action: ActionName,
    parameters: Parameters,
}

impl Intent {
    pub fn new(action: ActionName, parameters: Parameters) -> Self {
        Self { action, parameters }
    }

    /// The fallback intent for a command no rule recognised.  The raw text is
    /// stored exactly as given.
    pub fn unknown(raw_command: &str) -> Self {
        let mut parameters = Parameters::new();
        parameters.insert("raw_command".into(), Value::String(raw_command.to_string()));
        Self::new(ActionName::Unknown, parameters)
    }

    pub fn action(&self) -> ActionName {
        self.action
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn into_parts(self) -> (ActionName, Parameters) {
        (self.action, self.parameters)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
