//! Ordered substring-trigger intent parser.
//!
//! The parser lower-cases a command and scans it for every registered trigger
//! phrase in one pass using an [`aho_corasick`] automaton.  When several
//! triggers occur, the rule declared **first** wins, regardless of where in
//! the text it matched or how long it is.  The winning rule then builds the
//! intent parameters:
//!
//! | Extraction | Parameters |
//! |------------|------------|
//! | [`Extraction::Fixed`] | a constant map |
//! | [`Extraction::TextAfter`] | the original-cased text following the trigger |
//! | [`Extraction::Pointer`] | `x`/`y` from the first coordinate pair after the trigger, plus an optional `button` |
//!
//! A command that contains no trigger becomes [`ActionName::Unknown`] with
//! the untouched text under `raw_command`.  Parsing never fails.
//!
//! # Example
//!
//! ```rust
//! # use deskflow_kernel::{ActionName, IntentParser};
//! let parser = IntentParser::new().unwrap();
//!
//! let intent = parser.parse("open notepad");
//! assert_eq!(intent.action(), ActionName::OpenApp);
//! assert_eq!(intent.parameters()["app_path"], "notepad.exe");
//!
//! let intent = parser.parse("do a backflip");
//! assert_eq!(intent.action(), ActionName::Unknown);
//! ```

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde_json::{Number, Value, json};

use crate::action::{ActionName, Intent, Parameters};
use crate::error::{KernelError, Result};

/// First coordinate pair: `100, 200`, `100 200`, `100x200`, `-5.5,12`.
const COORDINATE_PATTERN: &str =
    r"(?P<x>-?\d+(?:\.\d+)?)\s*(?:,|x|\s)\s*(?P<y>-?\d+(?:\.\d+)?)";

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// How a matched rule derives intent parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Use this map as-is.
    Fixed(Parameters),
    /// Store the trimmed text after the trigger under `param`.  Nothing is
    /// stored when the remainder is empty.
    TextAfter { param: &'static str },
    /// Read the first coordinate pair after the trigger into `x`/`y`.  When
    /// `button` is set, a `right` or `middle` anywhere in the command selects
    /// that button.
    Pointer { button: bool },
}

/// One entry of the ordered rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    /// Lower-cased phrase searched for as a substring.
    pub trigger: String,
    pub action: ActionName,
    pub extraction: Extraction,
}

impl TriggerRule {
    pub fn new(trigger: impl Into<String>, action: ActionName, extraction: Extraction) -> Self {
        Self {
            trigger: trigger.into().to_lowercase(),
            action,
            extraction,
        }
    }

    /// A rule with a constant parameter map.  `params` must be a JSON object;
    /// anything else yields an empty map.
    pub fn fixed(trigger: impl Into<String>, action: ActionName, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Parameters::new(),
        };
        Self::new(trigger, action, Extraction::Fixed(params))
    }

    pub fn text_after(trigger: impl Into<String>, action: ActionName, param: &'static str) -> Self {
        Self::new(trigger, action, Extraction::TextAfter { param })
    }

    pub fn pointer(trigger: impl Into<String>, action: ActionName, button: bool) -> Self {
        Self::new(trigger, action, Extraction::Pointer { button })
    }
}

/// The built-in rule table, in priority order.
///
/// The five fixed phrases come first, then the pointer phrases, so both
/// shadow the catch-all `type `/`open `/`run `/`execute ` rules.
pub fn default_rules() -> Vec<TriggerRule> {
    vec![
        TriggerRule::fixed(
            "summarize emails",
            ActionName::SummarizeEmails,
            json!({"email_count": 5, "folder": "inbox"}),
        ),
        TriggerRule::fixed("fetch crm interactions", ActionName::FetchCrmInteractions, json!({})),
        TriggerRule::fixed("fetch calendar events", ActionName::FetchCalendarEvents, json!({})),
        TriggerRule::fixed("open notepad", ActionName::OpenApp, json!({"app_path": "notepad.exe"})),
        TriggerRule::fixed("type hello world", ActionName::TypeText, json!({"text": "Hello, World!"})),
        TriggerRule::pointer("move the mouse", ActionName::MoveMouse, false),
        TriggerRule::pointer("move mouse", ActionName::MoveMouse, false),
        TriggerRule::pointer("click", ActionName::ClickMouse, true),
        TriggerRule::text_after("type ", ActionName::TypeText, "text"),
        TriggerRule::text_after("open ", ActionName::OpenApp, "app_path"),
        TriggerRule::text_after("run ", ActionName::ExecuteTerminatorCommand, "command"),
        TriggerRule::text_after("execute ", ActionName::ExecuteTerminatorCommand, "command"),
    ]
}

// ---------------------------------------------------------------------------
// IntentParser
// ---------------------------------------------------------------------------

/// Converts raw command text into an [`Intent`].
///
/// The automaton is compiled once in the constructor; [`IntentParser::parse`]
/// takes `&self` and is safe to call from many tasks at once.
#[derive(Debug)]
pub struct IntentParser {
    rules: Vec<TriggerRule>,
    automaton: AhoCorasick,
    coordinates: Regex,
}

impl IntentParser {
    /// Build a parser over [`default_rules`].
    pub fn new() -> Result<Self> {
        Self::with_rules(default_rules())
    }

    /// Build a parser over a custom rule table.  Earlier rules take priority.
    ///
    /// Returns an error for an empty trigger (it would match every command)
    /// or if the automaton cannot be built.
    pub fn with_rules(rules: Vec<TriggerRule>) -> Result<Self> {
        if let Some(rule) = rules.iter().find(|r| r.trigger.is_empty()) {
            return Err(KernelError::ParserBuildError {
                reason: format!("empty trigger phrase for action `{}`", rule.action),
            });
        }

        let automaton = AhoCorasick::new(rules.iter().map(|r| r.trigger.as_str())).map_err(|e| {
            KernelError::ParserBuildError {
                reason: e.to_string(),
            }
        })?;

        let coordinates =
            Regex::new(COORDINATE_PATTERN).map_err(|e| KernelError::InvalidPattern {
                pattern: COORDINATE_PATTERN.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(rules = rules.len(), "intent parser built");

        Ok(Self {
            rules,
            automaton,
            coordinates,
        })
    }

    /// The rule table in priority order.
    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Parse a command.  Never fails.
    pub fn parse(&self, command: &str) -> Intent {
        let folded = FoldedText::new(command);

        // Overlapping search reports every trigger occurrence; keep the one
        // belonging to the earliest-declared rule (its first occurrence).
        let mut best: Option<aho_corasick::Match> = None;
        for mat in self.automaton.find_overlapping_iter(&folded.lowered) {
            if best.is_none_or(|b| mat.pattern() < b.pattern()) {
                best = Some(mat);
            }
        }

        let Some(mat) = best else {
            tracing::debug!(command = %command, "no trigger matched");
            return Intent::unknown(command);
        };

        let rule = &self.rules[mat.pattern().as_usize()];
        let rest = folded.original_after(command, mat.end());

        let parameters = match &rule.extraction {
            Extraction::Fixed(params) => params.clone(),
            Extraction::TextAfter { param } => {
                let mut params = Parameters::new();
                if !rest.is_empty() {
                    params.insert((*param).to_string(), Value::String(rest.to_string()));
                }
                params
            }
            Extraction::Pointer { button } => {
                let mut params = self.extract_coordinates(rest);
                if *button && let Some(b) = detect_button(&folded.lowered) {
                    params.insert("button".into(), Value::String(b.into()));
                }
                params
            }
        };

        tracing::debug!(
            trigger = %rule.trigger,
            action = %rule.action,
            "trigger matched"
        );

        Intent::new(rule.action, parameters)
    }

    /// Pull `x`/`y` from the first coordinate pair in `text`.
    fn extract_coordinates(&self, text: &str) -> Parameters {
        let mut params = Parameters::new();
        let Some(caps) = self.coordinates.captures(text) else {
            return params;
        };
        for axis in ["x", "y"] {
            if let Some(number) = caps.name(axis).and_then(|m| parse_number(m.as_str())) {
                params.insert(axis.to_string(), Value::Number(number));
            }
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A lower-cased copy of a command plus, for every byte of the copy, the byte
/// offset of the original character that produced it.
struct FoldedText {
    lowered: String,
    origin: Vec<usize>,
}

impl FoldedText {
    fn new(command: &str) -> Self {
        let mut lowered = String::with_capacity(command.len());
        let mut origin = Vec::with_capacity(command.len() + 1);
        for (idx, ch) in command.char_indices() {
            for lower in ch.to_lowercase() {
                lowered.push(lower);
                origin.resize(lowered.len(), idx);
            }
        }
        origin.push(command.len());
        Self { lowered, origin }
    }

    /// The trimmed original text starting where byte `end` of the lowered
    /// copy came from.
    fn original_after<'a>(&self, command: &'a str, end: usize) -> &'a str {
        let start = self.origin.get(end).copied().unwrap_or(command.len());
        command.get(start..).unwrap_or_default().trim()
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Number::from(int));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

fn detect_button(lowered: &str) -> Option<&'static str> {
    if lowered.contains("right") {
        Some("right")
    } else if lowered.contains("middle") {
        Some("middle")
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IntentParser {
        IntentParser::new().expect("default rules build")
    }

    #[test]
    fn summarize_emails_anywhere_in_sentence() {
        let intent = parser().parse("Please summarize emails from my inbox");
        assert_eq!(intent.action(), ActionName::SummarizeEmails);
        assert_eq!(intent.parameters()["email_count"], json!(5));
        assert_eq!(intent.parameters()["folder"], json!("inbox"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let intent = parser().parse("FETCH CRM Interactions now");
        assert_eq!(intent.action(), ActionName::FetchCrmInteractions);
        assert!(intent.parameters().is_empty());
    }

    #[test]
    fn fixed_phrases_shadow_generic_rules() {
        let intent = parser().parse("open notepad");
        assert_eq!(intent.action(), ActionName::OpenApp);
        assert_eq!(intent.parameters()["app_path"], json!("notepad.exe"));

        let intent = parser().parse("type hello world");
        assert_eq!(intent.action(), ActionName::TypeText);
        assert_eq!(intent.parameters()["text"], json!("Hello, World!"));
    }

    #[test]
    fn earlier_rule_wins_even_when_it_matches_later_in_text() {
        // "type " appears first in the text but "summarize emails" is
        // declared first.
        let intent = parser().parse("type this: summarize emails");
        assert_eq!(intent.action(), ActionName::SummarizeEmails);
    }

    #[test]
    fn text_after_keeps_original_casing() {
        let intent = parser().parse("Type Dear Sir, Thanks!");
        assert_eq!(intent.action(), ActionName::TypeText);
        assert_eq!(intent.parameters()["text"], json!("Dear Sir, Thanks!"));

        let intent = parser().parse("please OPEN C:\\Tools\\Calc.exe");
        assert_eq!(intent.parameters()["app_path"], json!("C:\\Tools\\Calc.exe"));
    }

    #[test]
    fn text_after_with_empty_rest_stores_nothing() {
        let intent = parser().parse("run   ");
        assert_eq!(intent.action(), ActionName::ExecuteTerminatorCommand);
        assert!(intent.parameters().is_empty());
    }

    #[test]
    fn run_extracts_command() {
        let intent = parser().parse("run ls -la /tmp");
        assert_eq!(intent.action(), ActionName::ExecuteTerminatorCommand);
        assert_eq!(intent.parameters()["command"], json!("ls -la /tmp"));
    }

    #[test]
    fn click_without_coordinates_has_no_xy() {
        let intent = parser().parse("click the mouse");
        assert_eq!(intent.action(), ActionName::ClickMouse);
        assert!(intent.parameters().get("x").is_none());
        assert!(intent.parameters().get("y").is_none());
    }

    #[test]
    fn click_with_coordinates_and_button() {
        let intent = parser().parse("Right click at 120, 45.5");
        assert_eq!(intent.action(), ActionName::ClickMouse);
        assert_eq!(intent.parameters()["x"], json!(120));
        assert_eq!(intent.parameters()["y"], json!(45.5));
        assert_eq!(intent.parameters()["button"], json!("right"));
    }

    #[test]
    fn move_mouse_coordinate_forms() {
        let p = parser();
        for text in [
            "move the mouse to 300 400",
            "move mouse to 300,400",
            "Move Mouse 300x400",
        ] {
            let intent = p.parse(text);
            assert_eq!(intent.action(), ActionName::MoveMouse, "{text}");
            assert_eq!(intent.parameters()["x"], json!(300), "{text}");
            assert_eq!(intent.parameters()["y"], json!(400), "{text}");
            assert!(intent.parameters().get("button").is_none());
        }
    }

    #[test]
    fn pointer_phrases_outrank_catch_all_words() {
        let p = parser();

        let intent = p.parse("click the open button at 100, 200");
        assert_eq!(intent.action(), ActionName::ClickMouse);
        assert_eq!(intent.parameters()["x"], json!(100));
        assert_eq!(intent.parameters()["y"], json!(200));

        let intent = p.parse("move the mouse to the open window at 10, 20");
        assert_eq!(intent.action(), ActionName::MoveMouse);
        assert_eq!(intent.parameters()["x"], json!(10));
        assert!(intent.parameters().get("app_path").is_none());

        let intent = p.parse("click the type selector at 5, 5");
        assert_eq!(intent.action(), ActionName::ClickMouse);
        assert!(intent.parameters().get("text").is_none());
    }

    #[test]
    fn unmatched_command_is_unknown_with_raw_text() {
        let intent = parser().parse("Do A Backflip");
        assert_eq!(intent.action(), ActionName::Unknown);
        assert_eq!(intent.parameters()["raw_command"], json!("Do A Backflip"));
    }

    #[test]
    fn punctuation_is_not_normalized() {
        // "summarize-emails" is not the trigger "summarize emails".
        let intent = parser().parse("summarize-emails");
        assert_eq!(intent.action(), ActionName::Unknown);
    }

    #[test]
    fn empty_trigger_is_rejected() {
        let result = IntentParser::with_rules(vec![TriggerRule::fixed(
            "",
            ActionName::TypeText,
            json!({}),
        )]);
        assert!(matches!(result, Err(KernelError::ParserBuildError { .. })));
    }

    #[test]
    fn custom_rules_respect_declaration_order() {
        let parser = IntentParser::with_rules(vec![
            TriggerRule::fixed("mail", ActionName::FetchCalendarEvents, json!({})),
            TriggerRule::fixed("email", ActionName::SummarizeEmails, json!({})),
        ])
        .unwrap();
        assert_eq!(parser.parse("check email").action(), ActionName::FetchCalendarEvents);
        assert_eq!(parser.rules().len(), 2);
    }

    #[test]
    fn folded_offsets_survive_multibyte_lowercasing() {
        // 'İ' lower-cases to two chars; the rest must still come from the
        // original text.
        let intent = parser().parse("İ type Ünïcode Text");
        assert_eq!(intent.action(), ActionName::TypeText);
        assert_eq!(intent.parameters()["text"], json!("Ünïcode Text"));
    }
}
