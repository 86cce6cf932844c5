//! Placeholder handlers for `fetch_crm_interactions` and
//! `fetch_calendar_events`.
//!
//! Neither integration exists yet.  Both always succeed with a fixed
//! `{"result": ...}` payload so callers can tell "not built" apart from a
//! failure.

use async_trait::async_trait;
use serde_json::json;

use deskflow_kernel::{ActionHandler, HandlerResult, Parameters, ValidatedParameters};

pub const CRM_PLACEHOLDER: &str =
    "Fetching recent customer interactions from CRM is not yet implemented.";

pub const CALENDAR_PLACEHOLDER: &str = "Fetching calendar events is not yet implemented.";

/// Replies with the same `result` text on every call, ignoring parameters.
#[derive(Debug, Clone, Copy)]
pub struct Placeholder {
    result: &'static str,
}

impl Placeholder {
    pub fn crm() -> Self {
        Self {
            result: CRM_PLACEHOLDER,
        }
    }

    pub fn calendar() -> Self {
        Self {
            result: CALENDAR_PLACEHOLDER,
        }
    }
}

#[async_trait]
impl ActionHandler for Placeholder {
    async fn handle(&self, _params: ValidatedParameters) -> HandlerResult {
        let mut payload = Parameters::new();
        payload.insert("result".into(), json!(self.result));
        Ok(payload)
    }
}
