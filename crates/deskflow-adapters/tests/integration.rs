//! Integration tests for the deskflow-adapters crate.
//!
//! These tests wire the production handler set into a real dispatcher (with a
//! recording input driver in place of `xdotool`) and drive it with commands.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use deskflow_adapters::placeholders::{CALENDAR_PLACEHOLDER, CRM_PLACEHOLDER};
use deskflow_adapters::{
    AdapterError, AdaptersConfig, DesktopConfig, InputDriver, MouseButton, register_with_driver,
};
use deskflow_kernel::{ActionRegistry, Dispatcher, ErrorKind, IntentParser};

#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<String>>,
}

impl RecordingDriver {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InputDriver for RecordingDriver {
    async fn type_text(&self, text: &str, _interval: Duration) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push(format!("type {text}"));
        Ok(())
    }

    async fn pointer_position(&self) -> Result<(f64, f64), AdapterError> {
        Ok((0.0, 0.0))
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push(format!("move {x} {y}"));
        Ok(())
    }

    async fn click(&self, x: f64, y: f64, button: MouseButton) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("click {x} {y} {}", button.as_str()));
        Ok(())
    }
}

fn dispatcher() -> (Dispatcher, Arc<RecordingDriver>) {
    let config = AdaptersConfig {
        desktop: DesktopConfig {
            pre_type_delay_ms: 0,
            launch_settle_ms: 0,
            mouse_move_steps: 1,
            ..DesktopConfig::default()
        },
        ..AdaptersConfig::default()
    };
    let driver = Arc::new(RecordingDriver::default());
    let builder = register_with_driver(
        ActionRegistry::builder(),
        &config,
        Arc::clone(&driver) as Arc<dyn InputDriver>,
    );
    let dispatcher = Dispatcher::new(IntentParser::new().unwrap(), builder.build().unwrap());
    (dispatcher, driver)
}

// ═══════════════════════════════════════════════════════════════════════
//  Wiring
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn production_set_covers_the_catalog() {
    let (dispatcher, _) = dispatcher();
    assert_eq!(dispatcher.registry().len(), 8);
}

// ═══════════════════════════════════════════════════════════════════════
//  Placeholders
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn crm_placeholder_is_a_success() {
    let (dispatcher, _) = dispatcher();
    let envelope = dispatcher.dispatch("Fetch CRM interactions").await;
    assert!(envelope.is_success());
    assert_eq!(envelope.to_json(), json!({"result": CRM_PLACEHOLDER}));
}

#[tokio::test]
async fn calendar_placeholder_is_a_success() {
    let (dispatcher, _) = dispatcher();
    let envelope = dispatcher.dispatch("fetch calendar events for today").await;
    assert_eq!(envelope.to_json(), json!({"result": CALENDAR_PLACEHOLDER}));
}

// ═══════════════════════════════════════════════════════════════════════
//  Desktop input
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn type_hello_world_reaches_the_driver() {
    let (dispatcher, driver) = dispatcher();
    let envelope = dispatcher.dispatch("type hello world").await;
    assert_eq!(envelope.to_json(), json!({"status": "Typed: Hello, World!"}));
    assert_eq!(driver.calls(), vec!["type Hello, World!"]);
}

#[tokio::test]
async fn move_and_click_use_parsed_coordinates() {
    let (dispatcher, driver) = dispatcher();

    let moved = dispatcher.dispatch("move the mouse to 300, 200").await;
    assert_eq!(moved.to_json(), json!({"status": "Mouse moved to (300, 200)"}));

    let clicked = dispatcher.dispatch("middle click at 10 20").await;
    assert_eq!(
        clicked.to_json(),
        json!({"status": "Mouse clicked at (10, 20) with middle button"})
    );

    assert_eq!(driver.calls(), vec!["move 300 200", "click 10 20 middle"]);
}

#[tokio::test]
async fn click_without_coordinates_never_touches_the_driver() {
    let (dispatcher, driver) = dispatcher();
    let envelope = dispatcher.dispatch("click the mouse").await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::InvalidParameters));
    assert!(driver.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Shell
// ═══════════════════════════════════════════════════════════════════════

#[cfg(unix)]
#[tokio::test]
async fn run_command_returns_stdout() {
    let (dispatcher, _) = dispatcher();
    let envelope = dispatcher.dispatch("run echo deskflow").await;
    assert_eq!(
        envelope.to_json(),
        json!({"status": "Command executed successfully", "output": "deskflow"})
    );
}

#[cfg(unix)]
#[tokio::test]
async fn failing_command_is_a_handler_error() {
    let (dispatcher, _) = dispatcher();
    let envelope = dispatcher.dispatch("execute ls /definitely/not/here").await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::HandlerError));
    assert_eq!(envelope.message(), Some("Command execution failed"));
    let body = envelope.to_json();
    assert!(!body["details"]["output"].as_str().unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Email
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn email_without_credentials_is_a_handler_error() {
    let config = AdaptersConfig {
        email: deskflow_adapters::EmailConfig {
            user_env: "DESKFLOW_IT_UNSET_USER".into(),
            password_env: "DESKFLOW_IT_UNSET_PASSWORD".into(),
            ..Default::default()
        },
        ..AdaptersConfig::default()
    };
    let builder = register_with_driver(
        ActionRegistry::builder(),
        &config,
        Arc::new(RecordingDriver::default()),
    );
    let dispatcher = Dispatcher::new(IntentParser::new().unwrap(), builder.build().unwrap());

    let envelope = dispatcher.dispatch("Please summarize emails from my inbox").await;
    assert_eq!(envelope.error_kind(), Some(ErrorKind::HandlerError));
    assert_eq!(
        envelope.to_json(),
        json!({"error": "Email credentials not found in environment variables"})
    );
}
