//! Desktop automation handlers -- `open_app`, `type_text`, `move_mouse`,
//! `click_mouse`.
//!
//! Keyboard and pointer control go through the [`InputDriver`] trait.  The
//! production driver shells out to `xdotool`; tests substitute a recording
//! fake.  Launching applications goes through the system shell directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use deskflow_kernel::{ActionHandler, HandlerError, HandlerResult, Parameters, ValidatedParameters};

use crate::error::{AdapterError, Result};

/// `[desktop]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    /// Delay between keystrokes.
    pub type_interval_ms: u64,
    /// Pause before typing so the target window can take focus.
    pub pre_type_delay_ms: u64,
    /// Pause after launching an application.
    pub launch_settle_ms: u64,
    /// Intermediate positions used when gliding the pointer.
    pub mouse_move_steps: u32,
    /// Input driver executable.
    pub driver_program: String,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            type_interval_ms: 50,
            pre_type_delay_ms: 1000,
            launch_settle_ms: 2000,
            mouse_move_steps: 20,
            driver_program: "xdotool".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Input driver
// ---------------------------------------------------------------------------

/// Mouse buttons a click may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "middle" => Some(Self::Middle),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
        }
    }

    /// X11 button number.
    fn code(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Middle => 2,
            Self::Right => 3,
        }
    }
}

/// Synthetic keyboard and pointer input.
#[async_trait]
pub trait InputDriver: Send + Sync {
    async fn type_text(&self, text: &str, interval: Duration) -> Result<()>;

    async fn pointer_position(&self) -> Result<(f64, f64)>;

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()>;

    async fn click(&self, x: f64, y: f64, button: MouseButton) -> Result<()>;
}

/// [`InputDriver`] backed by the `xdotool` command.
#[derive(Debug, Clone)]
pub struct XdotoolDriver {
    program: String,
}

impl XdotoolDriver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        debug!(program = %self.program, args = ?args, "running input driver");
        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(AdapterError::CommandFailed {
                program: self.program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Default for XdotoolDriver {
    fn default() -> Self {
        Self::new("xdotool")
    }
}

fn pixel(v: f64) -> String {
    format!("{}", v.round() as i64)
}

/// Parse `xdotool getmouselocation --shell` output (`X=..`, `Y=..` lines).
fn parse_mouse_location(output: &str) -> Option<(f64, f64)> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("X", v)) => x = v.parse().ok(),
            Some(("Y", v)) => y = v.parse().ok(),
            _ => {}
        }
    }
    Some((x?, y?))
}

#[async_trait]
impl InputDriver for XdotoolDriver {
    async fn type_text(&self, text: &str, interval: Duration) -> Result<()> {
        self.run(&[
            "type".into(),
            "--delay".into(),
            interval.as_millis().to_string(),
            "--".into(),
            text.into(),
        ])
        .await
        .map(|_| ())
    }

    async fn pointer_position(&self) -> Result<(f64, f64)> {
        let out = self
            .run(&["getmouselocation".into(), "--shell".into()])
            .await?;
        parse_mouse_location(&out).ok_or_else(|| AdapterError::InvalidInput(format!(
            "unrecognised pointer location output: {}",
            out.trim()
        )))
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.run(&["mousemove".into(), pixel(x), pixel(y)])
            .await
            .map(|_| ())
    }

    async fn click(&self, x: f64, y: f64, button: MouseButton) -> Result<()> {
        self.run(&[
            "mousemove".into(),
            pixel(x),
            pixel(y),
            "click".into(),
            button.code().to_string(),
        ])
        .await
        .map(|_| ())
    }
}

fn status(message: String) -> Parameters {
    let mut payload = Parameters::new();
    payload.insert("status".into(), json!(message));
    payload
}

// ---------------------------------------------------------------------------
// open_app
// ---------------------------------------------------------------------------

/// Launches an application through the system shell and waits for it to
/// settle.  The process is not awaited.
#[derive(Debug, Clone)]
pub struct AppLauncher {
    settle: Duration,
}

impl AppLauncher {
    pub fn new(config: &DesktopConfig) -> Self {
        Self {
            settle: Duration::from_millis(config.launch_settle_ms),
        }
    }

    fn command(app_path: &str) -> tokio::process::Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = tokio::process::Command::new("cmd");
            cmd.args(["/C", "start", ""]);
            cmd
        } else {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c");
            cmd
        };
        cmd.arg(app_path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        cmd
    }
}

#[async_trait]
impl ActionHandler for AppLauncher {
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
        let app_path = params.require_str("app_path")?;
        let child = Self::command(app_path)
            .spawn()
            .map_err(|e| HandlerError::declared(format!("Failed to open application: {e}")))?;
        info!(app_path = app_path, pid = ?child.id(), "application launched");
        tokio::time::sleep(self.settle).await;
        Ok(status(format!("Opened application: {app_path}")))
    }
}

// ---------------------------------------------------------------------------
// type_text
// ---------------------------------------------------------------------------

/// Types text into the focused window.
#[derive(Clone)]
pub struct TextTyper {
    driver: Arc<dyn InputDriver>,
    pre_delay: Duration,
    interval: Duration,
}

impl TextTyper {
    pub fn new(driver: Arc<dyn InputDriver>, config: &DesktopConfig) -> Self {
        Self {
            driver,
            pre_delay: Duration::from_millis(config.pre_type_delay_ms),
            interval: Duration::from_millis(config.type_interval_ms),
        }
    }
}

#[async_trait]
impl ActionHandler for TextTyper {
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
        let text = params.require_str("text")?;
        tokio::time::sleep(self.pre_delay).await;
        self.driver
            .type_text(text, self.interval)
            .await
            .map_err(|e| HandlerError::declared(format!("Failed to type text: {e}")))?;
        Ok(status(format!("Typed: {text}")))
    }
}

// ---------------------------------------------------------------------------
// move_mouse
// ---------------------------------------------------------------------------

/// Glides the pointer to `(x, y)` over `duration` seconds.
#[derive(Clone)]
pub struct MouseMover {
    driver: Arc<dyn InputDriver>,
    steps: u32,
}

impl MouseMover {
    pub fn new(driver: Arc<dyn InputDriver>, config: &DesktopConfig) -> Self {
        Self {
            driver,
            steps: config.mouse_move_steps,
        }
    }

    async fn glide(&self, x: f64, y: f64, duration: f64) -> Result<()> {
        if duration.is_nan() || duration <= 0.0 || self.steps <= 1 {
            return self.driver.move_pointer(x, y).await;
        }
        let pause = Duration::try_from_secs_f64(duration / f64::from(self.steps))
            .map_err(|e| AdapterError::InvalidInput(format!("duration {duration}: {e}")))?;
        let (start_x, start_y) = self.driver.pointer_position().await?;
        for step in 1..=self.steps {
            let t = f64::from(step) / f64::from(self.steps);
            self.driver
                .move_pointer(start_x + (x - start_x) * t, start_y + (y - start_y) * t)
                .await?;
            if step < self.steps {
                tokio::time::sleep(pause).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ActionHandler for MouseMover {
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
        let x = params.require_f64("x")?;
        let y = params.require_f64("y")?;
        let duration = params.require_f64("duration")?;
        self.glide(x, y, duration)
            .await
            .map_err(|e| HandlerError::declared(format!("Failed to move mouse: {e}")))?;
        Ok(status(format!("Mouse moved to ({x}, {y})")))
    }
}

// ---------------------------------------------------------------------------
// click_mouse
// ---------------------------------------------------------------------------

/// Clicks at `(x, y)` with the requested button.
#[derive(Clone)]
pub struct MouseClicker {
    driver: Arc<dyn InputDriver>,
}

impl MouseClicker {
    pub fn new(driver: Arc<dyn InputDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl ActionHandler for MouseClicker {
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
        let x = params.require_f64("x")?;
        let y = params.require_f64("y")?;
        let name = params.require_str("button")?;
        let button = MouseButton::parse(name).ok_or_else(|| {
            HandlerError::declared(format!("Failed to click mouse: unsupported button `{name}`"))
        })?;
        self.driver
            .click(x, y, button)
            .await
            .map_err(|e| HandlerError::declared(format!("Failed to click mouse: {e}")))?;
        Ok(status(format!(
            "Mouse clicked at ({x}, {y}) with {} button",
            button.as_str()
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
