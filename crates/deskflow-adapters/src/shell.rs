//! Shell command executor -- handler for `execute_terminator_command`.
//!
//! Commands run through the system shell with a configurable working
//! directory and timeout.  Output is trimmed and truncated to
//! [`MAX_OUTPUT_BYTES`] (100 KB) to prevent memory exhaustion from runaway
//! commands.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use deskflow_kernel::{ActionHandler, HandlerError, HandlerResult, Parameters, ValidatedParameters};

use crate::error::AdapterError;

/// Default command timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum output size in bytes (100 KB).  Stdout and stderr are each
/// independently truncated to this limit.
const MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// `[shell]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Seconds before a running command is killed.
    pub timeout_secs: u64,
    /// Working directory; `None` inherits the process's.
    pub working_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            working_dir: None,
        }
    }
}

/// Runs `command` through `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ShellConfig,
}

impl CommandExecutor {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    fn shell_command(command: &str) -> tokio::process::Command {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        let mut cmd = tokio::process::Command::new(shell);
        cmd.arg(flag).arg(command);
        cmd
    }

    async fn execute(&self, command: &str) -> HandlerResult {
        let timeout_secs = self.config.timeout_secs;
        debug!(
            command = command,
            timeout_secs = timeout_secs,
            "executing shell command"
        );

        let mut cmd = Self::shell_command(command);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        let child = cmd
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HandlerError::declared(format!("Failed to execute command: {e}")))?;

        // On timeout the child is dropped and killed via `kill_on_drop(true)`.
        let output = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(HandlerError::declared(format!(
                    "Failed to execute command: {e}"
                )));
            }
            Err(_) => {
                warn!(
                    command = command,
                    timeout_secs = timeout_secs,
                    "command timed out"
                );
                return Err(AdapterError::Timeout {
                    seconds: timeout_secs,
                    reason: format!("command `{command}` exceeded time limit"),
                }
                .into());
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code = exit_code, "command completed");

        if output.status.success() {
            let mut payload = Parameters::new();
            payload.insert("status".into(), json!("Command executed successfully"));
            payload.insert("output".into(), Value::String(truncate_output(&output.stdout)));
            Ok(payload)
        } else {
            let mut details = Parameters::new();
            details.insert("output".into(), Value::String(truncate_output(&output.stderr)));
            details.insert("exit_code".into(), json!(exit_code));
            Err(HandlerError::declared_with_details(
                "Command execution failed",
                details,
            ))
        }
    }
}

#[async_trait]
impl ActionHandler for CommandExecutor {
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
        let command = params.require_str("command")?;
        self.execute(command).await
    }
}

/// Lossy UTF-8 decode, trimmed, truncated to [`MAX_OUTPUT_BYTES`].
fn truncate_output(raw: &[u8]) -> String {
    if raw.len() <= MAX_OUTPUT_BYTES {
        String::from_utf8_lossy(raw).trim().to_string()
    } else {
        let mut s = String::from_utf8_lossy(&raw[..MAX_OUTPUT_BYTES])
            .trim()
            .to_string();
        s.push_str("\n... [output truncated at 100 KB]");
        s
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_output_trims_short_input() {
        assert_eq!(truncate_output(b"  hello world\n"), "hello world");
    }

    #[test]
    fn truncate_output_large_input_is_truncated() {
        let data = vec![b'x'; MAX_OUTPUT_BYTES + 1000];
        let s = truncate_output(&data);
        assert!(s.ends_with("[output truncated at 100 KB]"));
        assert!(s.len() <= MAX_OUTPUT_BYTES + 50);
    }

    #[test]
    fn default_config() {
        let config = ShellConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.working_dir.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_reports_stdout() {
        let executor = CommandExecutor::default();
        let payload = executor.execute("echo hello").await.unwrap();
        assert_eq!(payload["status"], json!("Command executed successfully"));
        assert_eq!(payload["output"], json!("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let executor = CommandExecutor::default();
        let err = executor.execute("echo oops >&2; exit 3").await.unwrap_err();
        match err {
            HandlerError::Declared { message, details } => {
                assert_eq!(message, "Command execution failed");
                let details = details.unwrap();
                assert_eq!(details["output"], json!("oops"));
                assert_eq!(details["exit_code"], json!(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let executor = CommandExecutor::new(ShellConfig {
            timeout_secs: 1,
            working_dir: None,
        });
        let err = executor.execute("sleep 5").await.unwrap_err();
        assert!(err.to_string().contains("timeout after 1s"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn working_dir_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(ShellConfig {
            timeout_secs: 5,
            working_dir: Some(dir.path().to_path_buf()),
        });
        let payload = executor.execute("pwd").await.unwrap();
        let reported = payload["output"].as_str().unwrap();
        assert!(reported.ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }
}
