//! Local-script provider.
//!
//! Runs a shell command, writes the prompt to its stdin and returns its
//! stdout as the answer.  The system context, when present, is exposed to
//! the script through the `HUBCENTRAL_SYSTEM_CONTEXT` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::providers::truncate_chars;
use crate::traits::ProviderAdapter;

/// Environment variable carrying the system context into the script.
pub const SYSTEM_CONTEXT_ENV: &str = "HUBCENTRAL_SYSTEM_CONTEXT";

/// Maximum number of characters of stderr kept in error messages.
const MAX_STDERR_CHARS: usize = 500;

/// Provider backed by a local command.
pub struct ScriptProvider {
    name: String,
    command: String,
    working_dir: Option<PathBuf>,
}

impl ScriptProvider {
    /// Create a provider that runs `command` through `sh -c`.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            working_dir: None,
        }
    }

    /// Run the command from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl ProviderAdapter for ScriptProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        prompt: &str,
        system_context: Option<&str>,
        timeout: Duration,
    ) -> ProviderResult<String> {
        if self.command.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "provider `{}` has no command",
                self.name
            )));
        }

        debug!(provider = %self.name, command = %self.command, "running provider script");

        let mut command = tokio::process::Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .env(SYSTEM_CONTEXT_ENV, system_context.unwrap_or_default())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ProviderError::Transport(format!("failed to spawn process: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A script that ignores stdin may close it early.
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                debug!(provider = %self.name, error = %e, "script did not consume stdin");
            }
        }

        // `wait_with_output` takes ownership, so on timeout the child is
        // dropped and killed via `kill_on_drop(true)`.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ProviderError::Transport(format!("process error: {e}"))),
            Err(_) => {
                warn!(provider = %self.name, timeout_ms = timeout.as_millis() as u64, "provider script timed out");
                return Err(ProviderError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Transport(format!(
                "script exited with status {code}: {}",
                truncate_chars(stderr.trim(), MAX_STDERR_CHARS)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(ProviderError::InvalidResponse("script produced no output".into()));
        }
        Ok(stdout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt_from_stdin() {
        let provider = ScriptProvider::new("echo", "cat");
        let answer = provider
            .call("hello from stdin", None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(answer, "hello from stdin");
    }

    #[tokio::test]
    async fn system_context_is_exported() {
        let provider = ScriptProvider::new("ctx", "printf '%s' \"$HUBCENTRAL_SYSTEM_CONTEXT\"");
        let answer = provider
            .call("ignored", Some("you are helpful"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(answer, "you are helpful");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let provider = ScriptProvider::new("fail", "echo broken >&2; exit 3");
        let err = provider
            .call("x", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ProviderError::Transport(msg) => {
                assert!(msg.contains("status 3"));
                assert!(msg.contains("broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_script_times_out() {
        let provider = ScriptProvider::new("slow", "sleep 5");
        let err = provider
            .call("x", None, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Timeout { timeout_ms: 200 });
    }

    #[tokio::test]
    async fn empty_output_is_invalid() {
        let provider = ScriptProvider::new("quiet", "cat > /dev/null");
        let err = provider
            .call("x", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }
}
