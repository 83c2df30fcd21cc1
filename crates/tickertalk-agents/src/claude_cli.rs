use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tickertalk_models::{Message, Role};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::model::{ChatModel, ModelRequest, TextStream};

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(90),
        }
    }
}

fn command(system_prompt: &str, user_prompt: &str, config: &ClaudeCliConfig) -> Command {
    let mut cmd = Command::new("claude");
    cmd.args([
        "-p",
        user_prompt,
        "--system-prompt",
        system_prompt,
        "--model",
        &config.model,
        "--output-format",
        "text",
    ]);
    cmd
}

/// Invoke the `claude` CLI with a system prompt and user prompt.
/// Returns the raw stdout text.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, AgentError> {
    debug!(model = %config.model, "Invoking claude CLI");

    let result = tokio::time::timeout(
        config.timeout,
        command(system_prompt, user_prompt, config).output(),
    )
    .await
    .map_err(|_| AgentError::Timeout(config.timeout.as_secs()))?
    .map_err(|e| AgentError::Cli(format!("Failed to spawn claude: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(AgentError::Cli(format!(
            "claude exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(AgentError::Cli(
            "Claude returned empty response".to_string(),
        ));
    }

    Ok(stdout)
}

struct CliOutput {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    pending: Vec<u8>,
    timeout: Duration,
}

impl CliOutput {
    /// Next decoded chunk of stdout, `None` once the process exits cleanly.
    async fn next_chunk(&mut self) -> Option<Result<String, AgentError>> {
        let mut buf = [0u8; 1024];
        loop {
            let read = match tokio::time::timeout(self.timeout, self.stdout.read(&mut buf)).await {
                Err(_) => {
                    let _ = self.child.start_kill();
                    return Some(Err(AgentError::Timeout(self.timeout.as_secs())));
                }
                Ok(Err(e)) => {
                    return Some(Err(AgentError::Stream(format!(
                        "Failed to read claude output: {e}"
                    ))))
                }
                Ok(Ok(n)) => n,
            };

            if read == 0 {
                return self.finish().await;
            }

            self.pending.extend_from_slice(&buf[..read]);
            // Hold back a trailing partial UTF-8 sequence until the next read.
            let valid = match std::str::from_utf8(&self.pending) {
                Ok(s) => s.len(),
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                Err(_) => self.pending.len(),
            };
            if valid == 0 {
                continue;
            }
            let chunk: Vec<u8> = self.pending.drain(..valid).collect();
            return Some(Ok(String::from_utf8_lossy(&chunk).into_owned()));
        }
    }

    async fn finish(&mut self) -> Option<Result<String, AgentError>> {
        let leftover = std::mem::take(&mut self.pending);
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(e) => return Some(Err(AgentError::Cli(format!("Failed to wait for claude: {e}")))),
        };

        if !status.success() {
            let stderr = match self.stderr.take() {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };
            warn!(status = %status, stderr = %stderr, "Claude CLI failed");
            return Some(Err(AgentError::Cli(format!(
                "claude exited {status}: {stderr}"
            ))));
        }

        if leftover.is_empty() {
            None
        } else {
            Some(Ok(String::from_utf8_lossy(&leftover).into_owned()))
        }
    }
}

/// Invoke the `claude` CLI and yield stdout as it arrives.
///
/// The child process is killed if the stream is dropped early.
pub fn stream_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<TextStream, AgentError> {
    debug!(model = %config.model, "Streaming claude CLI");

    let mut child = command(system_prompt, user_prompt, config)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AgentError::Cli(format!("Failed to spawn claude: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AgentError::Cli("claude stdout not captured".to_string()))?;

    // stderr is read alongside stdout, never after it.
    let stderr = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    let output = CliOutput {
        child,
        stdout,
        stderr,
        pending: Vec::new(),
        timeout: config.timeout,
    };

    Ok(Box::pin(stream::unfold(Some(output), |state| async move {
        let mut output = state?;
        match output.next_chunk().await {
            Some(Ok(chunk)) => Some((Ok(chunk), Some(output))),
            Some(Err(e)) => Some((Err(e), None)),
            None => None,
        }
    })))
}

/// Flatten a conversation into the single prompt the CLI accepts.
pub fn render_transcript(messages: &[Message]) -> String {
    if let [only] = messages {
        if only.role == Role::User {
            return only.content.clone();
        }
    }

    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// A [`ChatModel`] backed by the `claude` CLI.
pub struct ClaudeCli {
    pub cli_config: ClaudeCliConfig,
}

impl ClaudeCli {
    pub fn new(model: String, timeout: Duration) -> Self {
        Self {
            cli_config: ClaudeCliConfig { model, timeout },
        }
    }
}

#[async_trait]
impl ChatModel for ClaudeCli {
    fn name(&self) -> &str {
        &self.cli_config.model
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, AgentError> {
        let prompt = render_transcript(&request.messages);
        invoke_claude(&request.system_prompt, &prompt, &self.cli_config).await
    }

    async fn stream(&self, request: &ModelRequest) -> Result<TextStream, AgentError> {
        let prompt = render_transcript(&request.messages);
        stream_claude(&request.system_prompt, &prompt, &self.cli_config)
    }
}
