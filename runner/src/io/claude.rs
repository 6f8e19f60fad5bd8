//! Agent runtime backed by the Claude Code CLI in print mode.
//!
//! Each invocation spawns `claude -p --output-format stream-json`, writes the
//! prompt to stdin and turns every stdout line into one [`Message`]. Lines are
//! read only when the consumer asks for the next message.

use std::process::Stdio;

use futures::StreamExt;
use futures::stream::Stream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::core::message::Message;
use crate::core::options::AgentOptions;
use crate::core::tools::join_tools;
use crate::error::{Result, RunnerError};
use crate::io::process::{LimitedOutput, read_stream_limited};
use crate::io::runtime::{AgentRuntime, MessageStream, QueryRequest};

/// Environment variable the CLI reads its credential from.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Settings for spawning the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudeCliConfig {
    /// Executable to run (looked up on `PATH` when not a path).
    pub claude_path: String,
    /// Passed to the child as `ANTHROPIC_API_KEY` when set.
    pub api_key: Option<String>,
    /// Bytes of stderr kept for error reports.
    pub stderr_limit_bytes: usize,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            claude_path: "claude".to_string(),
            api_key: None,
            stderr_limit_bytes: 16 * 1024,
        }
    }
}

/// Runtime that spawns one `claude` process per invocation.
#[derive(Debug, Clone, Default)]
pub struct ClaudeCliRuntime {
    config: ClaudeCliConfig,
}

impl ClaudeCliRuntime {
    pub fn new(config: ClaudeCliConfig) -> Self {
        Self { config }
    }

    /// Build the command for one invocation without spawning it.
    pub fn build_command(&self, options: &AgentOptions) -> Command {
        let tools = join_tools(&options.allowed_tools);

        let mut cmd = Command::new(&self.config.claude_path);
        // Print mode with stream-json output (requires --verbose). The prompt
        // is read from stdin.
        cmd.arg("-p")
            .arg("--verbose")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--permission-mode")
            .arg(options.permission_mode.as_str())
            .arg("--max-turns")
            .arg(options.max_turns.to_string())
            .arg("--tools")
            .arg(&tools)
            .arg("--allowedTools")
            .arg(&tools);

        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(key) = &self.config.api_key {
            cmd.env(API_KEY_ENV, key);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl AgentRuntime for ClaudeCliRuntime {
    #[instrument(skip_all, fields(claude = %self.config.claude_path, max_turns = request.options.max_turns))]
    async fn query(&self, request: QueryRequest) -> Result<MessageStream> {
        let mut cmd = self.build_command(&request.options);

        debug!("spawning claude");
        let mut child = cmd.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                RunnerError::invocation_with(
                    format!("claude binary `{}` not found", self.config.claude_path),
                    err,
                )
            } else {
                RunnerError::invocation_with("spawn claude", err)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::invocation("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::invocation("stderr was not piped"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RunnerError::invocation("stdin was not piped"))?;
        // stderr is drained before the prompt goes out; a child that exits
        // without reading stdin must still have its stderr captured.
        let stderr_task = tokio::spawn(read_stream_limited(stderr, self.config.stderr_limit_bytes));
        let stdin_task = tokio::spawn(write_prompt(stdin, request.prompt));

        info!(pid = ?child.id(), "claude started");
        Ok(message_stream(child, stdout, stdin_task, stderr_task).boxed())
    }
}

async fn write_prompt(mut stdin: ChildStdin, prompt: String) -> std::io::Result<()> {
    stdin.write_all(prompt.as_bytes()).await?;
    stdin.shutdown().await
}

/// Lazily read stream-json lines until stdout closes, then check the exit status.
///
/// A failed exit is reported with the captured stderr; a prompt write error is
/// only reported when the child exited successfully.
fn message_stream(
    mut child: Child,
    stdout: ChildStdout,
    stdin_task: JoinHandle<std::io::Result<()>>,
    stderr_task: JoinHandle<std::io::Result<LimitedOutput>>,
) -> impl Stream<Item = Result<Message>> + Send + 'static {
    async_stream::try_stream! {
        let mut lines = BufReader::new(stdout).lines();
        let mut count = 0usize;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|err| RunnerError::stream_with("read claude output", err))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|err| {
                RunnerError::stream_with(format!("parse claude message {}", count + 1), err)
            })?;
            count += 1;
            yield Message::from(value);
        }

        let status = child
            .wait()
            .await
            .map_err(|err| RunnerError::stream_with("wait for claude", err))?;
        let stderr = match stderr_task.await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(err = %err, "failed to read claude stderr");
                LimitedOutput::default()
            }
            Err(err) => {
                warn!(err = %err, "claude stderr reader panicked");
                LimitedOutput::default()
            }
        };

        let prompt_write = match stdin_task.await {
            Ok(result) => result,
            Err(err) => Err(std::io::Error::other(err)),
        };

        if !status.success() {
            if let Err(err) = &prompt_write {
                debug!(err = %err, "prompt write failed before claude exited");
            }
            warn!(exit_code = ?status.code(), messages = count, "claude failed");
            let stderr_text = stderr.to_text("stderr");
            let message = if stderr_text.is_empty() {
                format!("claude exited with status {:?}", status.code())
            } else {
                format!("claude exited with status {:?}: {stderr_text}", status.code())
            };
            Err::<(), RunnerError>(RunnerError::stream(message))?;
        }
        prompt_write.map_err(|err| RunnerError::stream_with("write prompt to claude", err))?;

        debug!(messages = count, "claude finished");
    }
}
