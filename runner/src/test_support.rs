//! Test-only runtimes and fixtures.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::StreamExt;
use futures::stream;

use crate::core::message::Message;
use crate::error::{Result, RunnerError};
use crate::io::runtime::{AgentRuntime, MessageStream, QueryRequest};

/// What a [`ScriptedRuntime`] does for one `query` call.
pub enum ScriptedReply {
    /// Accept the request and yield these items in order.
    Messages(Vec<Result<Message>>),
    /// Reject the request before any stream exists.
    Reject(RunnerError),
}

/// Runtime that records requests and replays queued replies.
///
/// Each `query` consumes the next reply; once the queue is empty further calls
/// are rejected.
pub struct ScriptedRuntime {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl ScriptedRuntime {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A runtime whose single invocation yields `messages`.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self::new(vec![ScriptedReply::Messages(
            messages.into_iter().map(Ok).collect(),
        )])
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl AgentRuntime for ScriptedRuntime {
    async fn query(&self, request: QueryRequest) -> Result<MessageStream> {
        self.requests.lock().expect("requests lock").push(request);
        let reply = self.replies.lock().expect("replies lock").pop_front();
        match reply {
            Some(ScriptedReply::Messages(items)) => Ok(stream::iter(items).boxed()),
            Some(ScriptedReply::Reject(err)) => Err(err),
            None => Err(RunnerError::invocation("no scripted reply left")),
        }
    }
}

#[cfg(unix)]
pub use fake_claude::FakeClaude;

#[cfg(unix)]
mod fake_claude {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use tempfile::TempDir;

    /// A stand-in `claude` executable in a temp directory.
    ///
    /// The script records its pid, arguments, stdin, working directory and
    /// `ANTHROPIC_API_KEY` next to itself, then runs the caller's script body.
    pub struct FakeClaude {
        dir: TempDir,
        path: PathBuf,
    }

    impl FakeClaude {
        /// `body` is shell code run after the inputs have been recorded.
        pub fn new(body: &str) -> Result<Self> {
            Self::with_script(body, true)
        }

        /// Like [`FakeClaude::new`] but stdin is never read, so the prompt
        /// is not recorded.
        pub fn ignoring_stdin(body: &str) -> Result<Self> {
            Self::with_script(body, false)
        }

        fn with_script(body: &str, read_stdin: bool) -> Result<Self> {
            let dir = tempfile::tempdir().context("create fake claude dir")?;
            let path = dir.path().join("claude");
            let log_dir = dir.path().display().to_string();
            let read_stdin = if read_stdin {
                format!("cat > '{log_dir}/stdin.log'\n")
            } else {
                String::new()
            };
            let script = format!(
                "#!/bin/sh\n\
                 echo $$ > '{log_dir}/pid.log'\n\
                 printf '%s\\n' \"$@\" > '{log_dir}/args.log'\n\
                 pwd > '{log_dir}/cwd.log'\n\
                 printf '%s' \"${{ANTHROPIC_API_KEY:-}}\" > '{log_dir}/api_key.log'\n\
                 {read_stdin}\
                 {body}\n"
            );
            fs::write(&path, script).with_context(|| format!("write {}", path.display()))?;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("chmod {}", path.display()))?;
            Ok(Self { dir, path })
        }

        /// Script that prints each JSON line on stdout and exits 0.
        pub fn emitting(lines: &[&str]) -> Result<Self> {
            let body = lines
                .iter()
                .map(|line| format!("echo '{line}'"))
                .collect::<Vec<_>>()
                .join("\n");
            Self::new(&body)
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Arguments of the last invocation, one per entry.
        pub fn args(&self) -> Result<Vec<String>> {
            Ok(self.read_log("args.log")?.lines().map(str::to_string).collect())
        }

        /// Everything written to the script's stdin.
        pub fn stdin(&self) -> Result<String> {
            self.read_log("stdin.log")
        }

        pub fn cwd(&self) -> Result<PathBuf> {
            Ok(PathBuf::from(self.read_log("cwd.log")?.trim_end()))
        }

        /// Process id of the last invocation.
        pub fn pid(&self) -> Result<u32> {
            let pid = self.read_log("pid.log")?;
            pid.trim()
                .parse()
                .with_context(|| format!("parse pid `{}`", pid.trim()))
        }

        pub fn api_key(&self) -> Result<String> {
            self.read_log("api_key.log")
        }

        fn read_log(&self, name: &str) -> Result<String> {
            let path = self.dir.path().join(name);
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
        }
    }
}
