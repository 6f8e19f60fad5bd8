//! End-to-end tests for the `claude` CLI runtime.
//!
//! A shell script stands in for `claude`: it records what it was given and
//! prints canned stream-json lines, so the whole prompt -> options -> process ->
//! relay path runs without network access.
#![cfg(unix)]

use std::time::{Duration, Instant};

use futures::StreamExt;
use serde_json::json;

use issue_runner::core::message::Message;
use issue_runner::core::options::{AgentOptionsOverride, PermissionMode};
use issue_runner::core::tools::Tool;
use issue_runner::error::RunnerError;
use issue_runner::io::claude::{ClaudeCliConfig, ClaudeCliRuntime};
use issue_runner::prompt::build_prompt;
use issue_runner::run_agent;
use issue_runner::test_support::FakeClaude;

fn runtime_for(fake: &FakeClaude, api_key: Option<&str>) -> ClaudeCliRuntime {
    ClaudeCliRuntime::new(ClaudeCliConfig {
        claude_path: fake.path().display().to_string(),
        api_key: api_key.map(str::to_string),
        stderr_limit_bytes: 1024,
    })
}

async fn collect(relay: issue_runner::relay::MessageRelay) -> Vec<Result<Message, RunnerError>> {
    relay.collect().await
}

#[tokio::test]
async fn relays_every_stdout_line_in_order() {
    let fake = FakeClaude::emitting(&[
        r#"{"type":"system","subtype":"init"}"#,
        "",
        r#"{"type":"assistant","message":{"content":[]}}"#,
        r#"{"type":"result","subtype":"success"}"#,
    ])
    .expect("fake claude");
    let runtime = runtime_for(&fake, None);

    let relay = run_agent(&runtime, "do the thing", None).await.expect("run");
    let messages: Vec<Message> = collect(relay)
        .await
        .into_iter()
        .map(|item| item.expect("message"))
        .collect();

    assert_eq!(
        messages,
        vec![
            Message::from(json!({"type": "system", "subtype": "init"})),
            Message::from(json!({"type": "assistant", "message": {"content": []}})),
            Message::from(json!({"type": "result", "subtype": "success"})),
        ]
    );
}

#[tokio::test]
async fn passes_prompt_options_and_credential_to_cli() {
    let fake = FakeClaude::emitting(&[r#"{"type":"result"}"#]).expect("fake claude");
    let workdir = tempfile::tempdir().expect("workdir");
    let runtime = runtime_for(&fake, Some("sk-test"));
    let prompt = build_prompt("Fix bug", "The login button is broken", Some(workdir.path()))
        .expect("prompt");

    let overrides = AgentOptionsOverride::default()
        .with_max_turns(5)
        .with_working_dir(workdir.path());
    let relay = run_agent(&runtime, prompt.clone(), Some(overrides))
        .await
        .expect("run");
    assert_eq!(collect(relay).await.len(), 1);

    let args = fake.args().expect("args");
    assert_eq!(
        args,
        vec![
            "-p",
            "--verbose",
            "--output-format",
            "stream-json",
            "--permission-mode",
            "bypassPermissions",
            "--max-turns",
            "5",
            "--tools",
            "Read,Edit,Write,Glob,Grep",
            "--allowedTools",
            "Read,Edit,Write,Glob,Grep",
        ]
    );
    assert_eq!(fake.stdin().expect("stdin"), prompt.as_str());
    assert_eq!(fake.api_key().expect("api key"), "sk-test");
    assert_eq!(
        fake.cwd().expect("cwd").canonicalize().expect("canonical cwd"),
        workdir.path().canonicalize().expect("canonical workdir")
    );
}

#[tokio::test]
async fn restricted_tool_list_reaches_cli() {
    let fake = FakeClaude::emitting(&[r#"{"type":"result"}"#]).expect("fake claude");
    let runtime = runtime_for(&fake, None);

    let overrides = AgentOptionsOverride::default()
        .with_permission_mode(PermissionMode::Plan)
        .with_allowed_tools([Tool::Read, Tool::Glob]);
    let relay = run_agent(&runtime, "look around", Some(overrides))
        .await
        .expect("run");
    collect(relay).await;

    let args = fake.args().expect("args");
    assert!(args.windows(2).any(|w| w == ["--permission-mode", "plan"]));
    assert!(args.windows(2).any(|w| w == ["--tools", "Read,Glob"]));
}

#[tokio::test]
async fn non_zero_exit_fails_the_stream_after_messages() {
    let fake = FakeClaude::new(
        "echo '{\"type\":\"system\"}'\necho 'rate limited' >&2\nexit 7",
    )
    .expect("fake claude");
    let runtime = runtime_for(&fake, None);

    let mut items = collect(run_agent(&runtime, "prompt", None).await.expect("run")).await;

    assert_eq!(items.len(), 2);
    let err = items.pop().expect("error item").unwrap_err();
    assert!(matches!(err, RunnerError::Stream { .. }));
    let text = err.to_string();
    assert!(text.contains("Some(7)"), "{text}");
    assert!(text.contains("rate limited"), "{text}");
    assert!(items.pop().expect("first item").is_ok());
}

#[tokio::test]
async fn malformed_line_is_a_stream_failure() {
    let fake = FakeClaude::emitting(&["not json"]).expect("fake claude");
    let runtime = runtime_for(&fake, None);

    let mut relay = run_agent(&runtime, "prompt", None).await.expect("run");
    let err = relay.next().await.expect("item").unwrap_err();

    assert!(matches!(err, RunnerError::Stream { .. }));
    assert!(err.to_string().contains("parse claude message 1"));
    assert!(relay.next().await.is_none());
}

#[tokio::test]
async fn early_exit_without_reading_prompt_reports_stderr() {
    let fake = FakeClaude::ignoring_stdin("echo 'error: unknown option --tools' >&2\nexit 2")
        .expect("fake claude");
    let runtime = runtime_for(&fake, None);
    let prompt = "x".repeat(1 << 20);

    let relay = run_agent(&runtime, prompt, None).await.expect("run");
    let mut items = collect(relay).await;

    assert_eq!(items.len(), 1);
    let err = items.pop().expect("error item").unwrap_err();
    assert!(matches!(err, RunnerError::Stream { .. }));
    let text = err.to_string();
    assert!(text.contains("Some(2)"), "{text}");
    assert!(text.contains("unknown option --tools"), "{text}");
}

/// True once `pid` has exited (a zombie awaiting reaping counts as exited).
#[cfg(target_os = "linux")]
fn process_exited(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state == "Z" || state == "X"),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropping_the_relay_kills_the_agent() {
    let fake = FakeClaude::new("echo '{\"type\":\"system\"}'\nexec sleep 30")
        .expect("fake claude");
    let runtime = runtime_for(&fake, None);

    let mut relay = run_agent(&runtime, "prompt", None).await.expect("run");
    let first = tokio::time::timeout(Duration::from_secs(10), relay.next())
        .await
        .expect("first message in time")
        .expect("item")
        .expect("ok");
    assert_eq!(first.message_type(), Some("system"));
    let pid = fake.pid().expect("pid");
    assert!(!process_exited(pid), "agent should still be running");

    drop(relay);

    let deadline = Instant::now() + Duration::from_secs(5);
    while !process_exited(pid) {
        assert!(Instant::now() < deadline, "agent {pid} still running after drop");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
