//! `issue-runner`: run a file-editing agent against an issue from CI.
//!
//! Reads the issue from the environment (or GitHub), runs the agent once and
//! prints each agent message as one JSON line on stdout. Errors go to stderr
//! and map onto [`exit_codes`].

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tracing::{info, warn};

use issue_runner::agent::run_agent;
use issue_runner::core::options::{AgentOptionsOverride, PermissionMode};
use issue_runner::error::RunnerError;
use issue_runner::exit_codes;
use issue_runner::io::claude::ClaudeCliRuntime;
use issue_runner::io::config::{DEFAULT_CONFIG_PATH, RunnerConfig, load_config};
use issue_runner::io::github::{GitHubClient, Repository};
use issue_runner::logging;
use issue_runner::prompt::{
    Prompt, TaskDescription, build_pr_description_prompt, build_task_prompt,
};
use issue_runner::relay::MessageRelay;

/// Turns the PR description into a short follow-up task.
const PR_DESCRIPTION_MAX_TURNS: u32 = 3;

#[derive(Parser)]
#[command(
    name = "issue-runner",
    version,
    about = "Run a file-editing agent against an issue"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the task prompt from the issue and let the agent edit files.
    Run {
        #[command(flatten)]
        issue: IssueArgs,
        #[command(flatten)]
        agent: AgentArgs,
    },
    /// Ask the agent to write `.pr-description.md` for the changes made.
    PrDescription {
        #[command(flatten)]
        issue: IssueArgs,
        #[command(flatten)]
        agent: AgentArgs,
        /// Diff of the changes made by the agent.
        #[arg(long, env = "GIT_DIFF", default_value = "")]
        diff: String,
    },
    /// Post a comment on an issue.
    Comment {
        /// Issue number to comment on.
        #[arg(long)]
        issue: u64,
        /// Comment text (markdown).
        #[arg(long, conflicts_with = "body_file", required_unless_present = "body_file")]
        body: Option<String>,
        /// Read the comment text from a file, `-` for stdin.
        #[arg(long)]
        body_file: Option<PathBuf>,
        #[command(flatten)]
        github: GitHubArgs,
    },
}

#[derive(Args)]
struct IssueArgs {
    /// Issue title.
    #[arg(long, env = "ISSUE_TITLE")]
    title: Option<String>,
    /// Issue body.
    #[arg(long, env = "ISSUE_BODY")]
    body: Option<String>,
    /// Fetch title and body of this issue from GitHub instead.
    #[arg(long)]
    issue: Option<u64>,
    #[command(flatten)]
    github: GitHubArgs,
}

#[derive(Args)]
struct GitHubArgs {
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,
    /// Repository as `owner/name`.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: Option<Repository>,
}

#[derive(Args)]
struct AgentArgs {
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Directory the agent works in; defaults to `agent.working_dir` from the
    /// config, then the current directory.
    #[arg(long)]
    working_dir: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    max_turns: Option<u32>,
    #[arg(long)]
    permission_mode: Option<PermissionMode>,
    /// Abandon the agent if it has not finished after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl AgentArgs {
    fn overrides(&self) -> AgentOptionsOverride {
        AgentOptionsOverride {
            permission_mode: self.permission_mode,
            max_turns: self.max_turns,
            ..AgentOptionsOverride::default()
        }
    }
}

/// Operator-facing configuration problem; exits with [`exit_codes::INVALID`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code(&err)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { issue, agent } => cmd_run(issue, agent).await,
        Command::PrDescription { issue, agent, diff } => {
            cmd_pr_description(issue, agent, diff).await
        }
        Command::Comment {
            issue,
            body,
            body_file,
            github,
        } => cmd_comment(issue, body, body_file, github).await,
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        return exit_codes::INVALID;
    }
    if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return exit_codes::TIMED_OUT;
    }
    match err.downcast_ref::<RunnerError>() {
        Some(runner_err) if runner_err.is_invalid_argument() => exit_codes::INVALID,
        _ => exit_codes::FAILED,
    }
}

async fn cmd_run(issue: IssueArgs, agent: AgentArgs) -> Result<()> {
    let session = AgentSession::prepare(&agent)?;
    let task = load_task(issue).await?;
    let prompt = build_task_prompt(&task, Some(&session.working_dir))?;
    session.run(prompt, agent.overrides()).await
}

async fn cmd_pr_description(issue: IssueArgs, agent: AgentArgs, diff: String) -> Result<()> {
    let session = AgentSession::prepare(&agent)?;
    let task = load_task(issue).await?;
    let prompt = build_pr_description_prompt(&task, &diff, Some(&session.working_dir))?;
    let overrides = agent
        .overrides()
        .or(AgentOptionsOverride::default().with_max_turns(PR_DESCRIPTION_MAX_TURNS));
    session.run(prompt, overrides).await
}

async fn cmd_comment(
    issue: u64,
    body: Option<String>,
    body_file: Option<PathBuf>,
    github: GitHubArgs,
) -> Result<()> {
    let (client, repo) = github.connect()?;
    let body = match (body, body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => read_body_file(&path)?,
        (None, None) => return Err(UsageError("--body or --body-file is required".into()).into()),
    };
    client.post_issue_comment(&repo, issue, &body).await?;
    info!(repo = %repo, issue, "comment posted");
    Ok(())
}

/// Everything an agent run needs besides the prompt.
struct AgentSession {
    config: RunnerConfig,
    api_key: String,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl AgentSession {
    fn prepare(args: &AgentArgs) -> Result<Self> {
        let config = load_config(&args.config)
            .context(UsageError(format!("invalid config {}", args.config.display())))?;
        let api_key = args.api_key.clone().filter(|key| !key.is_empty()).ok_or_else(|| {
            UsageError("ANTHROPIC_API_KEY environment variable is required".into())
        })?;
        // The same directory goes into the prompt and becomes the agent's cwd.
        let working_dir = match args.working_dir.as_ref().or(config.agent.working_dir.as_ref()) {
            Some(dir) => std::path::absolute(dir)
                .with_context(|| format!("resolve working directory {}", dir.display()))?,
            None => std::env::current_dir().context("read current directory")?,
        };
        Ok(Self {
            config,
            api_key,
            working_dir,
            timeout: args.timeout_secs.map(Duration::from_secs),
        })
    }

    async fn run(self, prompt: Prompt, cli_overrides: AgentOptionsOverride) -> Result<()> {
        let overrides = cli_overrides
            .or(self.config.agent.clone())
            .with_working_dir(&self.working_dir);
        let runtime = ClaudeCliRuntime::new(self.config.claude_config(Some(self.api_key)));

        let relay = run_agent(&runtime, prompt, Some(overrides)).await?;
        let relayed = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, print_messages(relay))
                .await
                .with_context(|| format!("agent did not finish within {}s", limit.as_secs()))??,
            None => print_messages(relay).await?,
        };
        info!(messages = relayed, "agent finished");
        Ok(())
    }
}

/// Print every relayed message as a JSON line until the stream ends.
async fn print_messages(mut relay: MessageRelay) -> Result<usize> {
    while let Some(message) = relay.next().await {
        let message = message?;
        if message.message_type() == Some("result") {
            info!(subtype = ?message.value().get("subtype"), "agent reported result");
        }
        let line = serde_json::to_string(&message).context("serialize agent message")?;
        println!("{line}");
    }
    Ok(relay.relayed())
}

async fn load_task(issue: IssueArgs) -> Result<TaskDescription> {
    if let Some(number) = issue.issue {
        let (client, repo) = issue.github.connect()?;
        let fetched = client.get_issue(&repo, number).await?;
        return TaskDescription::from_parts(Some(fetched.title), fetched.body).map_err(|err| {
            warn!(repo = %repo, number, "issue has no usable title or body");
            err.into()
        });
    }
    TaskDescription::from_parts(issue.title, issue.body).map_err(|_| {
        UsageError("ISSUE_TITLE and ISSUE_BODY environment variables are required".into()).into()
    })
}

impl GitHubArgs {
    fn connect(self) -> Result<(GitHubClient, Repository)> {
        let token = self
            .github_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| UsageError("GITHUB_TOKEN environment variable is required".into()))?;
        let repo = self
            .repo
            .ok_or_else(|| UsageError("GITHUB_REPOSITORY environment variable is required".into()))?;
        Ok((GitHubClient::new(token)?, repo))
    }
}

fn read_body_file(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read comment body from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}
