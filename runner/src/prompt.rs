//! Prompt construction for agent invocations.
//!
//! Prompts are rendered from Markdown templates compiled into the binary. The
//! working directory is written into the instructions themselves: it is the only
//! thing steering the agent toward absolute, directory-scoped paths.

use std::fmt;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior, context};
use tracing::debug;

use crate::core::tools::FILE_EDITING_TOOLS;
use crate::error::{Result, RunnerError};

const TASK_TEMPLATE: &str = include_str!("prompts/task.md");
const PR_DESCRIPTION_TEMPLATE: &str = include_str!("prompts/pr_description.md");

const MISSING_TASK_FIELDS: &str = "title and body are required";

/// Issue title and body, both guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescription {
    title: String,
    body: String,
}

impl TaskDescription {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Result<Self> {
        Self::from_parts(Some(title.into()), Some(body.into()))
    }

    /// Build from possibly-absent values (environment variables, API fields).
    pub fn from_parts(title: Option<String>, body: Option<String>) -> Result<Self> {
        match (title, body) {
            (Some(title), Some(body)) if !title.is_empty() && !body.is_empty() => {
                Ok(Self { title, body })
            }
            _ => Err(RunnerError::invalid_argument(MISSING_TASK_FIELDS)),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// A rendered instruction string, consumed once by an agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Prompt> for String {
    fn from(prompt: Prompt) -> Self {
        prompt.0
    }
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template("task", TASK_TEMPLATE)
            .expect("task template should be valid");
        env.add_template("pr_description", PR_DESCRIPTION_TEMPLATE)
            .expect("pr_description template should be valid");
        Self { env }
    }

    fn render_task(&self, task: &TaskDescription, working_dir: &Path) -> Result<String> {
        let tools: Vec<&str> = FILE_EDITING_TOOLS.iter().map(|tool| tool.as_str()).collect();
        let template = self.env.get_template("task")?;
        let rendered = template.render(context! {
            working_dir => working_dir.display().to_string(),
            path_root => path_root(working_dir),
            tools => tools,
            title => task.title(),
            body => task.body(),
        })?;
        Ok(rendered)
    }

    fn render_pr_description(
        &self,
        task: &TaskDescription,
        diff: &str,
        working_dir: &Path,
    ) -> Result<String> {
        let template = self.env.get_template("pr_description")?;
        let rendered = template.render(context! {
            working_dir => working_dir.display().to_string(),
            path_root => path_root(working_dir),
            title => task.title(),
            body => task.body(),
            diff => diff,
        })?;
        Ok(rendered)
    }
}

/// Build the code-editing prompt for `title` and `body`.
///
/// `working_dir` defaults to the current directory of this process, read at call
/// time. Fails with [`RunnerError::InvalidArgument`] before rendering anything if
/// either field is empty.
pub fn build_prompt(title: &str, body: &str, working_dir: Option<&Path>) -> Result<Prompt> {
    let task = TaskDescription::new(title, body)?;
    build_task_prompt(&task, working_dir)
}

/// [`build_prompt`] for an already validated task.
pub fn build_task_prompt(task: &TaskDescription, working_dir: Option<&Path>) -> Result<Prompt> {
    let working_dir = resolve_working_dir(working_dir)?;
    let content = PromptEngine::new().render_task(task, &working_dir)?;
    debug!(bytes = content.len(), working_dir = %working_dir.display(), "built task prompt");
    Ok(Prompt(content))
}

/// Build the follow-up prompt asking the agent to describe its changes as a PR.
///
/// `diff` may be empty (no changes were detected).
pub fn build_pr_description_prompt(
    task: &TaskDescription,
    diff: &str,
    working_dir: Option<&Path>,
) -> Result<Prompt> {
    let working_dir = resolve_working_dir(working_dir)?;
    let content = PromptEngine::new().render_pr_description(task, diff, &working_dir)?;
    debug!(
        bytes = content.len(),
        diff_bytes = diff.len(),
        "built pr description prompt"
    );
    Ok(Prompt(content))
}

fn resolve_working_dir(working_dir: Option<&Path>) -> Result<PathBuf> {
    match working_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().map_err(RunnerError::WorkingDirectory),
    }
}

/// Directory prefix for example paths, without a trailing separator.
fn path_root(working_dir: &Path) -> String {
    let shown = working_dir.display().to_string();
    shown.trim_end_matches('/').to_string()
}
