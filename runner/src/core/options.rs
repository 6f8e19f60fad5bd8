//! Invocation options and the flat override merge.
//!
//! [`AgentOptions`] is always fully resolved. Callers describe only what they want
//! to change with an [`AgentOptionsOverride`]; every field left as `None` keeps
//! its documented default. Lists are replaced wholesale, never appended to.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::tools::{FILE_EDITING_TOOLS, Tool};
use crate::error::{Result, RunnerError};

/// Turn budget used when the caller does not supply one.
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// How the runtime treats tool calls that would normally need human approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Ask before every sensitive tool call.
    Default,
    /// Auto-approve file edits, ask for everything else.
    AcceptEdits,
    /// Execute every tool call without confirmation.
    #[default]
    BypassPermissions,
    /// Read-only planning; no edits are applied.
    Plan,
}

impl PermissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            PermissionMode::Default,
            PermissionMode::AcceptEdits,
            PermissionMode::BypassPermissions,
            PermissionMode::Plan,
        ]
        .into_iter()
        .find(|mode| mode.as_str() == s)
        .ok_or_else(|| format!("unknown permission mode `{s}`"))
    }
}

/// Fully resolved options for one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub permission_mode: PermissionMode,
    pub max_turns: u32,
    /// Ordered, duplicate-free allowlist of tools.
    pub allowed_tools: Vec<Tool>,
    /// Directory the runtime runs the agent in. `None` inherits the caller's.
    pub working_dir: Option<PathBuf>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            permission_mode: PermissionMode::BypassPermissions,
            max_turns: DEFAULT_MAX_TURNS,
            allowed_tools: FILE_EDITING_TOOLS.to_vec(),
            working_dir: None,
        }
    }
}

impl AgentOptions {
    /// Defaults with the caller's overrides applied on top.
    pub fn resolve(overrides: Option<AgentOptionsOverride>) -> Self {
        overrides.unwrap_or_default().apply_to(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(RunnerError::invalid_argument("max_turns must be > 0"));
        }
        if self.allowed_tools.is_empty() {
            return Err(RunnerError::invalid_argument(
                "allowed_tools must list at least one tool",
            ));
        }
        Ok(())
    }
}

/// Sparse set of option changes. `None` means "keep the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentOptionsOverride {
    pub permission_mode: Option<PermissionMode>,
    pub max_turns: Option<u32>,
    pub allowed_tools: Option<Vec<Tool>>,
    pub working_dir: Option<PathBuf>,
}

impl AgentOptionsOverride {
    pub fn with_permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_allowed_tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.allowed_tools = Some(tools.into_iter().collect());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Layer `self` over `fallback`: fields set here win, the rest come from `fallback`.
    pub fn or(self, fallback: AgentOptionsOverride) -> Self {
        Self {
            permission_mode: self.permission_mode.or(fallback.permission_mode),
            max_turns: self.max_turns.or(fallback.max_turns),
            allowed_tools: self.allowed_tools.or(fallback.allowed_tools),
            working_dir: self.working_dir.or(fallback.working_dir),
        }
    }

    /// Shallow merge onto `base`.
    pub fn apply_to(self, base: AgentOptions) -> AgentOptions {
        AgentOptions {
            permission_mode: self.permission_mode.unwrap_or(base.permission_mode),
            max_turns: self.max_turns.unwrap_or(base.max_turns),
            allowed_tools: self
                .allowed_tools
                .map(dedup_preserving_order)
                .unwrap_or(base.allowed_tools),
            working_dir: self.working_dir.or(base.working_dir),
        }
    }
}

fn dedup_preserving_order(tools: Vec<Tool>) -> Vec<Tool> {
    let mut out: Vec<Tool> = Vec::with_capacity(tools.len());
    for tool in tools {
        if !out.contains(&tool) {
            out.push(tool);
        }
    }
    out
}
