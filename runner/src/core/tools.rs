//! The fixed capability set granted to the agent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A file-editing capability the agent may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Read,
    Edit,
    Write,
    Glob,
    Grep,
}

/// Every capability the agent is allowed to use, in the order it is advertised.
///
/// This is an allowlist: the runtime is told to expose these tools and nothing else.
pub const FILE_EDITING_TOOLS: &[Tool] = &[
    Tool::Read,
    Tool::Edit,
    Tool::Write,
    Tool::Glob,
    Tool::Grep,
];

impl Tool {
    /// Name understood by the agent runtime.
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Read => "Read",
            Tool::Edit => "Edit",
            Tool::Write => "Write",
            Tool::Glob => "Glob",
            Tool::Grep => "Grep",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FILE_EDITING_TOOLS
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown tool `{s}` (expected one of {})",
                    join_tools(FILE_EDITING_TOOLS)
                )
            })
    }
}

/// Comma-separated tool names, as passed on the runtime command line.
pub fn join_tools(tools: &[Tool]) -> String {
    tools
        .iter()
        .map(|tool| tool.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
