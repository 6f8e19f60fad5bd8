//! Runner configuration, optionally stored in `.github/issue-runner.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::options::AgentOptionsOverride;
use crate::io::claude::ClaudeCliConfig;

/// Where the binary looks for configuration unless told otherwise.
pub const DEFAULT_CONFIG_PATH: &str = ".github/issue-runner.toml";

/// Runner configuration (TOML).
///
/// Every field is optional in the file. `[agent]` holds option overrides that
/// sit between the built-in defaults and command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Claude Code executable.
    pub claude_path: String,

    /// Bytes of agent stderr kept for error reports.
    pub stderr_limit_bytes: usize,

    /// `working_dir` here is used when `--working-dir` is absent; a relative
    /// path resolves against the directory the runner was started in.
    pub agent: AgentOptionsOverride,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let cli = ClaudeCliConfig::default();
        Self {
            claude_path: cli.claude_path,
            stderr_limit_bytes: cli.stderr_limit_bytes,
            agent: AgentOptionsOverride::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.claude_path.trim().is_empty() {
            return Err(anyhow!("claude_path must be non-empty"));
        }
        if self.stderr_limit_bytes == 0 {
            return Err(anyhow!("stderr_limit_bytes must be > 0"));
        }
        if self.agent.max_turns == Some(0) {
            return Err(anyhow!("agent.max_turns must be > 0"));
        }
        if self.agent.allowed_tools.as_ref().is_some_and(Vec::is_empty) {
            return Err(anyhow!("agent.allowed_tools must list at least one tool"));
        }
        Ok(())
    }

    /// CLI runtime settings for this config and credential.
    pub fn claude_config(&self, api_key: Option<String>) -> ClaudeCliConfig {
        ClaudeCliConfig {
            claude_path: self.claude_path.clone(),
            api_key,
            stderr_limit_bytes: self.stderr_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        return Ok(RunnerConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::PermissionMode;
    use crate::core::tools::Tool;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RunnerConfig::default());
        assert_eq!(cfg.claude_path, "claude");
        assert_eq!(cfg.agent, AgentOptionsOverride::default());
    }

    #[test]
    fn load_reads_agent_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("issue-runner.toml");
        fs::write(
            &path,
            r#"
claude_path = "/usr/local/bin/claude"

[agent]
max_turns = 15
permission_mode = "acceptEdits"
allowed_tools = ["Read", "Grep"]
working_dir = "checkout"
"#,
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.claude_path, "/usr/local/bin/claude");
        assert_eq!(cfg.stderr_limit_bytes, RunnerConfig::default().stderr_limit_bytes);
        assert_eq!(cfg.agent.max_turns, Some(15));
        assert_eq!(cfg.agent.permission_mode, Some(PermissionMode::AcceptEdits));
        assert_eq!(cfg.agent.allowed_tools, Some(vec![Tool::Read, Tool::Grep]));
        assert_eq!(cfg.agent.working_dir, Some(std::path::PathBuf::from("checkout")));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("issue-runner.toml");

        fs::write(&path, "[agent]\nmax_turns = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_turns"));

        fs::write(&path, "stderr_limit_bytes = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("stderr_limit_bytes"));

        fs::write(&path, "unknown_key = true\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unknown_key"));
    }

    #[test]
    fn claude_config_carries_credential() {
        let cfg = RunnerConfig::default();
        let cli = cfg.claude_config(Some("sk-test".to_string()));
        assert_eq!(cli.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cli.claude_path, cfg.claude_path);
    }
}
