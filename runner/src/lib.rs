//! Turn an issue into a single, tool-constrained code-editing agent run.
//!
//! The crate is split the same way the work is:
//!
//! - **[`core`]**: Pure types (capability set, invocation options, messages).
//! - **[`prompt`]**: Renders the instructions handed to the agent.
//! - **[`agent`]**: Merges options, starts the runtime once, returns a
//!   [`relay::MessageRelay`] over its messages.
//! - **[`io`]**: Side effects. The [`io::runtime::AgentRuntime`] trait and its
//!   `claude` CLI implementation, configuration, and the GitHub client.
//!
//! Nothing here prints or exits; the `issue-runner` binary owns reporting.

pub mod agent;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod prompt;
pub mod relay;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::agent::run_agent;
pub use crate::core::tools::{FILE_EDITING_TOOLS, Tool};
pub use crate::error::RunnerError;
pub use crate::prompt::build_prompt;
