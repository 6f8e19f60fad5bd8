//! Side-effecting collaborators: agent processes, configuration, GitHub.

pub mod claude;
pub mod config;
pub mod github;
pub mod process;
pub mod runtime;
