//! Error types for the invocation core.
//!
//! The core never recovers locally: every variant is handed back to the
//! caller, which decides how to report it. The binary maps them onto
//! [`crate::exit_codes`].

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by prompt building, option negotiation and agent runs.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Caller passed an unusable value (empty title or body, zero turns, ...).
    #[error("{0}")]
    InvalidArgument(String),

    /// The agent runtime refused or failed to start the invocation.
    #[error("agent invocation failed: {message}")]
    Invocation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The runtime failed while producing messages.
    #[error("agent stream failed: {message}")]
    Stream {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The process current directory could not be resolved.
    #[error("resolve working directory")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("render prompt template")]
    Template(#[from] minijinja::Error),
}

impl RunnerError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation {
            message: message.into(),
            source: None,
        }
    }

    pub fn invocation_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Invocation {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
            source: None,
        }
    }

    pub fn stream_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Stream {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// True for errors caused by the caller rather than the agent runtime.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
