//! Agent runtime abstraction.
//!
//! The [`AgentRuntime`] trait decouples invocation orchestration from the actual
//! agent backend (currently the `claude` CLI). Tests use scripted runtimes that
//! replay predetermined messages without spawning processes.

use std::future::Future;

use futures::stream::BoxStream;

use crate::core::message::Message;
use crate::core::options::AgentOptions;
use crate::error::Result;

/// Lazy, single-pass sequence of messages produced by one invocation.
pub type MessageStream = BoxStream<'static, Result<Message>>;

/// Parameters for one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Instruction text handed to the agent.
    pub prompt: String,
    /// Fully resolved options; the runtime must not fill in its own defaults.
    pub options: AgentOptions,
}

/// Abstraction over agent backends.
pub trait AgentRuntime {
    /// Start one invocation.
    ///
    /// Resolves once the runtime has accepted the request; failures here are
    /// invocation failures. Errors while producing messages surface as items of
    /// the returned stream.
    fn query(&self, request: QueryRequest) -> impl Future<Output = Result<MessageStream>> + Send;
}
