//! Invocation orchestration: merge options, start the agent, hand back its stream.

use tracing::{info, instrument};

use crate::core::options::{AgentOptions, AgentOptionsOverride};
use crate::core::tools::join_tools;
use crate::error::Result;
use crate::io::runtime::{AgentRuntime, QueryRequest};
use crate::relay::MessageRelay;

/// Run the agent once with `prompt`.
///
/// `overrides` is merged flatly over the defaults (bypass permissions, 10 turns,
/// the full file-editing tool set). Exactly one request reaches `runtime`; any
/// error it returns is passed back untouched. The prompt is not re-validated.
#[instrument(skip_all)]
pub async fn run_agent<R: AgentRuntime>(
    runtime: &R,
    prompt: impl Into<String>,
    overrides: Option<AgentOptionsOverride>,
) -> Result<MessageRelay> {
    let options = AgentOptions::resolve(overrides);
    options.validate()?;

    info!(
        permission_mode = %options.permission_mode,
        max_turns = options.max_turns,
        tools = %join_tools(&options.allowed_tools),
        "starting agent"
    );

    let request = QueryRequest {
        prompt: prompt.into(),
        options,
    };
    let stream = runtime.query(request).await?;
    Ok(MessageRelay::new(stream))
}
