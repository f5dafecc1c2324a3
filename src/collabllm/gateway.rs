use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::pin::Pin;

/// An AgentGateway is the boundary to a single provider backend (an external
/// AI coding agent). It provides a common interface to start one streaming
/// exchange per agent per prompt. It does not keep track of collaboration
/// state, for that we use a `Session` which is owned by the protocol run
/// driving it and uses an AgentGateway to talk to the backends.

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// A contextual item attached to a request (an open file, a selection, a
/// snippet). Rendered into prompts and passed to the gateway verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextItem {
    /// Short label shown to the agent (e.g. a file path).
    pub label: String,
    /// The item's content.
    pub content: String,
}

impl ContextItem {
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
        }
    }
}

/// One chunk of a streaming agent response.
///
/// A well-behaved gateway stream yields any number of `Text`/`Thinking`
/// chunks and then terminates with exactly one `Done` (success, optionally
/// carrying usage stats) or one `Error` (failure). The orchestrator treats
/// `Done` as stream end-of-success and `Error` as stream end-of-failure.
#[derive(Clone, Debug)]
pub enum GatewayChunk {
    /// Incremental answer text.
    Text { content: String },
    /// Incremental reasoning text, when the backend exposes it.
    Thinking { content: String },
    /// End of a successful stream.
    Done { usage: Option<TokenUsage> },
    /// End of a failed stream.
    Error { message: String },
}

/// A stream of chunks from one gateway call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = GatewayChunk> + Send>>;

/// Type alias for a Send-able error box.
pub type GatewayError = Box<dyn Error + Send + Sync>;

/// Trait defining the interface to the per-agent transport.
///
/// Exactly one gateway call is active per agent per orchestrator-issued
/// prompt. Timeout and retry policy live behind this trait; the orchestrator
/// imposes no deadline of its own and reacts only to how the stream ends.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Start a streaming exchange with one agent backend.
    ///
    /// - `agent_id`: which backend to address.
    /// - `prompt`: the fully assembled prompt for this phase.
    /// - `context_items`: contextual items, passed through verbatim.
    /// - `settings`: provider settings, opaque to the orchestrator.
    /// - `session_key`: tag for cancellation bookkeeping.
    async fn send_message(
        &self,
        agent_id: &str,
        prompt: &str,
        context_items: &[ContextItem],
        settings: &serde_json::Value,
        session_key: &str,
    ) -> Result<ChunkStream, GatewayError>;

    /// Whether the backend is currently reachable. Checked once per
    /// participant before a session is created.
    async fn is_reachable(&self, agent_id: &str) -> bool;

    /// Cancel every in-flight request tagged with `session_key`.
    ///
    /// Default is a no-op so gateways without cancellation support still
    /// satisfy the trait. Implementations should return promptly; callers do
    /// not await request teardown.
    async fn cancel_requests(&self, _session_key: &str) {}
}
