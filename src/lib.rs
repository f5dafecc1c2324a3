//! # CollabLLM
//!
//! CollabLLM is a multi-agent collaboration orchestrator: it runs one user
//! query through two concurrently responding agent backends under a chosen
//! collaboration protocol, merges their streaming output without losing a
//! chunk, scores how much the two agents agree, and produces a single
//! synthesized recommendation.
//!
//! The crate provides carefully layered abstractions for:
//!
//! * **Gateway boundary**: the [`AgentGateway`] trait — one streaming call
//!   per agent per prompt, consumed as a black box. Transport, auth, retry
//!   and timeout policy all live behind it.
//! * **Collaboration protocols**: five strategies ([`CollabStrategy`]) —
//!   quick synthesis, structured debate, red-team, dual-perspective, and
//!   Delphi consensus — built from three reusable phase primitives by the
//!   [`runner`] module.
//! * **Lossless stream interleaving**: [`interleave::StreamInterleaver`]
//!   merges the per-agent chunk streams with a select-and-drain loop that
//!   never drops a chunk, even when both sources finish a step in the same
//!   scheduling tick.
//! * **Convergence scoring**: [`convergence`] — a deterministic textual
//!   heuristic combining agreement-signal counting with lexical position
//!   stability across discussion rounds.
//! * **Session lifecycle**: [`store::SessionStore`] keyed by a caller
//!   supplied session key, with snapshots, cancellation and explicit
//!   clearing through the [`CollabOrchestrator`] facade.
//!
//! ## Core Concepts
//!
//! ### The event stream
//!
//! [`CollabOrchestrator::start_session`] returns a live stream of
//! [`CollabEvent`]s: phase changes, interleaved per-agent text and thinking
//! chunks, discussion-round progress, convergence updates, synthesis text,
//! and a final `Done`. Every path through the protocol — including
//! precondition failures and mid-stream agent errors — ends with exactly
//! one `Done` event.
//!
//! ### Fault tolerance
//!
//! A single agent failing mid-stream marks that agent's response and the
//! protocol adapts: discussion is skipped when an addressed agent did not
//! complete, and synthesis falls back from the designated agent to the
//! other participant to a deterministic concatenation that always
//! succeeds. Nothing is silently retried except that one synthesis-agent
//! fallback.
//!
//! ## Getting Started
//!
//! Implement [`AgentGateway`] for your transport, describe the two
//! participants in a [`CollabConfig`], then:
//!
//! ```rust,ignore
//! use collabllm::{CollabConfig, CollabOrchestrator, CollabStrategy};
//! use collabllm::session::AgentParticipant;
//! use futures_util::StreamExt;
//! use std::sync::Arc;
//!
//! let config = CollabConfig::new(
//!     AgentParticipant::new("claude", "Claude"),
//!     AgentParticipant::new("codex", "Codex"),
//! )
//! .with_strategy(CollabStrategy::Debate);
//!
//! let orchestrator = CollabOrchestrator::new(Arc::new(my_gateway), config);
//! let mut events = orchestrator.start_session(
//!     "Should we use a queue or direct calls?",
//!     Vec::new(),
//!     serde_json::Value::Null,
//!     None,
//! );
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// The helper is intentionally lightweight so that applications embedding
/// CollabLLM can opt-in to simple `RUST_LOG` driven diagnostics without
/// having to choose a specific logging backend upfront.
///
/// ```rust
/// collabllm::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `collabllm` module.
pub mod collabllm;

// Re-exporting key items for easier external access.
pub use crate::collabllm::config;
pub use crate::collabllm::config::CollabConfig;
pub use crate::collabllm::convergence;
pub use crate::collabllm::event;
pub use crate::collabllm::event::{CollabEvent, EventSink};
pub use crate::collabllm::gateway;
pub use crate::collabllm::gateway::{
    AgentGateway, ChunkStream, ContextItem, GatewayChunk, GatewayError, TokenUsage,
};
pub use crate::collabllm::interleave;
pub use crate::collabllm::interleave::StreamInterleaver;
pub use crate::collabllm::orchestrator;
pub use crate::collabllm::orchestrator::{CollabOrchestrator, EventStream};
pub use crate::collabllm::prompts;
pub use crate::collabllm::protocol;
pub use crate::collabllm::protocol::{DiscussionPlan, IndividualPlan, ProtocolDescriptor};
pub use crate::collabllm::runner;
pub use crate::collabllm::runner::{CollabError, ProtocolRunner};
pub use crate::collabllm::session;
pub use crate::collabllm::session::{
    AgentParticipant, AgentResponse, CollabPhase, CollabStrategy, ConvergenceMetrics,
    ConvergenceRecommendation, DiscussionRole, DiscussionRound, ResponseStatus, Session,
    DEFAULT_SESSION_KEY,
};
pub use crate::collabllm::store;
pub use crate::collabllm::store::{SessionStore, SharedSession};
