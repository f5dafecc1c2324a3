//! Collaboration event stream.
//!
//! A [`start_session`](crate::orchestrator::CollabOrchestrator::start_session)
//! call yields one live sequence of [`CollabEvent`]s. Events arrive in real
//! time as the protocol progresses and the sequence always ends with exactly
//! one [`Done`](CollabEvent::Done).
//!
//! # Event Flow (quick protocol, both agents succeed)
//!
//! ```text
//! PhaseChange { phase: Individual }
//!   ├─ AgentText { agent_id: "a", .. }      ┐ interleaved, per-agent order
//!   ├─ AgentText { agent_id: "b", .. }      │ preserved, no cross-agent
//!   ├─ AgentComplete { agent_id: "a", .. }  │ ordering promised
//!   └─ AgentComplete { agent_id: "b", .. }  ┘
//! PhaseChange { phase: Synthesis }
//!   └─ SynthesisText { .. }  (one or more)
//! PhaseChange { phase: Complete }
//! Done { total_tokens }
//! ```
//!
//! # Event Flow (debate, early convergence)
//!
//! ```text
//! PhaseChange { phase: Individual }
//!   └─ ... individual streaming ...
//! PhaseChange { phase: Discussion }
//!   └─ DiscussionRoundStart { round: 1 }
//!       ├─ DiscussionText { agent_id: "a", round: 1, .. }
//!       ├─ DiscussionText { agent_id: "b", round: 1, .. }
//!       └─ ConvergenceUpdate { metrics }        // converged → no round 2
//! PhaseChange { phase: Synthesis }
//! ...
//! Done { total_tokens }
//! ```

use crate::collabllm::gateway::TokenUsage;
use crate::collabllm::session::{CollabPhase, ConvergenceMetrics};
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted to the caller during one collaboration session.
///
/// Every variant that originates from a specific agent carries that agent's
/// id. Session-level failures (precondition shortfalls, unexpected protocol
/// errors) surface as [`Error`](CollabEvent::Error).
#[derive(Clone, Debug)]
pub enum CollabEvent {
    /// The protocol entered a new phase.
    PhaseChange { phase: CollabPhase },

    /// Incremental answer text from an agent's individual analysis.
    AgentText { agent_id: String, content: String },

    /// Incremental reasoning text from an agent, in any phase that streams
    /// one agent's thinking.
    AgentThinking { agent_id: String, content: String },

    /// An agent's individual stream ended successfully.
    AgentComplete {
        agent_id: String,
        usage: Option<TokenUsage>,
    },

    /// An agent's individual stream ended in error. The protocol continues
    /// with the surviving agent.
    AgentError { agent_id: String, message: String },

    /// A discussion round is beginning.
    DiscussionRoundStart { round: usize },

    /// Incremental text from an agent's contribution to a discussion round.
    DiscussionText {
        agent_id: String,
        round: usize,
        content: String,
    },

    /// An agent's stream ended in error mid-round. The round completes with
    /// the remaining contributions.
    DiscussionError {
        agent_id: String,
        round: usize,
        message: String,
    },

    /// Convergence was scored at the end of a discussion round.
    ConvergenceUpdate { metrics: ConvergenceMetrics },

    /// Incremental text of the synthesized recommendation. `agent_id` is
    /// `None` when the deterministic fallback produced the text.
    SynthesisText {
        agent_id: Option<String>,
        content: String,
    },

    /// A session-level failure: fewer than two reachable agents, or an
    /// unexpected error caught at the orchestrator boundary.
    Error { message: String },

    /// Terminal event; emitted exactly once per session stream.
    Done { total_tokens: usize },
}

/// Sender half of a session's event channel.
///
/// Cloneable, and tolerant of the caller dropping the receiving stream —
/// a closed channel only downgrades emission to a debug log line.
#[derive(Clone)]
pub struct EventSink {
    tx: UnboundedSender<CollabEvent>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<CollabEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: CollabEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("event receiver dropped; discarding event");
        }
    }
}
