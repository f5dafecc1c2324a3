//! Collaboration configuration.
//!
//! Mirrors the host's settings surface: the two participating agents, the
//! designated synthesis agent, the selected strategy, the discussion-round
//! cap, and whether convergence may stop a discussion early. Constructed
//! manually — no file parsing here.
//!
//! # Example
//!
//! ```rust
//! use collabllm::config::CollabConfig;
//! use collabllm::session::{AgentParticipant, CollabStrategy};
//!
//! let config = CollabConfig::new(
//!     AgentParticipant::new("claude", "Claude"),
//!     AgentParticipant::new("codex", "Codex"),
//! )
//! .with_strategy(CollabStrategy::Debate)
//! .with_max_discussion_rounds(2);
//!
//! assert_eq!(config.synthesis_agent_id, "claude");
//! ```

use crate::collabllm::session::{AgentParticipant, CollabStrategy};
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_DISCUSSION_ROUNDS: usize = 3;

/// Configuration for one collaboration session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollabConfig {
    /// The ordered pair of participants. The first one doubles as the
    /// red-team proposer.
    pub participants: Vec<AgentParticipant>,
    /// Agent asked to produce the unified solution (and to facilitate
    /// delphi rounds). Defaults to the first participant.
    pub synthesis_agent_id: String,
    pub strategy: CollabStrategy,
    /// Cap on debate/delphi iterations.
    pub max_discussion_rounds: usize,
    /// Whether a converged/stalled verdict ends the discussion early.
    pub auto_converge_stop: bool,
}

impl CollabConfig {
    pub fn new(first: AgentParticipant, second: AgentParticipant) -> Self {
        let synthesis_agent_id = first.agent_id.clone();
        Self {
            participants: vec![first, second],
            synthesis_agent_id,
            strategy: CollabStrategy::Quick,
            max_discussion_rounds: DEFAULT_MAX_DISCUSSION_ROUNDS,
            auto_converge_stop: true,
        }
    }

    pub fn with_strategy(mut self, strategy: CollabStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_synthesis_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.synthesis_agent_id = agent_id.into();
        self
    }

    pub fn with_max_discussion_rounds(mut self, rounds: usize) -> Self {
        self.max_discussion_rounds = rounds.max(1);
        self
    }

    pub fn with_auto_converge_stop(mut self, enabled: bool) -> Self {
        self.auto_converge_stop = enabled;
        self
    }

    pub fn participant_ids(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.agent_id.as_str()).collect()
    }
}
