//! Collaboration session data model.
//!
//! A [`Session`] is one active collaboration between exactly two agent
//! participants. It is created by the orchestrator facade, mutated only by
//! the protocol run driving it, and kept in the
//! [`SessionStore`](crate::store::SessionStore) until explicitly cleared or
//! superseded by a new session under the same key.

use crate::collabllm::gateway::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session key used when the caller does not supply one.
pub const DEFAULT_SESSION_KEY: &str = "default-panel";

/// The five collaboration protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollabStrategy {
    /// Both agents answer independently, then one synthesis pass.
    Quick,
    /// Iterated critique/rebuttal rounds with convergence scoring.
    Debate,
    /// One agent proposes, the other stress-tests, the first defends.
    RedTeam,
    /// Risk lens vs. opportunity lens, then a single cross-review round.
    Perspectives,
    /// Facilitator-led refinement rounds until consensus.
    Delphi,
}

impl CollabStrategy {
    /// Stable name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollabStrategy::Quick => "quick",
            CollabStrategy::Debate => "debate",
            CollabStrategy::RedTeam => "red-team",
            CollabStrategy::Perspectives => "perspectives",
            CollabStrategy::Delphi => "delphi",
        }
    }

    /// Parse a configuration strategy name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "quick" => Some(CollabStrategy::Quick),
            "debate" => Some(CollabStrategy::Debate),
            "red-team" => Some(CollabStrategy::RedTeam),
            "perspectives" => Some(CollabStrategy::Perspectives),
            "delphi" => Some(CollabStrategy::Delphi),
            _ => None,
        }
    }
}

/// Phase state machine: `Initial → Individual → Discussion → Synthesis →
/// Complete`. Quick skips `Discussion`; a session only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollabPhase {
    Initial,
    Individual,
    Discussion,
    Synthesis,
    Complete,
}

impl CollabPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollabPhase::Initial => "initial",
            CollabPhase::Individual => "individual",
            CollabPhase::Discussion => "discussion",
            CollabPhase::Synthesis => "synthesis",
            CollabPhase::Complete => "complete",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CollabPhase::Initial => 0,
            CollabPhase::Individual => 1,
            CollabPhase::Discussion => 2,
            CollabPhase::Synthesis => 3,
            CollabPhase::Complete => 4,
        }
    }
}

/// Static per-session configuration of one participant.
///
/// `styling` and `persona` are opaque pass-through payloads for the host UI
/// and the gateway respectively; the orchestrator never branches on them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentParticipant {
    pub agent_id: String,
    pub display_name: String,
    #[serde(default)]
    pub styling: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<serde_json::Value>,
}

impl AgentParticipant {
    pub fn new(agent_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            styling: serde_json::Value::Null,
            persona: None,
        }
    }

    pub fn with_styling(mut self, styling: serde_json::Value) -> Self {
        self.styling = styling;
        self
    }

    pub fn with_persona(mut self, persona: serde_json::Value) -> Self {
        self.persona = Some(persona);
        self
    }
}

/// Lifecycle of one agent's individual response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Pending,
    Streaming,
    Complete,
    Error,
}

/// Accumulated output of one agent during the individual phase.
///
/// Created empty when the phase first addresses the agent, mutated only by
/// appending chunks from that agent's stream, terminal once `status` is
/// `Complete` or `Error`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_id: String,
    pub content: String,
    pub thinking: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub updated_at: DateTime<Utc>,
}

impl AgentResponse {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: String::new(),
            thinking: String::new(),
            status: ResponseStatus::Pending,
            usage: None,
            updated_at: Utc::now(),
        }
    }
}

/// Discussion roles an agent can hold within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscussionRole {
    Critic,
    Defender,
    Challenger,
    Proposer,
    RiskAnalyst,
    Innovator,
    Facilitator,
    Refiner,
}

impl DiscussionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionRole::Critic => "critic",
            DiscussionRole::Defender => "defender",
            DiscussionRole::Challenger => "challenger",
            DiscussionRole::Proposer => "proposer",
            DiscussionRole::RiskAnalyst => "risk-analyst",
            DiscussionRole::Innovator => "innovator",
            DiscussionRole::Facilitator => "facilitator",
            DiscussionRole::Refiner => "refiner",
        }
    }
}

/// One completed exchange within the discussion phase.
///
/// Round numbering is strategy-defined: debate numbers rounds 1..N, delphi
/// records a facilitator summary and a refinement exchange per iteration
/// under distinct numbers. Contribution keys are present only for agents who
/// actually produced output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscussionRound {
    pub round: usize,
    pub contributions: HashMap<String, String>,
    pub roles: HashMap<String, DiscussionRole>,
}

/// Scorer verdict for a discussion round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceRecommendation {
    Continue,
    Converged,
    Stalled,
}

/// Heuristic agreement metrics for one scored round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvergenceMetrics {
    pub round: usize,
    pub agreement_signals: usize,
    pub disagreement_signals: usize,
    /// `agreement / (agreement + disagreement)`, 0.5 when both are zero.
    pub agreement_ratio: f32,
    /// Per-agent similarity of this round's contribution to the previous one.
    pub position_stability: HashMap<String, f32>,
    /// Weighted blend: `0.6 * agreement_ratio + 0.4 * avg stability`.
    pub overall_convergence: f32,
    pub recommendation: ConvergenceRecommendation,
}

impl ConvergenceMetrics {
    /// Average of the per-agent stability scores, 0.5 when none were scored.
    pub fn avg_stability(&self) -> f32 {
        if self.position_stability.is_empty() {
            return 0.5;
        }
        let sum: f32 = self.position_stability.values().sum();
        sum / self.position_stability.len() as f32
    }
}

/// One active collaboration between exactly two participants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub query: String,
    pub phase: CollabPhase,
    pub strategy: CollabStrategy,
    /// Exactly two, in configuration order.
    pub participants: Vec<AgentParticipant>,
    /// One entry per participant addressed by the individual phase.
    pub responses: HashMap<String, AgentResponse>,
    /// Append-only.
    pub discussion_rounds: Vec<DiscussionRound>,
    /// Append-only, one per scored round.
    pub convergence_history: Vec<ConvergenceMetrics>,
    /// Set once, at synthesis.
    pub unified_solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_usage: Option<TokenUsage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        query: impl Into<String>,
        strategy: CollabStrategy,
        participants: Vec<AgentParticipant>,
    ) -> Self {
        debug_assert_eq!(participants.len(), 2, "a session has exactly two participants");
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            phase: CollabPhase::Initial,
            strategy,
            participants,
            responses: HashMap::new(),
            discussion_rounds: Vec::new(),
            convergence_history: Vec::new(),
            unified_solution: None,
            synthesis_usage: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the phase state machine. Backward moves are ignored, so a
    /// cancelled session (forced to `Complete`) stays complete even if the
    /// protocol run is still unwinding.
    pub fn advance_phase(&mut self, next: CollabPhase) -> bool {
        if next.rank() <= self.phase.rank() {
            return false;
        }
        self.phase = next;
        self.touch();
        true
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn participant(&self, agent_id: &str) -> Option<&AgentParticipant> {
        self.participants.iter().find(|p| p.agent_id == agent_id)
    }

    /// The participant that is not `agent_id`.
    pub fn other_participant(&self, agent_id: &str) -> Option<&AgentParticipant> {
        self.participants.iter().find(|p| p.agent_id != agent_id)
    }

    pub fn display_name<'a>(&'a self, agent_id: &'a str) -> &'a str {
        self.participant(agent_id)
            .map(|p| p.display_name.as_str())
            .unwrap_or(agent_id)
    }

    /// Record the unified solution. The first write wins; later writes are
    /// ignored and reported via the return value.
    pub fn set_unified_solution(&mut self, text: impl Into<String>) -> bool {
        if self.unified_solution.is_some() {
            return false;
        }
        self.unified_solution = Some(text.into());
        self.touch();
        true
    }

    /// Participants whose individual response reached `Complete`.
    pub fn completed_participants(&self) -> Vec<&AgentParticipant> {
        self.participants
            .iter()
            .filter(|p| {
                self.responses
                    .get(&p.agent_id)
                    .map(|r| r.status == ResponseStatus::Complete)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Total tokens reported across individual responses and synthesis.
    pub fn total_tokens_used(&self) -> usize {
        let individual: usize = self
            .responses
            .values()
            .filter_map(|r| r.usage.as_ref())
            .map(|u| u.total_tokens)
            .sum();
        let synthesis = self
            .synthesis_usage
            .as_ref()
            .map(|u| u.total_tokens)
            .unwrap_or(0);
        individual + synthesis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_participants() -> Vec<AgentParticipant> {
        vec![
            AgentParticipant::new("a", "Agent A"),
            AgentParticipant::new("b", "Agent B"),
        ]
    }

    #[test]
    fn phase_only_moves_forward() {
        let mut session = Session::new("q", CollabStrategy::Quick, two_participants());
        assert!(session.advance_phase(CollabPhase::Individual));
        assert!(session.advance_phase(CollabPhase::Synthesis));
        assert!(!session.advance_phase(CollabPhase::Individual));
        assert_eq!(session.phase, CollabPhase::Synthesis);
        assert!(session.advance_phase(CollabPhase::Complete));
        assert!(!session.advance_phase(CollabPhase::Synthesis));
    }

    #[test]
    fn unified_solution_set_once() {
        let mut session = Session::new("q", CollabStrategy::Quick, two_participants());
        assert!(session.set_unified_solution("first"));
        assert!(!session.set_unified_solution("second"));
        assert_eq!(session.unified_solution.as_deref(), Some("first"));
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in [
            CollabStrategy::Quick,
            CollabStrategy::Debate,
            CollabStrategy::RedTeam,
            CollabStrategy::Perspectives,
            CollabStrategy::Delphi,
        ]
        .iter()
        {
            assert_eq!(CollabStrategy::parse(strategy.as_str()), Some(*strategy));
        }
        assert_eq!(CollabStrategy::parse("round-robin"), None);
    }
}
