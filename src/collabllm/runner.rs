//! Protocol runner: drives one session through its phase sequence.
//!
//! The runner owns the session for the duration of the run (single logical
//! owner; lock scopes never span an await) and is built from three reusable
//! phase primitives:
//!
//! - **individual phase** — concurrent per-agent analysis streamed through
//!   the [`StreamInterleaver`](crate::interleave::StreamInterleaver);
//! - **discussion round** — concurrent role-assigned contributions, recorded
//!   as one [`DiscussionRound`](crate::session::DiscussionRound);
//! - **synthesis** — one consolidated prompt, with a cascading fallback that
//!   always produces a unified solution.
//!
//! A single agent failing mid-stream never aborts the protocol: the failure
//! is surfaced as an event and the remaining phases adapt (discussion is
//! skipped when an addressed agent did not complete its individual
//! analysis).

use crate::collabllm::config::CollabConfig;
use crate::collabllm::convergence::{parse_reported_score, score_round};
use crate::collabllm::event::{CollabEvent, EventSink};
use crate::collabllm::gateway::{AgentGateway, ContextItem, GatewayError, GatewayChunk, TokenUsage};
use crate::collabllm::interleave::StreamInterleaver;
use crate::collabllm::prompts::{self, PerspectiveLens};
use crate::collabllm::protocol::{DiscussionPlan, IndividualPlan, ProtocolDescriptor};
use crate::collabllm::session::{
    AgentParticipant, CollabPhase, ConvergenceMetrics, ConvergenceRecommendation,
    DiscussionRole, DiscussionRound, ResponseStatus, Session,
};
use crate::collabllm::store::SharedSession;
use futures_util::StreamExt;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Error types for protocol runs.
#[derive(Debug, Clone)]
pub enum CollabError {
    /// Session start preconditions not met (fewer than two reachable agents).
    PreconditionFailed(String),
    /// A referenced agent is not one of the session's participants.
    ParticipantMissing(String),
    /// Unexpected failure inside a protocol step.
    ExecutionFailed(String),
}

impl fmt::Display for CollabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollabError::PreconditionFailed(msg) => write!(f, "precondition failed: {}", msg),
            CollabError::ParticipantMissing(id) => write!(f, "participant not found: {}", id),
            CollabError::ExecutionFailed(msg) => write!(f, "execution failed: {}", msg),
        }
    }
}

impl Error for CollabError {}

/// Drives one session through its strategy's phase sequence.
pub struct ProtocolRunner {
    gateway: Arc<dyn AgentGateway>,
    session: SharedSession,
    session_key: String,
    config: CollabConfig,
    context_items: Vec<ContextItem>,
    settings: serde_json::Value,
    events: EventSink,
}

impl ProtocolRunner {
    pub fn new(
        gateway: Arc<dyn AgentGateway>,
        session: SharedSession,
        session_key: impl Into<String>,
        config: CollabConfig,
        context_items: Vec<ContextItem>,
        settings: serde_json::Value,
        events: EventSink,
    ) -> Self {
        Self {
            gateway,
            session,
            session_key: session_key.into(),
            config,
            context_items,
            settings,
            events,
        }
    }

    /// Run the full protocol. Per-agent stream failures are absorbed and
    /// surfaced as events; an `Err` here means an unexpected internal
    /// failure, caught by the orchestrator facade.
    pub async fn run(&self) -> Result<(), CollabError> {
        let descriptor = ProtocolDescriptor::for_strategy(self.config.strategy);

        self.set_phase(CollabPhase::Individual);
        let addressed = self.individual_phase(&descriptor).await?;
        if self.is_cancelled() {
            return Ok(());
        }

        if descriptor.has_discussion() {
            let completed = self.with_session(|s| {
                addressed
                    .iter()
                    .filter(|id| {
                        s.responses
                            .get(id.as_str())
                            .map(|r| r.status == ResponseStatus::Complete)
                            .unwrap_or(false)
                    })
                    .count()
            });
            if completed == addressed.len() && !addressed.is_empty() {
                self.set_phase(CollabPhase::Discussion);
                match descriptor.discussion {
                    DiscussionPlan::None => {}
                    DiscussionPlan::Iterative => self.run_debate_discussion().await?,
                    DiscussionPlan::ChallengeDefense => self.run_red_team_discussion().await?,
                    DiscussionPlan::CrossReview => self.run_cross_review_discussion().await?,
                    DiscussionPlan::Facilitated => self.run_delphi_discussion().await?,
                }
            } else {
                log::warn!(
                    "skipping discussion for strategy '{}': {}/{} addressed agents completed",
                    self.config.strategy.as_str(),
                    completed,
                    addressed.len()
                );
            }
        }
        if self.is_cancelled() {
            return Ok(());
        }

        self.set_phase(CollabPhase::Synthesis);
        self.synthesis_phase().await?;

        self.set_phase(CollabPhase::Complete);
        Ok(())
    }

    // ── Phase primitive: individual analysis ─────────────────────────────

    /// Stream every addressed agent's analysis concurrently. Returns the
    /// addressed agent ids.
    async fn individual_phase(
        &self,
        descriptor: &ProtocolDescriptor,
    ) -> Result<Vec<String>, CollabError> {
        let query = self.with_session(|s| s.query.clone());
        let participants = self.config.participants.clone();
        if participants.len() != 2 {
            return Err(CollabError::PreconditionFailed(format!(
                "expected 2 participants, found {}",
                participants.len()
            )));
        }

        let targets: Vec<(AgentParticipant, String)> = match descriptor.individual {
            IndividualPlan::BothSamePrompt => participants
                .iter()
                .map(|p| (p.clone(), prompts::individual_prompt(&query)))
                .collect(),
            IndividualPlan::BothDistinctLens => vec![
                (
                    participants[0].clone(),
                    prompts::perspective_prompt(&query, PerspectiveLens::Risk),
                ),
                (
                    participants[1].clone(),
                    prompts::perspective_prompt(&query, PerspectiveLens::Opportunity),
                ),
            ],
            IndividualPlan::ProposerOnly => vec![(
                participants[0].clone(),
                prompts::individual_prompt(&query),
            )],
        };

        // One empty response per addressed agent, before any stream starts.
        self.with_session(|s| {
            for (participant, _) in &targets {
                s.responses.insert(
                    participant.agent_id.clone(),
                    crate::collabllm::session::AgentResponse::new(participant.agent_id.clone()),
                );
            }
            s.touch();
        });

        let mut sources = Vec::new();
        for (participant, prompt) in &targets {
            let settings = self.call_settings(participant);
            match self
                .gateway
                .send_message(
                    &participant.agent_id,
                    prompt,
                    &self.context_items,
                    &settings,
                    &self.session_key,
                )
                .await
            {
                Ok(stream) => sources.push((participant.agent_id.clone(), stream)),
                Err(err) => {
                    log::warn!("agent '{}' unavailable: {}", participant.agent_id, err);
                    self.mark_response_error(&participant.agent_id);
                    self.events.emit(CollabEvent::AgentError {
                        agent_id: participant.agent_id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let mut interleaver = StreamInterleaver::new(sources);
        let mut failed: HashSet<String> = HashSet::new();
        while let Some((agent_id, chunk)) = interleaver.next().await {
            if failed.contains(&agent_id) {
                continue;
            }
            match chunk {
                GatewayChunk::Text { content } => {
                    self.with_session(|s| {
                        if let Some(response) = s.responses.get_mut(&agent_id) {
                            response.content.push_str(&content);
                            response.status = ResponseStatus::Streaming;
                            response.updated_at = chrono::Utc::now();
                        }
                        s.touch();
                    });
                    self.events.emit(CollabEvent::AgentText { agent_id, content });
                }
                GatewayChunk::Thinking { content } => {
                    self.with_session(|s| {
                        if let Some(response) = s.responses.get_mut(&agent_id) {
                            response.thinking.push_str(&content);
                            response.status = ResponseStatus::Streaming;
                            response.updated_at = chrono::Utc::now();
                        }
                        s.touch();
                    });
                    self.events
                        .emit(CollabEvent::AgentThinking { agent_id, content });
                }
                GatewayChunk::Done { usage } => {
                    self.with_session(|s| {
                        if let Some(response) = s.responses.get_mut(&agent_id) {
                            response.status = ResponseStatus::Complete;
                            response.usage = usage.clone();
                            response.updated_at = chrono::Utc::now();
                        }
                        s.touch();
                    });
                    self.events
                        .emit(CollabEvent::AgentComplete { agent_id, usage });
                }
                GatewayChunk::Error { message } => {
                    failed.insert(agent_id.clone());
                    self.mark_response_error(&agent_id);
                    self.events
                        .emit(CollabEvent::AgentError { agent_id, message });
                }
            }
        }

        Ok(targets
            .into_iter()
            .map(|(participant, _)| participant.agent_id)
            .collect())
    }

    // ── Phase primitive: discussion round ────────────────────────────────

    /// Run the assigned agents concurrently and append one round record when
    /// all of them finish. Partial text from an agent that errored mid-round
    /// is kept when non-empty.
    async fn discussion_round(
        &self,
        round_no: usize,
        assignments: Vec<(String, DiscussionRole, String)>,
    ) -> Result<DiscussionRound, CollabError> {
        self.events
            .emit(CollabEvent::DiscussionRoundStart { round: round_no });

        let mut roles: HashMap<String, DiscussionRole> = HashMap::new();
        for (agent_id, role, _) in &assignments {
            roles.insert(agent_id.clone(), *role);
        }

        let mut sources = Vec::new();
        for (agent_id, _, prompt) in &assignments {
            let participant = self
                .config
                .participants
                .iter()
                .find(|p| &p.agent_id == agent_id)
                .cloned()
                .ok_or_else(|| CollabError::ParticipantMissing(agent_id.clone()))?;
            let settings = self.call_settings(&participant);
            match self
                .gateway
                .send_message(agent_id, prompt, &self.context_items, &settings, &self.session_key)
                .await
            {
                Ok(stream) => sources.push((agent_id.clone(), stream)),
                Err(err) => {
                    log::warn!("agent '{}' unavailable in round {}: {}", agent_id, round_no, err);
                    self.events.emit(CollabEvent::DiscussionError {
                        agent_id: agent_id.clone(),
                        round: round_no,
                        message: err.to_string(),
                    });
                }
            }
        }

        let mut contributions: HashMap<String, String> = HashMap::new();
        let mut interleaver = StreamInterleaver::new(sources);
        let mut failed: HashSet<String> = HashSet::new();
        while let Some((agent_id, chunk)) = interleaver.next().await {
            if failed.contains(&agent_id) {
                continue;
            }
            match chunk {
                GatewayChunk::Text { content } => {
                    contributions
                        .entry(agent_id.clone())
                        .or_default()
                        .push_str(&content);
                    self.events.emit(CollabEvent::DiscussionText {
                        agent_id,
                        round: round_no,
                        content,
                    });
                }
                GatewayChunk::Thinking { content } => {
                    self.events
                        .emit(CollabEvent::AgentThinking { agent_id, content });
                }
                GatewayChunk::Done { usage: _ } => {}
                GatewayChunk::Error { message } => {
                    failed.insert(agent_id.clone());
                    self.events.emit(CollabEvent::DiscussionError {
                        agent_id,
                        round: round_no,
                        message,
                    });
                }
            }
        }

        contributions.retain(|_, text| !text.is_empty());
        let round = DiscussionRound {
            round: round_no,
            contributions,
            roles,
        };
        self.with_session(|s| {
            s.discussion_rounds.push(round.clone());
            s.touch();
        });
        Ok(round)
    }

    // ── Strategy drivers ─────────────────────────────────────────────────

    /// Debate: critique, then rebuttal rounds, convergence-scored after each
    /// round but the last.
    async fn run_debate_discussion(&self) -> Result<(), CollabError> {
        let query = self.with_session(|s| s.query.clone());
        let first = self.config.participants[0].clone();
        let second = self.config.participants[1].clone();
        let max_rounds = self.config.max_discussion_rounds;

        // Round 0 stands in for the individual analyses so round-1 stability
        // has something to compare against.
        let mut previous = self.individual_round_zero();

        for round_no in 1..=max_rounds {
            if self.is_cancelled() {
                return Ok(());
            }
            let assignments = if round_no == 1 {
                vec![
                    (
                        first.agent_id.clone(),
                        DiscussionRole::Critic,
                        prompts::critique_prompt(
                            &query,
                            &second.display_name,
                            &self.individual_content(&second.agent_id),
                        ),
                    ),
                    (
                        second.agent_id.clone(),
                        DiscussionRole::Critic,
                        prompts::critique_prompt(
                            &query,
                            &first.display_name,
                            &self.individual_content(&first.agent_id),
                        ),
                    ),
                ]
            } else {
                let first_position = previous
                    .contributions
                    .get(&first.agent_id)
                    .cloned()
                    .unwrap_or_else(|| self.individual_content(&first.agent_id));
                let second_position = previous
                    .contributions
                    .get(&second.agent_id)
                    .cloned()
                    .unwrap_or_else(|| self.individual_content(&second.agent_id));
                vec![
                    (
                        first.agent_id.clone(),
                        DiscussionRole::Defender,
                        prompts::rebuttal_prompt(
                            &query,
                            &first_position,
                            &second.display_name,
                            &second_position,
                        ),
                    ),
                    (
                        second.agent_id.clone(),
                        DiscussionRole::Defender,
                        prompts::rebuttal_prompt(
                            &query,
                            &second_position,
                            &first.display_name,
                            &first_position,
                        ),
                    ),
                ]
            };

            let round = self.discussion_round(round_no, assignments).await?;

            if round_no < max_rounds {
                let history = self.with_session(|s| s.convergence_history.clone());
                let metrics = score_round(&round, Some(&previous), &history);
                self.record_convergence(metrics.clone());
                if self.config.auto_converge_stop
                    && metrics.recommendation != ConvergenceRecommendation::Continue
                {
                    log::info!(
                        "debate ended after round {} ({:?})",
                        round_no,
                        metrics.recommendation
                    );
                    return Ok(());
                }
            }
            previous = round;
        }
        Ok(())
    }

    /// Red-team: the challenger stress-tests the proposal, then the proposer
    /// defends and revises.
    async fn run_red_team_discussion(&self) -> Result<(), CollabError> {
        let query = self.with_session(|s| s.query.clone());
        let proposer = self.config.participants[0].clone();
        let challenger = self.config.participants[1].clone();
        let proposal = self.individual_content(&proposer.agent_id);

        let challenge_round = self
            .discussion_round(
                1,
                vec![(
                    challenger.agent_id.clone(),
                    DiscussionRole::Challenger,
                    prompts::challenge_prompt(&query, &proposer.display_name, &proposal),
                )],
            )
            .await?;

        let challenge = match challenge_round.contributions.get(&challenger.agent_id) {
            Some(text) => text.clone(),
            None => {
                log::warn!("challenger produced no output; skipping defense round");
                return Ok(());
            }
        };
        if self.is_cancelled() {
            return Ok(());
        }

        self.discussion_round(
            2,
            vec![(
                proposer.agent_id.clone(),
                DiscussionRole::Defender,
                prompts::defense_prompt(&query, &proposal, &challenger.display_name, &challenge),
            )],
        )
        .await?;
        Ok(())
    }

    /// Perspectives: one combined round where each agent reviews the other
    /// lens's analysis.
    async fn run_cross_review_discussion(&self) -> Result<(), CollabError> {
        let query = self.with_session(|s| s.query.clone());
        let risk = self.config.participants[0].clone();
        let opportunity = self.config.participants[1].clone();

        self.discussion_round(
            1,
            vec![
                (
                    risk.agent_id.clone(),
                    DiscussionRole::RiskAnalyst,
                    prompts::cross_review_prompt(
                        &query,
                        &opportunity.display_name,
                        &self.individual_content(&opportunity.agent_id),
                    ),
                ),
                (
                    opportunity.agent_id.clone(),
                    DiscussionRole::Innovator,
                    prompts::cross_review_prompt(
                        &query,
                        &risk.display_name,
                        &self.individual_content(&risk.agent_id),
                    ),
                ),
            ],
        )
        .await?;
        Ok(())
    }

    /// Delphi: per iteration, an opinion-free facilitator summary (odd round
    /// numbers) followed by parallel refinement (even round numbers).
    async fn run_delphi_discussion(&self) -> Result<(), CollabError> {
        let query = self.with_session(|s| s.query.clone());
        let participants = self.config.participants.clone();
        let facilitator_id = self.config.synthesis_agent_id.clone();
        let max_rounds = self.config.max_discussion_rounds;

        let mut positions: HashMap<String, String> = participants
            .iter()
            .map(|p| (p.agent_id.clone(), self.individual_content(&p.agent_id)))
            .collect();
        let mut previous_refinement = self.individual_round_zero();

        for iteration in 1..=max_rounds {
            if self.is_cancelled() {
                return Ok(());
            }
            let summary_round = 2 * iteration - 1;
            let refine_round = 2 * iteration;

            let named_positions: Vec<(String, String)> = participants
                .iter()
                .map(|p| {
                    (
                        p.display_name.clone(),
                        positions.get(&p.agent_id).cloned().unwrap_or_default(),
                    )
                })
                .collect();
            let summary_record = self
                .discussion_round(
                    summary_round,
                    vec![(
                        facilitator_id.clone(),
                        DiscussionRole::Facilitator,
                        prompts::facilitator_prompt(&query, &named_positions),
                    )],
                )
                .await?;
            let summary = summary_record
                .contributions
                .get(&facilitator_id)
                .cloned()
                .unwrap_or_default();

            let assignments: Vec<(String, DiscussionRole, String)> = participants
                .iter()
                .map(|p| {
                    (
                        p.agent_id.clone(),
                        DiscussionRole::Refiner,
                        prompts::refine_prompt(
                            &query,
                            positions.get(&p.agent_id).map(|s| s.as_str()).unwrap_or(""),
                            &summary,
                        ),
                    )
                })
                .collect();
            let refinement = self.discussion_round(refine_round, assignments).await?;
            for (agent_id, text) in &refinement.contributions {
                positions.insert(agent_id.clone(), text.clone());
            }

            // The facilitator's self-reported score wins; heuristic otherwise.
            let metrics = match parse_reported_score(&summary) {
                Some(score) => ConvergenceMetrics {
                    round: refine_round,
                    agreement_signals: 0,
                    disagreement_signals: 0,
                    agreement_ratio: score,
                    position_stability: HashMap::new(),
                    overall_convergence: score,
                    recommendation: if score >= 0.7 {
                        ConvergenceRecommendation::Converged
                    } else {
                        ConvergenceRecommendation::Continue
                    },
                },
                None => {
                    let history = self.with_session(|s| s.convergence_history.clone());
                    score_round(&refinement, Some(&previous_refinement), &history)
                }
            };
            let converged =
                metrics.recommendation == ConvergenceRecommendation::Converged;
            self.record_convergence(metrics);
            if self.config.auto_converge_stop && converged {
                log::info!("delphi consensus reached after iteration {}", iteration);
                return Ok(());
            }
            previous_refinement = refinement;
        }
        Ok(())
    }

    // ── Phase primitive: synthesis ───────────────────────────────────────

    /// Synthesize the unified solution, falling back from the designated
    /// agent to the other participant to a deterministic concatenation.
    async fn synthesis_phase(&self) -> Result<(), CollabError> {
        let snapshot = self.with_session(|s| s.clone());
        let prompt = prompts::synthesis_prompt(&snapshot);

        let mut candidates = vec![self.config.synthesis_agent_id.clone()];
        if let Some(other) = snapshot.other_participant(&self.config.synthesis_agent_id) {
            candidates.push(other.agent_id.clone());
        }

        for agent_id in candidates {
            match self.try_synthesis_with(&agent_id, &prompt).await {
                Ok(Some((text, usage))) => {
                    self.with_session(|s| {
                        s.synthesis_usage = usage;
                        s.set_unified_solution(text);
                    });
                    return Ok(());
                }
                Ok(None) => {
                    log::warn!("synthesis agent '{}' produced no output, falling back", agent_id);
                }
                Err(err) => {
                    log::warn!("synthesis agent '{}' failed ({}), falling back", agent_id, err);
                }
            }
        }

        let fallback = build_fallback_solution(&snapshot);
        self.events.emit(CollabEvent::SynthesisText {
            agent_id: None,
            content: fallback.clone(),
        });
        self.with_session(|s| {
            s.set_unified_solution(fallback);
        });
        Ok(())
    }

    /// One synthesis attempt. `Ok(None)` means the stream ended cleanly but
    /// produced nothing usable.
    async fn try_synthesis_with(
        &self,
        agent_id: &str,
        prompt: &str,
    ) -> Result<Option<(String, Option<TokenUsage>)>, GatewayError> {
        let participant = self
            .config
            .participants
            .iter()
            .find(|p| p.agent_id == agent_id)
            .cloned()
            .unwrap_or_else(|| AgentParticipant::new(agent_id, agent_id));
        let settings = self.call_settings(&participant);
        let mut stream = self
            .gateway
            .send_message(agent_id, prompt, &self.context_items, &settings, &self.session_key)
            .await?;

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                GatewayChunk::Text { content } => {
                    text.push_str(&content);
                    self.events.emit(CollabEvent::SynthesisText {
                        agent_id: Some(agent_id.to_string()),
                        content,
                    });
                }
                GatewayChunk::Thinking { content } => {
                    self.events.emit(CollabEvent::AgentThinking {
                        agent_id: agent_id.to_string(),
                        content,
                    });
                }
                GatewayChunk::Done { usage } => {
                    if text.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some((text, usage)));
                }
                GatewayChunk::Error { message } => {
                    return Err(message.into());
                }
            }
        }
        // Stream ended without a terminal chunk; salvage accumulated text.
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some((text, None)))
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut guard = self.session.lock().unwrap();
        f(&mut guard)
    }

    fn set_phase(&self, phase: CollabPhase) {
        let advanced = self.with_session(|s| s.advance_phase(phase));
        if advanced {
            self.events.emit(CollabEvent::PhaseChange { phase });
        }
    }

    fn is_cancelled(&self) -> bool {
        self.with_session(|s| s.phase == CollabPhase::Complete)
    }

    fn mark_response_error(&self, agent_id: &str) {
        self.with_session(|s| {
            if let Some(response) = s.responses.get_mut(agent_id) {
                response.status = ResponseStatus::Error;
                response.updated_at = chrono::Utc::now();
            }
            s.touch();
        });
    }

    fn individual_content(&self, agent_id: &str) -> String {
        self.with_session(|s| {
            s.responses
                .get(agent_id)
                .map(|r| r.content.clone())
                .unwrap_or_default()
        })
    }

    /// The individual analyses, packaged as a pseudo-round for round-1
    /// stability comparison.
    fn individual_round_zero(&self) -> DiscussionRound {
        let contributions = self.with_session(|s| {
            s.responses
                .iter()
                .filter(|(_, r)| !r.content.is_empty())
                .map(|(id, r)| (id.clone(), r.content.clone()))
                .collect::<HashMap<String, String>>()
        });
        DiscussionRound {
            round: 0,
            contributions,
            roles: HashMap::new(),
        }
    }

    fn record_convergence(&self, metrics: ConvergenceMetrics) {
        self.with_session(|s| {
            s.convergence_history.push(metrics.clone());
            s.touch();
        });
        self.events.emit(CollabEvent::ConvergenceUpdate { metrics });
    }

    /// Per-call settings: the caller's settings with the participant's
    /// persona attached verbatim when one is configured.
    fn call_settings(&self, participant: &AgentParticipant) -> serde_json::Value {
        match &participant.persona {
            None => self.settings.clone(),
            Some(persona) => {
                let mut merged = serde_json::Map::new();
                if let serde_json::Value::Object(map) = &self.settings {
                    merged.extend(map.clone());
                }
                merged.insert("persona".to_string(), persona.clone());
                serde_json::Value::Object(merged)
            }
        }
    }
}

/// Deterministic last-resort solution: every completed individual analysis,
/// labeled, behind an unavailability note. Never empty.
fn build_fallback_solution(session: &Session) -> String {
    let mut out = String::from(
        "Synthesis unavailable. The agents' individual analyses are reproduced below.\n",
    );
    for participant in &session.participants {
        if let Some(response) = session.responses.get(&participant.agent_id) {
            if response.status == ResponseStatus::Complete && !response.content.is_empty() {
                out.push_str(&format!(
                    "\n## {}\n{}\n",
                    participant.display_name, response.content
                ));
            }
        }
    }
    out
}
