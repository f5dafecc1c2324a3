use async_trait::async_trait;
use collabllm::orchestrator::EventStream;
use collabllm::{
    AgentGateway, AgentParticipant, ChunkStream, CollabConfig, CollabEvent, CollabOrchestrator,
    CollabStrategy, ContextItem, ConvergenceRecommendation, DiscussionRole, GatewayChunk,
    GatewayError, TokenUsage,
};
use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Scripted gateway that also records every (agent_id, prompt) call.
struct MockGateway {
    scripts: Mutex<HashMap<String, VecDeque<Vec<GatewayChunk>>>>,
    reachable: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            reachable: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn reachable(mut self, agent_id: &str) -> Self {
        self.reachable.insert(agent_id.to_string());
        self
    }

    fn script(self, agent_id: &str, chunks: Vec<GatewayChunk>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(agent_id.to_string())
            .or_default()
            .push_back(chunks);
        self
    }

    fn calls_for(&self, agent_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == agent_id)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl AgentGateway for MockGateway {
    async fn send_message(
        &self,
        agent_id: &str,
        prompt: &str,
        _context_items: &[ContextItem],
        _settings: &serde_json::Value,
        _session_key: &str,
    ) -> Result<ChunkStream, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((agent_id.to_string(), prompt.to_string()));
        let chunks = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(agent_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                vec![GatewayChunk::Error {
                    message: format!("no scripted response for '{}'", agent_id),
                }]
            });
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn is_reachable(&self, agent_id: &str) -> bool {
        self.reachable.contains(agent_id)
    }
}

fn text(content: &str) -> GatewayChunk {
    GatewayChunk::Text {
        content: content.to_string(),
    }
}

fn done() -> GatewayChunk {
    GatewayChunk::Done {
        usage: Some(TokenUsage {
            input_tokens: 5,
            output_tokens: 5,
            total_tokens: 10,
        }),
    }
}

fn config(strategy: CollabStrategy) -> CollabConfig {
    CollabConfig::new(
        AgentParticipant::new("alpha", "Alpha"),
        AgentParticipant::new("beta", "Beta"),
    )
    .with_strategy(strategy)
}

async fn collect_until_done(mut events: EventStream) -> Vec<CollabEvent> {
    let mut out = Vec::new();
    while let Some(event) = events.next().await {
        let is_done = matches!(event, CollabEvent::Done { .. });
        out.push(event);
        if is_done {
            break;
        }
    }
    out
}

// An analysis with plenty of distinct >3-char tokens and no agreement or
// disagreement vocabulary, so critiques built from it dominate the overlap.
const ALPHA_ANALYSIS: &str = "queue architecture provides durable buffering decoupled \
     producers consumers backpressure smoothing burst tolerance operational isolation \
     replay capability ordered delivery guarantees simpler recovery paths";
const BETA_ANALYSIS: &str = "direct invocation keeps latency minimal avoids broker \
     infrastructure reduces moving pieces simplifies tracing debugging deployment \
     model lowers operational overhead keeps failure domains visible";

#[tokio::test]
async fn debate_converges_after_round_one_and_skips_round_two() {
    // Round-1 critiques restate each agent's own analysis nearly verbatim
    // and add agreement phrasing: high position stability, pure agreement
    // signals, so the scorer recommends converged after round 1.
    let alpha_critique = format!("{} agree valid point", ALPHA_ANALYSIS);
    let beta_critique = format!("{} agree valid point", BETA_ANALYSIS);

    let gateway = MockGateway::new()
        .reachable("alpha")
        .reachable("beta")
        .script("alpha", vec![text(ALPHA_ANALYSIS), done()])
        .script("beta", vec![text(BETA_ANALYSIS), done()])
        .script("alpha", vec![text(&alpha_critique), done()])
        .script("beta", vec![text(&beta_critique), done()])
        .script("alpha", vec![text("unified answer"), done()]);

    let orchestrator = CollabOrchestrator::new(
        Arc::new(gateway),
        config(CollabStrategy::Debate).with_max_discussion_rounds(3),
    );
    let events = orchestrator.start_session(
        "Queue or direct calls?",
        Vec::new(),
        serde_json::Value::Null,
        Some("debate"),
    );
    let events = collect_until_done(events).await;

    let round_starts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            CollabEvent::DiscussionRoundStart { round } => Some(*round),
            _ => None,
        })
        .collect();
    assert_eq!(round_starts, vec![1]);
    assert!(!events.iter().any(|e| matches!(
        e,
        CollabEvent::DiscussionText { round: 2, .. }
    )));

    let recommendations: Vec<ConvergenceRecommendation> = events
        .iter()
        .filter_map(|e| match e {
            CollabEvent::ConvergenceUpdate { metrics } => Some(metrics.recommendation),
            _ => None,
        })
        .collect();
    assert_eq!(recommendations, vec![ConvergenceRecommendation::Converged]);

    let session = orchestrator.get_current_session("debate").unwrap();
    assert_eq!(session.discussion_rounds.len(), 1);
    assert_eq!(session.convergence_history.len(), 1);
    let metrics = &session.convergence_history[0];
    assert!(metrics.agreement_ratio >= 0.7);
    assert!(metrics.avg_stability() >= 0.8);
    assert_eq!(session.unified_solution.as_deref(), Some("unified answer"));
}

#[tokio::test]
async fn debate_runs_all_rounds_when_positions_shift() {
    // Every round is fresh wording: stability stays low, signals mixed, so
    // the debate runs to the round cap.
    let gateway = MockGateway::new()
        .reachable("alpha")
        .reachable("beta")
        .script("alpha", vec![text(ALPHA_ANALYSIS), done()])
        .script("beta", vec![text(BETA_ANALYSIS), done()])
        .script("alpha", vec![text("however the broker adds deployment weight"), done()])
        .script("beta", vec![text("however queues mask transient spikes nicely"), done()])
        .script("alpha", vec![text("fresh framing entirely new angle today"), done()])
        .script("beta", vec![text("different reasoning substantially revised stance"), done()])
        .script("alpha", vec![text("unified answer"), done()]);

    let orchestrator = CollabOrchestrator::new(
        Arc::new(gateway),
        config(CollabStrategy::Debate).with_max_discussion_rounds(2),
    );
    let events = orchestrator.start_session(
        "Queue or direct calls?",
        Vec::new(),
        serde_json::Value::Null,
        Some("debate-long"),
    );
    let events = collect_until_done(events).await;

    let round_starts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            CollabEvent::DiscussionRoundStart { round } => Some(*round),
            _ => None,
        })
        .collect();
    assert_eq!(round_starts, vec![1, 2]);

    let session = orchestrator.get_current_session("debate-long").unwrap();
    assert_eq!(session.discussion_rounds.len(), 2);
    // The last round is never scored.
    assert_eq!(session.convergence_history.len(), 1);
}

#[tokio::test]
async fn red_team_proposer_failure_skips_discussion() {
    let gateway = MockGateway::new()
        .reachable("alpha")
        .reachable("beta")
        // proposer's individual call fails outright
        .script(
            "alpha",
            vec![GatewayChunk::Error {
                message: "proposer offline".to_string(),
            }],
        )
        // synthesis: alpha fails (queue empty -> error), beta succeeds
        .script("beta", vec![text("salvaged summary"), done()]);

    let orchestrator =
        CollabOrchestrator::new(Arc::new(gateway), config(CollabStrategy::RedTeam));
    let events = orchestrator.start_session(
        "Proposal?",
        Vec::new(),
        serde_json::Value::Null,
        Some("redteam"),
    );
    let events = collect_until_done(events).await;

    assert!(events.iter().any(|e| matches!(
        e,
        CollabEvent::AgentError { agent_id, .. } if agent_id == "alpha"
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e, CollabEvent::DiscussionRoundStart { .. })));
    assert!(matches!(events.last(), Some(CollabEvent::Done { .. })));

    let session = orchestrator.get_current_session("redteam").unwrap();
    assert!(session.discussion_rounds.is_empty());
    assert_eq!(
        session.unified_solution.as_deref(),
        Some("salvaged summary")
    );
}

#[tokio::test]
async fn red_team_challenge_and_defense_rounds() {
    let gateway = MockGateway::new()
        .reachable("alpha")
        .reachable("beta")
        .script("alpha", vec![text("Proposal: ship the queue"), done()])
        .script("beta", vec![text("Challenge: what about ordering?"), done()])
        .script("alpha", vec![text("Defense: partition keys preserve order"), done()])
        .script("alpha", vec![text("unified"), done()]);

    let orchestrator =
        CollabOrchestrator::new(Arc::new(gateway), config(CollabStrategy::RedTeam));
    let events = orchestrator.start_session(
        "Ship it?",
        Vec::new(),
        serde_json::Value::Null,
        Some("redteam-ok"),
    );
    collect_until_done(events).await;

    let session = orchestrator.get_current_session("redteam-ok").unwrap();
    // Individual phase addressed the proposer only.
    assert_eq!(session.responses.len(), 1);
    assert!(session.responses.contains_key("alpha"));

    assert_eq!(session.discussion_rounds.len(), 2);
    let challenge = &session.discussion_rounds[0];
    assert_eq!(challenge.roles.get("beta"), Some(&DiscussionRole::Challenger));
    assert!(challenge.contributions["beta"].contains("ordering"));
    let defense = &session.discussion_rounds[1];
    assert_eq!(defense.roles.get("alpha"), Some(&DiscussionRole::Defender));
    assert!(defense.contributions["alpha"].contains("partition"));
}

#[tokio::test]
async fn perspectives_uses_both_lenses_and_one_cross_review_round() {
    let gateway = MockGateway::new()
        .reachable("alpha")
        .reachable("beta")
        .script("alpha", vec![text("Risks: broker outage, duplication"), done()])
        .script("beta", vec![text("Opportunities: elasticity, decoupling"), done()])
        .script("alpha", vec![text("Cross-review of the upside case"), done()])
        .script("beta", vec![text("Cross-review of the risk case"), done()])
        .script("alpha", vec![text("unified"), done()]);

    let orchestrator = CollabOrchestrator::new(
        Arc::new(gateway),
        config(CollabStrategy::Perspectives),
    );
    let events = orchestrator.start_session(
        "Adopt queues?",
        Vec::new(),
        serde_json::Value::Null,
        Some("lenses"),
    );
    let events = collect_until_done(events).await;

    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, CollabEvent::DiscussionRoundStart { .. }))
            .count(),
        1
    );

    let session = orchestrator.get_current_session("lenses").unwrap();
    assert_eq!(session.discussion_rounds.len(), 1);
    let round = &session.discussion_rounds[0];
    assert_eq!(round.roles.get("alpha"), Some(&DiscussionRole::RiskAnalyst));
    assert_eq!(round.roles.get("beta"), Some(&DiscussionRole::Innovator));
    assert_eq!(round.contributions.len(), 2);
}

#[tokio::test]
async fn perspectives_individual_prompts_differ_by_lens() {
    let gateway = Arc::new(
        MockGateway::new()
            .reachable("alpha")
            .reachable("beta")
            .script("alpha", vec![text("risk view"), done()])
            .script("beta", vec![text("upside view"), done()])
            .script("alpha", vec![text("review"), done()])
            .script("beta", vec![text("review"), done()])
            .script("alpha", vec![text("unified"), done()]),
    );

    let orchestrator = CollabOrchestrator::new(
        Arc::clone(&gateway) as Arc<dyn AgentGateway>,
        config(CollabStrategy::Perspectives),
    );
    let events = orchestrator.start_session(
        "Adopt queues?",
        Vec::new(),
        serde_json::Value::Null,
        Some("lenses-2"),
    );
    collect_until_done(events).await;

    let alpha_prompts = gateway.calls_for("alpha");
    let beta_prompts = gateway.calls_for("beta");
    assert!(alpha_prompts[0].contains("risk lens"));
    assert!(beta_prompts[0].contains("opportunity lens"));
}

#[tokio::test]
async fn delphi_facilitator_score_ends_iteration_early() {
    // Facilitator (alpha, the synthesis agent) self-reports 9/10 in the
    // first iteration, so no second iteration runs.
    let gateway = Arc::new(
        MockGateway::new()
            .reachable("alpha")
            .reachable("beta")
            .script("alpha", vec![text("Position A"), done()])
            .script("beta", vec![text("Position B"), done()])
            .script(
                "alpha",
                vec![
                    text("Both positions largely overlap. CONVERGENCE_SCORE: 9"),
                    done(),
                ],
            )
            .script("alpha", vec![text("Refined A"), done()])
            .script("beta", vec![text("Refined B"), done()])
            .script("alpha", vec![text("unified consensus"), done()]),
    );

    let orchestrator = CollabOrchestrator::new(
        Arc::clone(&gateway) as Arc<dyn AgentGateway>,
        config(CollabStrategy::Delphi).with_max_discussion_rounds(3),
    );
    let events = orchestrator.start_session(
        "Consensus?",
        Vec::new(),
        serde_json::Value::Null,
        Some("delphi"),
    );
    let events = collect_until_done(events).await;

    let session = orchestrator.get_current_session("delphi").unwrap();
    // One facilitator summary (round 1) and one refinement exchange (round 2).
    assert_eq!(session.discussion_rounds.len(), 2);
    assert_eq!(session.discussion_rounds[0].round, 1);
    assert_eq!(
        session.discussion_rounds[0].roles.get("alpha"),
        Some(&DiscussionRole::Facilitator)
    );
    assert_eq!(session.discussion_rounds[1].round, 2);
    assert_eq!(
        session.discussion_rounds[1].roles.get("beta"),
        Some(&DiscussionRole::Refiner)
    );

    assert_eq!(session.convergence_history.len(), 1);
    let metrics = &session.convergence_history[0];
    assert!((metrics.overall_convergence - 0.9).abs() < 1e-6);
    assert_eq!(
        metrics.recommendation,
        ConvergenceRecommendation::Converged
    );
    assert!(events.iter().any(|e| matches!(
        e,
        CollabEvent::ConvergenceUpdate { .. }
    )));

    // alpha: individual + summary + refine + synthesis = 4 calls.
    assert_eq!(gateway.calls_for("alpha").len(), 4);
    // beta: individual + refine = 2 calls.
    assert_eq!(gateway.calls_for("beta").len(), 2);
}

#[tokio::test]
async fn auto_converge_stop_disabled_still_records_metrics() {
    let alpha_critique = format!("{} agree valid point", ALPHA_ANALYSIS);
    let beta_critique = format!("{} agree valid point", BETA_ANALYSIS);

    let gateway = MockGateway::new()
        .reachable("alpha")
        .reachable("beta")
        .script("alpha", vec![text(ALPHA_ANALYSIS), done()])
        .script("beta", vec![text(BETA_ANALYSIS), done()])
        .script("alpha", vec![text(&alpha_critique), done()])
        .script("beta", vec![text(&beta_critique), done()])
        .script("alpha", vec![text("rebuttal one"), done()])
        .script("beta", vec![text("rebuttal two"), done()])
        .script("alpha", vec![text("unified"), done()]);

    let orchestrator = CollabOrchestrator::new(
        Arc::new(gateway),
        config(CollabStrategy::Debate)
            .with_max_discussion_rounds(2)
            .with_auto_converge_stop(false),
    );
    let events = orchestrator.start_session(
        "q",
        Vec::new(),
        serde_json::Value::Null,
        Some("no-stop"),
    );
    collect_until_done(events).await;

    let session = orchestrator.get_current_session("no-stop").unwrap();
    // Converged verdict was recorded after round 1 but did not end the
    // debate: round 2 still ran.
    assert_eq!(session.discussion_rounds.len(), 2);
    assert_eq!(session.convergence_history.len(), 1);
    assert_eq!(
        session.convergence_history[0].recommendation,
        ConvergenceRecommendation::Converged
    );
}
