//! Prompt assembly for every protocol phase.
//!
//! Plain string construction: each builder renders the query and the
//! relevant slice of the session transcript into one prompt for a single
//! agent. Contextual items are not rendered here — they travel to the
//! gateway verbatim alongside the prompt. Nothing here talks to a gateway.

use crate::collabllm::session::{ConvergenceMetrics, Session};

/// The two individual-analysis lenses used by the perspectives protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerspectiveLens {
    Risk,
    Opportunity,
}

/// Shared individual-analysis prompt (quick, debate, delphi, red-team
/// proposer).
pub fn individual_prompt(query: &str) -> String {
    format!(
        "Analyze the following request and give your best independent answer. \
         Be specific and commit to a recommendation.\n\nRequest: {}",
        query
    )
}

/// Lens-specific individual prompt for the perspectives protocol.
pub fn perspective_prompt(query: &str, lens: PerspectiveLens) -> String {
    let framing = match lens {
        PerspectiveLens::Risk => {
            "Examine this request through a risk lens: failure modes, hidden costs, \
             operational burden, and what could go wrong. End with the safest viable path."
        }
        PerspectiveLens::Opportunity => {
            "Examine this request through an opportunity lens: upside, leverage, \
             simplifications, and what becomes possible. End with the most promising path."
        }
    };
    format!("{}\n\nRequest: {}", framing, query)
}

/// Debate round 1: critique the other agent's analysis.
pub fn critique_prompt(query: &str, other_name: &str, other_analysis: &str) -> String {
    format!(
        "The original request was: {}\n\n\
         {} answered:\n{}\n\n\
         Critique this answer. Identify weak assumptions, missing considerations, \
         and anything you would change. Acknowledge points that hold up.",
        query, other_name, other_analysis
    )
}

/// Debate round ≥2: rebut the critique of your position.
pub fn rebuttal_prompt(query: &str, own_position: &str, other_name: &str, critique: &str) -> String {
    format!(
        "The original request was: {}\n\n\
         Your position so far:\n{}\n\n\
         {} responded:\n{}\n\n\
         Address this critique point by point. Concede what is valid, refute what \
         is not, and restate your position, revised where warranted.",
        query, own_position, other_name, critique
    )
}

/// Red-team round 1: the challenger stress-tests the proposal.
pub fn challenge_prompt(query: &str, proposer_name: &str, proposal: &str) -> String {
    format!(
        "The original request was: {}\n\n\
         {} proposed:\n{}\n\n\
         You are the red team. Attack this proposal: find failure modes, edge cases, \
         security and scaling problems, and unstated assumptions. Be adversarial but concrete.",
        query, proposer_name, proposal
    )
}

/// Red-team round 2: the proposer defends and revises.
pub fn defense_prompt(query: &str, proposal: &str, challenger_name: &str, challenge: &str) -> String {
    format!(
        "The original request was: {}\n\n\
         Your proposal:\n{}\n\n\
         {} challenged it:\n{}\n\n\
         Defend your proposal where the challenge misses, and revise it where the \
         challenge lands. Produce the strengthened version.",
        query, proposal, challenger_name, challenge
    )
}

/// Perspectives: cross-review of the other lens's analysis.
pub fn cross_review_prompt(query: &str, other_name: &str, other_analysis: &str) -> String {
    format!(
        "The original request was: {}\n\n\
         {} examined it through the opposite lens and wrote:\n{}\n\n\
         Review that analysis from your own lens: where does it change your view, \
         and where does your lens reveal something it missed?",
        query, other_name, other_analysis
    )
}

/// Delphi: the facilitator's opinion-free summary with a self-reported score.
pub fn facilitator_prompt(query: &str, positions: &[(String, String)]) -> String {
    let mut prompt = format!(
        "You are facilitating a consensus process on: {}\n\nCurrent positions:\n",
        query
    );
    for (name, position) in positions {
        prompt.push_str(&format!("{}:\n{}\n\n", name, position));
    }
    prompt.push_str(
        "Summarize where the positions agree and where they still differ. Offer no \
         opinion of your own. End with a line of the form CONVERGENCE_SCORE: <0-10> \
         rating how close the positions are to consensus.",
    );
    prompt
}

/// Delphi: refine a position given the facilitator's summary.
pub fn refine_prompt(query: &str, own_position: &str, facilitator_summary: &str) -> String {
    format!(
        "The original request was: {}\n\n\
         Your current position:\n{}\n\n\
         The facilitator summarized the discussion:\n{}\n\n\
         Refine your position in light of the summary. Move toward the other \
         position where the summary shows your differences are not substantive; \
         hold firm where they are.",
        query, own_position, facilitator_summary
    )
}

/// The consolidated synthesis prompt built from the full session transcript.
pub fn synthesis_prompt(session: &Session) -> String {
    let mut prompt = format!(
        "Produce one unified recommendation for the following request, \
         synthesizing everything below into a single coherent answer.\n\n\
         Request: {}\n",
        session.query
    );

    prompt.push_str("\nIndividual analyses:\n");
    for participant in &session.participants {
        if let Some(response) = session.responses.get(&participant.agent_id) {
            if !response.content.is_empty() {
                prompt.push_str(&format!(
                    "{}:\n{}\n\n",
                    participant.display_name, response.content
                ));
            }
        }
    }

    if !session.discussion_rounds.is_empty() {
        prompt.push_str("Discussion:\n");
        for round in &session.discussion_rounds {
            for (agent_id, text) in &round.contributions {
                let role = round
                    .roles
                    .get(agent_id)
                    .map(|r| r.as_str())
                    .unwrap_or("participant");
                prompt.push_str(&format!(
                    "[round {}] {} ({}):\n{}\n\n",
                    round.round,
                    session.display_name(agent_id),
                    role,
                    text
                ));
            }
        }
    }

    if let Some(metrics) = session.convergence_history.last() {
        prompt.push_str(&render_convergence_status(metrics));
    }

    prompt.push_str(
        "Write the final recommendation. Where the agents still disagree, weigh \
         both sides and make the call.",
    );
    prompt
}

fn render_convergence_status(metrics: &ConvergenceMetrics) -> String {
    format!(
        "Convergence status after round {}: agreement ratio {:.2}, overall \
         convergence {:.2} ({:?}).\n\n",
        metrics.round,
        metrics.agreement_ratio,
        metrics.overall_convergence,
        metrics.recommendation
    )
}
