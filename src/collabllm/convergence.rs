//! Heuristic convergence scoring for discussion rounds.
//!
//! The scorer is deterministic: the same two-round transcript always yields
//! the same metrics and recommendation. It combines a keyword-based
//! agreement ratio with a lexical-overlap measure of how stable each agent's
//! position is between consecutive rounds. This is a cheap textual heuristic,
//! not an LLM judgment.

use crate::collabllm::session::{
    ConvergenceMetrics, ConvergenceRecommendation, DiscussionRound,
};
use std::collections::{HashMap, HashSet};

/// Phrases that signal an agent accepting the other's points.
const AGREEMENT_SIGNALS: &[&str] = &[
    "agree",
    "concede",
    "valid point",
    "correct",
    "accept",
    "well-taken",
    "makes sense",
    "aligned",
];

/// Phrases that signal an agent holding or contesting ground.
const DISAGREEMENT_SIGNALS: &[&str] = &[
    "disagree",
    "however",
    "incorrect",
    "wrong",
    "reject",
    "maintain",
    "defend",
    "flawed",
];

/// Agreement ratio threshold for `Converged`.
const CONVERGED_RATIO: f32 = 0.7;
/// Stability threshold for `Converged`.
const CONVERGED_STABILITY: f32 = 0.8;
/// Stability floor below which a non-improving discussion counts as stalled.
const STALLED_STABILITY: f32 = 0.3;

/// Lexical-overlap similarity between two texts.
///
/// Texts are tokenized to lower-cased words longer than 3 characters
/// (punctuation trimmed) and compared as sets:
/// `|intersection| / max(|A|, |B|)`. Two empty sets are identical (1.0);
/// exactly one empty set means no similarity (0.0).
pub fn text_similarity(a: &str, b: &str) -> f32 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let larger = set_a.len().max(set_b.len());
    intersection as f32 / larger as f32
}

fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() > 3)
        .collect()
}

fn count_signals(text: &str, signals: &[&str]) -> usize {
    let lowered = text.to_lowercase();
    signals
        .iter()
        .map(|signal| lowered.matches(signal).count())
        .sum()
}

/// Parse a facilitator's self-reported `CONVERGENCE_SCORE: <0-10>` marker,
/// mapped to `0.0..=1.0`. `None` when no marker is present or its value does
/// not parse.
pub fn parse_reported_score(text: &str) -> Option<f32> {
    let upper = text.to_uppercase();
    let marker = "CONVERGENCE_SCORE:";
    let start = upper.find(marker)? + marker.len();
    let tail = &text[start..];
    let token = tail
        .trim_start()
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()?;
    let value: f32 = token.parse().ok()?;
    Some((value / 10.0).clamp(0.0, 1.0))
}

/// Score the latest discussion round.
///
/// - `latest`: the round just completed.
/// - `previous`: the round before it, when one exists, for stability
///   comparison.
/// - `history`: convergence records appended before this one; the stall rule
///   compares against exactly the most recent record.
pub fn score_round(
    latest: &DiscussionRound,
    previous: Option<&DiscussionRound>,
    history: &[ConvergenceMetrics],
) -> ConvergenceMetrics {
    let mut agreement = 0usize;
    let mut disagreement = 0usize;
    for text in latest.contributions.values() {
        agreement += count_signals(text, AGREEMENT_SIGNALS);
        disagreement += count_signals(text, DISAGREEMENT_SIGNALS);
    }

    let agreement_ratio = if agreement + disagreement == 0 {
        0.5
    } else {
        agreement as f32 / (agreement + disagreement) as f32
    };

    let mut position_stability: HashMap<String, f32> = HashMap::new();
    if let Some(prior) = previous {
        for (agent_id, text) in &latest.contributions {
            if let Some(prior_text) = prior.contributions.get(agent_id) {
                position_stability
                    .insert(agent_id.clone(), text_similarity(text, prior_text));
            }
        }
    }
    let avg_stability = if position_stability.is_empty() {
        0.5
    } else {
        position_stability.values().sum::<f32>() / position_stability.len() as f32
    };

    let overall_convergence = 0.6 * agreement_ratio + 0.4 * avg_stability;

    let recommendation = if agreement_ratio >= CONVERGED_RATIO
        && avg_stability >= CONVERGED_STABILITY
    {
        ConvergenceRecommendation::Converged
    } else if history.len() >= 2
        && history
            .last()
            .map(|prev| prev.overall_convergence >= overall_convergence)
            .unwrap_or(false)
        && avg_stability < STALLED_STABILITY
    {
        ConvergenceRecommendation::Stalled
    } else {
        ConvergenceRecommendation::Continue
    };

    log::debug!(
        "convergence round {}: ratio={:.2} stability={:.2} overall={:.2} -> {:?}",
        latest.round,
        agreement_ratio,
        avg_stability,
        overall_convergence,
        recommendation
    );

    ConvergenceMetrics {
        round: latest.round,
        agreement_signals: agreement,
        disagreement_signals: disagreement,
        agreement_ratio,
        position_stability,
        overall_convergence,
        recommendation,
    }
}
