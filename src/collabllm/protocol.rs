//! Protocol descriptors.
//!
//! Each of the five collaboration strategies is described by a small
//! [`ProtocolDescriptor`] — which agents the individual phase addresses and
//! what shape the discussion phase takes — so the protocol runner keeps one
//! phase state machine instead of five parallel code paths.

use crate::collabllm::session::CollabStrategy;

/// Who the individual phase addresses, and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndividualPlan {
    /// Both participants, identical prompt.
    BothSamePrompt,
    /// Both participants, one risk lens and one opportunity lens.
    BothDistinctLens,
    /// Only the first participant (the proposer).
    ProposerOnly,
}

/// Shape of the discussion phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscussionPlan {
    /// No discussion at all.
    None,
    /// Up to N critique/rebuttal rounds, convergence-scored between rounds.
    Iterative,
    /// Exactly two dependent rounds: challenge, then defense.
    ChallengeDefense,
    /// One combined round of parallel cross-review.
    CrossReview,
    /// Up to N facilitator-summary + parallel-refinement iterations.
    Facilitated,
}

/// Static description of one strategy's phase sequence.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolDescriptor {
    pub strategy: CollabStrategy,
    pub individual: IndividualPlan,
    pub discussion: DiscussionPlan,
}

impl ProtocolDescriptor {
    pub fn for_strategy(strategy: CollabStrategy) -> Self {
        match strategy {
            CollabStrategy::Quick => Self {
                strategy,
                individual: IndividualPlan::BothSamePrompt,
                discussion: DiscussionPlan::None,
            },
            CollabStrategy::Debate => Self {
                strategy,
                individual: IndividualPlan::BothSamePrompt,
                discussion: DiscussionPlan::Iterative,
            },
            CollabStrategy::RedTeam => Self {
                strategy,
                individual: IndividualPlan::ProposerOnly,
                discussion: DiscussionPlan::ChallengeDefense,
            },
            CollabStrategy::Perspectives => Self {
                strategy,
                individual: IndividualPlan::BothDistinctLens,
                discussion: DiscussionPlan::CrossReview,
            },
            CollabStrategy::Delphi => Self {
                strategy,
                individual: IndividualPlan::BothSamePrompt,
                discussion: DiscussionPlan::Facilitated,
            },
        }
    }

    /// Whether this strategy has a discussion phase at all.
    pub fn has_discussion(&self) -> bool {
        self.discussion != DiscussionPlan::None
    }
}
