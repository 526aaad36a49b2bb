use std::cmp::Ordering;

use zeroplay_core::Action;

use crate::tree::{NodeId, SearchNode, SearchTree};

/// A child to be created by expansion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionCandidate {
    pub action: Action,
    pub policy: f32,
    pub policy_logit: f32,
}

impl ActionCandidate {
    pub fn new(action: Action, policy: f32, policy_logit: f32) -> Self {
        Self {
            action,
            policy,
            policy_logit,
        }
    }
}

/// Sort candidates by prior, highest first, ties by ascending action id
pub fn rank_candidates(candidates: &mut [ActionCandidate]) {
    candidates.sort_by(|a, b| {
        b.policy
            .partial_cmp(&a.policy)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.action.id().cmp(&b.action.id()))
    });
}

/// Expand `leaf` with one child per candidate, in candidate order
pub fn expand(tree: &mut SearchTree, leaf: NodeId, candidates: &[ActionCandidate]) {
    tree.allocate_children(
        leaf,
        candidates
            .iter()
            .map(|c| SearchNode::new_child(c.action, c.policy, c.policy_logit)),
    );
}
