use std::cmp::Ordering;

use crate::config::GumbelParams;
use crate::tree::{NodeId, SearchTree};

/// Where a sequential-halving search currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalvingPhase {
    /// Root not expanded yet, no candidates
    Idle,

    /// Survivors are visited until each reaches `target`
    Running { phase: usize, target: u32 },
}

/// Gumbel sequential halving over the root's children
///
/// The root edge of every simulation is chosen here; below it the search
/// falls back to PUCT. Survivors are kept ranked, best first.
#[derive(Debug, Clone)]
pub struct SequentialHalving {
    params: GumbelParams,
    budget: u32,
    num_phases: usize,
    phase: HalvingPhase,
    candidates: Vec<NodeId>,
}

impl SequentialHalving {
    pub fn new(params: GumbelParams, budget: u32) -> Self {
        Self {
            params,
            budget,
            num_phases: 1,
            phase: HalvingPhase::Idle,
            candidates: Vec::with_capacity(params.sample_size),
        }
    }

    pub fn reset(&mut self) {
        self.phase = HalvingPhase::Idle;
        self.num_phases = 1;
        self.candidates.clear();
    }

    pub fn phase(&self) -> HalvingPhase {
        self.phase
    }

    /// Surviving root children, best ranked first
    pub fn candidates(&self) -> &[NodeId] {
        &self.candidates
    }

    /// Pick the initial candidates once the root has been expanded (and noised)
    pub fn start(&mut self, tree: &SearchTree) {
        let mut children: Vec<NodeId> = tree.root().children().collect();
        // Stable: equal logits keep block order
        children.sort_by(|&a, &b| {
            tree.node(b)
                .policy_logit
                .partial_cmp(&tree.node(a).policy_logit)
                .unwrap_or(Ordering::Equal)
        });
        children.truncate(self.params.sample_size.min(children.len()));

        self.candidates = children;
        if self.candidates.is_empty() {
            self.phase = HalvingPhase::Idle;
            return;
        }

        let m = self.candidates.len();
        self.num_phases = (m as f32).log2().ceil().max(1.0) as usize;
        self.phase = HalvingPhase::Running {
            phase: 0,
            target: self.visits_per_phase(),
        };
    }

    /// Root edge for the next simulation: the survivor with the fewest
    /// visits, the better ranked one on ties
    pub fn next_root_child(&self, tree: &SearchTree) -> Option<NodeId> {
        if self.phase == HalvingPhase::Idle {
            return None;
        }
        let mut best: Option<(NodeId, u32)> = None;
        for &id in &self.candidates {
            let visits = tree.node(id).visit_count;
            if best.map_or(true, |(_, best_visits)| visits < best_visits) {
                best = Some((id, visits));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Advance after a backup: once every survivor reached the target,
    /// keep the better half and raise the target
    pub fn update(&mut self, tree: &SearchTree) {
        let HalvingPhase::Running { phase, target } = self.phase else {
            return;
        };
        if self
            .candidates
            .iter()
            .any(|&id| tree.node(id).visit_count < target)
        {
            return;
        }

        self.rerank(tree);
        let keep = (self.candidates.len() / 2).max(1);
        self.candidates.truncate(keep);

        self.phase = HalvingPhase::Running {
            phase: phase + 1,
            target: target + self.visits_per_phase(),
        };
    }

    /// Final choice: the best survivor after a last re-rank
    pub fn decide(&mut self, tree: &SearchTree) -> Option<NodeId> {
        self.rerank(tree);
        self.candidates.first().copied()
    }

    /// `logit + σ(q̂)` with `σ(q̂) = (c_visit + max_visits) · c_scale · q̂`
    pub fn score(&self, tree: &SearchTree, child: NodeId) -> f32 {
        let root = tree.root();
        let max_visits = root
            .children()
            .map(|id| tree.node(id).visit_count)
            .max()
            .unwrap_or(0);

        let node = tree.node(child);
        let value = if node.visit_count == 0 {
            root.mean
        } else {
            node.value_for(root.to_play)
        };
        let q_hat = (value + 1.0) / 2.0;
        let sigma = (self.params.c_visit + max_visits as f32) * self.params.c_scale * q_hat;

        node.policy_logit + sigma
    }

    fn visits_per_phase(&self) -> u32 {
        let per_phase = self.budget as usize / (self.num_phases * self.candidates.len().max(1));
        per_phase.max(1) as u32
    }

    fn rerank(&mut self, tree: &SearchTree) {
        let mut scored: Vec<(NodeId, f32)> = self
            .candidates
            .iter()
            .map(|&id| (id, self.score(tree, id)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        self.candidates = scored.into_iter().map(|(id, _)| id).collect();
    }
}
