use zeroplay_core::Action;

use crate::error::{MctsError, Result};
use crate::tree::{NodeId, SearchTree};

/// Result of MCTS search
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Action of the decided root child
    pub action: Action,

    /// Mean value of the root, for the player to move at the root
    pub root_value: f32,

    /// Mean value of the decided child, for the player to move at the root
    pub action_value: f32,

    /// Number of simulations actually run
    pub num_simulations_run: u32,

    /// Visit counts of the root children in block order: (action id, visit_count)
    pub root_visit_counts: Vec<(usize, u32)>,
}

impl SearchResult {
    /// Summarize `tree` once `chosen` has been decided at the root
    pub fn from_tree(tree: &SearchTree, chosen: NodeId) -> Result<Self> {
        let root = tree.root();
        let node = tree.node(chosen);
        let action = node.action.ok_or(MctsError::NotExpanded(SearchTree::ROOT))?;

        let root_visit_counts = root
            .children()
            .filter_map(|id| {
                let child = tree.node(id);
                child.action.map(|a| (a.id(), child.visit_count))
            })
            .collect();

        Ok(Self {
            action,
            root_value: root.mean,
            action_value: node.value_for(root.to_play),
            num_simulations_run: tree.num_simulations(),
            root_visit_counts,
        })
    }

    /// Get the visit count for a specific action id
    pub fn visit_count_for_action(&self, action_id: usize) -> u32 {
        self.root_visit_counts
            .iter()
            .find(|(a, _)| *a == action_id)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    /// Get the total number of visits to the root's children
    pub fn total_visits(&self) -> u32 {
        self.root_visit_counts.iter().map(|(_, v)| v).sum()
    }

    /// `id:count` pairs of visited children, empty when every visit went to
    /// the decided action
    pub fn distribution_string(&self) -> String {
        if self.visit_count_for_action(self.action.id()) == self.total_visits() {
            return String::new();
        }
        self.root_visit_counts
            .iter()
            .filter(|(_, v)| *v > 0)
            .map(|(a, v)| format!("{a}:{v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}
