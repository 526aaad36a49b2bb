use crate::tree::{NodeId, SearchTree};

/// Select a leaf using the PUCT formula
///
/// Clears `path` and fills it with the node ids from the root down to the
/// selected leaf (a node with no visits or no children).
pub fn select(tree: &SearchTree, c_puct: f32, path: &mut Vec<NodeId>) {
    path.clear();
    path.push(SearchTree::ROOT);
    descend(tree, c_puct, path);
}

/// Continue a selection from the last node of `path`
pub fn descend(tree: &SearchTree, c_puct: f32, path: &mut Vec<NodeId>) {
    let Some(&start) = path.last() else {
        return;
    };
    let mut current_id = start;

    loop {
        let node = tree.node(current_id);

        // Stop at an unvisited node or a node that was never expanded
        if node.visit_count == 0 || node.is_leaf() {
            return;
        }

        let sqrt_parent = (node.visit_count as f32).sqrt();

        // Strict comparison keeps the first (highest prior) child on ties
        let mut best_child = node.children().start;
        let mut best_score = f32::NEG_INFINITY;
        for child_id in node.children() {
            let score = puct_value(tree, current_id, child_id, sqrt_parent, c_puct);
            if score > best_score {
                best_score = score;
                best_child = child_id;
            }
        }

        path.push(best_child);
        current_id = best_child;
    }
}

/// Calculate PUCT value for a child
///
/// PUCT(s, a) = Q(s, a) + c_puct * P(s, a) * sqrt(N(s)) / (1 + N(s, a))
///
/// Q is the child's mean seen from the parent's player to move, 0 when the
/// child is unvisited.
pub(crate) fn puct_value(
    tree: &SearchTree,
    parent_id: NodeId,
    child_id: NodeId,
    sqrt_parent: f32,
    c_puct: f32,
) -> f32 {
    let parent = tree.node(parent_id);
    let child = tree.node(child_id);

    let q = if child.visit_count == 0 {
        0.0
    } else {
        child.value_for(parent.to_play)
    };

    let u = c_puct * child.policy * sqrt_parent / (1.0 + child.visit_count as f32);

    q + u
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SearchNode;
    use zeroplay_core::{Action, Player};

    fn tree_with_children(priors: &[f32]) -> SearchTree {
        let mut tree = SearchTree::new(4, priors.len());
        tree.allocate_children(
            SearchTree::ROOT,
            priors
                .iter()
                .enumerate()
                .map(|(i, &p)| SearchNode::new_child(Action::new(i, Player::One), p, 0.0)),
        );
        tree
    }

    #[test]
    fn test_puct_value_unvisited() {
        let mut tree = tree_with_children(&[0.5]);
        tree.node_mut(SearchTree::ROOT).visit_count = 100;

        let puct = puct_value(&tree, 0, 1, 10.0, 1.5);

        // PUCT = 0 + 1.5 * 0.5 * sqrt(100) / (1 + 0) = 7.5
        assert!((puct - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_puct_value_visited_uses_parent_perspective() {
        let mut tree = tree_with_children(&[0.5]);
        tree.node_mut(SearchTree::ROOT).visit_count = 100;

        // Child mean is from player two's side; player one sees the opposite.
        let child = tree.node_mut(1);
        child.visit_count = 10;
        child.mean = -0.5;

        let puct = puct_value(&tree, 0, 1, 10.0, 1.5);

        // Q = 0.5, U = 1.5 * 0.5 * 10 / 11 ≈ 0.682
        assert!((puct - 1.182).abs() < 0.01);
    }

    #[test]
    fn unvisited_root_is_the_leaf() {
        let tree = SearchTree::new(1, 4);
        let mut path = Vec::new();
        select(&tree, 1.5, &mut path);
        assert_eq!(path, vec![SearchTree::ROOT]);
    }

    #[test]
    fn picks_highest_prior_when_all_unvisited() {
        let mut tree = tree_with_children(&[0.2, 0.7, 0.1]);
        tree.node_mut(SearchTree::ROOT).visit_count = 1;

        let mut path = Vec::new();
        select(&tree, 1.5, &mut path);
        assert_eq!(path, vec![0, 2]);
    }

    #[test]
    fn ties_keep_first_child() {
        let mut tree = tree_with_children(&[0.5, 0.5]);
        tree.node_mut(SearchTree::ROOT).visit_count = 1;

        let mut path = Vec::new();
        select(&tree, 1.0, &mut path);
        assert_eq!(path, vec![0, 1]);
    }

    #[test]
    fn descends_through_visited_nodes() {
        let mut tree = tree_with_children(&[0.9, 0.1]);
        tree.node_mut(SearchTree::ROOT).visit_count = 2;
        tree.node_mut(1).visit_count = 1;
        tree.allocate_children(
            1,
            (0..2).map(|i| SearchNode::new_child(Action::new(i, Player::Two), 0.5, 0.0)),
        );

        let mut path = Vec::new();
        select(&tree, 1.5, &mut path);
        assert_eq!(path, vec![0, 1, 3]);
    }
}
