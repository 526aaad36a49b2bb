use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::{MctsError, Result};
use crate::tree::{NodeId, SearchTree};

/// Child of `node` with the most visits, the earliest one on ties
pub fn select_child_by_max_count(tree: &SearchTree, node: NodeId) -> Result<NodeId> {
    let mut best: Option<(NodeId, u32)> = None;
    for child_id in tree.node(node).children() {
        let count = tree.node(child_id).visit_count;
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((child_id, count));
        }
    }
    best.map(|(id, _)| id).ok_or(MctsError::NotExpanded(node))
}

/// Sample a child of `node` proportionally to visits^(1/temperature)
///
/// - temperature = 1: proportional to visits
/// - temperature > 1: more exploration
/// - temperature → 0: approaches argmax
///
/// Falls back to max-count when every child is unvisited or the weights
/// cannot form a distribution.
pub fn select_child_by_softmax_count<R: Rng + ?Sized>(
    tree: &SearchTree,
    node: NodeId,
    temperature: f32,
    rng: &mut R,
) -> Result<NodeId> {
    let children = tree.node(node).children();
    if children.is_empty() {
        return Err(MctsError::NotExpanded(node));
    }

    let max_count = children
        .clone()
        .map(|id| tree.node(id).visit_count)
        .max()
        .unwrap_or(0);
    if max_count == 0 {
        return select_child_by_max_count(tree, node);
    }

    // Scaled by the largest count so small temperatures cannot overflow
    let inv_temp = 1.0f64 / temperature as f64;
    let weights: Vec<f64> = children
        .clone()
        .map(|id| (tree.node(id).visit_count as f64 / max_count as f64).powf(inv_temp))
        .collect();

    match WeightedIndex::new(&weights) {
        Ok(dist) => Ok(children.start + dist.sample(rng)),
        Err(_) => select_child_by_max_count(tree, node),
    }
}
