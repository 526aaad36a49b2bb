use crate::tree::{oriented_value, NodeId, SearchTree};

/// Backup value from leaf to root
///
/// `value` is given from player one's point of view. Each node on the path
/// stores its mean from the side of its own player to move, so the value is
/// re-oriented per node rather than negated blindly per ply.
pub fn backup(tree: &mut SearchTree, path: &[NodeId], value: f32) {
    for &node_id in path.iter().rev() {
        let node = tree.node_mut(node_id);
        let v = oriented_value(value, node.to_play);
        node.add(v);
    }
}
