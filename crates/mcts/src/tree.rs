use std::ops::Range;

use zeroplay_core::{Action, Player};

/// Index of a node inside its tree's arena
pub type NodeId = usize;

/// Re-orient a value given from player one's point of view
pub fn oriented_value(value: f32, player: Player) -> f32 {
    match player {
        Player::One => value,
        Player::Two => -value,
    }
}

/// A single node in the search tree
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Move that led to this node (None for the root)
    pub action: Option<Action>,

    /// Player to move at this node
    pub to_play: Player,

    pub visit_count: u32,

    /// Running mean of backed-up values, from `to_play`'s point of view
    pub mean: f32,

    /// Prior probability from the policy network
    pub policy: f32,

    pub policy_logit: f32,

    /// Root noise mixed into `policy` or added to `policy_logit` (0 if none)
    pub policy_noise: f32,

    /// Handle into [`TreeExtraData`] once this node has a latent state
    pub extra_data: Option<usize>,

    first_child: NodeId,
    num_children: usize,
}

impl SearchNode {
    pub fn new_root(to_play: Player) -> Self {
        Self {
            action: None,
            to_play,
            visit_count: 0,
            mean: 0.0,
            policy: 1.0,
            policy_logit: 0.0,
            policy_noise: 0.0,
            extra_data: None,
            first_child: 0,
            num_children: 0,
        }
    }

    pub fn new_child(action: Action, policy: f32, policy_logit: f32) -> Self {
        Self {
            action: Some(action),
            to_play: action.next_player(),
            visit_count: 0,
            mean: 0.0,
            policy,
            policy_logit,
            policy_noise: 0.0,
            extra_data: None,
            first_child: 0,
            num_children: 0,
        }
    }

    pub fn num_children(&self) -> usize {
        self.num_children
    }

    pub fn is_leaf(&self) -> bool {
        self.num_children == 0
    }

    /// Ids of this node's children, which always form one contiguous block
    pub fn children(&self) -> Range<NodeId> {
        self.first_child..self.first_child + self.num_children
    }

    /// Mean value seen from `player`'s side
    pub fn value_for(&self, player: Player) -> f32 {
        if player == self.to_play {
            self.mean
        } else {
            -self.mean
        }
    }

    /// Add one visit with `value` already oriented to `to_play`
    pub fn add(&mut self, value: f32) {
        self.visit_count += 1;
        self.mean += (value - self.mean) / self.visit_count as f32;
    }
}

/// Append-only store for per-node payloads such as latent states.
///
/// Payloads outlive the node that produced them within one search; they are
/// only reached from that node's descendants through the stored handle.
#[derive(Debug, Default)]
pub struct TreeExtraData {
    hidden_states: Vec<Vec<f32>>,
}

impl TreeExtraData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, hidden_state: Vec<f32>) -> usize {
        self.hidden_states.push(hidden_state);
        self.hidden_states.len() - 1
    }

    pub fn get(&self, handle: usize) -> &[f32] {
        &self.hidden_states[handle]
    }

    pub fn len(&self) -> usize {
        self.hidden_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden_states.is_empty()
    }

    pub fn clear(&mut self) {
        self.hidden_states.clear();
    }
}

/// Search tree backed by a preallocated node arena.
///
/// The arena holds the root plus at most `num_simulations × max_branching`
/// children: every simulation expands at most one leaf. It is reserved once and
/// reused across searches, so no allocation happens while searching.
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    capacity: usize,
    extra_data: TreeExtraData,
}

impl SearchTree {
    pub const ROOT: NodeId = 0;

    pub fn new(num_simulations: u32, max_branching: usize) -> Self {
        let capacity = num_simulations as usize * max_branching;
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(SearchNode::new_root(Player::One));
        Self {
            nodes,
            capacity,
            extra_data: TreeExtraData::new(),
        }
    }

    /// Drop every node and start over with a fresh root
    pub fn reset(&mut self, to_play: Player) {
        self.nodes.clear();
        self.nodes.push(SearchNode::new_root(to_play));
        self.extra_data.clear();
    }

    pub fn root(&self) -> &SearchNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id]
    }

    /// Completed simulations of the current search
    pub fn num_simulations(&self) -> u32 {
        self.root().visit_count
    }

    /// Nodes in use, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Maximum number of non-root nodes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn extra_data(&self) -> &TreeExtraData {
        &self.extra_data
    }

    pub fn extra_data_mut(&mut self) -> &mut TreeExtraData {
        &mut self.extra_data
    }

    /// Allocate `children` as one contiguous block under `parent`.
    ///
    /// # Panics
    ///
    /// If `parent` already has children or the arena would overflow.
    pub fn allocate_children<I>(&mut self, parent: NodeId, children: I)
    where
        I: ExactSizeIterator<Item = SearchNode>,
    {
        assert!(
            self.nodes[parent].is_leaf(),
            "node {parent} is already expanded"
        );
        let count = children.len();
        let first = self.nodes.len();
        assert!(
            first - 1 + count <= self.capacity,
            "search tree arena exhausted: {} + {count} > {}",
            first - 1,
            self.capacity
        );
        self.nodes.extend(children);

        let node = &mut self.nodes[parent];
        node.first_child = first;
        node.num_children = count;
    }
}
