//! One self-play episode driven by MCTS, one simulation per scheduler round.
//!
//! The scheduler calls [`ZeroActor::before_nn_evaluation`] in a CPU phase,
//! evaluates the whole batch in the following GPU phase and hands the output
//! back through [`ZeroActor::after_nn_evaluation`] in the next CPU phase.

use rand::rngs::StdRng;
use rand::Rng;
use zeroplay_core::{Action, Environment, Rotation};
use zeroplay_mcts::{
    add_noise_to_children, backup, descend, expand, latent_candidates, select,
    select_child_by_max_count, select_child_by_softmax_count, single_step_candidates,
    ActionDecision, MctsConfig, MctsError, NodeId, SearchNode, SearchResult, SearchTree,
    SequentialHalving,
};
use zeroplay_nn::{InferenceKind, InferenceRequest, Network, NetworkOutput};

use crate::data::GameRecord;
use crate::error::{Result, SelfPlayError};

/// Where the current search stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Ready to select the next leaf
    Selecting,
    /// A request is queued and waits for the batched call
    AwaitingEval,
    /// Budget spent, an action node has been chosen
    Decided,
}

/// A request this actor placed into a replica's batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEval {
    /// Index into the batch's outputs
    pub slot: usize,
    pub kind: InferenceKind,
    /// Scheduler round the request was issued in
    pub round: u64,
}

/// Resign only when enabled and both values, seen by the player choosing
/// the action, are strictly below the threshold
pub fn should_resign(enabled: bool, threshold: f32, root_value: f32, action_value: f32) -> bool {
    enabled && root_value < threshold && action_value < threshold
}

pub struct ZeroActor<E: Environment> {
    env: E,
    config: MctsConfig,
    tree: SearchTree,
    path: Vec<NodeId>,
    phase: SearchPhase,
    pending: Option<PendingEval>,
    chosen: Option<NodeId>,
    halving: Option<SequentialHalving>,
    enable_resign: bool,
    disable_resign_ratio: f32,
    distributions: Vec<String>,
    rng: StdRng,
}

impl<E: Environment> ZeroActor<E> {
    /// Create an actor with a fresh episode
    ///
    /// `max_branching` bounds the children of any node (the network's action
    /// size); the tree arena is sized from it once.
    pub fn new(
        env: E,
        config: MctsConfig,
        max_branching: usize,
        disable_resign_ratio: f32,
        rng: StdRng,
    ) -> Self {
        let tree = SearchTree::new(config.num_simulations, max_branching);
        let halving = config
            .use_gumbel()
            .then(|| SequentialHalving::new(config.gumbel, config.num_simulations));
        let mut actor = Self {
            env,
            config,
            tree,
            path: Vec::new(),
            phase: SearchPhase::Selecting,
            pending: None,
            chosen: None,
            halving,
            enable_resign: true,
            disable_resign_ratio,
            distributions: Vec::new(),
            rng,
        };
        actor.reset();
        actor
    }

    /// Start a new episode
    pub fn reset(&mut self) {
        self.env.reset();
        self.distributions.clear();
        self.enable_resign = self.rng.gen::<f32>() >= self.disable_resign_ratio;
        self.reset_search();
    }

    /// Start a new search from the current position
    pub fn reset_search(&mut self) {
        self.tree.reset(self.env.turn());
        self.path.clear();
        self.phase = SearchPhase::Selecting;
        self.pending = None;
        self.chosen = None;
        if let Some(halving) = &mut self.halving {
            halving.reset();
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn pending_eval(&self) -> Option<PendingEval> {
        self.pending
    }

    pub fn enable_resign(&self) -> bool {
        self.enable_resign
    }

    pub fn is_search_done(&self) -> bool {
        self.tree.num_simulations() >= self.config.num_simulations
    }

    /// Select a leaf and queue its evaluation on `network`
    pub fn before_nn_evaluation(&mut self, network: &mut Network, round: u64) -> Result<PendingEval> {
        self.select_path();

        let request = if network.supports_single_step() {
            let env_transition = self.environment_transition();
            InferenceRequest::SingleStep {
                features: env_transition.features(Rotation::None),
            }
        } else if self.tree.root().visit_count == 0 {
            InferenceRequest::Initial {
                features: self.env.features(Rotation::None),
            }
        } else {
            let &[.., parent_id, leaf_id] = self.path.as_slice() else {
                panic!("recurrent request on a path of {} nodes", self.path.len());
            };
            let Some(handle) = self.tree.node(parent_id).extra_data else {
                panic!("node {parent_id} has no latent state");
            };
            let Some(action) = self.tree.node(leaf_id).action else {
                panic!("node {leaf_id} has no action");
            };
            InferenceRequest::Recurrent {
                hidden_state: self.tree.extra_data().get(handle).to_vec(),
                action_features: self.env.action_features(&action, Rotation::None),
            }
        };

        let kind = request.kind();
        let slot = network.submit(request)?;
        let pending = PendingEval { slot, kind, round };
        self.pending = Some(pending);
        self.phase = SearchPhase::AwaitingEval;
        Ok(pending)
    }

    /// Expand and back up the pending leaf with its network output
    pub fn after_nn_evaluation(&mut self, output: &NetworkOutput) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            panic!("network output delivered without a pending request");
        };
        let leaf = self.path.last().copied().unwrap_or(SearchTree::ROOT);
        let is_root = leaf == SearchTree::ROOT;

        match pending.kind {
            InferenceKind::SingleStep => {
                let env_transition = self.environment_transition();
                if env_transition.is_terminal() {
                    backup(&mut self.tree, &self.path, env_transition.eval_score(false));
                } else {
                    let candidates = single_step_candidates(&env_transition, output);
                    expand(&mut self.tree, leaf, &candidates);
                    backup(&mut self.tree, &self.path, output.value);
                }
            }
            InferenceKind::Initial | InferenceKind::Recurrent => {
                let hidden_state = output
                    .hidden_state
                    .clone()
                    .ok_or(SelfPlayError::MissingHiddenState)?;
                let candidates = if is_root {
                    latent_candidates(self.env.turn(), Some(&self.env), output)
                } else {
                    let Some(action) = self.tree.node(leaf).action else {
                        panic!("node {leaf} has no action");
                    };
                    latent_candidates::<E>(action.next_player(), None, output)
                };
                expand(&mut self.tree, leaf, &candidates);
                backup(&mut self.tree, &self.path, output.value);
                let handle = self.tree.extra_data_mut().store(hidden_state);
                self.tree.node_mut(leaf).extra_data = Some(handle);
            }
        }

        if is_root && !self.tree.root().is_leaf() {
            add_noise_to_children(&mut self.tree, SearchTree::ROOT, &self.config.noise, &mut self.rng)?;
            if let Some(halving) = &mut self.halving {
                halving.start(&self.tree);
            }
        } else if let Some(halving) = &mut self.halving {
            halving.update(&self.tree);
        }

        self.phase = SearchPhase::Selecting;
        if self.is_search_done() {
            self.chosen = Some(self.decide_action_node()?);
            self.phase = SearchPhase::Decided;
        }
        Ok(())
    }

    /// Chosen root child of a decided search
    pub fn chosen_node(&self) -> Option<NodeId> {
        self.chosen
    }

    pub fn search_action(&self) -> Option<Action> {
        self.chosen.and_then(|id| self.tree.node(id).action)
    }

    pub fn search_result(&self) -> Result<SearchResult> {
        let chosen = self.chosen.ok_or(SelfPlayError::NotDecided)?;
        Ok(SearchResult::from_tree(&self.tree, chosen)?)
    }

    /// Whether this decided search should end the episode by resignation
    pub fn is_resign(&self, threshold: f32) -> Result<bool> {
        let result = self.search_result()?;
        Ok(should_resign(
            self.enable_resign,
            threshold,
            result.root_value,
            result.action_value,
        ))
    }

    /// Play the decided action and remember its visit distribution
    pub fn commit_action(&mut self) -> Result<Action> {
        let result = self.search_result()?;
        if !self.env.act(&result.action) {
            return Err(SelfPlayError::IllegalAction(result.action));
        }
        self.distributions.push(result.distribution_string());
        Ok(result.action)
    }

    /// Record of the episode so far
    pub fn record(&self, is_resign: bool) -> GameRecord {
        GameRecord::from_environment(&self.env, &self.distributions, is_resign)
    }

    /// Run a whole search synchronously against one network
    pub fn think(&mut self, network: &mut Network) -> Result<Action> {
        self.reset_search();
        while self.phase != SearchPhase::Decided {
            let pending = self.before_nn_evaluation(network, 0)?;
            let outputs = network.infer(pending.kind)?;
            let output = outputs
                .get(pending.slot)
                .ok_or(SelfPlayError::MissingOutput(pending.slot))?;
            self.after_nn_evaluation(output)?;
        }
        self.search_action().ok_or(SelfPlayError::NotDecided)
    }

    /// Board plus a summary of the root and the chosen node
    pub fn display_board(&self) -> String {
        let mut out = self.env.to_string();
        if let Some(action) = self.search_action() {
            out.push_str(&format!(
                "move number: {}, action: {} ({}), player: {}\n",
                self.env.action_history().len(),
                action,
                action.id(),
                action.player().to_char()
            ));
        }
        out.push_str(&format!("  root node info: {}\n", node_summary(self.tree.root())));
        if let Some(chosen) = self.chosen {
            out.push_str(&format!(
                "action node info: {}\n",
                node_summary(self.tree.node(chosen))
            ));
        }
        out
    }

    fn select_path(&mut self) {
        let c_puct = self.config.c_puct;
        let forced = self
            .halving
            .as_ref()
            .and_then(|halving| halving.next_root_child(&self.tree));
        match forced {
            Some(child) => {
                self.path.clear();
                self.path.push(SearchTree::ROOT);
                self.path.push(child);
                descend(&self.tree, c_puct, &mut self.path);
            }
            None => select(&self.tree, c_puct, &mut self.path),
        }
    }

    fn environment_transition(&self) -> E {
        let mut env = self.env.clone();
        for &id in &self.path[1..] {
            if let Some(action) = self.tree.node(id).action {
                env.act(&action);
            }
        }
        env
    }

    fn decide_action_node(&mut self) -> Result<NodeId> {
        let chosen = match self.config.decision {
            ActionDecision::MaxCount => select_child_by_max_count(&self.tree, SearchTree::ROOT)?,
            ActionDecision::SoftmaxCount { temperature } => {
                select_child_by_softmax_count(&self.tree, SearchTree::ROOT, temperature, &mut self.rng)?
            }
            ActionDecision::SequentialHalving => self
                .halving
                .as_mut()
                .and_then(|halving| halving.decide(&self.tree))
                .ok_or(MctsError::NotExpanded(SearchTree::ROOT))?,
        };
        Ok(chosen)
    }
}

fn node_summary(node: &SearchNode) -> String {
    let action = node
        .action
        .map_or_else(|| "-".to_string(), |a| a.to_string());
    format!(
        "action: {}, to play: {}, count: {}, mean: {:.4}, policy: {:.4}, logit: {:.4}, noise: {:.4}",
        action,
        node.to_play.to_char(),
        node.visit_count,
        node.mean,
        node.policy,
        node.policy_logit,
        node.policy_noise
    )
}
