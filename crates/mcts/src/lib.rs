//! Tree algorithms for AlphaZero-style search.
//!
//! The tree is a flat arena; callers drive a search one simulation at a time
//! (select, evaluate, expand, backup) so evaluations can be batched across
//! many trees.

// Module declarations
mod backup;
mod config;
mod decision;
mod error;
mod evaluation;
mod expansion;
mod gumbel;
mod noise;
mod search_result;
mod selection;
mod tree;

// Public exports
pub use backup::backup;
pub use config::{ActionDecision, GumbelParams, MctsConfig, RootNoise};
pub use decision::{select_child_by_max_count, select_child_by_softmax_count};
pub use error::{MctsError, Result};
pub use evaluation::{latent_candidates, single_step_candidates};
pub use expansion::{expand, rank_candidates, ActionCandidate};
pub use gumbel::{HalvingPhase, SequentialHalving};
pub use noise::{add_noise_to_children, sample_dirichlet, sample_gumbel};
pub use search_result::SearchResult;
pub use selection::{descend, select};
pub use tree::{oriented_value, NodeId, SearchNode, SearchTree, TreeExtraData};
