//! Self-play data generation for AlphaZero/MuZero-style training
//!
//! This crate provides:
//! - `ZeroActor`: one episode driven by MCTS, stepped one simulation at a time
//! - `ActorGroup`: a barrier-phased worker pool that batches the actors'
//!   network requests per replica
//! - `GameRecord` and `RecordSink`: the one-line episode format and its output
//!
//! # Example
//!
//! ```no_run
//! use zeroplay_core::TicTacToe;
//! use zeroplay_mcts::MctsConfig;
//! use zeroplay_nn::{Network, UniformNetwork};
//! use zeroplay_selfplay::{ActorGroup, RecordSink, SelfPlayConfig};
//!
//! # fn main() -> zeroplay_selfplay::Result<()> {
//! let config = SelfPlayConfig::default()
//!     .with_parallel_games(8)
//!     .with_mcts(MctsConfig::default().with_simulations(50).with_dirichlet_noise(0.3, 0.25));
//!
//! let networks = vec![Network::single_step(UniformNetwork::new(9))];
//! let group = ActorGroup::new(config, TicTacToe::new, networks, RecordSink::stdout())?;
//! group.run()
//! # }
//! ```

mod actor;
mod config;
mod data;
mod error;
mod scheduler;
mod sink;

// Re-export public API
pub use actor::{should_resign, PendingEval, SearchPhase, ZeroActor};
pub use config::SelfPlayConfig;
pub use data::GameRecord;
pub use error::{Result, SelfPlayError};
pub use scheduler::{ActorGroup, Batch, SharedSchedulerState};
pub use sink::RecordSink;
