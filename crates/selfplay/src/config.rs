use zeroplay_mcts::MctsConfig;

use crate::error::{Result, SelfPlayError};

/// Configuration for the self-play generator
#[derive(Debug, Clone)]
pub struct SelfPlayConfig {
    /// Episodes played side by side, one actor each
    pub num_parallel_games: usize,

    /// CPU worker threads (the pool is at least as large as `num_devices`)
    pub num_threads: usize,

    /// Network replicas, one GPU worker each
    pub num_devices: usize,

    pub mcts: MctsConfig,

    /// Resign when both root and chosen values fall below this
    pub resign_threshold: f32,

    /// Fraction of episodes played out without resignation
    pub disable_resign_ratio: f32,

    /// Base seed for the actors' RNGs; random when unset
    pub seed: Option<u64>,
}

impl SelfPlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel_games(mut self, n: usize) -> Self {
        self.num_parallel_games = n;
        self
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn with_devices(mut self, n: usize) -> Self {
        self.num_devices = n;
        self
    }

    pub fn with_mcts(mut self, mcts: MctsConfig) -> Self {
        self.mcts = mcts;
        self
    }

    pub fn with_resign(mut self, threshold: f32, disable_ratio: f32) -> Self {
        self.resign_threshold = threshold;
        self.disable_resign_ratio = disable_ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Worker threads to spawn: every replica needs its own GPU worker
    pub fn total_threads(&self) -> usize {
        self.num_threads.max(self.num_devices)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_parallel_games == 0 {
            return Err(SelfPlayError::Config("num_parallel_games must be positive"));
        }
        if self.num_devices == 0 {
            return Err(SelfPlayError::Config("num_devices must be positive"));
        }
        if self.num_threads == 0 {
            return Err(SelfPlayError::Config("num_threads must be positive"));
        }
        if !(0.0..=1.0).contains(&self.disable_resign_ratio) {
            return Err(SelfPlayError::Config(
                "disable_resign_ratio must be within [0, 1]",
            ));
        }
        if self.resign_threshold.is_nan() {
            return Err(SelfPlayError::Config("resign_threshold must be a number"));
        }
        self.mcts.validate()?;
        Ok(())
    }
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            num_parallel_games: 32,
            num_threads: 4,
            num_devices: 1,
            mcts: MctsConfig::default(),
            resign_threshold: -0.9,
            disable_resign_ratio: 0.1,
            seed: None,
        }
    }
}
