use crate::error::{MctsError, Result};

/// How the final action is chosen once the search budget is spent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ActionDecision {
    /// Most visited child, earliest on ties
    #[default]
    MaxCount,

    /// Sample a child with probability proportional to count^(1/T)
    SoftmaxCount { temperature: f32 },

    /// Gumbel sequential halving over the root candidates
    SequentialHalving,
}

/// Noise applied once to the root's children right after expansion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RootNoise {
    #[default]
    None,

    /// Mix Dirichlet noise into the priors (0.3 for chess, 0.03 for Go)
    Dirichlet { alpha: f32, epsilon: f32 },

    /// Add Gumbel(0, 1) samples to the logits
    Gumbel,
}

/// Gumbel sequential halving parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GumbelParams {
    /// Number of root candidates considered (m)
    pub sample_size: usize,
    pub c_visit: f32,
    pub c_scale: f32,
}

impl Default for GumbelParams {
    fn default() -> Self {
        Self {
            sample_size: 16,
            c_visit: 50.0,
            c_scale: 1.0,
        }
    }
}

/// Configuration for MCTS search
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Number of simulations to run per move
    pub num_simulations: u32,

    /// PUCT exploration constant (typically 1.0-5.0)
    pub c_puct: f32,

    pub decision: ActionDecision,

    pub noise: RootNoise,

    pub gumbel: GumbelParams,
}

impl MctsConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of simulations
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Set PUCT exploration constant
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    pub fn with_decision(mut self, decision: ActionDecision) -> Self {
        self.decision = decision;
        self
    }

    /// Sample moves proportionally to count^(1/T)
    pub fn with_temperature(mut self, t: f32) -> Self {
        self.decision = ActionDecision::SoftmaxCount { temperature: t };
        self
    }

    /// Enable Dirichlet noise with given parameters
    pub fn with_dirichlet_noise(mut self, alpha: f32, epsilon: f32) -> Self {
        self.noise = RootNoise::Dirichlet { alpha, epsilon };
        self
    }

    /// Gumbel search: noisy logits at the root and sequential halving
    pub fn with_gumbel(self, params: GumbelParams) -> Self {
        self.with_gumbel_params(params)
            .with_gumbel_noise()
            .with_decision(ActionDecision::SequentialHalving)
    }

    /// Add Gumbel(0, 1) samples to the root logits; the decision is untouched
    pub fn with_gumbel_noise(mut self) -> Self {
        self.noise = RootNoise::Gumbel;
        self
    }

    pub fn with_gumbel_params(mut self, params: GumbelParams) -> Self {
        self.gumbel = params;
        self
    }

    pub fn without_noise(mut self) -> Self {
        self.noise = RootNoise::None;
        self
    }

    pub fn use_gumbel(&self) -> bool {
        self.decision == ActionDecision::SequentialHalving
    }

    /// Reject values the search cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(MctsError::InvalidConfig("num_simulations must be positive"));
        }
        if !is_positive(self.c_puct) {
            return Err(MctsError::InvalidConfig("c_puct must be positive"));
        }
        if let ActionDecision::SoftmaxCount { temperature } = self.decision {
            if !is_positive(temperature) {
                return Err(MctsError::InvalidConfig("temperature must be positive"));
            }
        }
        if let RootNoise::Dirichlet { alpha, epsilon } = self.noise {
            if !is_positive(alpha) {
                return Err(MctsError::InvalidConfig("dirichlet alpha must be positive"));
            }
            if !(0.0..=1.0).contains(&epsilon) {
                return Err(MctsError::InvalidConfig(
                    "dirichlet epsilon must be within [0, 1]",
                ));
            }
        }
        if self.use_gumbel() && self.gumbel.sample_size == 0 {
            return Err(MctsError::InvalidConfig("gumbel sample size must be positive"));
        }
        Ok(())
    }
}

// NaN fails this as well
fn is_positive(x: f32) -> bool {
    x > 0.0
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 800,
            c_puct: 1.5,
            decision: ActionDecision::MaxCount,
            noise: RootNoise::None,
            gumbel: GumbelParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.num_simulations, 800);
        assert_eq!(config.c_puct, 1.5);
        assert_eq!(config.decision, ActionDecision::MaxCount);
        assert_eq!(config.noise, RootNoise::None);
        assert_eq!(config.gumbel.sample_size, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = MctsConfig::default()
            .with_simulations(1000)
            .with_c_puct(2.0)
            .with_temperature(0.5)
            .with_dirichlet_noise(0.25, 0.3);

        assert_eq!(config.num_simulations, 1000);
        assert_eq!(config.c_puct, 2.0);
        assert_eq!(
            config.decision,
            ActionDecision::SoftmaxCount { temperature: 0.5 }
        );
        assert_eq!(
            config.noise,
            RootNoise::Dirichlet {
                alpha: 0.25,
                epsilon: 0.3
            }
        );
        assert!(!config.use_gumbel());
    }

    #[test]
    fn test_gumbel_builder() {
        let config = MctsConfig::default().with_gumbel(GumbelParams {
            sample_size: 4,
            ..GumbelParams::default()
        });
        assert!(config.use_gumbel());
        assert_eq!(config.noise, RootNoise::Gumbel);
        assert_eq!(config.gumbel.sample_size, 4);
    }

    #[test]
    fn test_gumbel_noise_keeps_decision() {
        let config = MctsConfig::default()
            .with_temperature(1.0)
            .with_gumbel_noise();
        assert_eq!(config.noise, RootNoise::Gumbel);
        assert_eq!(
            config.decision,
            ActionDecision::SoftmaxCount { temperature: 1.0 }
        );
        assert!(!config.use_gumbel());

        let config = MctsConfig::default()
            .with_decision(ActionDecision::SequentialHalving)
            .with_gumbel_params(GumbelParams {
                sample_size: 8,
                ..GumbelParams::default()
            });
        assert!(config.use_gumbel());
        assert_eq!(config.noise, RootNoise::None);
        assert_eq!(config.gumbel.sample_size, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MctsConfig::default().with_simulations(0).validate().is_err());
        assert!(MctsConfig::default().with_c_puct(0.0).validate().is_err());
        assert!(MctsConfig::default().with_c_puct(f32::NAN).validate().is_err());
        assert!(MctsConfig::default().with_temperature(0.0).validate().is_err());
        assert!(MctsConfig::default()
            .with_dirichlet_noise(0.0, 0.25)
            .validate()
            .is_err());
        assert!(MctsConfig::default()
            .with_dirichlet_noise(0.3, 1.5)
            .validate()
            .is_err());
        assert!(MctsConfig::default()
            .with_gumbel(GumbelParams {
                sample_size: 0,
                ..GumbelParams::default()
            })
            .validate()
            .is_err());
    }
}
