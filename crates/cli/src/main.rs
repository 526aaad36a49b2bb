//! Self-play data generator
//!
//! Plays tic-tac-toe episodes with one MCTS actor per parallel game and
//! writes one record line per finished episode to stdout. Runs until killed.

#[cfg(feature = "torch")]
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::info;

use zeroplay_core::{Environment, TicTacToe};
use zeroplay_mcts::{ActionDecision, GumbelParams, MctsConfig};
use zeroplay_nn::{Network, UniformDynamicsNetwork, UniformNetwork};
use zeroplay_selfplay::{ActorGroup, RecordSink, SelfPlayConfig};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    /// Most visited root child
    MaxCount,
    /// Sample root children by visit count with temperature
    Softmax,
    /// Gumbel sequential halving over the root candidates
    Gumbel,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Noise {
    None,
    Dirichlet,
    /// Gumbel(0, 1) samples added to the root logits
    Gumbel,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum NetworkKind {
    /// Flat policy and zero value, evaluated on the CPU
    Uniform,
    /// Latent-dynamics stand-in with initial and recurrent calls
    UniformLatent,
    /// TorchScript module given by --model
    #[cfg(feature = "torch")]
    Torch,
}

/// Self-play record generator
#[derive(Parser, Debug)]
#[command(name = "zeroplay")]
#[command(about = "Generate self-play episodes with batched MCTS", long_about = None)]
struct Args {
    /// Episodes played side by side
    #[arg(long, default_value_t = 32)]
    games: usize,

    /// MCTS simulations per move
    #[arg(long, default_value_t = 800)]
    simulations: u32,

    /// CPU worker threads
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Network replicas, one per device
    #[arg(long, default_value_t = 1)]
    devices: usize,

    #[arg(long, default_value_t = 1.5)]
    c_puct: f32,

    #[arg(long, value_enum, default_value_t = Decision::MaxCount)]
    decision: Decision,

    /// Temperature for --decision softmax
    #[arg(long, default_value_t = 1.0)]
    temperature: f32,

    #[arg(long, value_enum, default_value_t = Noise::None)]
    noise: Noise,

    #[arg(long, default_value_t = 0.3)]
    dirichlet_alpha: f32,

    #[arg(long, default_value_t = 0.25)]
    dirichlet_epsilon: f32,

    /// Root candidates considered by --decision gumbel
    #[arg(long, default_value_t = 16)]
    gumbel_sample_size: usize,

    #[arg(long, default_value_t = 50.0)]
    gumbel_c_visit: f32,

    #[arg(long, default_value_t = 1.0)]
    gumbel_c_scale: f32,

    /// Resign when root and chosen values both fall below this
    #[arg(long, default_value_t = -0.9, allow_hyphen_values = true)]
    resign_threshold: f32,

    /// Fraction of episodes played out without resignation
    #[arg(long, default_value_t = 0.1)]
    disable_resign_ratio: f32,

    /// Seed for the actors' RNGs; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = NetworkKind::Uniform)]
    network: NetworkKind,

    /// TorchScript model path for --network torch
    #[cfg(feature = "torch")]
    #[arg(long)]
    model: Option<PathBuf>,
}

impl Args {
    fn mcts_config(&self) -> MctsConfig {
        let config = MctsConfig::default()
            .with_simulations(self.simulations)
            .with_c_puct(self.c_puct)
            .with_gumbel_params(GumbelParams {
                sample_size: self.gumbel_sample_size,
                c_visit: self.gumbel_c_visit,
                c_scale: self.gumbel_c_scale,
            });
        let config = match self.decision {
            Decision::MaxCount => config.with_decision(ActionDecision::MaxCount),
            Decision::Softmax => config.with_temperature(self.temperature),
            Decision::Gumbel => config.with_decision(ActionDecision::SequentialHalving),
        };
        match self.noise {
            Noise::None => config.without_noise(),
            Noise::Dirichlet => {
                config.with_dirichlet_noise(self.dirichlet_alpha, self.dirichlet_epsilon)
            }
            Noise::Gumbel => config.with_gumbel_noise(),
        }
    }

    fn selfplay_config(&self) -> SelfPlayConfig {
        let config = SelfPlayConfig::default()
            .with_parallel_games(self.games)
            .with_threads(self.threads)
            .with_devices(self.devices)
            .with_mcts(self.mcts_config())
            .with_resign(self.resign_threshold, self.disable_resign_ratio);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    /// One replica per device
    fn networks(&self, action_size: usize) -> anyhow::Result<Vec<Network>> {
        if self.devices == 0 {
            bail!("--devices must be positive");
        }
        match self.network {
            NetworkKind::Uniform => Ok((0..self.devices)
                .map(|_| Network::single_step(UniformNetwork::new(action_size)))
                .collect()),
            NetworkKind::UniformLatent => Ok((0..self.devices)
                .map(|_| Network::latent_dynamics(UniformDynamicsNetwork::new(action_size, 16)))
                .collect()),
            #[cfg(feature = "torch")]
            NetworkKind::Torch => self.torch_networks(action_size),
        }
    }

    #[cfg(feature = "torch")]
    fn torch_networks(&self, action_size: usize) -> anyhow::Result<Vec<Network>> {
        use tch::Device;
        use zeroplay_nn::torch::TorchNetwork;

        let path = self
            .model
            .as_ref()
            .context("--network torch needs --model")?;
        let cuda_devices = TorchNetwork::device_count();
        info!("tch cuda device count: {cuda_devices}");

        (0..self.devices)
            .map(|i| {
                let device = if i < cuda_devices {
                    Device::Cuda(i)
                } else {
                    Device::Cpu
                };
                info!("loading {} onto {device:?}", path.display());
                let network = TorchNetwork::load(path, device, vec![3, 3, 3], action_size)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                Ok(Network::single_step(network))
            })
            .collect()
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let action_size = TicTacToe::new().policy_size();
    let config = args.selfplay_config();
    config.validate().context("invalid self-play configuration")?;
    let networks = args.networks(action_size)?;

    info!("self-play configuration: {config:?}");
    info!("network: {:?}", args.network);

    let group = ActorGroup::new(config, TicTacToe::new, networks, RecordSink::stdout())
        .context("failed to start self-play")?;
    group.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroplay_mcts::RootNoise;

    fn parse(flags: &[&str]) -> Args {
        Args::parse_from(std::iter::once("zeroplay").chain(flags.iter().copied()))
    }

    #[test]
    fn defaults_are_max_count_without_noise() {
        let config = parse(&[]).mcts_config();
        assert_eq!(config.decision, ActionDecision::MaxCount);
        assert_eq!(config.noise, RootNoise::None);
        assert_eq!(config.num_simulations, 800);
    }

    #[test]
    fn gumbel_noise_keeps_softmax_decision() {
        let config = parse(&["--decision", "softmax", "--temperature", "0.5", "--noise", "gumbel"])
            .mcts_config();
        assert_eq!(
            config.decision,
            ActionDecision::SoftmaxCount { temperature: 0.5 }
        );
        assert_eq!(config.noise, RootNoise::Gumbel);
    }

    #[test]
    fn gumbel_decision_with_any_noise() {
        let config = parse(&[
            "--decision",
            "gumbel",
            "--gumbel-sample-size",
            "4",
            "--noise",
            "dirichlet",
        ])
        .mcts_config();
        assert_eq!(config.decision, ActionDecision::SequentialHalving);
        assert_eq!(
            config.noise,
            RootNoise::Dirichlet {
                alpha: 0.3,
                epsilon: 0.25
            }
        );
        assert_eq!(config.gumbel.sample_size, 4);

        let config = parse(&["--decision", "gumbel", "--noise", "gumbel"]).mcts_config();
        assert_eq!(config.decision, ActionDecision::SequentialHalving);
        assert_eq!(config.noise, RootNoise::Gumbel);
    }

    #[test]
    fn selfplay_flags_reach_the_config() {
        let config = parse(&[
            "--games",
            "3",
            "--devices",
            "2",
            "--resign-threshold",
            "-0.5",
            "--seed",
            "7",
        ])
        .selfplay_config();
        assert_eq!(config.num_parallel_games, 3);
        assert_eq!(config.num_devices, 2);
        assert_eq!(config.resign_threshold, -0.5);
        assert_eq!(config.seed, Some(7));
        assert!(config.validate().is_ok());
    }
}
