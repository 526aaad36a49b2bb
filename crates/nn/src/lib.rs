//! Batched network interfaces used by the self-play scheduler.
//!
//! Requests are appended to a per-replica batch during the CPU phase and the
//! whole batch is evaluated by one call during the GPU phase. Two model
//! families exist: single-step policy/value networks (AlphaZero style) and
//! latent-dynamics networks (MuZero style) which additionally return a
//! latent state that later recurrent requests continue from.

mod batch;
mod error;
#[cfg(feature = "torch")]
pub mod torch;
mod uniform;

pub use batch::BatchBuffer;
pub use error::{NnError, Result};
pub use uniform::{UniformDynamicsNetwork, UniformNetwork};

/// One evaluated position
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkOutput {
    /// Softmax of `policy_logits` over the full action space
    pub policy: Vec<f32>,
    pub policy_logits: Vec<f32>,
    /// Position value from player one's point of view, in `[-1, 1]`
    pub value: f32,
    /// Latent state, only produced by latent-dynamics networks
    pub hidden_state: Option<Vec<f32>>,
}

impl NetworkOutput {
    pub fn from_logits(policy_logits: Vec<f32>, value: f32) -> Self {
        Self {
            policy: softmax(&policy_logits),
            policy_logits,
            value,
            hidden_state: None,
        }
    }

    pub fn with_hidden_state(mut self, hidden_state: Vec<f32>) -> Self {
        self.hidden_state = Some(hidden_state);
        self
    }
}

/// Which batched call produced (or will consume) a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceKind {
    SingleStep,
    Initial,
    Recurrent,
}

/// A request waiting in a replica's batch
#[derive(Debug, Clone)]
pub enum InferenceRequest {
    SingleStep {
        features: Vec<f32>,
    },
    Initial {
        features: Vec<f32>,
    },
    Recurrent {
        hidden_state: Vec<f32>,
        action_features: Vec<f32>,
    },
}

impl InferenceRequest {
    pub fn kind(&self) -> InferenceKind {
        match self {
            InferenceRequest::SingleStep { .. } => InferenceKind::SingleStep,
            InferenceRequest::Initial { .. } => InferenceKind::Initial,
            InferenceRequest::Recurrent { .. } => InferenceKind::Recurrent,
        }
    }
}

/// Single-step policy/value network
pub trait PolicyValueNetwork: Send {
    /// Append one request to the pending batch, returning its slot
    fn push_back(&mut self, features: Vec<f32>) -> usize;

    /// Evaluate and clear the pending batch; output `i` answers slot `i`
    fn forward(&mut self) -> Result<Vec<NetworkOutput>>;

    fn action_size(&self) -> usize;
}

/// Latent-dynamics network with separate initial and recurrent batches
pub trait DynamicsNetwork: Send {
    fn push_back_initial(&mut self, features: Vec<f32>) -> usize;

    fn initial_inference(&mut self) -> Result<Vec<NetworkOutput>>;

    fn push_back_recurrent(&mut self, hidden_state: Vec<f32>, action_features: Vec<f32>)
        -> usize;

    fn recurrent_inference(&mut self) -> Result<Vec<NetworkOutput>>;

    fn action_size(&self) -> usize;
}

/// A network replica. Callers pick behavior through the capability queries
/// rather than by inspecting the model family.
pub enum Network {
    SingleStep(Box<dyn PolicyValueNetwork>),
    LatentDynamics(Box<dyn DynamicsNetwork>),
}

impl Network {
    pub fn single_step(network: impl PolicyValueNetwork + 'static) -> Self {
        Network::SingleStep(Box::new(network))
    }

    pub fn latent_dynamics(network: impl DynamicsNetwork + 'static) -> Self {
        Network::LatentDynamics(Box::new(network))
    }

    pub fn supports_single_step(&self) -> bool {
        matches!(self, Network::SingleStep(_))
    }

    pub fn supports_initial_inference(&self) -> bool {
        matches!(self, Network::LatentDynamics(_))
    }

    pub fn supports_recurrent_inference(&self) -> bool {
        matches!(self, Network::LatentDynamics(_))
    }

    pub fn action_size(&self) -> usize {
        match self {
            Network::SingleStep(n) => n.action_size(),
            Network::LatentDynamics(n) => n.action_size(),
        }
    }

    /// Queue a request, returning its slot in the batch of its kind
    pub fn submit(&mut self, request: InferenceRequest) -> Result<usize> {
        match (self, request) {
            (Network::SingleStep(n), InferenceRequest::SingleStep { features }) => {
                Ok(n.push_back(features))
            }
            (Network::LatentDynamics(n), InferenceRequest::Initial { features }) => {
                Ok(n.push_back_initial(features))
            }
            (
                Network::LatentDynamics(n),
                InferenceRequest::Recurrent {
                    hidden_state,
                    action_features,
                },
            ) => Ok(n.push_back_recurrent(hidden_state, action_features)),
            (_, request) => Err(NnError::Unsupported(request.kind())),
        }
    }

    /// Run the batched call of the given kind
    pub fn infer(&mut self, kind: InferenceKind) -> Result<Vec<NetworkOutput>> {
        match (self, kind) {
            (Network::SingleStep(n), InferenceKind::SingleStep) => n.forward(),
            (Network::LatentDynamics(n), InferenceKind::Initial) => n.initial_inference(),
            (Network::LatentDynamics(n), InferenceKind::Recurrent) => n.recurrent_inference(),
            (_, kind) => Err(NnError::Unsupported(kind)),
        }
    }
}

/// Numerically stable softmax over the whole vector
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
