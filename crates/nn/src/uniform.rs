//! CPU stand-ins that need no model file: uniform policy, neutral value.

use log::trace;

use crate::{BatchBuffer, DynamicsNetwork, NetworkOutput, PolicyValueNetwork, Result};

/// Single-step network answering every request with a uniform policy and a
/// zero value.
pub struct UniformNetwork {
    action_size: usize,
    batch: BatchBuffer<Vec<f32>>,
}

impl UniformNetwork {
    pub fn new(action_size: usize) -> Self {
        Self {
            action_size,
            batch: BatchBuffer::new(),
        }
    }

    /// Number of requests waiting for the next forward call
    pub fn pending(&self) -> usize {
        self.batch.len()
    }
}

impl PolicyValueNetwork for UniformNetwork {
    fn push_back(&mut self, features: Vec<f32>) -> usize {
        self.batch.push(features)
    }

    fn forward(&mut self) -> Result<Vec<NetworkOutput>> {
        let requests = self.batch.take();
        trace!("uniform forward over {} requests", requests.len());
        Ok(requests
            .iter()
            .map(|_| NetworkOutput::from_logits(vec![0.0; self.action_size], 0.0))
            .collect())
    }

    fn action_size(&self) -> usize {
        self.action_size
    }
}

/// Latent-dynamics stand-in. The latent state is a fixed-width fold of the
/// request, so recurrent requests produce states that depend on the path.
pub struct UniformDynamicsNetwork {
    action_size: usize,
    hidden_size: usize,
    initial: BatchBuffer<Vec<f32>>,
    recurrent: BatchBuffer<(Vec<f32>, Vec<f32>)>,
}

impl UniformDynamicsNetwork {
    pub fn new(action_size: usize, hidden_size: usize) -> Self {
        Self {
            action_size,
            hidden_size: hidden_size.max(1),
            initial: BatchBuffer::new(),
            recurrent: BatchBuffer::new(),
        }
    }

    fn fold(&self, inputs: &[&[f32]]) -> Vec<f32> {
        let mut hidden = vec![0.0; self.hidden_size];
        for (i, x) in inputs.iter().flat_map(|s| s.iter()).enumerate() {
            hidden[i % self.hidden_size] += x;
        }
        hidden
    }

    fn output(&self, hidden_state: Vec<f32>) -> NetworkOutput {
        NetworkOutput::from_logits(vec![0.0; self.action_size], 0.0).with_hidden_state(hidden_state)
    }
}

impl DynamicsNetwork for UniformDynamicsNetwork {
    fn push_back_initial(&mut self, features: Vec<f32>) -> usize {
        self.initial.push(features)
    }

    fn initial_inference(&mut self) -> Result<Vec<NetworkOutput>> {
        let requests = self.initial.take();
        Ok(requests
            .iter()
            .map(|features| self.output(self.fold(&[features.as_slice()])))
            .collect())
    }

    fn push_back_recurrent(
        &mut self,
        hidden_state: Vec<f32>,
        action_features: Vec<f32>,
    ) -> usize {
        self.recurrent.push((hidden_state, action_features))
    }

    fn recurrent_inference(&mut self) -> Result<Vec<NetworkOutput>> {
        let requests = self.recurrent.take();
        Ok(requests
            .iter()
            .map(|(hidden, action)| self.output(self.fold(&[hidden.as_slice(), action.as_slice()])))
            .collect())
    }

    fn action_size(&self) -> usize {
        self.action_size
    }
}
