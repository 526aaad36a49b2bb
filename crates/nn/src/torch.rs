//! TorchScript-backed single-step network.

use std::path::Path;

use log::debug;
use tch::{CModule, Device, IValue, Kind, Tensor};

use crate::{BatchBuffer, NetworkOutput, NnError, PolicyValueNetwork, Result};

/// A TorchScript module returning `(policy_logits, value)` for a batch.
pub struct TorchNetwork {
    module: CModule,
    device: Device,
    input_shape: Vec<i64>,
    action_size: usize,
    batch: BatchBuffer<Vec<f32>>,
}

impl TorchNetwork {
    /// Load a module onto `device`. `input_shape` is the per-position feature
    /// shape, e.g. `[3, 3, 3]` for tic-tac-toe.
    pub fn load<P: AsRef<Path>>(
        path: P,
        device: Device,
        input_shape: Vec<i64>,
        action_size: usize,
    ) -> Result<Self> {
        let module = CModule::load_on_device(path, device)?;
        Ok(Self {
            module,
            device,
            input_shape,
            action_size,
            batch: BatchBuffer::new(),
        })
    }

    /// Number of visible CUDA devices, i.e. the replica count
    pub fn device_count() -> usize {
        tch::Cuda::device_count().max(0) as usize
    }

    fn run(&self, x: &Tensor) -> Result<(Tensor, Tensor)> {
        let iv = self.module.forward_is(&[IValue::Tensor(x.shallow_clone())])?;
        match iv {
            IValue::Tuple(mut elems) if elems.len() == 2 => {
                let value = tensor_from_ivalue(elems.pop())?;
                let policy = tensor_from_ivalue(elems.pop())?;
                Ok((policy, value))
            }
            other => Err(NnError::Shape(format!(
                "expected (policy, value) tuple, got {other:?}"
            ))),
        }
    }
}

impl PolicyValueNetwork for TorchNetwork {
    fn push_back(&mut self, features: Vec<f32>) -> usize {
        self.batch.push(features)
    }

    fn forward(&mut self) -> Result<Vec<NetworkOutput>> {
        let requests = self.batch.take();
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let n = requests.len();
        let flat: Vec<f32> = requests.into_iter().flatten().collect();
        let mut shape = vec![n as i64];
        shape.extend_from_slice(&self.input_shape);
        let input = Tensor::from_slice(&flat).view(shape.as_slice()).to_device(self.device);

        let (policy, value) = tch::no_grad(|| self.run(&input))?;
        let policy = policy.to_kind(Kind::Float).to_device(Device::Cpu).contiguous();
        let value = value.to_kind(Kind::Float).to_device(Device::Cpu).contiguous();

        if policy.numel() != n * self.action_size || value.numel() != n {
            return Err(NnError::Shape(format!(
                "policy {:?} / value {:?} for batch of {n}",
                policy.size(),
                value.size()
            )));
        }

        let mut logits = vec![0.0f32; n * self.action_size];
        policy.copy_data(&mut logits, logits.len());
        let mut values = vec![0.0f32; n];
        value.copy_data(&mut values, n);
        debug!("torch forward over {n} requests");

        Ok(logits
            .chunks(self.action_size)
            .zip(values)
            .map(|(l, v)| NetworkOutput::from_logits(l.to_vec(), v))
            .collect())
    }

    fn action_size(&self) -> usize {
        self.action_size
    }
}

fn tensor_from_ivalue(iv: Option<IValue>) -> Result<Tensor> {
    match iv {
        Some(IValue::Tensor(t)) => Ok(t),
        other => Err(NnError::Shape(format!("expected Tensor, got {other:?}"))),
    }
}
