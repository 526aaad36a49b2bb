use thiserror::Error;

use crate::InferenceKind;

#[derive(Error, Debug)]
pub enum NnError {
    #[cfg(feature = "torch")]
    #[error("Torch error: {0}")]
    TorchError(#[from] tch::TchError),

    #[error("Network does not support {0:?} inference")]
    Unsupported(InferenceKind),

    #[error("Unexpected network output shape: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, NnError>;
