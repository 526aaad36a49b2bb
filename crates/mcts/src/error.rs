use thiserror::Error;

use crate::tree::NodeId;

#[derive(Error, Debug)]
pub enum MctsError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("Noise sampling error: {0}")]
    NoiseError(String),

    #[error("Node {0} has not been expanded")]
    NotExpanded(NodeId),
}

pub type Result<T> = std::result::Result<T, MctsError>;
