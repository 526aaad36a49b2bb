use thiserror::Error;
use zeroplay_core::Action;
use zeroplay_mcts::MctsError;
use zeroplay_nn::NnError;

#[derive(Error, Debug)]
pub enum SelfPlayError {
    #[error("Invalid configuration: {0}")]
    Config(&'static str),

    #[error("Network action size {network} does not match policy size {environment}")]
    ActionSizeMismatch { network: usize, environment: usize },

    #[error("Search error: {0}")]
    Mcts(#[from] MctsError),

    #[error("Network error: {0}")]
    Network(#[from] NnError),

    #[error("Latent-dynamics output carries no hidden state")]
    MissingHiddenState,

    #[error("Batch has no output for slot {0}")]
    MissingOutput(usize),

    #[error("No search has been decided yet")]
    NotDecided,

    #[error("Environment rejected the searched action {0}")]
    IllegalAction(Action),

    #[error("Malformed record: {0}")]
    Record(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SelfPlayError>;
