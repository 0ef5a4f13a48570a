use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistevoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Generation error: {0}")]
    Generation(String),

    /// A condition that correct operators and configuration can never produce.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown message tag {tag} from rank {from_rank}")]
    UnknownTag { tag: i32, from_rank: usize },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Run aborted by rank {rank} with code {code}")]
    Aborted { rank: usize, code: i32 },

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, DistevoError>;
