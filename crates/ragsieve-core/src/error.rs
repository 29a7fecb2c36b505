use thiserror::Error;

/// Error taxonomy shared by every ragsieve crate.
///
/// `Configuration`, `NotFound` and `CorruptIndex` are construction-time
/// failures and must reach the caller. `Retrieval` and `Rerank` are raised by
/// per-query capabilities and are recovered inside the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Rerank failed: {0}")]
    Rerank(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures that must abort construction of a retriever.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::NotFound(_) | Error::CorruptIndex(_) | Error::Io(_) | Error::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
