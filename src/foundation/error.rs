use crate::convert::ConversionPhase;

/// Crate-wide result alias.
pub type ReelResult<T> = Result<T, ReelError>;

/// Errors produced by ingestion, settings validation and conversion runs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user input or an empty selection.
    #[error("validation error: {0}")]
    Validation(String),

    /// A host file or directory could not be read.
    #[error("ingest error: {0}")]
    Ingest(String),

    /// A legacy-format image could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The conversion engine failed to load, execute, or access its filesystem.
    #[error("engine error: {0}")]
    Engine(String),

    /// A conversion run ended in the `error` phase.
    #[error("conversion failed during {phase}: {message}")]
    Conversion {
        /// Phase that was active when the run failed.
        phase: ConversionPhase,
        /// User-facing failure message.
        message: String,
    },

    /// A conversion run is already in flight.
    #[error("a conversion is already running")]
    Busy,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    pub fn conversion(phase: ConversionPhase, msg: impl Into<String>) -> Self {
        Self::Conversion {
            phase,
            message: msg.into(),
        }
    }
}
