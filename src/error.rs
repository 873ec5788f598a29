use thiserror::Error;

/// Failures reported by the analysis core.
///
/// None of these are fatal; callers decide whether to retry.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Missing clip, empty buffer or an unusable parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two spectral sequences (or two spectra) disagree in length.
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Comparison requested while preparation is still running.
    #[error("comparison not ready: preparation in progress")]
    NotReady,

    /// A build was stopped through its cancellation flag.
    #[error("preparation cancelled")]
    Cancelled,

    /// Persisting an encoded WAV buffer failed.
    #[error("failed to write audio file: {0}")]
    EncodingFailure(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
