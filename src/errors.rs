use thiserror::Error;

/// Application-level error type.
///
/// Only fatal and pre-flight failures live here. Per-candidate failures
/// (PDF extraction, a single model call, unparsable extraction output) are
/// degraded at the stage that produced them and never propagate this far.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
