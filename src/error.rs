use thiserror::Error;

/// Main error type for the digit recognition service.
///
/// The variants are grouped by how the HTTP boundary reports them:
/// client-input failures keep their 400 classification end to end,
/// everything else surfaces as a 500 carrying the underlying message.
#[derive(Error, Debug)]
pub enum DigitError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Model artifact not found (searched: {searched}). \
         Train and export it first:\n\n    digitd train\n\n\
         which writes the artifact to the first configured candidate path."
    )]
    ModelMissing { searched: String },

    // Client input errors
    #[error("{0}")]
    InvalidInput(String),

    // Model runtime errors
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DigitError {
    /// True for failures caused by the caller's input rather than the
    /// service's own state. These bypass generic 500 wrapping.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DigitError::InvalidInput(_))
    }
}

/// Result type alias for DigitError
pub type Result<T> = std::result::Result<T, DigitError>;
