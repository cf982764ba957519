use thiserror::Error;

/// Errors raised at the input boundary.
///
/// The normalizer, calculator and reporter never fail; only the helpers that
/// decode caller-supplied text (test record batches, directories, variant
/// keys) return this type.
#[derive(Error, Debug, Clone)]
pub enum AbtrackError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown variant key: {0} (expected one of A, B, C, D, E)")]
    UnknownVariant(String),
}

pub type Result<T> = std::result::Result<T, AbtrackError>;

impl From<std::io::Error> for AbtrackError {
    fn from(e: std::io::Error) -> Self {
        AbtrackError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AbtrackError {
    fn from(e: serde_json::Error) -> Self {
        AbtrackError::Json(e.to_string())
    }
}

impl AbtrackError {
    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AbtrackError::UnknownVariant(_) => 2,
            AbtrackError::InvalidInput(_) => 3,
            AbtrackError::Json(_) => 3,
            AbtrackError::Io(_) => 4,
        }
    }
}
