use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// A generation call was rejected or returned something unusable.
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Generation timed out after {0}s: {1}")]
    Timeout(u64, &'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::GenerationFailure(e.to_string())
    }
}
