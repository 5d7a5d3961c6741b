use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Component could not be parsed by any dialect: {0}")]
    UnparsableComponent(String),

    #[error("No template node at {file}:{line}:{column}")]
    NodeNotLocated {
        file: String,
        line: u32,
        column: u32,
    },

    #[error("Graph build failed: {0}")]
    GraphBuild(String),

    #[error("Reasoning call timed out after {0}s")]
    LlmTimeout(u64),

    #[error("Reasoning service rate limited")]
    LlmRateLimited,

    #[error("Transient reasoning failure: {0}")]
    LlmTransient(String),

    #[error("Reasoning output did not match schema: {0}")]
    LlmMalformedOutput(String),

    #[error("Circuit open, reasoning call not attempted")]
    CircuitOpen,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LineageError {
    /// Whether the reliability facade may retry the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LineageError::LlmTimeout(_)
                | LineageError::LlmRateLimited
                | LineageError::LlmTransient(_)
        )
    }

    /// Failures that should truncate a trace chain instead of aborting
    /// the whole request.
    pub fn truncates_chain(&self) -> bool {
        matches!(
            self,
            LineageError::UnparsableComponent(_)
                | LineageError::FileNotFound(_)
                | LineageError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LineageError>;
