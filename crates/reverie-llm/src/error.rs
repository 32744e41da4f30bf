//! Error types for the LLM router.

/// Errors that can occur while routing or completing a prompt.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The backend HTTP call failed or its response was malformed.
    #[error("llm backend error: {0}")]
    Backend(String),

    /// Invalid tier configuration.
    #[error("llm configuration error: {0}")]
    Config(String),
}
