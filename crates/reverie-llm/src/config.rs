//! Tier configuration loaded from prefixed environment variables.
//!
//! Each tier reads `{prefix}_BACKEND`, `{prefix}_API_URL`,
//! `{prefix}_API_KEY`, and `{prefix}_MODEL`. The scheduler uses prefixes
//! `LLM_MINOR` and `LLM_STORY`. An unset backend falls back to the
//! deterministic stub so the simulator runs without any model server.

use crate::error::LlmError;

/// Supported backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// OpenAI-compatible chat completions API (OpenAI, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Deterministic fixture backend.
    Stub,
}

/// Configuration for a single model tier.
#[derive(Debug, Clone)]
pub struct TierConfig {
    /// Which backend implementation to construct.
    pub backend: BackendKind,
    /// Base API URL, e.g. `http://localhost:11434/v1`.
    pub api_url: String,
    /// API key; empty for local servers.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl TierConfig {
    /// A stub tier for tests and offline runs.
    pub fn stub() -> Self {
        Self {
            backend: BackendKind::Stub,
            api_url: String::new(),
            api_key: String::new(),
            model: String::from("stub"),
        }
    }

    /// Load a tier from `{prefix}_*` environment variables.
    ///
    /// When `{prefix}_BACKEND` is unset the stub tier is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] on an unknown backend string.
    pub fn from_env(prefix: &str) -> Result<Self, LlmError> {
        let Ok(backend_raw) = std::env::var(format!("{prefix}_BACKEND")) else {
            return Ok(Self::stub());
        };
        let backend = parse_backend_kind(&backend_raw)?;
        if backend == BackendKind::Stub {
            return Ok(Self::stub());
        }

        let var = |suffix: &str| -> Result<String, LlmError> {
            std::env::var(format!("{prefix}_{suffix}"))
                .map_err(|_| LlmError::Config(format!("missing {prefix}_{suffix}")))
        };

        Ok(Self {
            backend,
            api_url: var("API_URL")?,
            api_key: std::env::var(format!("{prefix}_API_KEY")).unwrap_or_default(),
            model: var("MODEL")?,
        })
    }
}

/// Parse a backend kind string (case-insensitive).
///
/// Recognized: `openai`, `ollama` -> OpenAI-compatible; `anthropic`,
/// `claude` -> Anthropic; `stub` -> stub.
fn parse_backend_kind(s: &str) -> Result<BackendKind, LlmError> {
    match s.to_lowercase().as_str() {
        "openai" | "ollama" => Ok(BackendKind::OpenAi),
        "anthropic" | "claude" => Ok(BackendKind::Anthropic),
        "stub" => Ok(BackendKind::Stub),
        other => Err(LlmError::Config(format!("unknown backend kind: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parsing() {
        for (name, expected) in [
            ("openai", BackendKind::OpenAi),
            ("ollama", BackendKind::OpenAi),
            ("OLLAMA", BackendKind::OpenAi),
            ("anthropic", BackendKind::Anthropic),
            ("claude", BackendKind::Anthropic),
            ("stub", BackendKind::Stub),
        ] {
            let parsed = parse_backend_kind(name);
            assert!(parsed.is_ok(), "'{name}' should parse");
            assert_eq!(parsed.unwrap_or(BackendKind::Stub), expected);
        }
    }

    #[test]
    fn unknown_backend_kind_is_rejected() {
        assert!(parse_backend_kind("bedrock").is_err());
        assert!(parse_backend_kind("").is_err());
    }

    #[test]
    fn unset_prefix_yields_stub() {
        let config = TierConfig::from_env("REVERIE_TEST_UNSET_LLM_PREFIX");
        assert!(matches!(
            config,
            Ok(TierConfig {
                backend: BackendKind::Stub,
                ..
            })
        ));
    }
}
