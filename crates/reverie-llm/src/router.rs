//! Tier selection and lazy backend initialization.
//!
//! Two logical tiers keyed by [`CharacterClass`]: `minor` characters use
//! the small model, `story` characters the larger one. Each tier's
//! backend is constructed on first use and shared for the life of the
//! process; the scheduler's sequential cycle means at most one generation
//! runs per tier at a time.

use reverie_types::CharacterClass;
use tokio::sync::OnceCell;

use crate::backend::{
    AnthropicBackend, GenerationOptions, LlmBackend, OpenAiBackend, Prompt, StubBackend,
};
use crate::config::{BackendKind, TierConfig};
use crate::error::LlmError;

/// One tier: its configuration plus the lazily constructed backend.
struct Tier {
    config: TierConfig,
    backend: OnceCell<LlmBackend>,
}

impl Tier {
    const fn new(config: TierConfig) -> Self {
        Self {
            config,
            backend: OnceCell::const_new(),
        }
    }

    async fn backend(&self) -> &LlmBackend {
        self.backend
            .get_or_init(|| async {
                let backend = create_backend(&self.config);
                tracing::info!(
                    backend = backend.name(),
                    model = self.config.model,
                    "llm tier initialized"
                );
                backend
            })
            .await
    }
}

/// Construct a backend from a tier configuration.
fn create_backend(config: &TierConfig) -> LlmBackend {
    match config.backend {
        BackendKind::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendKind::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
        BackendKind::Stub => LlmBackend::Stub(StubBackend::new()),
    }
}

/// The two-tier model router.
pub struct LlmRouter {
    minor: Tier,
    story: Tier,
}

impl LlmRouter {
    /// Create a router from per-tier configurations.
    pub const fn new(minor: TierConfig, story: TierConfig) -> Self {
        Self {
            minor: Tier::new(minor),
            story: Tier::new(story),
        }
    }

    /// Load both tiers from the environment (`LLM_MINOR_*`, `LLM_STORY_*`).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] on malformed tier configuration.
    pub fn from_env() -> Result<Self, LlmError> {
        Ok(Self::new(
            TierConfig::from_env("LLM_MINOR")?,
            TierConfig::from_env("LLM_STORY")?,
        ))
    }

    /// A router with the same deterministic stub backend on both tiers.
    pub fn stubbed(stub: StubBackend) -> Self {
        let router = Self::new(TierConfig::stub(), TierConfig::stub());
        // Pre-populate so the fixtures are actually used.
        let _ = router.minor.backend.set(LlmBackend::Stub(stub.clone()));
        let _ = router.story.backend.set(LlmBackend::Stub(stub));
        router
    }

    /// Complete a prompt on the tier selected by `class`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Backend`] if the backend call fails.
    pub async fn complete(
        &self,
        class: CharacterClass,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let tier = match class {
            CharacterClass::Minor => &self.minor,
            CharacterClass::Story => &self.story,
        };
        tier.backend().await.complete(prompt, options).await
    }
}
