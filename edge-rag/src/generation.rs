//! Generation provider trait for producing text from a prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
    /// Number of highest-probability tokens considered at each step.
    pub top_k: u32,
    /// System prompt for providers with a chat template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { max_tokens: 512, temperature: 0.7, top_p: 0.9, top_k: 40, system_prompt: None }
    }
}

/// Text produced by a [`GenerationProvider`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Generation {
    /// The generated text.
    pub text: String,
    /// Tokens generated, if the provider reports it.
    #[serde(default)]
    pub tokens_generated: Option<u32>,
    /// Prompt tokens consumed, if the provider reports it.
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    /// Why generation stopped (`"stop"`, `"length"`, ...), if reported.
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl Generation {
    /// A generation carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
}

/// A provider that turns a prompt and sampling parameters into text.
///
/// Generation runs to completion or to its native failure; there is no
/// cancellation. The pipeline serializes every call, so implementations do
/// not need to be reentrant. Failures should be reported as
/// [`RagError::GenerationFailed`](crate::RagError::GenerationFailed) with the
/// model's own message.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<Generation>;

    /// Provider identifier for logs and error messages.
    fn name(&self) -> &str {
        "generation"
    }

    /// Whether the underlying model is loaded and able to serve requests.
    fn is_ready(&self) -> bool {
        true
    }

    /// Context window of the model in tokens, if known.
    fn context_size(&self) -> Option<usize> {
        None
    }
}
