use tracing::debug;

use crate::ollama::OllamaClientTrait;

use super::{GenerationError, TextGenerator, echo};

/// Generates text with a model hosted by an Ollama server.
pub struct OllamaGenerator<C: OllamaClientTrait> {
    client: C,
    model: String,
    max_new_tokens: usize,
}

impl<C: OllamaClientTrait> OllamaGenerator<C> {
    pub fn new(client: C, model: impl Into<String>, max_new_tokens: usize) -> Self {
        Self {
            client,
            model: model.into(),
            max_new_tokens,
        }
    }
}

impl<C: OllamaClientTrait> TextGenerator for OllamaGenerator<C> {
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
        let continuation = self
            .client
            .complete(&self.model, prompt, self.max_new_tokens)?;
        debug!(chars = continuation.len(), "Ollama continuation received");
        Ok(echo(prompt, &continuation))
    }
}
