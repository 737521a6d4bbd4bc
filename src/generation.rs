//! Text generation backends.
//!
//! Every backend echoes its prompt: the returned text is the prompt followed by
//! the model's continuation, capped at a fixed number of new tokens.

mod gguf;
mod ollama;

pub use gguf::{GgufGenerator, SamplingConfig};
pub use ollama::OllamaGenerator;

use thiserror::Error;

use crate::model_source::ModelError;
use crate::ollama::OllamaError;

/// New-token budget used when none is configured.
pub const DEFAULT_MAX_NEW_TOKENS: usize = 128;

/// Errors from a generation backend. All are fatal for the run.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Ollama(#[from] OllamaError),
}

/// Continues a prompt with a causal language model.
pub trait TextGenerator {
    /// Returns `prompt` followed by the generated continuation.
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError>;
}

/// Joins prompt and continuation the way an echoing completion API would.
pub(crate) fn echo(prompt: &str, continuation: &str) -> String {
    let mut text = String::with_capacity(prompt.len() + continuation.len());
    text.push_str(prompt);
    text.push_str(continuation);
    text
}
