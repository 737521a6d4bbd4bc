/// Ollama HTTP client module.
///
/// This module provides a blocking HTTP client for an Ollama server, used as an
/// alternative text generation backend.
mod client;

pub use client::{
    DEFAULT_OLLAMA_HOST, OllamaClient, OllamaClientBuilder, OllamaClientTrait, OllamaError,
};
