//! Quantized Llama-family model loaded from a GGUF file through candle.

use std::path::Path;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::model_source::{ModelError, ModelSource};

use super::{GenerationError, TextGenerator, echo};

const EOS_TOKEN: &str = "</s>";

/// Sampling parameters. Defaults mirror llama.cpp's completion defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub repeat_penalty: f32,
    /// How many trailing tokens the repeat penalty looks at
    pub repeat_last_n: usize,
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
            seed: 299_792_458,
        }
    }
}

impl SamplingConfig {
    fn sampling(&self) -> Sampling {
        if self.temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            Sampling::TopKThenTopP {
                k: self.top_k,
                p: self.top_p,
                temperature: self.temperature,
            }
        }
    }
}

/// Text generator over a local GGUF model.
pub struct GgufGenerator {
    model: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
    max_new_tokens: usize,
    sampling: SamplingConfig,
}

impl GgufGenerator {
    /// Loads the model file and its tokenizer.
    ///
    /// `model_path` must be a GGUF file on disk. `tokenizer` resolves a
    /// `tokenizer.json`; see `Settings::gguf_tokenizer_source` for the default.
    pub fn load(
        model_path: &Path,
        tokenizer: &ModelSource,
        max_new_tokens: usize,
        sampling: SamplingConfig,
    ) -> Result<Self, ModelError> {
        info!(model = %model_path.display(), "Loading causal language model");
        let device = Device::Cpu;

        if !model_path.is_file() {
            return Err(ModelError::MissingFile {
                path: model_path.to_path_buf(),
            });
        }

        let mut file = std::fs::File::open(model_path)
            .map_err(|e| ModelError::load(model_path.display().to_string(), e))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| ModelError::load("GGUF header", e))?;
        debug!(tensors = content.tensor_infos.len(), "GGUF header read");
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| ModelError::load("GGUF weights", e))?;

        let tokenizer_path = tokenizer.fetch("tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::load("tokenizer.json", e))?;
        let eos_token = tokenizer.token_to_id(EOS_TOKEN);

        info!(max_new_tokens, "Causal language model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            eos_token,
            max_new_tokens,
            sampling,
        })
    }

    fn continue_prompt(&mut self, prompt: &str) -> Result<String, ModelError> {
        let prompt_tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?
            .get_ids()
            .to_vec();

        let mut logits_processor =
            LogitsProcessor::from_sampling(self.sampling.seed, self.sampling.sampling());
        let mut tokens = prompt_tokens.clone();
        let mut index_pos = 0;

        for step in 0..self.max_new_tokens {
            // First step feeds the whole prompt; index_pos 0 also resets the KV cache
            let context = if step == 0 {
                &tokens[..]
            } else {
                &tokens[tokens.len() - 1..]
            };
            let input = Tensor::new(context, &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input, index_pos)?.squeeze(0)?;
            index_pos += context.len();

            let logits = if self.sampling.repeat_penalty == 1.0 {
                logits
            } else {
                let start = tokens.len().saturating_sub(self.sampling.repeat_last_n);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    self.sampling.repeat_penalty,
                    &tokens[start..],
                )?
            };

            let next = logits_processor.sample(&logits)?;
            if Some(next) == self.eos_token {
                break;
            }
            tokens.push(next);
        }

        debug!(
            new_tokens = tokens.len() - prompt_tokens.len(),
            "Generation finished"
        );

        let full = self.decode(&tokens)?;
        let prompt_text = self.decode(&prompt_tokens)?;
        match full.strip_prefix(&prompt_text) {
            Some(continuation) => Ok(continuation.to_string()),
            None => self.decode(&tokens[prompt_tokens.len()..]),
        }
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, ModelError> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))
    }
}

impl TextGenerator for GgufGenerator {
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
        let continuation = self.continue_prompt(prompt)?;
        Ok(echo(prompt, &continuation))
    }
}
