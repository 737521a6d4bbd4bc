//! Runtime settings.
//!
//! Every value is resolved in the same order: explicit builder value (usually a
//! CLI flag), then the environment, then a built-in default. `main` loads `.env`
//! with dotenvy before settings are built, so values from `.env` count as
//! environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::generation::DEFAULT_MAX_NEW_TOKENS;
use crate::knowledge::{DEFAULT_WIKIDATA_API_URL, DEFAULT_WIKIPEDIA_API_URL, DEFAULT_WIKIPEDIA_REST_URL};
use crate::model_source::ModelSource;
use crate::ner::DEFAULT_NER_MODEL;
use crate::ollama::{DEFAULT_OLLAMA_HOST, OllamaClient, OllamaClientBuilder, OllamaError};

pub const ENV_NER_MODEL: &str = "QAFACT_NER_MODEL";
pub const ENV_GENERATOR: &str = "QAFACT_GENERATOR";
pub const ENV_GGUF_MODEL: &str = "QAFACT_GGUF_MODEL";
pub const ENV_GGUF_TOKENIZER: &str = "QAFACT_GGUF_TOKENIZER";
pub const ENV_MAX_NEW_TOKENS: &str = "QAFACT_MAX_NEW_TOKENS";
pub const ENV_SEED: &str = "QAFACT_SEED";
pub const ENV_WIKIPEDIA_URL: &str = "QAFACT_WIKIPEDIA_URL";
pub const ENV_WIKIPEDIA_REST_URL: &str = "QAFACT_WIKIPEDIA_REST_URL";
pub const ENV_WIKIDATA_URL: &str = "QAFACT_WIKIDATA_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "QAFACT_HTTP_TIMEOUT_SECS";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";

/// File name of the default quantized model.
pub const DEFAULT_GGUF_FILE: &str = "llama-2-7b.Q2_K.gguf";

/// Llama-2 tokenizer used when the GGUF file has no `tokenizer.json` beside it.
pub const DEFAULT_GGUF_TOKENIZER: &str = "hf-internal-testing/llama-tokenizer";

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 299_792_458;

/// Configuration errors. These are user errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({message})")]
    InvalidValue {
        name: String,
        value: String,
        message: String,
    },

    #[error("Failed to determine data directory")]
    NoDataDir,
}

impl ConfigError {
    fn invalid(name: &str, value: &str, message: impl fmt::Display) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

/// Which text generation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorKind {
    /// Local GGUF model through candle
    #[default]
    Gguf,
    /// Ollama server in raw completion mode
    Ollama,
}

impl FromStr for GeneratorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gguf" => Ok(Self::Gguf),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::invalid(
                ENV_GENERATOR,
                s,
                "expected 'gguf' or 'ollama'",
            )),
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gguf => write!(f, "gguf"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Resolved settings for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// NER model directory or hub repository id
    pub ner_model: String,
    pub generator: GeneratorKind,
    pub gguf_model: PathBuf,
    /// Tokenizer directory, file or hub repository id; see `gguf_tokenizer_source`
    pub gguf_tokenizer: Option<String>,
    pub max_new_tokens: usize,
    pub seed: u64,
    pub wikipedia_api_url: String,
    pub wikipedia_rest_url: String,
    pub wikidata_api_url: String,
    pub http_timeout: Option<Duration>,
    pub ollama_host: String,
    /// `None` picks the largest installed model
    pub ollama_model: Option<String>,
}

impl Settings {
    /// Where the GGUF tokenizer comes from.
    ///
    /// An explicit setting wins, then a `tokenizer.json` next to the model file,
    /// then the `DEFAULT_GGUF_TOKENIZER` hub repository.
    pub fn gguf_tokenizer_source(&self) -> ModelSource {
        if let Some(tokenizer) = self.gguf_tokenizer.as_deref() {
            return ModelSource::parse(tokenizer);
        }
        let beside_model = ModelSource::Local(self.gguf_model.clone());
        if beside_model.cached("tokenizer.json").is_some() {
            beside_model
        } else {
            ModelSource::Hub {
                repo: DEFAULT_GGUF_TOKENIZER.to_string(),
            }
        }
    }

    /// Ollama client for the configured host and model.
    pub fn ollama_client(&self) -> Result<OllamaClient, OllamaError> {
        OllamaClientBuilder::new()
            .base_url(&self.ollama_host)
            .model(self.ollama_model.as_deref().unwrap_or_default())
            .build()
    }
}

/// Builder for `Settings`.
///
/// # Examples
///
/// ```
/// use qafact::config::{GeneratorKind, SettingsBuilder};
///
/// let settings = SettingsBuilder::new()
///     .generator(GeneratorKind::Ollama)
///     .gguf_model("models/llama-2-7b.Q2_K.gguf")
///     .max_new_tokens(64)
///     .build()
///     .expect("valid settings");
/// assert_eq!(settings.max_new_tokens, 64);
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    ner_model: Option<String>,
    generator: Option<GeneratorKind>,
    gguf_model: Option<PathBuf>,
    gguf_tokenizer: Option<String>,
    max_new_tokens: Option<usize>,
    seed: Option<u64>,
    wikipedia_api_url: Option<String>,
    wikipedia_rest_url: Option<String>,
    wikidata_api_url: Option<String>,
    http_timeout: Option<Duration>,
    ollama_host: Option<String>,
    ollama_model: Option<String>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ner_model(mut self, model: impl Into<String>) -> Self {
        self.ner_model = Some(model.into());
        self
    }

    pub fn generator(mut self, generator: GeneratorKind) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn gguf_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.gguf_model = Some(path.into());
        self
    }

    pub fn gguf_tokenizer(mut self, tokenizer: impl Into<String>) -> Self {
        self.gguf_tokenizer = Some(tokenizer.into());
        self
    }

    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = Some(max_new_tokens);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn wikipedia_api_url(mut self, url: impl Into<String>) -> Self {
        self.wikipedia_api_url = Some(url.into());
        self
    }

    pub fn wikipedia_rest_url(mut self, url: impl Into<String>) -> Self {
        self.wikipedia_rest_url = Some(url.into());
        self
    }

    pub fn wikidata_api_url(mut self, url: impl Into<String>) -> Self {
        self.wikidata_api_url = Some(url.into());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn ollama_host(mut self, url: impl Into<String>) -> Self {
        self.ollama_host = Some(url.into());
        self
    }

    pub fn ollama_model(mut self, model: impl Into<String>) -> Self {
        self.ollama_model = Some(model.into());
        self
    }

    /// Resolves every unset value from the environment or its default.
    pub fn build(self) -> Result<Settings, ConfigError> {
        let gguf_model = match self.gguf_model.or_else(|| env_var(ENV_GGUF_MODEL).map(PathBuf::from)) {
            Some(path) => path,
            None => default_gguf_model_path()?,
        };

        let max_new_tokens = match self.max_new_tokens {
            Some(n) => n,
            None => parse_env(ENV_MAX_NEW_TOKENS)?.unwrap_or(DEFAULT_MAX_NEW_TOKENS),
        };
        if max_new_tokens == 0 {
            return Err(ConfigError::invalid(
                ENV_MAX_NEW_TOKENS,
                "0",
                "must be at least 1",
            ));
        }

        let http_timeout = match self.http_timeout {
            Some(timeout) => Some(timeout),
            None => parse_env::<u64>(ENV_HTTP_TIMEOUT_SECS)?.map(Duration::from_secs),
        };

        Ok(Settings {
            ner_model: self
                .ner_model
                .or_else(|| env_var(ENV_NER_MODEL))
                .unwrap_or_else(|| DEFAULT_NER_MODEL.to_string()),
            generator: match self.generator {
                Some(kind) => kind,
                None => parse_env(ENV_GENERATOR)?.unwrap_or_default(),
            },
            gguf_model,
            gguf_tokenizer: self.gguf_tokenizer.or_else(|| env_var(ENV_GGUF_TOKENIZER)),
            max_new_tokens,
            seed: match self.seed {
                Some(seed) => seed,
                None => parse_env(ENV_SEED)?.unwrap_or(DEFAULT_SEED),
            },
            wikipedia_api_url: self
                .wikipedia_api_url
                .or_else(|| env_var(ENV_WIKIPEDIA_URL))
                .unwrap_or_else(|| DEFAULT_WIKIPEDIA_API_URL.to_string()),
            wikipedia_rest_url: self
                .wikipedia_rest_url
                .or_else(|| env_var(ENV_WIKIPEDIA_REST_URL))
                .unwrap_or_else(|| DEFAULT_WIKIPEDIA_REST_URL.to_string()),
            wikidata_api_url: self
                .wikidata_api_url
                .or_else(|| env_var(ENV_WIKIDATA_URL))
                .unwrap_or_else(|| DEFAULT_WIKIDATA_API_URL.to_string()),
            http_timeout,
            ollama_host: self
                .ollama_host
                .or_else(|| env_var(ENV_OLLAMA_HOST))
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            ollama_model: self.ollama_model.or_else(|| env_var(ENV_OLLAMA_MODEL)),
        })
    }
}

/// Returns `{data_dir}/qafact/models/llama-2-7b.Q2_K.gguf`.
///
/// `data_dir` is `~/.local/share` on Linux, `~/Library/Application Support` on
/// macOS and `%APPDATA%` on Windows.
pub fn default_gguf_model_path() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(data_dir.join("qafact").join("models").join(DEFAULT_GGUF_FILE))
}

/// Non-empty, trimmed value of an environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_var(name)
        .map(|value| {
            value
                .parse()
                .map_err(|e| ConfigError::invalid(name, &value, e))
        })
        .transpose()
}
