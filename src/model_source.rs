//! Resolution of on-disk model artifacts.
//!
//! A model is named either by a local path (directory or single file) or by a
//! Hugging Face Hub repository id such as `dbmdz/bert-large-cased-finetuned-conll03-english`.
//! Hub artifacts are fetched once into the local Hugging Face cache.

use std::fmt;
use std::path::{Path, PathBuf};

use hf_hub::Cache;
use hf_hub::api::sync::Api;
use thiserror::Error;
use tracing::debug;

/// Errors raised while locating or loading model artifacts.
///
/// Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A required artifact does not exist
    #[error("Model file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Hub download or cache failure
    #[error("Hugging Face Hub error for {repo}: {message}")]
    Hub { repo: String, message: String },

    /// Artifact exists but could not be read or parsed
    #[error("Failed to load {what}: {message}")]
    Load { what: String, message: String },

    /// Tokenization or detokenization failure
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Tensor computation failure during inference
    #[error("Inference error: {0}")]
    Inference(#[from] candle_core::Error),
}

impl ModelError {
    pub(crate) fn load(what: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Load {
            what: what.into(),
            message: err.to_string(),
        }
    }
}

/// Where a model's artifacts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A local directory, or a single local file
    Local(PathBuf),
    /// A Hugging Face Hub model repository
    Hub { repo: String },
}

impl ModelSource {
    /// Interprets a user-supplied model reference.
    ///
    /// Existing local paths win. Otherwise an `owner/name` string with no other
    /// separators is treated as a Hub repository id; anything else is kept as a
    /// (missing) local path so loading reports it clearly.
    pub fn parse(reference: &str) -> Self {
        let path = Path::new(reference);
        if path.exists() {
            return Self::Local(path.to_path_buf());
        }

        if looks_like_repo_id(reference) {
            return Self::Hub {
                repo: reference.to_string(),
            };
        }

        Self::Local(path.to_path_buf())
    }

    /// Returns the local path of `file` within this source, downloading it if needed.
    pub fn fetch(&self, file: &str) -> Result<PathBuf, ModelError> {
        match self {
            Self::Local(path) => {
                let candidate = local_candidate(path, file);
                if candidate.is_file() {
                    Ok(candidate)
                } else {
                    Err(ModelError::MissingFile { path: candidate })
                }
            }
            Self::Hub { repo } => {
                debug!(repo = %repo, file, "fetching model artifact from hub");
                let api = Api::new().map_err(|e| ModelError::Hub {
                    repo: repo.clone(),
                    message: e.to_string(),
                })?;
                api.model(repo.clone())
                    .get(file)
                    .map_err(|e| ModelError::Hub {
                        repo: repo.clone(),
                        message: format!("{file}: {e}"),
                    })
            }
        }
    }

    /// Returns the local path of `file` if it is available without downloading.
    pub fn cached(&self, file: &str) -> Option<PathBuf> {
        match self {
            Self::Local(path) => Some(local_candidate(path, file)).filter(|p| p.is_file()),
            Self::Hub { repo } => Cache::default().model(repo.clone()).get(file),
        }
    }

    /// Fetches the first of `files` that the source provides.
    ///
    /// Used for weights that ship in more than one format.
    pub fn fetch_any(&self, files: &[&str]) -> Result<PathBuf, ModelError> {
        let mut last_error = None;
        for file in files {
            match self.fetch(file) {
                Ok(path) => return Ok(path),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| ModelError::Load {
            what: "model weights".to_string(),
            message: "no candidate files given".to_string(),
        }))
    }
}

fn local_candidate(path: &Path, file: &str) -> PathBuf {
    if path.is_dir() {
        path.join(file)
    } else if path.file_name().is_some_and(|name| name == file) {
        path.to_path_buf()
    } else if path.is_file() || path.extension().is_some() {
        // Single-file source: companion files live next to it
        path.with_file_name(file)
    } else {
        path.join(file)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Hub { repo } => write!(f, "hf://{repo}"),
        }
    }
}

fn looks_like_repo_id(reference: &str) -> bool {
    let mut parts = reference.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => {
            let valid = |s: &str| {
                !s.is_empty()
                    && !s.starts_with('.')
                    && s.chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            };
            valid(owner) && valid(name)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_treats_owner_slash_name_as_hub_repo() {
        let source = ModelSource::parse("dbmdz/bert-large-cased-finetuned-conll03-english");
        assert_eq!(
            source,
            ModelSource::Hub {
                repo: "dbmdz/bert-large-cased-finetuned-conll03-english".to_string()
            }
        );
    }

    #[test]
    fn parse_prefers_existing_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().to_string_lossy().to_string();
        assert_eq!(
            ModelSource::parse(&reference),
            ModelSource::Local(dir.path().to_path_buf())
        );
    }

    #[test]
    fn parse_keeps_missing_absolute_paths_local() {
        let source = ModelSource::parse("/nonexistent/models/llama.gguf");
        assert!(matches!(source, ModelSource::Local(_)));
    }

    #[test]
    fn fetch_from_directory_finds_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let source = ModelSource::Local(dir.path().to_path_buf());
        let path = source.fetch("config.json").unwrap();
        assert_eq!(path, dir.path().join("config.json"));
    }

    #[test]
    fn fetch_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::Local(dir.path().to_path_buf());

        match source.fetch("tokenizer.json") {
            Err(ModelError::MissingFile { path }) => {
                assert_eq!(path, dir.path().join("tokenizer.json"));
            }
            other => panic!("Expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn fetch_any_falls_back_to_later_candidates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pytorch_model.bin"), b"weights").unwrap();

        let source = ModelSource::Local(dir.path().to_path_buf());
        let path = source
            .fetch_any(&["model.safetensors", "pytorch_model.bin"])
            .unwrap();
        assert!(path.ends_with("pytorch_model.bin"));
    }

    #[test]
    fn single_file_source_resolves_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("llama.gguf");
        std::fs::write(&model, b"gguf").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

        let source = ModelSource::Local(model.clone());
        assert_eq!(source.fetch("llama.gguf").unwrap(), model);
        assert_eq!(
            source.fetch("tokenizer.json").unwrap(),
            dir.path().join("tokenizer.json")
        );
    }

    #[test]
    fn cached_local_lookup_never_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let source = ModelSource::Local(dir.path().to_path_buf());
        assert_eq!(
            source.cached("config.json"),
            Some(dir.path().join("config.json"))
        );
        assert_eq!(source.cached("tokenizer.json"), None);
    }

    #[test]
    fn missing_file_error_message_names_path() {
        let err = ModelError::MissingFile {
            path: PathBuf::from("/models/missing.gguf"),
        };
        assert_eq!(err.to_string(), "Model file not found: /models/missing.gguf");
    }
}
