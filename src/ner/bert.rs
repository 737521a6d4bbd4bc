//! BERT token-classification model loaded through candle.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{D, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use serde::Deserialize;
use tokenizers::decoders::wordpiece::WordPiece as WordPieceDecoder;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{Model as _, Tokenizer, TokenizerBuilder};
use tracing::{debug, info};

use crate::model_source::{ModelError, ModelSource};
use crate::models::EntitySet;

use super::EntityExtractor;
use super::aggregation::{OUTSIDE_LABEL, TokenPrediction, aggregate_simple};

/// CoNLL-2003 fine-tuned BERT used when no model is configured.
pub const DEFAULT_NER_MODEL: &str = "dbmdz/bert-large-cased-finetuned-conll03-english";

/// Weight files in order of preference.
pub const NER_WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

/// Tokenizer files in order of preference. Older checkpoints ship only a
/// WordPiece `vocab.txt`.
pub const NER_TOKENIZER_FILES: [&str; 2] = ["tokenizer.json", "vocab.txt"];

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";
const UNK_TOKEN: &str = "[UNK]";

/// The part of `config.json` describing the classification head.
#[derive(Debug, Deserialize)]
struct LabelConfig {
    id2label: HashMap<String, String>,
}

/// Named-entity recognizer backed by a BERT encoder and a linear token classifier.
pub struct BertNerExtractor {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    max_len: usize,
    device: Device,
}

impl BertNerExtractor {
    /// Loads config, tokenizer and weights from `source`.
    ///
    /// Any missing or malformed artifact is returned as an error; callers treat
    /// it as fatal.
    pub fn load(source: &ModelSource) -> Result<Self, ModelError> {
        info!(source = %source, "Loading token-classification model");
        let device = Device::Cpu;

        let config_path = source.fetch("config.json")?;
        let tokenizer_path = source.fetch_any(&NER_TOKENIZER_FILES)?;
        let weights_path = source.fetch_any(&NER_WEIGHT_FILES)?;

        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| ModelError::load("config.json", e))?;
        let config: Config =
            serde_json::from_str(&raw_config).map_err(|e| ModelError::load("config.json", e))?;
        let label_config: LabelConfig =
            serde_json::from_str(&raw_config).map_err(|e| ModelError::load("id2label", e))?;
        let labels = labels_by_id(label_config.id2label)?;
        debug!(labels = ?labels, "Token classification labels");

        let tokenizer = load_tokenizer(&tokenizer_path)?;

        let vb = load_weights(&weights_path, &device)?;
        let model = BertModel::load(vb.pp("bert"), &config)
            .map_err(|e| ModelError::load("BERT encoder", e))?;
        let classifier = candle_nn::linear(config.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| ModelError::load("classifier head", e))?;

        info!(num_labels = labels.len(), "Token-classification model loaded");

        Ok(Self {
            model,
            classifier,
            tokenizer,
            labels,
            max_len: config.max_position_embeddings,
            device,
        })
    }

    /// Runs the model and returns one prediction per token, special tokens included.
    pub fn predict(&self, text: &str) -> Result<Vec<TokenPrediction>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;

        let len = encoding.get_ids().len().min(self.max_len);
        let ids = &encoding.get_ids()[..len];
        let offsets = encoding.get_offsets();
        let special = encoding.get_special_tokens_mask();

        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        let logits = self.classifier.forward(&hidden)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec2::<f32>()?;

        Ok(probs
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let (label_id, score) = argmax(row);
                let (start, end) = offsets.get(i).copied().unwrap_or((0, 0));
                TokenPrediction {
                    label: self
                        .labels
                        .get(label_id)
                        .cloned()
                        .unwrap_or_else(|| OUTSIDE_LABEL.to_string()),
                    score,
                    start,
                    end,
                    special: special.get(i).is_some_and(|&m| m == 1),
                }
            })
            .collect())
    }
}

impl EntityExtractor for BertNerExtractor {
    fn extract(&self, text: &str) -> Result<EntitySet, ModelError> {
        let predictions = self.predict(text)?;
        Ok(collect_entities(text, &predictions))
    }
}

/// Aggregates predictions into spans and keeps each surface string once.
fn collect_entities(text: &str, predictions: &[TokenPrediction]) -> EntitySet {
    let spans = aggregate_simple(text, predictions);
    debug!(count = spans.len(), "Aggregated entity spans");
    spans.into_iter().map(|span| span.word).collect()
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer, ModelError> {
    if path.file_name().is_some_and(|name| name == "vocab.txt") {
        wordpiece_tokenizer(path)
    } else {
        Tokenizer::from_file(path).map_err(|e| ModelError::load("tokenizer.json", e))
    }
}

/// Builds a cased BERT tokenizer from a bare WordPiece vocabulary.
fn wordpiece_tokenizer(vocab: &Path) -> Result<Tokenizer, ModelError> {
    let vocab_path = vocab
        .to_str()
        .ok_or_else(|| ModelError::load("vocab.txt", "path is not valid UTF-8"))?;
    let wordpiece = WordPiece::from_file(vocab_path)
        .unk_token(UNK_TOKEN.to_string())
        .build()
        .map_err(|e| ModelError::load("vocab.txt", e))?;

    let special = |token: &str| {
        wordpiece
            .token_to_id(token)
            .map(|id| (token.to_string(), id))
            .ok_or_else(|| ModelError::load("vocab.txt", format!("missing {token} token")))
    };
    let processing = BertProcessing::new(special(SEP_TOKEN)?, special(CLS_TOKEN)?);

    let tokenizer = TokenizerBuilder::new()
        .with_model(wordpiece)
        .with_normalizer(Some(BertNormalizer::new(true, true, Some(false), false)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(processing))
        .with_decoder(Some(WordPieceDecoder::default()))
        .build()
        .map_err(|e| ModelError::load("vocab.txt", e))?;

    Ok(Tokenizer::from(tokenizer))
}

fn load_weights<'a>(path: &Path, device: &Device) -> Result<VarBuilder<'a>, ModelError> {
    let is_safetensors = path
        .extension()
        .is_some_and(|ext| ext == "safetensors");

    if is_safetensors {
        // SAFETY: the file is memory-mapped read-only and kept alive by the VarBuilder
        unsafe { VarBuilder::from_mmaped_safetensors(&[path], DTYPE, device) }
            .map_err(|e| ModelError::load("model.safetensors", e))
    } else {
        VarBuilder::from_pth(path, DTYPE, device)
            .map_err(|e| ModelError::load("pytorch_model.bin", e))
    }
}

/// Orders `id2label` by numeric id; ids must be dense from zero.
fn labels_by_id(id2label: HashMap<String, String>) -> Result<Vec<String>, ModelError> {
    let mut indexed = id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|id| (id, label))
                .map_err(|e| ModelError::load("id2label", format!("label id {id:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    indexed.sort_by_key(|(id, _)| *id);

    if indexed.is_empty() || indexed.iter().enumerate().any(|(i, (id, _))| i != *id) {
        return Err(ModelError::load(
            "id2label",
            "label ids must be contiguous and start at 0",
        ));
    }

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

fn argmax(row: &[f32]) -> (usize, f32) {
    row.iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best })
}
