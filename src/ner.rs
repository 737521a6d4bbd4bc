//! Named-entity extraction.
//!
//! `EntityExtractor` abstracts the token-classification model so the pipeline
//! can be driven by a stub in tests; `BertNerExtractor` is the real implementation.

mod aggregation;
mod bert;

pub use aggregation::{EntitySpan, OUTSIDE_LABEL, TokenPrediction, aggregate_simple};
pub use bert::{BertNerExtractor, DEFAULT_NER_MODEL, NER_TOKENIZER_FILES, NER_WEIGHT_FILES};

use crate::model_source::ModelError;
use crate::models::EntitySet;

/// Maps text to the distinct entity surface strings it mentions.
pub trait EntityExtractor {
    fn extract(&self, text: &str) -> Result<EntitySet, ModelError>;
}
