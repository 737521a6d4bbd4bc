//! Short-form answer extraction from generated text.
//!
//! Yes/no questions are classified with ordered regular-expression cue lists;
//! other questions are answered with the first linked entity the text mentions.

mod extractor;

pub use extractor::{AnswerExtractor, YES_NO_LEADING_WORDS, is_yes_no_question};
