//! "Simple" aggregation of per-token label predictions into entity spans.
//!
//! Contiguous tokens sharing an entity type are merged into one span unless a
//! token opens a new entity with a `B-` tag. Tokens labelled `O` and special
//! tokens end the current span. The span text is sliced from the original input
//! between the first and last token offsets, so word-piece markers never leak
//! into entity names.

/// Label assigned to tokens outside any entity.
pub const OUTSIDE_LABEL: &str = "O";

/// Prediction for a single token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPrediction {
    pub label: String,
    pub score: f32,
    /// Byte offset of the token start in the source text
    pub start: usize,
    /// Byte offset one past the token end
    pub end: usize,
    /// `[CLS]`, `[SEP]` and similar
    pub special: bool,
}

/// A merged entity span.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpan {
    /// Entity type without the B-/I- prefix (e.g. `PER`, `LOC`)
    pub entity_group: String,
    pub word: String,
    /// Mean of the member token scores
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

/// Splits `B-PER` into `("B", "PER")`. Labels without a prefix count as inside tags.
fn split_label(label: &str) -> (&str, &str) {
    match label.split_once('-') {
        Some((prefix @ ("B" | "I"), tag)) => (prefix, tag),
        _ => ("I", label),
    }
}

struct OpenSpan<'a> {
    tag: &'a str,
    start: usize,
    end: usize,
    scores: Vec<f32>,
}

impl OpenSpan<'_> {
    fn close(self, text: &str) -> Option<EntitySpan> {
        let word = text.get(self.start..self.end)?.trim();
        if word.is_empty() {
            return None;
        }
        let score = self.scores.iter().sum::<f32>() / self.scores.len() as f32;
        Some(EntitySpan {
            entity_group: self.tag.to_string(),
            word: word.to_string(),
            score,
            start: self.start,
            end: self.end,
        })
    }
}

/// Groups token predictions into entity spans using the simple strategy.
pub fn aggregate_simple(text: &str, tokens: &[TokenPrediction]) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<OpenSpan<'_>> = None;

    for token in tokens {
        if token.special || token.label == OUTSIDE_LABEL {
            if let Some(span) = open.take().and_then(|s| s.close(text)) {
                spans.push(span);
            }
            continue;
        }

        let (bi, tag) = split_label(&token.label);
        match open.as_mut() {
            Some(span) if span.tag == tag && bi != "B" => {
                span.end = token.end;
                span.scores.push(token.score);
            }
            _ => {
                if let Some(span) = open.take().and_then(|s| s.close(text)) {
                    spans.push(span);
                }
                open = Some(OpenSpan {
                    tag,
                    start: token.start,
                    end: token.end,
                    scores: vec![token.score],
                });
            }
        }
    }

    if let Some(span) = open.and_then(|s| s.close(text)) {
        spans.push(span);
    }

    spans
}
