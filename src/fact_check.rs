//! Heuristic verification of extracted answers.
//!
//! Yes/no answers are accepted whenever at least one entity was linked. Other
//! answers are compared against linked-entity URLs and confirmed by lexical
//! overlap between the question and the entity's Wikipedia summary.
//!
//! The answer extractor produces entity *names* while this check compares the
//! answer with entity *URLs*, so a named answer is never confirmed. That
//! mismatch is kept as-is; see DESIGN.md.

use tracing::{debug, warn};

use crate::knowledge::KnowledgeBase;
use crate::models::{Answer, LinkedEntity, Verdict};

/// Verifies answers against a knowledge base.
pub struct FactChecker<'a, K: KnowledgeBase + ?Sized> {
    knowledge: &'a K,
}

impl<'a, K: KnowledgeBase + ?Sized> FactChecker<'a, K> {
    pub fn new(knowledge: &'a K) -> Self {
        Self { knowledge }
    }

    pub fn check(
        &self,
        question: &str,
        answer: &Answer,
        linked_entities: &[LinkedEntity],
    ) -> Verdict {
        let answer = answer.as_str();

        if matches!(answer, "yes" | "no") {
            return if linked_entities.is_empty() {
                Verdict::Incorrect
            } else {
                Verdict::Correct
            };
        }

        for entity in linked_entities.iter().filter(|e| e.url() == answer) {
            match self.knowledge.page_summary(entity.name()) {
                Ok(summary) => {
                    if summary_supports(&summary, entity.name(), question) {
                        debug!(entity = entity.name(), "Summary supports the answer");
                        return Verdict::Correct;
                    }
                }
                Err(e) => {
                    warn!(entity = entity.name(), error = %e, "Error fetching evidence for entity");
                }
            }
        }

        Verdict::Incorrect
    }
}

/// The summary mentions the entity and every word of the question (case-insensitive).
fn summary_supports(summary: &str, entity_name: &str, question: &str) -> bool {
    let summary = summary.to_lowercase();
    summary.contains(&entity_name.to_lowercase())
        && question
            .split_whitespace()
            .all(|word| summary.contains(&word.to_lowercase()))
}
