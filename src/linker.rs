//! Entity linking: disambiguation against Wikidata, then resolution to a Wikipedia URL.
//!
//! Disambiguation is a first-match heuristic. Candidates are scanned in the order
//! the search endpoint ranks them and the first one whose description mentions
//! any word of the context wins. It is lenient and order-dependent on purpose:
//! it reproduces the reference behaviour rather than ranking candidates.

use tracing::{debug, warn};

use crate::knowledge::{KnowledgeBase, SearchCandidate};
use crate::models::{EntitySet, LinkedEntity};

/// Description recorded when no candidate matched the context.
pub const NO_DISAMBIGUATION: &str = "No disambiguation found";

/// Links entity surface strings to reference pages.
pub struct EntityLinker<'a, K: KnowledgeBase + ?Sized> {
    knowledge: &'a K,
}

impl<'a, K: KnowledgeBase + ?Sized> EntityLinker<'a, K> {
    pub fn new(knowledge: &'a K) -> Self {
        Self { knowledge }
    }

    /// Picks a `(label, description)` for `entity` using `context` words.
    ///
    /// Falls back to `(entity, NO_DISAMBIGUATION)` when nothing matches or the
    /// search call fails.
    pub fn disambiguate(&self, entity: &str, context: &str) -> (String, String) {
        match self.knowledge.search_entities(entity) {
            Ok(candidates) => {
                if let Some(candidate) = first_matching_candidate(&candidates, context) {
                    debug!(entity, label = %candidate.label, "Disambiguated entity");
                    return (
                        candidate.label.clone(),
                        candidate.description_or_empty().to_string(),
                    );
                }
                debug!(
                    entity,
                    candidates = candidates.len(),
                    "No candidate description matched the context"
                );
            }
            Err(e) => {
                warn!(entity, error = %e, "Entity search failed");
            }
        }
        (entity.to_string(), NO_DISAMBIGUATION.to_string())
    }

    /// Looks up the canonical page URL for `title`.
    ///
    /// Lookup failures are logged and reported as no link.
    pub fn resolve_reference(&self, title: &str) -> Option<String> {
        match self.knowledge.page_url(title) {
            Ok(url) => url,
            Err(e) => {
                warn!(entity = title, error = %e, "Error querying Wikipedia for entity");
                None
            }
        }
    }

    /// Links every entity in `entities`, keeping only those with a reference URL.
    ///
    /// Output order follows the iteration order of `entities`.
    pub fn link(&self, entities: &EntitySet, context: &str) -> Vec<LinkedEntity> {
        entities
            .iter()
            .filter_map(|entity| {
                let (name, description) = self.disambiguate(entity, context);
                let url = self.resolve_reference(&name)?;
                Some(LinkedEntity::new(name, url, description))
            })
            .collect()
    }
}

/// First candidate whose description contains any whitespace-delimited context
/// word, compared case-insensitively as substrings.
fn first_matching_candidate<'c>(
    candidates: &'c [SearchCandidate],
    context: &str,
) -> Option<&'c SearchCandidate> {
    let words: Vec<String> = context.split_whitespace().map(str::to_lowercase).collect();
    candidates.iter().find(|candidate| {
        let description = candidate.description_or_empty().to_lowercase();
        words.iter().any(|word| description.contains(word.as_str()))
    })
}
