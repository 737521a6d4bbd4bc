//! Rule-based answer extraction.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::models::{Answer, LinkedEntity};

/// Question prefixes that mark a yes/no question.
pub const YES_NO_LEADING_WORDS: [&str; 7] = ["is", "does", "are", "was", "were", "can", "should"];

const AFFIRMATIVE_PATTERNS: [&str; 4] = [
    r"\b(yes|yeah|yep|correct|true|indeed|absolutely|definitely|of course)\b",
    r"it is",
    r"that's right",
    r"without a doubt",
];

const NEGATIVE_PATTERNS: [&str; 4] = [
    r"\b(no|nope|false|not at all|incorrect|never|absolutely not)\b",
    r"it is not",
    r"that's wrong",
    r"under no circumstances",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .unwrap()
        })
        .collect()
}

static AFFIRMATIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(&AFFIRMATIVE_PATTERNS));
static NEGATIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(&NEGATIVE_PATTERNS));

/// True when the lower-cased question starts with one of the yes/no leading words.
///
/// This is a plain prefix test, so "Isaac ..." also qualifies.
pub fn is_yes_no_question(question: &str) -> bool {
    let question = question.to_lowercase();
    YES_NO_LEADING_WORDS
        .iter()
        .any(|word| question.starts_with(word))
}

/// Classifies generated text into a short-form answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnswerExtractor;

impl AnswerExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the answer to `question` from `generated_text`.
    pub fn extract(
        &self,
        question: &str,
        generated_text: &str,
        linked_entities: &[LinkedEntity],
    ) -> Answer {
        if is_yes_no_question(question) {
            return classify_yes_no(generated_text);
        }

        linked_entities
            .iter()
            .find(|entity| generated_text.contains(entity.name()))
            .map(|entity| Answer::Entity(entity.name().to_string()))
            .unwrap_or(Answer::NotFound)
    }
}

/// Affirmative cues are checked first, so text containing both kinds is "yes".
fn classify_yes_no(text: &str) -> Answer {
    if AFFIRMATIVE.iter().any(|re| re.is_match(text)) {
        Answer::Yes
    } else if NEGATIVE.iter().any(|re| re.is_match(text)) {
        Answer::No
    } else {
        Answer::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(name: &str) -> LinkedEntity {
        LinkedEntity::new(
            name,
            format!("https://en.wikipedia.org/wiki/{name}"),
            "description",
        )
    }

    #[test]
    fn cue_patterns_compile() {
        assert_eq!(AFFIRMATIVE.len(), AFFIRMATIVE_PATTERNS.len());
        assert_eq!(NEGATIVE.len(), NEGATIVE_PATTERNS.len());
    }

    #[test]
    fn recognizes_yes_no_questions() {
        assert!(is_yes_no_question("Is Managua the capital of Nicaragua?"));
        assert!(is_yes_no_question("DOES water boil at 100C?"));
        assert!(is_yes_no_question("Were the Beatles British?"));
        assert!(is_yes_no_question("Should I go?"));
        assert!(!is_yes_no_question("Who is the director of Pulp Fiction?"));
        assert!(!is_yes_no_question(
            "The largest company in the world by revenue is Apple."
        ));
    }

    #[test]
    fn prefix_test_has_no_word_boundary() {
        assert!(is_yes_no_question("Isaac Newton discovered gravity."));
        assert!(is_yes_no_question("Canada is large."));
    }

    #[test]
    fn affirmative_cue_yields_yes() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "Is Managua the capital of Nicaragua?",
            "Is Managua the capital of Nicaragua? Yes, Managua is the capital of Nicaragua.",
            &[],
        );
        assert_eq!(answer, Answer::Yes);
    }

    #[test]
    fn negative_cue_yields_no() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "Was Napoleon tall?",
            "Was Napoleon tall? Nope, he was of average height.",
            &[],
        );
        assert_eq!(answer, Answer::No);
    }

    #[test]
    fn affirmative_wins_when_both_cues_present() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "Is the sky green?",
            "No. Well, yes at sunset maybe.",
            &[],
        );
        assert_eq!(answer, Answer::Yes);
    }

    #[test]
    fn it_is_not_counts_as_affirmative() {
        // "it is" is checked before "it is not" and matches the same text
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract("Is it raining?", "It is not raining today.", &[]);
        assert_eq!(answer, Answer::Yes);
    }

    #[test]
    fn word_boundaries_prevent_partial_matches() {
        let extractor = AnswerExtractor::new();
        // "know" and "yesterday" must not trigger "no"/"yes"
        let answer = extractor.extract("Can pigs fly?", "I know they flew yesterday.", &[]);
        assert_eq!(answer, Answer::NotFound);
    }

    #[test]
    fn yes_no_question_without_cues_is_not_found_even_with_entities() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "Is Managua the capital of Nicaragua?",
            "Managua sits on a lake.",
            &[linked("Managua")],
        );
        assert_eq!(answer, Answer::NotFound);
    }

    #[test]
    fn open_question_returns_first_mentioned_entity() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "Who is the director of Pulp Fiction?",
            "Who is the director of Pulp Fiction? Quentin Tarantino directed Pulp Fiction.",
            &[linked("Quentin Tarantino"), linked("Pulp Fiction")],
        );
        assert_eq!(answer, Answer::Entity("Quentin Tarantino".to_string()));
    }

    #[test]
    fn open_question_entity_match_is_case_sensitive_substring() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "Who founded apple?",
            "who founded apple? steve jobs.",
            &[linked("Apple Inc."), linked("Steve Jobs")],
        );
        assert_eq!(answer, Answer::NotFound);
    }

    #[test]
    fn open_question_without_entity_in_text_is_not_found() {
        let extractor = AnswerExtractor::new();
        let answer = extractor.extract(
            "The largest company in the world by revenue is Apple.",
            "The largest company in the world by revenue is Walmart, followed by Amazon.",
            &[linked("Apple Inc.")],
        );
        assert_eq!(answer, Answer::NotFound);
        assert_eq!(answer.to_string(), "Answer not found");
    }
}
