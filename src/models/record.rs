use serde::Serialize;
use std::fmt;

use super::{Answer, EntitySet, LinkedEntity, Verdict};

/// Everything produced for a single question.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub question: String,
    pub input_entities: EntitySet,
    pub generated_text: String,
    pub output_entities: EntitySet,
    pub linked_entities: Vec<LinkedEntity>,
    pub answer: Answer,
    pub verdict: Verdict,
}

impl fmt::Display for ResultRecord {
    /// One field per line in the fixed report order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input (A): {}", self.question)?;
        writeln!(f, "Entities in Input (A): {}", self.input_entities)?;
        writeln!(f, "Raw Text (B): {}", self.generated_text)?;
        writeln!(f, "Entities in Raw Text (B): {}", self.output_entities)?;
        write!(f, "Linked Entities: [")?;
        for (i, entity) in self.linked_entities.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entity}")?;
        }
        writeln!(f, "]")?;
        writeln!(f, "Extracted Answer: {}", self.answer)?;
        writeln!(f, "Correctness: {}", self.verdict)
    }
}
