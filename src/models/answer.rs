use serde::{Serialize, Serializer};
use std::fmt;

/// Text reported when neither extraction branch produced an answer.
pub const ANSWER_NOT_FOUND: &str = "Answer not found";

/// Short-form answer extracted from generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Name of a linked entity found in the generated text
    Entity(String),
    NotFound,
}

impl Answer {
    /// Returns the report form of the answer.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Entity(name) => name,
            Self::NotFound => ANSWER_NOT_FOUND,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fact-checking verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => write!(f, "correct"),
            Self::Incorrect => write!(f, "incorrect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_report_forms() {
        assert_eq!(Answer::Yes.to_string(), "yes");
        assert_eq!(Answer::No.to_string(), "no");
        assert_eq!(Answer::Entity("Apple".into()).to_string(), "Apple");
        assert_eq!(Answer::NotFound.to_string(), "Answer not found");
    }

    #[test]
    fn answer_and_verdict_serialize_as_strings() {
        assert_eq!(serde_json::to_string(&Answer::NotFound).unwrap(), r#""Answer not found""#);
        assert_eq!(serde_json::to_string(&Verdict::Correct).unwrap(), r#""correct""#);
        assert_eq!(serde_json::to_string(&Verdict::Incorrect).unwrap(), r#""incorrect""#);
    }
}
