use serde::{Deserialize, Serialize};
use std::fmt;

/// An entity that was disambiguated and resolved to a reference page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEntity {
    /// Disambiguated label (or the raw surface string when no candidate matched)
    name: String,
    /// Canonical encyclopedia URL
    url: String,
    /// Knowledge-base description, or the "no disambiguation" marker
    description: String,
}

impl LinkedEntity {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: description.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for LinkedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {:?}, {:?})",
            self.name, self.url, self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_tuple() {
        let entity = LinkedEntity::new(
            "Managua",
            "https://en.wikipedia.org/wiki/Managua",
            "capital city of Nicaragua",
        );
        assert_eq!(
            entity.to_string(),
            r#"("Managua", "https://en.wikipedia.org/wiki/Managua", "capital city of Nicaragua")"#
        );
    }
}
