use serde::{Deserialize, Serialize};
use std::fmt;

/// A set of distinct entity surface strings.
///
/// Duplicates collapse on insert. Iteration follows first-seen order so that
/// everything downstream of extraction (linking, answer precedence) is
/// reproducible between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySet(Vec<String>);

impl EntitySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a surface string, returning `false` if it was already present.
    pub fn insert(&mut self, entity: impl Into<String>) -> bool {
        let entity = entity.into();
        if self.contains(&entity) {
            return false;
        }
        self.0.push(entity);
        true
    }

    /// Returns true if the exact surface string is present.
    pub fn contains(&self, entity: &str) -> bool {
        self.0.iter().any(|e| e == entity)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the entities in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for EntitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for EntitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, entity) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entity:?}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let set: EntitySet = ["Managua", "Nicaragua", "Managua"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("Managua"));
        assert!(set.contains("Nicaragua"));
    }

    #[test]
    fn insert_reports_whether_entity_was_new() {
        let mut set = EntitySet::new();
        assert!(set.insert("Apple"));
        assert!(!set.insert("Apple"));
        // Matching is exact, not case-folded
        assert!(set.insert("apple"));
    }

    #[test]
    fn iteration_follows_first_seen_order() {
        let set: EntitySet = ["Canada", "England", "Canada", "China"]
            .into_iter()
            .collect();
        let items: Vec<&str> = set.iter().collect();
        assert_eq!(items, vec!["Canada", "England", "China"]);
    }

    #[test]
    fn display_renders_quoted_list() {
        let set: EntitySet = ["Pulp Fiction", "Quentin Tarantino"].into_iter().collect();
        assert_eq!(set.to_string(), r#"["Pulp Fiction", "Quentin Tarantino"]"#);
        assert_eq!(EntitySet::new().to_string(), "[]");
    }

    #[test]
    fn serializes_as_plain_array() {
        let set: EntitySet = ["China"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["China"]"#);
    }
}
