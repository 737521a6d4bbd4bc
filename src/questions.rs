//! Question sources for a batch run.

use std::path::Path;

use anyhow::{Context, Result};

/// Questions processed when no other source is given.
pub const DEFAULT_QUESTIONS: [&str; 5] = [
    "Is Managua the capital of Nicaragua?",
    "Is it true that China is the country with most people in the world?",
    "The largest company in the world by revenue is Apple.",
    "Who is the director of Pulp Fiction?",
    "Is it true that the monarch of England is also the monarch of Canada?",
];

/// Returns the built-in questions as owned strings.
pub fn default_questions() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

/// Reads one question per line from `path`.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
pub fn load_questions(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read questions file: {}", path.display()))?;
    Ok(parse_questions(&content))
}

/// Parses questions from file contents. See `load_questions`.
pub fn parse_questions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
