//! Health checks for the `doctor` command.
//!
//! Verifies that model artifacts resolve, that the Wikimedia endpoints answer,
//! and, for the Ollama backend, that the server is reachable and has a model.

use std::path::Path;

use crate::config::{GeneratorKind, Settings};
use crate::knowledge::KnowledgeBase;
use crate::model_source::ModelSource;
use crate::ner::{NER_TOKENIZER_FILES, NER_WEIGHT_FILES};

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Title probed against every knowledge endpoint.
const PROBE_TITLE: &str = "Nicaragua";

/// Health status for a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Component is healthy
    Ok,
    /// Component has a warning but is functional
    Warning(String),
    /// Component is not functional
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HealthStatus::Error(_))
    }
}

/// Outcome of one check.
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub status: HealthStatus,
    /// Path, URL or other context shown dimmed under the check
    pub detail: Option<String>,
}

impl Check {
    fn new(name: impl Into<String>, status: HealthStatus, detail: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail,
        }
    }
}

/// Checks grouped under section headings, in print order.
#[derive(Debug, Default)]
pub struct HealthReport {
    pub sections: Vec<(String, Vec<Check>)>,
}

impl HealthReport {
    /// True unless some check failed outright. Warnings are allowed.
    pub fn is_healthy(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|(_, checks)| checks)
            .all(|check| !check.status.is_error())
    }
}

// ============================================================================
// Health Check Functions
// ============================================================================

/// Runs every check for `settings` against `knowledge`.
pub fn run_health_checks(settings: &Settings, knowledge: &dyn KnowledgeBase) -> HealthReport {
    let ner_source = ModelSource::parse(&settings.ner_model);
    let mut report = HealthReport::default();

    report.sections.push((
        "Entity model".to_string(),
        check_model_source(
            &ner_source,
            &[&["config.json"], &NER_TOKENIZER_FILES, &NER_WEIGHT_FILES],
        ),
    ));

    let generator_checks = match settings.generator {
        GeneratorKind::Gguf => {
            let tokenizer = settings.gguf_tokenizer_source();
            let mut checks = vec![check_gguf_model(&settings.gguf_model)];
            checks.extend(check_model_source(&tokenizer, &[&["tokenizer.json"]]));
            checks
        }
        GeneratorKind::Ollama => vec![check_ollama(settings)],
    };
    report.sections.push((
        format!("Text generator ({})", settings.generator),
        generator_checks,
    ));

    report
        .sections
        .push(("Knowledge sources".to_string(), check_knowledge(knowledge)));

    report
}

/// One check per file group; a group passes when any of its files is available.
///
/// Hub files that are not cached yet are a warning, since the first run downloads them.
fn check_model_source(source: &ModelSource, groups: &[&[&str]]) -> Vec<Check> {
    groups
        .iter()
        .map(|files| {
            let name = files.join(" or ");
            match files.iter().find_map(|file| source.cached(file)) {
                Some(path) => Check::new(name, HealthStatus::Ok, Some(path.display().to_string())),
                None => {
                    let status = match source {
                        ModelSource::Hub { .. } => HealthStatus::Warning(
                            "Not cached; downloaded on first run".to_string(),
                        ),
                        ModelSource::Local(_) => HealthStatus::Error("Not found".to_string()),
                    };
                    Check::new(name, status, Some(source.to_string()))
                }
            }
        })
        .collect()
}

fn check_gguf_model(path: &Path) -> Check {
    let detail = Some(path.display().to_string());
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Check::new(
            format!("GGUF model ({:.1} GiB)", meta.len() as f64 / GIB),
            HealthStatus::Ok,
            detail,
        ),
        Ok(_) => Check::new(
            "GGUF model",
            HealthStatus::Error("Not a file".to_string()),
            detail,
        ),
        Err(e) => Check::new("GGUF model", HealthStatus::Error(e.to_string()), detail),
    }
}

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn check_ollama(settings: &Settings) -> Check {
    let client = match settings.ollama_client() {
        Ok(c) => c,
        Err(e) => {
            return Check::new(
                "Ollama",
                HealthStatus::Error(format!("Failed to build client: {e}")),
                None,
            );
        }
    };

    let base_url = client.base_url().to_string();

    match client.list_models() {
        Ok(models) => Check::new(
            "Ollama",
            ollama_status(&models, client.model()),
            Some(format!("{base_url} [{}]", models_display(&models))),
        ),
        Err(e) => Check::new(
            "Ollama",
            HealthStatus::Error(format!("Connection failed: {e}")),
            Some(base_url),
        ),
    }
}

/// A run cannot start without an installed model, or with a configured one missing.
fn ollama_status(installed: &[String], configured: &str) -> HealthStatus {
    if installed.is_empty() {
        HealthStatus::Error("No models installed".to_string())
    } else if !configured.is_empty() && !installed.iter().any(|m| m == configured) {
        HealthStatus::Error(format!("Model '{configured}' not installed"))
    } else {
        HealthStatus::Ok
    }
}

fn models_display(models: &[String]) -> String {
    if models.len() > 3 {
        format!("{}, ... ({} more)", models[..3].join(", "), models.len() - 3)
    } else {
        models.join(", ")
    }
}

/// Probes entity search, page lookup and page summary with a well-known title.
fn check_knowledge(knowledge: &dyn KnowledgeBase) -> Vec<Check> {
    let search = match knowledge.search_entities(PROBE_TITLE) {
        Ok(candidates) if candidates.is_empty() => {
            HealthStatus::Warning(format!("No candidates for '{PROBE_TITLE}'"))
        }
        Ok(_) => HealthStatus::Ok,
        Err(e) => HealthStatus::Error(e.to_string()),
    };

    let (page, url) = match knowledge.page_url(PROBE_TITLE) {
        Ok(Some(url)) => (HealthStatus::Ok, Some(url)),
        Ok(None) => (
            HealthStatus::Warning(format!("No page for '{PROBE_TITLE}'")),
            None,
        ),
        Err(e) => (HealthStatus::Error(e.to_string()), None),
    };

    let summary = match knowledge.page_summary(PROBE_TITLE) {
        Ok(extract) if extract.is_empty() => {
            HealthStatus::Warning(format!("Empty summary for '{PROBE_TITLE}'"))
        }
        Ok(_) => HealthStatus::Ok,
        Err(e) => HealthStatus::Error(e.to_string()),
    };

    vec![
        Check::new("Wikidata entity search", search, None),
        Check::new("Wikipedia page lookup", page, url),
        Check::new("Wikipedia page summary", summary, None),
    ]
}

// ============================================================================
// Pretty Printing
// ============================================================================

fn status_symbol(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "\u{2713}",
        HealthStatus::Warning(_) => "!",
        HealthStatus::Error(_) => "\u{2717}",
    }
}

fn status_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => GREEN,
        HealthStatus::Warning(_) => YELLOW,
        HealthStatus::Error(_) => RED,
    }
}

pub fn print_health_report(report: &HealthReport) {
    println!("{}qafact doctor{}", BOLD, RESET);
    println!();

    for (title, checks) in &report.sections {
        println!("{}{}{}", BOLD, title, RESET);
        for check in checks {
            let status_text = match &check.status {
                HealthStatus::Ok => "OK",
                HealthStatus::Warning(w) => w.as_str(),
                HealthStatus::Error(e) => e.as_str(),
            };
            println!(
                "  {}{}{} {}: {}",
                status_color(&check.status),
                status_symbol(&check.status),
                RESET,
                check.name,
                status_text
            );
            if let Some(detail) = &check.detail {
                println!("    {}{}{}", DIM, detail, RESET);
            }
        }
        println!();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{KnowledgeError, SearchCandidate};

    struct HealthyKnowledge;

    impl KnowledgeBase for HealthyKnowledge {
        fn search_entities(&self, name: &str) -> Result<Vec<SearchCandidate>, KnowledgeError> {
            Ok(vec![SearchCandidate::new(name, Some("country in Central America"))])
        }

        fn page_url(&self, title: &str) -> Result<Option<String>, KnowledgeError> {
            Ok(Some(format!("https://en.wikipedia.org/wiki/{title}")))
        }

        fn page_summary(&self, title: &str) -> Result<String, KnowledgeError> {
            Ok(format!("{title} is a country."))
        }
    }

    struct UnreachableKnowledge;

    impl KnowledgeBase for UnreachableKnowledge {
        fn search_entities(&self, _name: &str) -> Result<Vec<SearchCandidate>, KnowledgeError> {
            Err(KnowledgeError::InvalidUrl("offline".to_string()))
        }

        fn page_url(&self, _title: &str) -> Result<Option<String>, KnowledgeError> {
            Ok(None)
        }

        fn page_summary(&self, _title: &str) -> Result<String, KnowledgeError> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_health_status_is_ok() {
        assert!(HealthStatus::Ok.is_ok());
        assert!(!HealthStatus::Warning("test".into()).is_ok());
        assert!(!HealthStatus::Error("test".into()).is_ok());
        assert!(HealthStatus::Error("test".into()).is_error());
    }

    #[test]
    fn test_check_knowledge_all_ok() {
        let checks = check_knowledge(&HealthyKnowledge);
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.status.is_ok()));
        assert_eq!(
            checks[1].detail.as_deref(),
            Some("https://en.wikipedia.org/wiki/Nicaragua")
        );
    }

    #[test]
    fn test_check_knowledge_reports_failures() {
        let checks = check_knowledge(&UnreachableKnowledge);
        assert!(checks[0].status.is_error());
        assert!(matches!(checks[1].status, HealthStatus::Warning(_)));
        assert!(matches!(checks[2].status, HealthStatus::Warning(_)));
    }

    #[test]
    fn test_check_model_source_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("pytorch_model.bin"), b"weights").unwrap();
        let source = ModelSource::Local(dir.path().to_path_buf());

        let checks = check_model_source(
            &source,
            &[&["config.json"], &NER_TOKENIZER_FILES, &NER_WEIGHT_FILES],
        );

        assert!(checks[0].status.is_ok());
        assert!(checks[1].status.is_error());
        assert_eq!(checks[2].name, "model.safetensors or pytorch_model.bin");
        assert!(checks[2].status.is_ok());
    }

    #[test]
    fn test_check_model_source_accepts_vocab_only_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vocab.txt"), "[PAD]\n[UNK]\n").unwrap();
        let source = ModelSource::Local(dir.path().to_path_buf());

        let checks = check_model_source(&source, &[&NER_TOKENIZER_FILES]);

        assert_eq!(checks[0].name, "tokenizer.json or vocab.txt");
        assert!(checks[0].status.is_ok());
        let expected = dir.path().join("vocab.txt").display().to_string();
        assert_eq!(checks[0].detail.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_ollama_status_missing_models_are_errors() {
        let installed = vec!["llama2:13b".to_string(), "llama2:7b".to_string()];

        assert!(ollama_status(&installed, "").is_ok());
        assert!(ollama_status(&installed, "llama2:7b").is_ok());
        assert_eq!(
            ollama_status(&installed, "mistral"),
            HealthStatus::Error("Model 'mistral' not installed".to_string())
        );
        assert!(ollama_status(&[], "").is_error());
        assert!(ollama_status(&[], "llama2:7b").is_error());
    }

    #[test]
    fn test_check_gguf_model_missing() {
        let dir = tempfile::tempdir().unwrap();
        let check = check_gguf_model(&dir.path().join("missing.gguf"));
        assert!(check.status.is_error());
    }

    #[test]
    fn test_check_gguf_model_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.gguf");
        std::fs::write(&path, b"GGUF").unwrap();

        let check = check_gguf_model(&path);
        assert!(check.status.is_ok());
        assert!(check.name.starts_with("GGUF model"));
    }

    #[test]
    fn test_report_health_ignores_warnings() {
        let mut report = HealthReport::default();
        report.sections.push((
            "Section".to_string(),
            vec![Check::new(
                "warning",
                HealthStatus::Warning("meh".to_string()),
                None,
            )],
        ));
        assert!(report.is_healthy());

        report.sections[0]
            .1
            .push(Check::new("broken", HealthStatus::Error("x".to_string()), None));
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_models_display_truncates() {
        let models: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(models_display(&models), "a, b, c, ... (2 more)");
        assert_eq!(models_display(&models[..2]), "a, b");
    }
}
