pub mod answerer;
pub mod config;
pub mod doctor;
pub mod fact_check;
pub mod generation;
pub mod knowledge;
pub mod linker;
pub mod logging;
pub mod model_source;
pub mod models;
pub mod ner;
pub mod ollama;
pub mod pipeline;
pub mod questions;

pub use answerer::AnswerExtractor;
pub use config::{GeneratorKind, Settings, SettingsBuilder};
pub use fact_check::FactChecker;
pub use generation::{GenerationError, GgufGenerator, OllamaGenerator, SamplingConfig, TextGenerator};
pub use knowledge::{KnowledgeBase, KnowledgeError, WikiClient, WikiClientBuilder};
pub use linker::EntityLinker;
pub use model_source::{ModelError, ModelSource};
pub use models::{Answer, EntitySet, LinkedEntity, ResultRecord, Verdict};
pub use ner::{BertNerExtractor, EntityExtractor};
pub use pipeline::{Pipeline, ReportFormat, RunSummary};
