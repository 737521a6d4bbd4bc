//! Question-answering and fact-checking pipeline.
//!
//! `Pipeline` owns the long-lived model handles and the knowledge-base client
//! and runs every question through the same fixed sequence of stages.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::answerer::AnswerExtractor;
use crate::fact_check::FactChecker;
use crate::generation::TextGenerator;
use crate::knowledge::KnowledgeBase;
use crate::linker::EntityLinker;
use crate::models::{ResultRecord, Verdict};
use crate::ner::EntityExtractor;

/// How result records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// `Processing:` header, `Result:` and one `key: value` line per field
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Verdict counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub correct: usize,
    pub incorrect: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.correct + self.incorrect
    }

    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Correct => self.correct += 1,
            Verdict::Incorrect => self.incorrect += 1,
        }
    }
}

/// Runs questions through extraction, generation, linking, answering and checking.
///
/// # Examples
///
/// ```no_run
/// use qafact::{BertNerExtractor, GgufGenerator, ModelSource, Pipeline, SamplingConfig};
/// use qafact::knowledge::WikiClientBuilder;
///
/// # fn main() -> anyhow::Result<()> {
/// let ner = BertNerExtractor::load(&ModelSource::parse("dbmdz/bert-large-cased-finetuned-conll03-english"))?;
/// let model = std::path::Path::new("models/llama-2-7b.Q2_K.gguf");
/// let generator = GgufGenerator::load(model, &ModelSource::Local(model.into()), 128, SamplingConfig::default())?;
/// let knowledge = WikiClientBuilder::new().build()?;
///
/// let mut pipeline = Pipeline::new(Box::new(ner), Box::new(generator), Box::new(knowledge));
/// let record = pipeline.process_question("Is Managua the capital of Nicaragua?")?;
/// println!("{record}");
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    extractor: Box<dyn EntityExtractor>,
    generator: Box<dyn TextGenerator>,
    knowledge: Box<dyn KnowledgeBase>,
    answerer: AnswerExtractor,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn EntityExtractor>,
        generator: Box<dyn TextGenerator>,
        knowledge: Box<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            extractor,
            generator,
            knowledge,
            answerer: AnswerExtractor::new(),
        }
    }

    /// Processes one question into a result record.
    ///
    /// Model failures are returned as errors. Knowledge-base failures are logged
    /// by the linker and fact checker and only degrade the record.
    pub fn process_question(&mut self, question: &str) -> Result<ResultRecord> {
        let input_entities = self
            .extractor
            .extract(question)
            .context("Entity extraction failed for the question")?;
        debug!(entities = %input_entities, "Entities in question");

        let generated_text = self
            .generator
            .generate(question)
            .context("Text generation failed")?;

        let output_entities = self
            .extractor
            .extract(&generated_text)
            .context("Entity extraction failed for the generated text")?;
        debug!(entities = %output_entities, "Entities in generated text");

        let linked_entities = EntityLinker::new(self.knowledge.as_ref())
            .link(&output_entities, question);
        debug!(linked = linked_entities.len(), "Entities linked");

        let answer = self
            .answerer
            .extract(question, &generated_text, &linked_entities);
        let verdict =
            FactChecker::new(self.knowledge.as_ref()).check(question, &answer, &linked_entities);

        Ok(ResultRecord {
            question: question.to_string(),
            input_entities,
            generated_text,
            output_entities,
            linked_entities,
            answer,
            verdict,
        })
    }

    /// Processes `questions` in order and writes one report entry per question.
    ///
    /// Stops at the first model failure.
    pub fn run<W: Write>(
        &mut self,
        questions: &[String],
        out: &mut W,
        format: ReportFormat,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for (i, question) in questions.iter().enumerate() {
            let header = processing_header(i, question);
            match format {
                ReportFormat::Text => {
                    writeln!(out, "{header}")?;
                    out.flush()?;
                }
                ReportFormat::Json => info!("{header}"),
            }

            let record = self.process_question(question)?;
            summary.record(record.verdict);
            write_record(out, &record, format)?;
        }

        info!(
            questions = summary.total(),
            correct = summary.correct,
            incorrect = summary.incorrect,
            "Run finished"
        );
        Ok(summary)
    }
}

/// `Processing: question-NNN <question>` with a 1-based, zero-padded index.
pub fn processing_header(index: usize, question: &str) -> String {
    format!("Processing: question-{:03} {question}", index + 1)
}

fn write_record<W: Write>(out: &mut W, record: &ResultRecord, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Text => {
            writeln!(out, "Result:")?;
            write!(out, "{record}")?;
            writeln!(out)?;
        }
        ReportFormat::Json => {
            serde_json::to_writer(&mut *out, record).context("Failed to serialize result")?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationError;
    use crate::knowledge::{KnowledgeError, SearchCandidate};
    use crate::model_source::ModelError;
    use crate::models::{Answer, EntitySet};

    /// Treats every capitalised word as an entity.
    struct CapitalisedWords;

    impl EntityExtractor for CapitalisedWords {
        fn extract(&self, text: &str) -> Result<EntitySet, ModelError> {
            Ok(text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
                .collect())
        }
    }

    struct CannedGenerator(&'static str);

    impl TextGenerator for CannedGenerator {
        fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
            Ok(format!("{prompt}{}", self.0))
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn generate(&mut self, _prompt: &str) -> Result<String, GenerationError> {
            Err(ModelError::Tokenizer("vocabulary missing".to_string()).into())
        }
    }

    /// Every title resolves to a page; no search candidates.
    struct EveryPageExists;

    impl KnowledgeBase for EveryPageExists {
        fn search_entities(&self, _name: &str) -> Result<Vec<SearchCandidate>, KnowledgeError> {
            Ok(Vec::new())
        }

        fn page_url(&self, title: &str) -> Result<Option<String>, KnowledgeError> {
            Ok(Some(format!("https://en.wikipedia.org/wiki/{title}")))
        }

        fn page_summary(&self, _title: &str) -> Result<String, KnowledgeError> {
            Ok(String::new())
        }
    }

    fn pipeline(generator: impl TextGenerator + 'static) -> Pipeline {
        Pipeline::new(
            Box::new(CapitalisedWords),
            Box::new(generator),
            Box::new(EveryPageExists),
        )
    }

    #[test]
    fn processing_header_is_one_based_and_zero_padded() {
        assert_eq!(
            processing_header(0, "Is Managua the capital of Nicaragua?"),
            "Processing: question-001 Is Managua the capital of Nicaragua?"
        );
        assert_eq!(processing_header(41, "Q"), "Processing: question-042 Q");
        assert_eq!(processing_header(999, "Q"), "Processing: question-1000 Q");
    }

    #[test]
    fn process_question_links_entities_from_generated_text() {
        let mut pipeline = pipeline(CannedGenerator(" Yes, Managua is the capital city."));

        let record = pipeline
            .process_question("Is Managua the capital of Nicaragua?")
            .unwrap();

        assert_eq!(
            record.input_entities.iter().collect::<Vec<_>>(),
            vec!["Is", "Managua", "Nicaragua"]
        );
        assert!(record.output_entities.contains("Yes"));
        assert_eq!(
            record.generated_text,
            "Is Managua the capital of Nicaragua? Yes, Managua is the capital city."
        );
        assert_eq!(record.linked_entities.len(), record.output_entities.len());
        assert_eq!(record.answer, Answer::Yes);
        assert_eq!(record.verdict, Verdict::Correct);
    }

    #[test]
    fn process_question_propagates_generation_failure() {
        let mut pipeline = pipeline(FailingGenerator);
        let err = pipeline.process_question("Who wrote Hamlet?").unwrap_err();
        assert!(err.to_string().contains("Text generation failed"));
    }

    #[test]
    fn run_writes_text_report() {
        let mut pipeline = pipeline(CannedGenerator(" Quentin Tarantino."));
        let questions = vec!["Who is the director of Pulp Fiction?".to_string()];
        let mut out = Vec::new();

        let summary = pipeline
            .run(&questions, &mut out, ReportFormat::Text)
            .unwrap();
        let report = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(
            lines[0],
            "Processing: question-001 Who is the director of Pulp Fiction?"
        );
        assert_eq!(lines[1], "Result:");
        assert_eq!(lines[2], "Input (A): Who is the director of Pulp Fiction?");
        assert!(report.contains("Extracted Answer: Who\n"));
        assert!(report.ends_with("Correctness: incorrect\n\n"));
        assert_eq!(summary, RunSummary { correct: 0, incorrect: 1 });
    }

    #[test]
    fn run_writes_one_json_object_per_question() {
        let mut pipeline = pipeline(CannedGenerator(" Yes."));
        let questions = vec![
            "Is Managua the capital of Nicaragua?".to_string(),
            "Is it true that China is the country with most people in the world?".to_string(),
        ];
        let mut out = Vec::new();

        let summary = pipeline
            .run(&questions, &mut out, ReportFormat::Json)
            .unwrap();
        let report = String::from_utf8(out).unwrap();

        let objects: Vec<serde_json::Value> = report
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["question"], "Is Managua the capital of Nicaragua?");
        assert_eq!(objects[0]["answer"], "yes");
        assert_eq!(objects[0]["verdict"], "correct");
        assert!(objects[1]["linked_entities"].is_array());
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn run_stops_at_first_model_failure() {
        let mut pipeline = pipeline(FailingGenerator);
        let questions = vec!["First?".to_string(), "Second?".to_string()];
        let mut out = Vec::new();

        assert!(
            pipeline
                .run(&questions, &mut out, ReportFormat::Text)
                .is_err()
        );
        let report = String::from_utf8(out).unwrap();
        assert_eq!(report, "Processing: question-001 First?\n");
    }
}
