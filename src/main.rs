use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qafact::config::ConfigError;
use qafact::doctor::{print_health_report, run_health_checks};
use qafact::generation::TextGenerator;
use qafact::ollama::OllamaError;
use qafact::questions::{default_questions, load_questions};
use qafact::{
    BertNerExtractor, GeneratorKind, GgufGenerator, ModelSource, OllamaGenerator, Pipeline,
    ReportFormat, SamplingConfig, Settings, SettingsBuilder, WikiClient, WikiClientBuilder,
};
use tracing::info;

/// qafact - answer questions with a local language model and check them against Wikipedia
#[derive(Parser)]
#[command(name = "qafact")]
#[command(about = "Question answering with entity linking and fact checking")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    models: ModelArgs,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Process the built-in questions or a questions file (default)
    Run(RunCommand),

    /// Process questions given on the command line
    Ask(AskCommand),

    /// Check model artifacts and knowledge sources
    Doctor,
}

#[derive(Args, Default)]
struct RunCommand {
    /// File with one question per line; `#` starts a comment line
    #[arg(long, value_name = "FILE")]
    questions_file: Option<PathBuf>,

    /// Emit one JSON object per question instead of the text report
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AskCommand {
    /// Questions to process, in order
    #[arg(value_name = "QUESTION", required = true)]
    questions: Vec<String>,

    /// Emit one JSON object per question instead of the text report
    #[arg(long)]
    json: bool,
}

/// Model and backend overrides; each falls back to its environment variable.
#[derive(Args)]
struct ModelArgs {
    /// NER model directory or Hugging Face repository id
    #[arg(long, global = true, value_name = "MODEL")]
    ner_model: Option<String>,

    /// Text generation backend: gguf or ollama
    #[arg(long, global = true, value_name = "BACKEND")]
    generator: Option<GeneratorKind>,

    /// Path to the GGUF model file
    #[arg(long, global = true, value_name = "FILE")]
    gguf_model: Option<PathBuf>,

    /// Tokenizer for the GGUF model (file, directory or repository id)
    #[arg(long, global = true, value_name = "TOKENIZER")]
    gguf_tokenizer: Option<String>,

    /// Maximum number of generated tokens per question
    #[arg(long, global = true, value_name = "N")]
    max_new_tokens: Option<usize>,

    /// Sampling seed
    #[arg(long, global = true, value_name = "SEED")]
    seed: Option<u64>,
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = qafact::logging::init_logging(cli.verbose) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    let result = settings_from(&cli.models)
        .map_err(anyhow::Error::from)
        .and_then(|settings| match cli.command {
            None => handle_run(&settings, RunCommand::default()),
            Some(Commands::Run(cmd)) => handle_run(&settings, cmd),
            Some(Commands::Ask(cmd)) => handle_ask(&settings, cmd),
            Some(Commands::Doctor) => handle_doctor(&settings),
        });

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// User errors are bad input: configuration values, questions and question files.
/// Everything else (model loading, inference, I/O on stdout) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    if error.chain().any(|cause| cause.is::<ConfigError>()) {
        return true;
    }
    let error_msg = error.to_string();
    error_msg.contains("cannot be empty")
        || error_msg.contains("Failed to read questions file")
        || error_msg.contains("No questions")
}

fn settings_from(args: &ModelArgs) -> Result<Settings, ConfigError> {
    let mut builder = SettingsBuilder::new();
    if let Some(model) = &args.ner_model {
        builder = builder.ner_model(model);
    }
    if let Some(generator) = args.generator {
        builder = builder.generator(generator);
    }
    if let Some(path) = &args.gguf_model {
        builder = builder.gguf_model(path);
    }
    if let Some(tokenizer) = &args.gguf_tokenizer {
        builder = builder.gguf_tokenizer(tokenizer);
    }
    if let Some(n) = args.max_new_tokens {
        builder = builder.max_new_tokens(n);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    builder.build()
}

fn handle_run(settings: &Settings, cmd: RunCommand) -> Result<()> {
    let questions = match &cmd.questions_file {
        Some(path) => {
            let questions = load_questions(path)?;
            if questions.is_empty() {
                anyhow::bail!("No questions in {}", path.display());
            }
            questions
        }
        None => default_questions(),
    };
    execute(settings, &questions, cmd.json)
}

fn handle_ask(settings: &Settings, cmd: AskCommand) -> Result<()> {
    let questions: Vec<String> = cmd.questions.iter().map(|q| q.trim().to_string()).collect();
    if questions.iter().any(String::is_empty) {
        anyhow::bail!("Question cannot be empty");
    }
    execute(settings, &questions, cmd.json)
}

fn handle_doctor(settings: &Settings) -> Result<()> {
    let knowledge = build_knowledge(settings)?;
    let report = run_health_checks(settings, &knowledge);
    print_health_report(&report);
    if !report.is_healthy() {
        anyhow::bail!("Health checks failed");
    }
    Ok(())
}

/// Loads both models, then processes `questions` and prints the report to stdout.
fn execute(settings: &Settings, questions: &[String], json: bool) -> Result<()> {
    let ner_source = ModelSource::parse(&settings.ner_model);
    let extractor = BertNerExtractor::load(&ner_source)
        .with_context(|| format!("Failed to load NER model from {ner_source}"))?;
    let generator = build_generator(settings)?;
    let knowledge = build_knowledge(settings)?;

    let mut pipeline = Pipeline::new(Box::new(extractor), generator, Box::new(knowledge));
    let format = if json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    pipeline.run(questions, &mut out, format)?;
    Ok(())
}

fn build_generator(settings: &Settings) -> Result<Box<dyn TextGenerator>> {
    match settings.generator {
        GeneratorKind::Gguf => {
            let tokenizer = settings.gguf_tokenizer_source();
            let sampling = SamplingConfig {
                seed: settings.seed,
                ..SamplingConfig::default()
            };
            let generator = GgufGenerator::load(
                &settings.gguf_model,
                &tokenizer,
                settings.max_new_tokens,
                sampling,
            )
            .with_context(|| {
                format!(
                    "Failed to load language model from {}",
                    settings.gguf_model.display()
                )
            })?;
            Ok(Box::new(generator))
        }
        GeneratorKind::Ollama => {
            let client = settings
                .ollama_client()
                .context("Failed to build Ollama client")?;

            let model = if client.model().is_empty() {
                largest_installed(client.list_models().context("Ollama not reachable")?)?
            } else {
                client.model().to_string()
            };
            info!(model = %model, base_url = client.base_url(), "Using Ollama for text generation");

            Ok(Box::new(OllamaGenerator::new(
                client,
                model,
                settings.max_new_tokens,
            )))
        }
    }
}

/// `models` comes sorted largest first from `list_models`.
fn largest_installed(models: Vec<String>) -> Result<String, OllamaError> {
    models.into_iter().next().ok_or_else(|| OllamaError::Api {
        message: "No models installed in Ollama".to_string(),
    })
}

fn build_knowledge(settings: &Settings) -> Result<WikiClient> {
    let mut builder = WikiClientBuilder::new()
        .wikipedia_api_url(&settings.wikipedia_api_url)
        .wikipedia_rest_url(&settings.wikipedia_rest_url)
        .wikidata_api_url(&settings.wikidata_api_url);
    if let Some(timeout) = settings.http_timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build knowledge-base client")
}
