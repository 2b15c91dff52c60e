//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use llm::{DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL};

/// Annotate occupation titles with industries, tasks, and AI-exposure ratings.
#[derive(Debug, Parser)]
#[command(name = "exposure", author, version, about, long_about = None)]
pub struct Cli {
    /// LLM provider used for every call in the run.
    #[arg(short, long, value_enum, default_value_t = ProviderKind::Gemini)]
    pub model: ProviderKind,

    /// Gemini model name.
    #[arg(long, env = "EXPOSURE_GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// OpenAI model name.
    #[arg(long, env = "EXPOSURE_OPENAI_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    pub openai_model: String,

    /// Seconds to wait before each Gemini call (0 disables pacing).
    #[arg(long, env = "EXPOSURE_GEMINI_PACING_SECS", default_value_t = 4)]
    pub gemini_pacing_secs: u64,

    /// Attempts per item before it is given up on.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Longest wait, in seconds, a provider's Retry-After hint may impose.
    #[arg(long, default_value_t = 60)]
    pub max_retry_wait_secs: u64,

    /// Abort the run on the first item that fails instead of skipping it.
    #[arg(long)]
    pub strict: bool,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Enable debug logging (ignored when RUST_LOG is set).
    #[arg(short, long)]
    pub verbose: bool,

    /// OTLP collector endpoint; traces are exported when set.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide = true, hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide = true, hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Provider selected with `--model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Google Gemini.
    Gemini,
    /// OpenAI chat completions.
    #[value(alias = "gpt")]
    Openai,
}

/// Log output selected with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Annotation jobs.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Assign each occupation title to an industry category.
    Classify {
        /// Table with an `occupation_title` column.
        #[arg(long, default_value = "../input/all_occupation_titles.csv")]
        input: PathBuf,
        /// Destination for `occupation_title,industry_classification`.
        #[arg(long, default_value = "../input/all_occupation_titles_industry.csv")]
        output: PathBuf,
    },

    /// List the tasks performed in each occupation.
    GenerateTasks {
        /// Table with an `occupation_title` column.
        #[arg(long, default_value = "../input/all_occupation_titles.csv")]
        input: PathBuf,
        /// Destination for `occupation_title,task`.
        #[arg(long, default_value = "../input/all_occupation_tasks.csv")]
        output: PathBuf,
    },

    /// Rate how exposed each occupation task is to AI, from 1 to 5.
    RateTasks {
        /// Table with `occupation_title` and `task` columns.
        #[arg(long, default_value = "../input/all_occupation_tasks.csv")]
        input: PathBuf,
        /// Destination for `occupation_title,task,rating`.
        #[arg(long, default_value = "../output/all_occupation_task_ratings.csv")]
        output: PathBuf,
    },
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Classify { .. } => "classify",
            Command::GenerateTasks { .. } => "generate-tasks",
            Command::RateTasks { .. } => "rate-tasks",
        }
    }
}
