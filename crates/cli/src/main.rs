//! `exposure` entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: read `.env` if present, parse arguments (which
//!    also read their environment variables), and check that the selected
//!    provider has a credential before any table is touched.
//! 2. **Wire observability**: install a `tracing-subscriber` stack with a
//!    pretty or JSON layer and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: build the one provider adapter for the run
//!    and hand it to the gateway and job runner.
//! 4. **Run the job**: read the input table, annotate each row in order, and
//!    write the output table.

mod annotate;
mod args;
mod config;
mod observability;
mod progress;

use clap::Parser;
use pipeline::RunId;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::args::{Cli, LogFormat};
use crate::config::{AppConfig, LogSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so clap's `env` lookups see the file's values.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_settings = LogSettings::from_cli(&cli);
    let _telemetry = observability::init(&log_settings)?;

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "Ignoring unreadable .env file"),
    }

    let config = AppConfig::from_cli(cli)
        .inspect_err(|err| error!(error = %err, "Invalid configuration"))?;

    let run_id = RunId::new_random();
    let span = info_span!(
        "run",
        run_id = %run_id,
        command = config.command.name(),
        provider = config.provider.name(),
    );
    let show_progress = log_settings.format == LogFormat::Pretty;

    annotate::execute(config, show_progress)
        .instrument(span)
        .await
        .inspect_err(|err| error!(run_id = %run_id, error = %format!("{err:#}"), "Run failed"))
}
