//! `ics-ingest`: normalize an iCalendar feed into canonical JSON events.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ics_ingest::{ingest_with_options, Diagnostic, DiagnosticSink, IngestOptions, TracingSink};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ics-ingest")]
#[command(about = "Normalize an iCalendar (ICS) feed into canonical JSON events")]
#[command(version)]
struct Cli {
    /// ICS file to read (stdin when omitted or `-`)
    file: Option<PathBuf>,

    /// JSON file with ingestion options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Write diagnostics to stderr as JSON lines
    #[arg(long)]
    diagnostics: bool,
}

/// Collects diagnostics for `--diagnostics` and forwards each one to the log.
#[derive(Default)]
struct CliSink {
    collected: Vec<Diagnostic>,
}

impl DiagnosticSink for CliSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        TracingSink.report(diagnostic.clone());
        self.collected.push(diagnostic);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let options = match &cli.config {
        Some(path) => load_options(path)?,
        None => IngestOptions::default(),
    };
    let text = read_input(cli.file.as_deref())?;

    let mut sink = CliSink::default();
    let events = ingest_with_options(&text, &options, &mut sink);
    tracing::info!(
        events = events.len(),
        diagnostics = sink.collected.len(),
        "ingestion finished"
    );

    let json = if cli.pretty {
        serde_json::to_string_pretty(&events)?
    } else {
        serde_json::to_string(&events)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}").context("Failed to write output")?;

    if cli.diagnostics {
        let mut stderr = io::stderr().lock();
        for diagnostic in &sink.collected {
            writeln!(stderr, "{}", serde_json::to_string(diagnostic)?)
                .context("Failed to write diagnostics")?;
        }
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn load_options(path: &Path) -> Result<IngestOptions> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}
