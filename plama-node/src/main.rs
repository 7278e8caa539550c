//! `plama`: maintenance, watch and handshake jobs for a PLAMA map.
//!
//! Usage:
//!   plama watch --root mapa
//!   plama agent --dir mapa/obiekty/agent
//!
//! Agent and line runs copy their log into the container folder.

use clap::Parser;
use plama_node::{run, Cli};
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool, log_file: Option<&Path>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PLAMA_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Arc::new(file)),
            Err(e) => {
                eprintln!("Cannot open {}: {}", path.display(), e);
                None
            }
        }
    });
    let tee = file.is_some();
    let writer = match file {
        Some(file) => BoxMakeWriter::new(std::io::stderr.and(file)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!tee)
        .with_writer(writer)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.command.log_file().as_deref());

    match run(cli.command).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
