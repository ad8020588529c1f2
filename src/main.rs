//! Raw IR to depth reprocessor - Main Entry Point
//!
//! Reads a raw IR capture archive and writes a depth/IR capture archive.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rawtodepth_rs::{
    cli::Cli,
    engine::SimulatedEngineFactory,
    logging,
    pipeline::{ProgressObserver, Reprocessor},
    RunConfig, SessionPlayer,
};

/// Log every n-th frame
const PROGRESS_INTERVAL: u64 = 30;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if let Err(print_err) = e.print() {
                eprintln!("Error: {}\nfailed to print usage: {}", e, print_err);
                return ExitCode::FAILURE;
            }
            // Help and version are printed to stdout and are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    let input = config.input_path()?;
    tracing::info!("Reprocessing {:?} -> {:?}", input, config.output);

    let total = SessionPlayer::open(input)
        .with_context(|| format!("Failed to open input archive {:?}", input))?
        .capture_count();

    let factory =
        SimulatedEngineFactory::new().with_frame_period_ticks(config.engine.frame_period_ticks);
    let mut reprocessor = Reprocessor::with_options(Box::new(factory), config.reprocess_options());
    reprocessor.add_observer(Box::new(ProgressObserver::new(total, PROGRESS_INTERVAL)));

    let report = reprocessor
        .run(input, &config.output)
        .with_context(|| format!("Failed to reprocess {:?}", input))?;

    println!("{}", report.metrics);
    tracing::debug!("Run report:\n{}", report.to_json()?);
    Ok(())
}
