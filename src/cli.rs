//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

use crate::config::RunConfig;
use crate::error::Result;

/// Reprocess a raw IR capture archive into a depth/IR capture archive
#[derive(Debug, Clone, Parser)]
#[command(name = "rawtodepth", version)]
#[command(about = "Reprocess a raw IR capture archive into a depth/IR capture archive")]
pub struct Cli {
    /// Input archive recorded in raw IR mode
    #[arg(short = 'i', long = "infile", value_name = "PATH", required_unless_present = "config")]
    pub infile: Option<PathBuf>,

    /// Output archive [default: out_depth.mkv]
    #[arg(short = 'o', long = "outfile", value_name = "PATH")]
    pub outfile: Option<PathBuf>,

    /// TOML run configuration
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Mirror logs to this file
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Simulated engine frame period in 90 kHz ticks [default: 3000]
    #[arg(long = "frame-period-ticks", value_name = "TICKS", value_parser = clap::value_parser!(u64).range(1..))]
    pub frame_period_ticks: Option<u64>,
}

impl Cli {
    /// Resolve the run configuration
    ///
    /// Starts from `--config` (or the default config file when it exists) and
    /// applies every flag given on the command line on top.
    pub fn resolve_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::load_default()?,
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Override config values with the flags that were given
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(infile) = &self.infile {
            config.input = Some(infile.clone());
        }
        if let Some(outfile) = &self.outfile {
            config.output = outfile.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.logging.log_file = Some(log_file.clone());
        }
        if let Some(ticks) = self.frame_period_ticks {
            config.engine.frame_period_ticks = ticks;
        }
    }
}
