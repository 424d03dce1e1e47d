//! Trellis CLI library

pub mod app;
pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// Trellis - synthesize Kubernetes workload manifests from an app file
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TRELLIS_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the chart and write its manifest
    Synth(commands::synth::SynthArgs),
    /// Build and resolve the chart without writing output
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Run the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Synth(args) => commands::synth::run(args),
            Commands::Validate(args) => commands::validate::run(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_synth_with_output() {
        let cli = Cli::try_parse_from(["trellis", "synth", "-f", "app.yaml", "-o", "out"]).unwrap();
        match cli.command {
            Commands::Synth(args) => {
                assert_eq!(args.file.to_str(), Some("app.yaml"));
                assert_eq!(args.output.to_str(), Some("out"));
            }
            other => panic!("expected synth, got {other:?}"),
        }
    }

    #[test]
    fn validate_requires_file() {
        assert!(Cli::try_parse_from(["trellis", "validate"]).is_err());
    }
}
