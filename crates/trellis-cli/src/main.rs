//! Trellis CLI
//!
//! Synthesizes Kubernetes manifests from a declarative app file.

use clap::Parser;

use trellis_cli::{Cli, Result};
use trellis_common::telemetry::{init_telemetry, TelemetryConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        json: cli.log_json,
        ..Default::default()
    })?;

    cli.run()
}
