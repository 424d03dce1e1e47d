//! Synth command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::app::build_chart;
use crate::config::AppConfig;
use crate::Result;

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// App file describing the chart
    #[arg(short, long)]
    pub file: PathBuf,

    /// Directory to write `<chart>.k8s.yaml` into
    #[arg(short, long, env = "TRELLIS_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Print the manifest to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn run(args: SynthArgs) -> Result<()> {
    let config = AppConfig::load(&args.file)?;
    let manifest = build_chart(&config)?.synth()?;

    if args.stdout {
        print!("{}", manifest.to_yaml()?);
        return Ok(());
    }

    let path = manifest.write_to(&args.output)?;
    info!(path = %path.display(), "Synthesized chart");
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = r#"
chart: shop
workloads:
  - id: web
    kind: Deployment
    name: web
    containers:
      - image: nginx:1.25
  - id: migrate
    kind: Job
    name: migrate
    containers:
      - image: migrate:1
"#;

    #[test]
    fn writes_chart_file_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.yaml");
        std::fs::write(&file, APP).unwrap();
        let output = dir.path().join("out");

        run(SynthArgs {
            file,
            output: output.clone(),
            stdout: false,
        })
        .unwrap();

        let yaml = std::fs::read_to_string(output.join("shop.k8s.yaml")).unwrap();
        assert!(yaml.contains("kind: Deployment"));
        assert!(yaml.contains("kind: Job"));
        assert_eq!(yaml.matches("---\n").count(), 1);
    }

    #[test]
    fn missing_app_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nope.yaml");
        let err = run(SynthArgs {
            file: file.clone(),
            output: dir.path().to_path_buf(),
            stdout: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }
}
