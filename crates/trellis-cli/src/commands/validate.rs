//! Validate command

use std::path::PathBuf;

use clap::Args;

use crate::app::build_chart;
use crate::config::AppConfig;
use crate::Result;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// App file describing the chart
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Build and resolve every workload without writing anything
pub fn run(args: ValidateArgs) -> Result<()> {
    let config = AppConfig::load(&args.file)?;
    let manifest = build_chart(&config)?.synth()?;
    println!(
        "  {} valid ({} resources)",
        args.file.display(),
        manifest.documents().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_file_passes_and_empty_pod_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.yaml");
        std::fs::write(
            &file,
            r#"
chart: shop
workloads:
  - id: web
    kind: Pod
    volumes:
      - { name: data, emptyDir: {} }
    containers:
      - image: nginx
        mounts: [{ volume: data, path: /data }]
"#,
        )
        .unwrap();
        run(ValidateArgs { file: file.clone() }).unwrap();

        std::fs::write(&file, "chart: shop\nworkloads:\n  - id: web\n    kind: Pod\n").unwrap();
        assert!(run(ValidateArgs { file }).is_err());
    }
}
