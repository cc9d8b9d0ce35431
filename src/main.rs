use std::path::PathBuf;

use laserkit::{init_logging, read_request, render, run, version_banner, OutputFormat};

const USAGE: &str = "Usage: laserkit [--svg] [REQUEST.json]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let mut format = OutputFormat::Json;
    let mut input: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--svg" => format = OutputFormat::Svg,
            "--version" => {
                println!("{}", version_banner());
                return Ok(());
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            other if other.starts_with('-') => anyhow::bail!("Unknown option {}\n{}", other, USAGE),
            other => input = Some(PathBuf::from(other)),
        }
    }

    let request = read_request(input.as_deref())?;
    tracing::info!(
        "Building outline from {} contributions",
        request.contributions.len()
    );
    let result = run(&request).await?;
    if !result.status.is_success() {
        tracing::warn!("Build finished with a placeholder outline: {:?}", result.status);
    }
    println!("{}", render(&result, format)?);
    Ok(())
}
