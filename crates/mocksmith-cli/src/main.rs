//! Mocksmith CLI
//!
//! Validates, inspects and exports MockServer expectation configurations.
//! Configurations are read from JSON or YAML files; a bare JSON array is
//! treated as wire-format expectations and wrapped on the fly.
//!
//! Usage:
//!   mocksmith validate <file>
//!   mocksmith export <file> [--expand] [-o out.json]
//!   mocksmith stats <file>
//!   mocksmith features

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mocksmith_core::{catalog, MockConfiguration};

#[derive(Parser, Debug)]
#[command(name = "mocksmith")]
#[command(
    author,
    version,
    about = "Build and transform MockServer expectation configurations"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a configuration file
    Validate {
        /// Path to a configuration file (.json, .yaml, .yml)
        path: PathBuf,
    },
    /// Export a configuration as MockServer wire JSON
    Export {
        path: PathBuf,

        /// Expand progressive delay policies into their clone chains
        #[arg(long)]
        expand: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show expectation statistics for a configuration file
    Stats { path: PathBuf },
    /// List the available feature catalog
    Features,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    match Args::parse().command {
        Command::Validate { path } => {
            let config = load_config(&path)?;
            config
                .validate()
                .with_context(|| format!("{} failed validation", path.display()))?;
            println!(
                "OK: {} expectation(s) valid in project '{}'",
                config.expectations.len(),
                config.metadata.project_id
            );
        }
        Command::Export { path, expand, output } => {
            let mut config = load_config(&path)?;
            config
                .validate()
                .with_context(|| format!("{} failed validation", path.display()))?;
            if expand {
                config = config.expand_progressive();
            }
            let wire = config.to_wire_json()?;
            match output {
                Some(out) => {
                    fs::write(&out, &wire)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Wrote {} expectation(s) to {}", config.expectations.len(), out.display());
                }
                None => println!("{wire}"),
            }
        }
        Command::Stats { path } => {
            let stats = load_config(&path)?.stats();
            println!("Total expectations: {}", stats.total);
            println!("\nBy method:");
            for (method, count) in &stats.by_method {
                println!("  {method:<8} {count}");
            }
            println!("\nBy status code:");
            for (status, count) in &stats.by_status_code {
                println!("  {status:<8} {count}");
            }
        }
        Command::Features => {
            let mut current = None;
            for info in catalog() {
                if current != Some(info.category) {
                    println!("\n{}", info.category.label());
                    current = Some(info.category);
                }
                println!("  {:<24} {:<36} {}", info.key.as_str(), info.label, info.description);
            }
        }
    }
    Ok(())
}

/// Load a configuration file, accepting a full configuration document
/// (JSON or YAML) or a bare wire-format expectation array.
fn load_config(path: &Path) -> Result<MockConfiguration> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let mut config = if extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml")
    {
        MockConfiguration::from_yaml(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else if content.trim_start().starts_with('[') {
        MockConfiguration::from_wire_json(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        MockConfiguration::from_json(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
    };

    // Wire arrays carry no metadata; name the project after the file.
    if config.metadata.project_id.is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            config.metadata.project_id = stem.to_string();
        }
    }
    Ok(config)
}
