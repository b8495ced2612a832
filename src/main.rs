//! Marginalia
//!
//! Extracts e-reader highlights and notes and writes them, aligned with
//! their book's text and chapters, as markdown.
//!
//! ```text
//! marginalia ~/Books -o ~/Notes            whole library
//! marginalia ~/Books/dune.epub -o dune.md  single document
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marginalia::workflow::ExtractWorkflow;
use marginalia::{config, Config};

#[derive(Parser)]
#[command(name = "marginalia", version, about = "Extract e-reader highlights aligned with their books")]
struct Cli {
    /// Document file or library directory holding the reader exports.
    /// Defaults to MARGINALIA_SOURCE.
    source: Option<PathBuf>,

    /// Output directory, or output file for a single document
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Add the surrounding paragraph below each highlight
    #[arg(long)]
    context: bool,

    /// Do not group annotations by table of contents sections
    #[arg(long)]
    no_sections: bool,
}

impl Cli {
    fn apply(self, mut config: Config) -> Config {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if self.context {
            config.include_context = true;
        }
        if self.no_sections {
            config.extract_sections = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = config::load_environment(None);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| config::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().apply(Config::from_env());
    tracing::info!("Starting marginalia v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "configuration");

    let summary = ExtractWorkflow::new()
        .run(&config)
        .await
        .with_context(|| format!("extraction from {} failed", config.source.display()))?;

    if summary.documents == 0 {
        tracing::warn!("No annotated documents found in {}", config.source.display());
    }
    println!(
        "{} documents, {} annotations, {} aligned",
        summary.documents, summary.annotations, summary.aligned
    );
    Ok(())
}
