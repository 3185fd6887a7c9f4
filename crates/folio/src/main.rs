//! Folio filter tool.
//!
//! Compiles a list filter for a record kind and prints the count and fetch
//! statements with their parameters as JSON. Index atoms are resolved against
//! an in-memory index, optionally seeded from a JSON file.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use folio_persistence::backends::memory::MemoryIndex;
use folio_persistence::service::FilterService;
use tracing::info;

use crate::config::CliConfig;

/// Initializes logging to stderr, so stdout stays valid JSON.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("folio={},folio_persistence={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Loads the in-memory index from the seed file, if any.
async fn load_index(config: &CliConfig) -> anyhow::Result<MemoryIndex> {
    let Some(path) = &config.index_seed else {
        return Ok(MemoryIndex::new());
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read index seed {}", path.display()))?;
    let index = MemoryIndex::from_json(&json)
        .with_context(|| format!("Invalid index seed {}", path.display()))?;

    info!(path = %path.display(), documents = index.len(), "Loaded index seed");
    Ok(index)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let index = load_index(&config).await?;
    let service = FilterService::new(Arc::new(index), config.settings());

    info!(
        kind = %config.kind,
        filter = %config.filter,
        "Compiling filter"
    );

    let compiled = service
        .compile(config.kind, &config.filter, &config.scope())
        .await?;

    let mut output = serde_json::to_value(&compiled)?;
    if config.explain {
        let parsed = serde_json::to_value(service.parse(&config.filter))?;
        output = serde_json::json!({ "parsed": parsed, "query": output });
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
