mod todos;

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fictive::{Config, Settler, Store, telemetry};
use serde_json::Value;
use todos::{FakeTodoApi, TODOS, TodoApi};
use tracing::{info, warn};

/// Run a mock todo service against the in-memory store
#[derive(Parser, Debug)]
#[command(name = "fictive-demo", version)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// JSON file mapping collection names to their initial state
    #[arg(long)]
    seed: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .apply_env();

    // Initialize logging
    let _telemetry = telemetry::init(&config.log)?;

    info!("Starting fictive demo");
    info!("Simulated latency: {:?}", config.delay.effective(None));

    // One store for the whole process, shared by every mock service
    let store = Arc::new(Store::new());
    if let Some(path) = &args.seed {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file '{}'", path))?;
        let fixtures: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file '{}'", path))?;
        let created = store.seed(fixtures)?;
        info!("Seeded {} collections from {}", created, path);
    }
    if !store.contains(TODOS)? {
        store.create(TODOS, None)?;
    }

    let api: Arc<dyn TodoApi> = Arc::new(FakeTodoApi::new(
        Arc::clone(&store),
        Settler::new(config.delay),
    ));

    let (first, second) = tokio::join!(api.add("buy milk"), api.add("walk the dog"));
    info!("Added todos: {:?}, {:?}", first?, second?);

    let renamed = api.rename(1, "buy oat milk").await?;
    info!("Renamed {} todo(s)", renamed);

    for todo in api.list().await? {
        info!("Todo: {}", todo);
    }

    match api.remove(99).await {
        Ok(removed) => info!("Removed {} todo(s)", removed),
        Err(e) => warn!("Remove failed: {}", e),
    }

    info!("Collections: {:?}", store.collections()?);
    Ok(())
}
