//! `autocontext stats`: show store statistics.

use autocontext_client::store_options;
use autocontext_config::AppConfig;
use autocontext_store::EntryStore;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    // Read-only: no embedding provider needed
    let stats = EntryStore::open(store_options(&config))?.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let store_path = config
        .store
        .persist_path
        .unwrap_or_else(AppConfig::default_store_path);

    println!("AutoContext Store");
    println!("=================");
    println!("  Entries:    {} / {}", stats.entries, stats.capacity);
    println!("  Tokens:     {}", stats.total_tokens);
    match stats.dimension {
        Some(d) => println!("  Dimension:  {d}"),
        None => println!("  Dimension:  (not fixed yet)"),
    }
    println!("  Eviction:   {:?} (on full: {:?})", config.store.eviction, config.store.on_full);
    println!("  Embeddings: {} / {}", config.embedding.provider, config.embedding.model);
    println!("  Checkpoint: {}", store_path.display());
    Ok(())
}
