//! `autocontext query`: assemble budget-sized context for a query.

use autocontext_client::GetEntryRequest;
use autocontext_core::{FilterCondition, MetadataValue};
use std::path::Path;

pub struct QueryOptions {
    pub max_tokens: Option<usize>,
    pub max_entries: Option<usize>,
    pub filters: Vec<(String, MetadataValue)>,
    pub json: bool,
}

pub async fn run(
    config_path: &Path,
    text: String,
    options: QueryOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::open_client(config_path)?;

    let mut request = GetEntryRequest::new(text);
    request.max_tokens = options.max_tokens;
    request.max_entries = options.max_entries;
    for (key, value) in options.filters {
        request = request.with_filter(key, FilterCondition::Equals(value));
    }

    let response = client.get_entry(request).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.is_empty() {
        println!("No entries fit the query and budget.");
        return Ok(());
    }

    println!("{}", response.context);
    println!();
    println!(
        "({} entries, {} tokens)",
        response.entries.len(),
        response.cumulative_tokens
    );
    Ok(())
}
