//! `autocontext add`: ingest a text entry.

use autocontext_client::AddEntryRequest;
use autocontext_core::{Metadata, MetadataValue};
use std::io::Read;
use std::path::Path;

pub async fn run(
    config_path: &Path,
    text: String,
    meta: Vec<(String, MetadataValue)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = if text == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        text
    };

    let client = super::open_client(config_path)?;
    let metadata: Metadata = meta.into_iter().collect();
    let request = if metadata.is_empty() {
        AddEntryRequest::new(text)
    } else {
        AddEntryRequest::new(text).with_metadata(metadata)
    };

    let response = client.add_entry(request).await?;
    if response.created {
        println!("Added {}", response.id);
    } else {
        println!("Already stored {}", response.id);
    }
    Ok(())
}
