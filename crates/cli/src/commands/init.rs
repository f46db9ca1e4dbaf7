//! `autocontext init`: write a starter config file.

use autocontext_config::AppConfig;
use std::path::Path;

pub fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or re-run with --force.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("Created config at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set embedding.api_key (or AUTOCONTEXT_API_KEY), or use provider = \"hashing\" offline");
    println!("  2. autocontext add \"Some fact worth remembering\" --meta source=notes");
    println!("  3. autocontext query \"what do I know?\" --max-tokens 512");
    Ok(())
}
