//! Config command handler.

use bulkport::config::{BulkportConfig, ENV_BATCH_SIZE, ENV_FROM_ADDRESS};
use bulkport::observability::{ENV_LOG_FILE, ENV_LOG_FORMAT};

/// Config command.
pub fn cmd_config(config: &BulkportConfig) -> anyhow::Result<()> {
    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Config Files Loaded:");
    if config.config_sources.is_empty() {
        println!("  (none - using defaults)");
    } else {
        for source in &config.config_sources {
            println!("  - {}", source.display());
        }
    }
    if let Some(path) = BulkportConfig::default_path() {
        println!("Default Location: {}", path.display());
    }
    println!();

    println!("Export:");
    println!("  Batch Size: {}", config.batch_size);
    println!(
        "  From Address: {}",
        config.from_address.as_deref().unwrap_or("(not set)")
    );
    println!("  Filtered Attributes: {}", config.filtered_attributes.join(", "));
    println!();

    println!("Environment Overrides:");
    for var in [ENV_FROM_ADDRESS, ENV_BATCH_SIZE, ENV_LOG_FORMAT, ENV_LOG_FILE, "RUST_LOG"] {
        let value = std::env::var(var).unwrap_or_else(|_| "(unset)".to_string());
        println!("  {var}: {value}");
    }

    Ok(())
}
