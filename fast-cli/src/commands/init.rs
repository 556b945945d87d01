//! Create the local identity.

use anyhow::Result;
use std::path::Path;

use crate::config::UserConfig;

/// Run the init command.
pub async fn run(data_dir: &Path) -> Result<UserConfig> {
    if UserConfig::exists(data_dir).await {
        anyhow::bail!(
            "Already initialized. Delete {} to start over.",
            data_dir.join("user.json").display()
        );
    }

    let config = UserConfig::generate();
    config.save(data_dir).await?;

    println!("Initialized successfully!");
    println!();
    println!("  User ID:  {}...", &config.user_id[..12]);
    println!("  Data dir: {}", data_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Start a fast:   unplugged start --goal 12");
    println!("  2. Check progress: unplugged status");

    Ok(config)
}
