//! Init command - write an example schoolstat.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::config::init_config;

/// Run the init command
pub fn run(dir: &Path) -> Result<()> {
    let path = init_config(dir).context("Failed to create config file")?;

    println!(
        "{} Created {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    println!("\nNext steps:");
    println!("  {} Merge the raw extracts", style("schoolstat prepare").cyan());
    println!("  {} Run the analysis", style("schoolstat --with-report").cyan());

    Ok(())
}
