//! Validate command - load the data file and report problems

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::data::{self, Loader};

pub fn run(data_path: &Path) -> Result<()> {
    let dataset = Loader::new()
        .load(data_path)
        .with_context(|| format!("Validation failed for {}", data_path.display()))?;

    println!(
        "{} {} schools loaded from {} ({} rows read, {} dropped)",
        style("✓").green(),
        style(dataset.len()).bold(),
        style(data_path.display()).cyan(),
        dataset.rows_read(),
        dataset.rows_dropped()
    );

    let warnings = data::validate(&dataset);
    if warnings.is_empty() {
        println!("{} No problems found", style("✓").green());
    }
    for w in &warnings {
        println!("{} {}", style("⚠").yellow(), w);
    }

    Ok(())
}
