//! Prepare command - merge the raw extracts into the analysis table

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::data::prepare::prepare;

use super::analyze::setup::spinner;

pub fn run(raw_dir: &Path, out: &Path) -> Result<()> {
    let pb = spinner(format!("Merging raw extracts from {}...", raw_dir.display()));
    let result = prepare(raw_dir, out);
    pb.finish_and_clear();
    let summary = result.with_context(|| {
        format!("Failed to prepare data from {}", raw_dir.display())
    })?;

    println!("\n{}", style("Sources").bold());
    for (name, rows) in &summary.source_rows {
        println!("  {:<16} {:>7} rows", name, rows);
    }
    println!("\n{}", style("Joins").bold());
    for (name, rows) in &summary.join_rows {
        println!("  {:<16} {:>7} rows", name, rows);
    }
    println!(
        "\n{} Wrote {} rows to {} ({} dropped for missing values)",
        style("✓").green(),
        style(summary.rows_written).bold(),
        style(summary.output.display()).cyan(),
        summary.rows_dropped
    );

    Ok(())
}
