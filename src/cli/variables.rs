//! Variables command - print the variable reference guide

use anyhow::Result;
use console::style;

use crate::models::{variable_reference, Category};

pub fn run() -> Result<()> {
    let reference = variable_reference();

    println!("\n{}\n", style("Variable Reference").bold());
    for category in Category::ALL {
        println!("{}", style(category.label().to_uppercase()).bold());
        for info in reference.iter().filter(|v| v.category == category) {
            println!("  {:<10} {}", style(info.name).cyan(), info.description);
        }
        println!();
    }

    Ok(())
}
