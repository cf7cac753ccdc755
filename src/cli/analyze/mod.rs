//! Analyze command implementation
//!
//! Orchestrates one analysis run:
//! 1. Resolve settings from flags and config       (setup.rs)
//! 2. Load and validate the merged table
//! 3. Compute correlations and bin tables
//! 4. Render charts
//! 5. Write reports and the JSON summary           (output.rs)
//! 6. Publish and open results                     (output.rs)

mod output;
pub(crate) mod setup;

use output::{open_in_viewer, publish, write_atomic};
use setup::RunSettings;

use crate::charts::{self, ChartFile, ChartKind};
use crate::config::ProjectConfig;
use crate::data::{self, Loader};
use crate::reporters::{self, ReportContext, ReportFormat};
use crate::stats;

use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Run the analyze command
pub fn run(args: &super::AnalyzeArgs, data: Option<&Path>, config: &ProjectConfig) -> Result<()> {
    let start_time = Instant::now();
    let settings = RunSettings::resolve(args, data, config);
    setup::print_header(&settings);

    // Phase 2: Load
    let pb = setup::spinner(format!("Loading {}...", settings.data.display()));
    let loaded = Loader::new().load(&settings.data);
    pb.finish_and_clear();
    let dataset =
        loaded.with_context(|| format!("Failed to load {}", settings.data.display()))?;
    for w in data::validate(&dataset) {
        warn!("{}", w);
        println!("{} {}", style("⚠").yellow(), w);
    }

    // Phase 3: Statistics
    let analysis = stats::analyze(&dataset, &settings.analysis, &settings.findings)
        .context("Failed to bin the data")?;

    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            settings.output_dir.display()
        )
    })?;

    // Phase 4: Charts
    let chart_options = settings.chart_options();
    let figures: Vec<ChartFile> = if settings.skip_charts {
        info!("Skipping charts");
        Vec::new()
    } else {
        let pb = setup::spinner("Rendering charts...");
        let rendered = charts::render_all(&dataset, &analysis, &settings.output_dir, &chart_options);
        pb.finish_and_clear();
        rendered.context("Failed to render charts")?
    };
    let expected = ChartKind::for_run(chart_options.annotated);
    let mut written: Vec<PathBuf> = figures.iter().map(|f| f.path.clone()).collect();

    // Phase 5: Reports
    let generated = Local::now();
    let mut formats = Vec::new();
    if settings.with_report {
        formats.push(ReportFormat::Markdown);
    }
    if settings.html_report {
        formats.push(ReportFormat::Html);
    }
    formats.push(ReportFormat::Json);

    let mut reports = Vec::new();
    for format in formats {
        let ctx = ReportContext {
            analysis: &analysis,
            title: &settings.title,
            data_period: &settings.data_period,
            generated,
            figures: &figures,
            expected_figures: &expected,
            written: &[],
        };
        let content = reporters::render(&ctx, format)
            .with_context(|| format!("Failed to render {} report", format))?;
        let path = settings.output_dir.join(reporters::file_name(format));
        write_atomic(&path, &content)?;
        info!("Wrote {} report to {}", format, path.display());
        if format != ReportFormat::Json {
            reports.push(path.clone());
        }
        written.push(path);
    }

    // Phase 6: Publish and open
    if let Some(dir) = &settings.publish_dir {
        let copied = publish(&written, dir)?;
        info!("Published {} files to {}", copied.len(), dir.display());
        written.extend(copied);
    }

    let ctx = ReportContext {
        analysis: &analysis,
        title: &settings.title,
        data_period: &settings.data_period,
        generated,
        figures: &figures,
        expected_figures: &expected,
        written: &written,
    };
    print!("{}", reporters::summary(&ctx)?);

    if settings.open {
        // HTML first when both were written
        match reports.last() {
            Some(report) => open_in_viewer(report),
            None => warn!("--open given but no report was written; use --with-report or --html-report"),
        }
    }

    print_final_summary(start_time);
    Ok(())
}

/// Print final summary message.
fn print_final_summary(start_time: Instant) {
    println!(
        "\n{}Analysis complete in {:.2}s",
        style("✨ ").bold(),
        start_time.elapsed().as_secs_f64()
    );
}
