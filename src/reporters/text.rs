//! Text (terminal) summary

use super::{fmt_value, ReportContext};
use anyhow::Result;
use console::style;

/// Strongest pairs shown in the summary
const STRONGEST: usize = 5;

/// Render the run summary for the terminal
pub fn render(ctx: &ReportContext<'_>) -> Result<String> {
    let a = ctx.analysis;
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", style("schoolstat analysis").bold()));
    out.push_str(&format!(
        "{}\n",
        style("──────────────────────────────────────").dim()
    ));
    out.push_str(&format!(
        "Schools: {}  Dropped: {}  Source: {}\n\n",
        style(a.rows).bold(),
        a.rows_dropped,
        a.source.display()
    ));

    out.push_str(&format!("{}\n", style("SED BUCKETS").bold()));
    let table = &a.sed_scores;
    out.push_str(&format!("  {:<10} {:>7}", "bucket", "schools"));
    for t in &table.targets {
        out.push_str(&format!(" {:>9}", t));
    }
    out.push('\n');
    for bucket in &table.buckets {
        out.push_str(&format!("  {:<10} {:>7}", bucket.label, bucket.count));
        for m in &bucket.means {
            let cell = format!("{:>9}", fmt_value(*m, 1));
            if m.is_finite() {
                out.push_str(&format!(" {cell}"));
            } else {
                out.push_str(&format!(" {}", style(cell).dim()));
            }
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&format!("{}\n", style("STRONGEST CORRELATIONS").bold()));
    let pairs = a.correlations.strongest_pairs(STRONGEST);
    if pairs.is_empty() {
        out.push_str("  none defined\n");
    }
    for (x, y, r) in pairs {
        let value = format!("{r:+.3}");
        let value = if r < 0.0 {
            style(value).cyan()
        } else {
            style(value).red()
        };
        out.push_str(&format!("  {:<9} {:<9} {}\n", x.column(), y.column(), value));
    }
    out.push('\n');

    if !a.findings.is_empty() {
        out.push_str(&format!("{}\n", style("KEY FINDINGS").bold()));
        for ev in &a.findings {
            out.push_str(&format!(
                "  {:<32} reported {:<20} observed {}\n",
                ev.finding.title,
                ev.finding.range,
                ev.observed_label()
            ));
        }
        out.push('\n');
    }

    if !ctx.written.is_empty() {
        out.push_str(&format!("{}\n", style("FILES").bold()));
        for path in ctx.written {
            out.push_str(&format!("  {} {}\n", style("✓").green(), path.display()));
        }
    }

    Ok(out)
}
