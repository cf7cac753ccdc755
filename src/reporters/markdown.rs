//! Markdown reporter
//!
//! Produces `school_data_report.md`: the narrative findings with their
//! configured ranges, the tables behind the charts, and the variable
//! reference. Figures are linked by file name, so the report is meant to
//! sit next to the PNGs in the output directory.

use super::{fmt_value, ReportContext, SOURCE_NOTE, SUMMARY};
use crate::models::{variable_reference, Variable};
use anyhow::Result;

/// Correlation pairs listed in the highlights table
const HIGHLIGHT_COUNT: usize = 10;

/// Render report as Markdown
pub fn render(ctx: &ReportContext<'_>) -> Result<String> {
    let mut md = String::new();

    md.push_str(&render_header(ctx));
    md.push('\n');

    md.push_str(&render_summary(ctx));
    md.push('\n');

    md.push_str(&render_findings(ctx));
    md.push('\n');

    md.push_str(&render_highlights(ctx));
    md.push('\n');

    md.push_str(&render_sed_table(ctx));
    md.push('\n');

    md.push_str(&render_absence_table(ctx));
    md.push('\n');

    md.push_str(&render_descriptive(ctx));
    md.push('\n');

    md.push_str(&render_figures(ctx));
    md.push('\n');

    md.push_str(&render_reference());
    md.push('\n');

    md.push_str(&render_footer(ctx));

    Ok(md)
}

fn render_header(ctx: &ReportContext<'_>) -> String {
    format!(
        "# {}\n\nGenerated: {}\n",
        ctx.title,
        ctx.generated.format("%B %d, %Y")
    )
}

fn render_summary(ctx: &ReportContext<'_>) -> String {
    let a = ctx.analysis;
    format!(
        r#"## Summary

{}

| Metric | Value |
|--------|-------|
| **Schools analyzed** | {} |
| **Rows dropped (missing values)** | {} |
| **Data source** | `{}` |
| **Data period** | {} |
"#,
        SUMMARY,
        a.rows,
        a.rows_dropped,
        a.source.display(),
        ctx.data_period
    )
}

fn render_findings(ctx: &ReportContext<'_>) -> String {
    let mut out = String::from("## Key Findings\n\n");
    if ctx.analysis.findings.is_empty() {
        out.push_str("No findings configured.\n");
        return out;
    }
    for (i, ev) in ctx.analysis.findings.iter().enumerate() {
        let f = &ev.finding;
        out.push_str(&format!("### {}. {}\n\n", i + 1, f.title));
        out.push_str(&format!("{}\n\n", f.text));
        out.push_str(&format!("- **Reported correlation:** {}\n", f.range));
        out.push_str(&format!(
            "- **Observed in this data:** {}\n\n",
            ev.observed_label()
        ));
    }
    out
}

fn render_highlights(ctx: &ReportContext<'_>) -> String {
    let mut out = String::from(
        "## Correlation Highlights\n\n\
         | Variable A | Variable B | r |\n\
         |------------|------------|---|\n",
    );
    for (a, b, r) in ctx.analysis.correlations.strongest_pairs(HIGHLIGHT_COUNT) {
        out.push_str(&format!("| {} | {} | {:.3} |\n", a, b, r));
    }
    out
}

fn render_sed_table(ctx: &ReportContext<'_>) -> String {
    let table = &ctx.analysis.sed_scores;
    let mut out = String::from(
        "## Test Scores by Socioeconomically Disadvantaged Percentage\n\n| SED bucket | Schools |",
    );
    for t in &table.targets {
        out.push_str(&format!(" {t} |"));
    }
    out.push_str("\n|------------|---------|");
    for _ in &table.targets {
        out.push_str("------|");
    }
    out.push('\n');
    for bucket in &table.buckets {
        out.push_str(&format!("| {} | {} |", bucket.label, bucket.count));
        for m in &bucket.means {
            out.push_str(&format!(" {} |", fmt_value(*m, 1)));
        }
        out.push('\n');
    }
    if table.out_of_range > 0 {
        out.push_str(&format!(
            "\n{} school(s) fell outside the bucket range.\n",
            table.out_of_range
        ));
    }
    out
}

fn render_absence_table(ctx: &ReportContext<'_>) -> String {
    let table = &ctx.analysis.absence_quantiles;
    let mut out = String::from(
        "## State Math Scores by Chronic Absence Quartile\n\n\
         | RALL quartile | Range | Schools | Mean SMATH_Y2 |\n\
         |---------------|-------|---------|---------------|\n",
    );
    for bucket in &table.buckets {
        out.push_str(&format!(
            "| {} | {} - {} | {} | {} |\n",
            bucket.label,
            fmt_value(bucket.lower, 1),
            fmt_value(bucket.upper, 1),
            bucket.count,
            fmt_value(bucket.means.first().copied().unwrap_or(f64::NAN), 1)
        ));
    }
    out
}

fn render_descriptive(ctx: &ReportContext<'_>) -> String {
    let mut out = String::from(
        "## Descriptive Statistics\n\n\
         | Variable | Mean | Std | Min | Max |\n\
         |----------|------|-----|-----|-----|\n",
    );
    for (v, d) in &ctx.analysis.describe {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            v,
            fmt_value(d.mean, 3),
            fmt_value(d.std, 3),
            fmt_value(d.min, 3),
            fmt_value(d.max, 3)
        ));
    }
    out
}

fn render_figures(ctx: &ReportContext<'_>) -> String {
    let mut out = String::from("## Figures\n\n");
    if ctx.expected_figures.is_empty() {
        out.push_str("No figures were requested for this run.\n");
        return out;
    }
    for (i, kind) in ctx.expected_figures.iter().enumerate() {
        match ctx.figure(*kind) {
            Some(_) => out.push_str(&format!(
                "{}. [{}]({})\n",
                i + 1,
                kind.caption(),
                kind.file_name()
            )),
            None => out.push_str(&format!(
                "{}. {} (not available)\n",
                i + 1,
                kind.caption()
            )),
        }
    }
    out
}

fn render_reference() -> String {
    let mut out = String::from(
        "## Variable Reference\n\n\
         | Variable | Description | Category |\n\
         |----------|-------------|----------|\n",
    );
    for info in variable_reference() {
        out.push_str(&format!(
            "| `{}` | {} | {} |\n",
            info.name,
            info.description,
            info.category.label()
        ));
    }
    out
}

fn render_footer(ctx: &ReportContext<'_>) -> String {
    let math = ctx.analysis.describe_of(Variable::SmathY2);
    let mut out = format!("---\n\n*{}*\n\nData period: {}\n", SOURCE_NOTE, ctx.data_period);
    if let Some(d) = math {
        out.push_str(&format!(
            "\nSMATH_Y2 ranges from {} to {} across {} schools.\n",
            fmt_value(d.min, 1),
            fmt_value(d.max, 1),
            d.count
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartFile, ChartKind};
    use crate::reporters::tests::{test_analysis, test_context};

    #[test]
    fn test_markdown_contains_ranges_verbatim() {
        let analysis = test_analysis();
        let md = render(&test_context(&analysis)).expect("render markdown");
        for range in [
            "-0.76 to -0.84",
            "approximately 0.18",
            "-0.39 to -0.48",
            "0.72-0.76",
            "0.76-0.95",
        ] {
            assert!(md.contains(range), "missing {range}");
        }
        assert!(md.starts_with("# Public School Data Analysis Report"));
        assert!(md.contains("March 05, 2024"));
    }

    #[test]
    fn test_markdown_empty_bucket_is_na() {
        let analysis = test_analysis();
        let md = render(&test_context(&analysis)).expect("render markdown");
        assert!(md.contains("| 25-50% | 0 | n/a | n/a | n/a | n/a |"));
    }

    #[test]
    fn test_markdown_figures_listed() {
        let analysis = test_analysis();
        let figures = vec![ChartFile {
            kind: ChartKind::CorrelationMatrix,
            path: "output/correlation_matrix.png".into(),
        }];
        let expected = [ChartKind::CorrelationMatrix, ChartKind::TestScoresBySed];
        let mut ctx = test_context(&analysis);
        ctx.figures = &figures;
        ctx.expected_figures = &expected;
        let md = render(&ctx).expect("render markdown");
        assert!(md.contains("(correlation_matrix.png)"));
        assert!(md.contains("Test Scores by Socioeconomically Disadvantaged Percentage (not available)"));
    }

    #[test]
    fn test_markdown_reference_has_all_variables() {
        let analysis = test_analysis();
        let md = render(&test_context(&analysis)).expect("render markdown");
        for info in variable_reference() {
            assert!(md.contains(&format!("`{}`", info.name)));
        }
    }
}
