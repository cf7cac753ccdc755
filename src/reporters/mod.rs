//! Report renderers for schoolstat analysis results
//!
//! Supports multiple output formats:
//! - `markdown` - Narrative report with findings and tables
//! - `html` - Standalone styled page with embedded figures
//! - `json` - Machine-readable summary of the computed tables
//!
//! The terminal summary is printed, never written, so it is not a format.

mod html;
mod json;
mod markdown;
mod text;

use crate::charts::{ChartFile, ChartKind};
use crate::stats::Analysis;
use anyhow::Result;
use chrono::{DateTime, Local};

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Html,
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Markdown => write!(f, "markdown"),
            ReportFormat::Html => write!(f, "html"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Fixed output file name per format
pub fn file_name(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Markdown => "school_data_report.md",
        ReportFormat::Html => "school_data_report.html",
        ReportFormat::Json => "analysis_summary.json",
    }
}

/// Everything a renderer needs besides the analysis itself
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub analysis: &'a Analysis,
    pub title: &'a str,
    pub data_period: &'a str,
    pub generated: DateTime<Local>,
    /// Charts that were actually written this run
    pub figures: &'a [ChartFile],
    /// Charts the run was expected to produce, in report order
    pub expected_figures: &'a [ChartKind],
    /// Files written so far, for the terminal summary
    pub written: &'a [std::path::PathBuf],
}

impl ReportContext<'_> {
    pub fn figure(&self, kind: ChartKind) -> Option<&ChartFile> {
        self.figures.iter().find(|f| f.kind == kind)
    }
}

/// Render the analysis in the specified format
pub fn render(ctx: &ReportContext<'_>, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => markdown::render(ctx),
        ReportFormat::Html => html::render(ctx),
        ReportFormat::Json => json::render(ctx),
    }
}

/// Styled terminal summary of the run
pub fn summary(ctx: &ReportContext<'_>) -> Result<String> {
    text::render(ctx)
}

/// Format a coefficient or mean, `n/a` when undefined
pub(crate) fn fmt_value(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        "n/a".to_string()
    }
}

pub(crate) const SUMMARY: &str = "This report analyzes California public school data to explore \
relationships between socioeconomic factors, teacher salaries, absence rates, and academic \
performance. The findings reveal several significant correlations that provide insights for \
educational policy and resource allocation decisions.";

pub(crate) const SOURCE_NOTE: &str = "These findings are derived from correlation analysis of \
California public school data including expenditures, salaries, test scores, and chronic \
absence information.";

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::findings::default_findings;
    use crate::models::{Dataset, SchoolRecord, Variable};
    use crate::stats::{analyze, AnalysisSettings};
    use chrono::TimeZone;

    /// A small analysis with one empty SED bucket
    pub(crate) fn test_analysis() -> Analysis {
        let persd = [0.05, 0.10, 0.20, 0.60, 0.70, 0.90, 0.95, 0.15];
        let records = persd
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut values = [0.0; Variable::COUNT];
                for v in Variable::ALL {
                    values[v.index()] = ((i + 1) * (v.index() + 3) % 11) as f64;
                }
                values[Variable::Persd.index()] = *p;
                for (k, s) in Variable::TEST_SCORES.iter().enumerate() {
                    values[s.index()] = 2600.0 - 200.0 * p + k as f64 * 10.0 + i as f64;
                }
                values[Variable::Rall.index()] = 5.0 + 20.0 * p;
                SchoolRecord::new(format!("{i:014}"), values)
            })
            .collect();
        let dataset = Dataset::new(records, "fixture.csv", 9);
        analyze(&dataset, &AnalysisSettings::default(), &default_findings()).unwrap()
    }

    pub(crate) fn test_context<'a>(analysis: &'a Analysis) -> ReportContext<'a> {
        ReportContext {
            analysis,
            title: "Public School Data Analysis Report",
            data_period: "2022-23",
            generated: Local.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap(),
            figures: &[],
            expected_figures: &[],
            written: &[],
        }
    }

    #[test]
    fn test_format_names_and_files() {
        assert_eq!(ReportFormat::Markdown.to_string(), "markdown");
        assert_eq!(ReportFormat::Html.to_string(), "html");
        assert_eq!(file_name(ReportFormat::Markdown), "school_data_report.md");
        assert_eq!(file_name(ReportFormat::Html), "school_data_report.html");
        assert_eq!(file_name(ReportFormat::Json), "analysis_summary.json");
    }

    #[test]
    fn test_summary_lists_written_files() {
        let analysis = test_analysis();
        let written = [std::path::PathBuf::from("output/analysis_summary.json")];
        let ctx = ReportContext {
            written: &written,
            ..test_context(&analysis)
        };
        let out = console::strip_ansi_codes(&summary(&ctx).unwrap()).to_string();
        assert!(out.contains("analysis_summary.json"));
    }

    #[test]
    fn test_fixture_has_empty_bucket() {
        let analysis = test_analysis();
        assert!(analysis.sed_scores.buckets[1].is_empty());
        assert_eq!(analysis.rows_dropped, 1);
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(0.123456, 2), "0.12");
        assert_eq!(fmt_value(f64::NAN, 2), "n/a");
    }
}
