//! Settings resolution and UI helpers for the analyze command.

use crate::charts::ChartOptions;
use crate::cli::AnalyzeArgs;
use crate::config::ProjectConfig;
use crate::findings::KeyFinding;
use crate::stats::AnalysisSettings;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything one analysis run needs, after CLI flags and config are merged
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub data: PathBuf,
    pub output_dir: PathBuf,
    pub publish_dir: Option<PathBuf>,
    pub with_report: bool,
    pub html_report: bool,
    pub open: bool,
    pub skip_charts: bool,
    pub title: String,
    pub data_period: String,
    pub analysis: AnalysisSettings,
    pub findings: Vec<KeyFinding>,
}

impl RunSettings {
    /// CLI flags win over the config file, which wins over defaults
    pub(crate) fn resolve(args: &AnalyzeArgs, data: Option<&Path>, config: &ProjectConfig) -> Self {
        Self {
            data: data
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config.paths.data.clone()),
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| config.paths.output_dir.clone()),
            publish_dir: args
                .publish_dir
                .clone()
                .or_else(|| config.paths.publish_dir.clone()),
            with_report: args.with_report,
            html_report: args.html_report,
            open: args.open || config.report.open,
            skip_charts: args.skip_charts,
            title: config.report.title.clone(),
            data_period: config.report.data_period.clone(),
            analysis: config.analysis_settings(),
            findings: config.findings(),
        }
    }

    /// The lower-triangle matrix only appears in the Markdown report
    pub(crate) fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            histogram_bins: self.analysis.histogram_bins,
            top_n: self.analysis.top_n,
            annotated: self.with_report,
        }
    }
}

/// Print analysis header
pub(super) fn print_header(settings: &RunSettings) {
    println!("\n{}\n", style("schoolstat").bold());
    println!("Data:    {}", style(settings.data.display()).cyan());
    println!("Output:  {}\n", style(settings.output_dir.display()).cyan());
}

/// Create spinner progress style
pub(crate) fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Start a steadily ticking spinner; hidden when stderr is not a terminal
pub(crate) fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(create_spinner_style());
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = ProjectConfig::default();
        config.paths.output_dir = PathBuf::from("from-config");
        config.paths.publish_dir = Some(PathBuf::from("docs"));
        config.report.open = true;
        config.binning.histogram_bins = 10;

        let args = AnalyzeArgs {
            output_dir: Some(PathBuf::from("from-cli")),
            with_report: true,
            ..Default::default()
        };
        let s = RunSettings::resolve(&args, Some(Path::new("x.csv")), &config);
        assert_eq!(s.data, PathBuf::from("x.csv"));
        assert_eq!(s.output_dir, PathBuf::from("from-cli"));
        assert_eq!(s.publish_dir, Some(PathBuf::from("docs")));
        assert!(s.open);
        assert_eq!(s.analysis.histogram_bins, 10);
        assert!(s.chart_options().annotated);
        assert_eq!(s.findings.len(), 5);
    }

    #[test]
    fn test_defaults_without_flags() {
        let s = RunSettings::resolve(&AnalyzeArgs::default(), None, &ProjectConfig::default());
        assert_eq!(s.data, PathBuf::from("data/school_data.csv"));
        assert_eq!(s.output_dir, PathBuf::from("output"));
        assert!(!s.chart_options().annotated);
        assert!(s.publish_dir.is_none());
    }

    #[test]
    fn test_html_report_alone_skips_annotated_matrix() {
        let args = AnalyzeArgs {
            html_report: true,
            ..Default::default()
        };
        let s = RunSettings::resolve(&args, None, &ProjectConfig::default());
        assert!(s.html_report);
        assert!(!s.chart_options().annotated);
    }
}
