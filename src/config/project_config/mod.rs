//! Project-level configuration support
//!
//! Loads `schoolstat.toml` from the working directory (or the file named by
//! `--config`). Every section is optional; missing keys take the defaults
//! below. CLI flags override whatever the file sets.
//!
//! # Configuration Format
//!
//! ```toml
//! # schoolstat.toml
//!
//! [paths]
//! data = "data/school_data.csv"
//! output_dir = "output"
//! publish_dir = "docs"
//!
//! [binning]
//! sed_edges = [0.0, 0.25, 0.5, 0.75, 1.0]
//! histogram_bins = 20
//! absence_quantiles = 4
//!
//! [report]
//! title = "Public School Data Analysis Report"
//! data_period = "2022-23"
//!
//! [[findings]]
//! title = "Socioeconomic Status Impact"
//! text = "..."
//! range = "-0.76 to -0.84"
//! pairs = [["PERSD", "SELA_Y2"], ["PERSD", "SMATH_Y2"]]
//! ```
//!
//! A `[[findings]]` list replaces the built-in findings entirely.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::findings::{default_findings, KeyFinding};
use crate::stats::{binning, AnalysisSettings, BinPolicy, DEFAULT_SED_EDGES};

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "schoolstat.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("{0} already exists; not overwriting")]
    Exists(PathBuf),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Merged school table read by `analyze`
    pub data: PathBuf,
    pub output_dir: PathBuf,
    /// Where HTML/PNG artifacts are copied for publishing
    pub publish_dir: Option<PathBuf>,
    /// Directory holding the raw extracts for `prepare`
    pub raw_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/school_data.csv"),
            output_dir: PathBuf::from("output"),
            publish_dir: None,
            raw_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinningConfig {
    /// SED bucket edges on the 0-1 fraction scale
    pub sed_edges: Vec<f64>,
    pub histogram_bins: usize,
    pub absence_quantiles: usize,
    /// Bars in each top-correlation chart
    pub top_n: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        let defaults = AnalysisSettings::default();
        Self {
            sed_edges: DEFAULT_SED_EDGES.to_vec(),
            histogram_bins: defaults.histogram_bins,
            absence_quantiles: defaults.absence_quantiles,
            top_n: defaults.top_n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub title: String,
    pub data_period: String,
    /// Open the written report in the default viewer
    pub open: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Public School Data Analysis Report".to_string(),
            data_period: "2022-23".to_string(),
            open: false,
        }
    }
}

/// Contents of `schoolstat.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub paths: PathsConfig,
    pub binning: BinningConfig,
    pub report: ReportConfig,
    pub findings: Option<Vec<KeyFinding>>,

    /// File the config was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl ProjectConfig {
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            sed_edges: self.binning.sed_edges.clone(),
            absence_quantiles: self.binning.absence_quantiles,
            histogram_bins: self.binning.histogram_bins,
            top_n: self.binning.top_n,
        }
    }

    /// Configured findings, or the built-in five
    pub fn findings(&self) -> Vec<KeyFinding> {
        self.findings.clone().unwrap_or_else(default_findings)
    }

    /// Semantic checks that parsing alone cannot express
    pub fn validate(&self) -> Result<(), String> {
        binning::edges(&[], &BinPolicy::FixedEdges(self.binning.sed_edges.clone()))
            .map_err(|e| format!("binning.sed_edges: {e}"))?;
        if self.binning.sed_edges.iter().any(|e| !(0.0..=1.0).contains(e)) {
            return Err("binning.sed_edges must lie within 0.0..=1.0".to_string());
        }
        if self.binning.histogram_bins == 0 {
            return Err("binning.histogram_bins must be at least 1".to_string());
        }
        if self.binning.absence_quantiles == 0 {
            return Err("binning.absence_quantiles must be at least 1".to_string());
        }
        if self.binning.top_n == 0 {
            return Err("binning.top_n must be at least 1".to_string());
        }
        if let Some(findings) = &self.findings {
            for (i, f) in findings.iter().enumerate() {
                if f.title.trim().is_empty() || f.range.trim().is_empty() {
                    return Err(format!("findings[{i}] needs a title and a range"));
                }
            }
        }
        Ok(())
    }
}

/// Load the project config.
///
/// An explicit path must exist. Without one, `schoolstat.toml` in `dir` is
/// used when present and defaults otherwise. A file that exists but does
/// not parse or validate is an error, never silently replaced by defaults.
pub fn load_project_config(
    explicit: Option<&Path>,
    dir: &Path,
) -> Result<ProjectConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if !candidate.exists() {
                debug!("No project config found, using defaults");
                return Ok(ProjectConfig::default());
            }
            candidate
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let mut config: ProjectConfig =
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
    config
        .validate()
        .map_err(|message| ConfigError::Invalid {
            path: path.clone(),
            message,
        })?;

    debug!("Loaded project config from {}", path.display());
    config.source = Some(path);
    Ok(config)
}

/// Write [`EXAMPLE_CONFIG`] to `dir/schoolstat.toml`; refuses to overwrite
pub fn init_config(dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                ConfigError::Exists(path.clone())
            } else {
                ConfigError::Write {
                    path: path.clone(),
                    source,
                }
            }
        })?;
    file.write_all(EXAMPLE_CONFIG.as_bytes())
        .map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Annotated example written by `schoolstat init`
pub const EXAMPLE_CONFIG: &str = r#"# schoolstat configuration
# Every key is optional; command-line flags take precedence.

[paths]
# Merged school table read by `schoolstat analyze`
data = "data/school_data.csv"
# Charts, reports and the JSON summary are written here
output_dir = "output"
# Copy HTML/PNG artifacts here after each run (e.g. a GitHub Pages folder)
# publish_dir = "docs"
# Raw state extracts read by `schoolstat prepare`
raw_dir = "data"

[binning]
# SED bucket edges on the 0-1 scale: 0-25%, 25-50%, 50-75%, 75-100%
sed_edges = [0.0, 0.25, 0.5, 0.75, 1.0]
histogram_bins = 20
# Chronic absence (RALL) buckets for the math-by-absence chart
absence_quantiles = 4
top_n = 8

[report]
title = "Public School Data Analysis Report"
data_period = "2022-23"
open = false

# Key findings quoted in the reports. The range is printed exactly as
# written; the pairs are used to show the coefficients observed this run.
# Remove this list to use the built-in findings.

[[findings]]
title = "Socioeconomic Status Impact"
text = "Schools with higher percentages of socioeconomically disadvantaged students show significantly lower test scores in both Math and English Language Arts. The correlation values range from -0.76 to -0.84."
range = "-0.76 to -0.84"
pairs = [["PERSD", "SELA_Y2"], ["PERSD", "SMATH_Y2"], ["PERSD", "DELA_Y2"], ["PERSD", "DMATH_Y2"]]

[[findings]]
title = "Teacher Salary Relationship"
text = "Higher teacher salaries show a modest positive correlation with test scores. High-level teacher salaries correlate at approximately 0.18 with test scores, suggesting that competitive compensation may contribute to student achievement."
range = "approximately 0.18"
pairs = [["HTCHSAL", "SELA_Y2"], ["HTCHSAL", "SMATH_Y2"]]

[[findings]]
title = "Chronic Absence Impact"
text = "Higher chronic absence rates strongly correlate with lower test scores. The correlation values range from -0.39 to -0.48, indicating that regular attendance is an important factor in student achievement."
range = "-0.39 to -0.48"
pairs = [["RALL", "SELA_Y2"], ["RALL", "SMATH_Y2"], ["RALL", "DELA_Y2"], ["RALL", "DMATH_Y2"]]

[[findings]]
title = "Salary Structure Observations"
text = "There's a strong correlation (0.72-0.76) between beginning, mid-career, and high-level teacher salaries, suggesting districts with higher starting salaries tend to maintain competitive compensation throughout career progression."
range = "0.72-0.76"
pairs = [["BTCHSAL", "MTCHSAL"], ["BTCHSAL", "HTCHSAL"], ["MTCHSAL", "HTCHSAL"]]

[[findings]]
title = "Absence Rate Patterns"
text = "Absence rates strongly correlate across different student groups (0.76-0.95), suggesting that absence issues tend to affect entire school populations rather than being isolated to specific demographic groups."
range = "0.76-0.95"
pairs = [["RALL", "REL"], ["RALL", "RSED"], ["REL", "RSED"]]
"#;
