//! Statistics engine
//!
//! Everything here is pure computation over an immutable [`Dataset`]:
//! the correlation matrix, descriptive summaries, and the bin tables the
//! charts and reports are drawn from.

pub mod binning;
pub mod correlation;
pub mod descriptive;

pub use binning::{bin_means, group_means, BinPolicy, BinTable, BinningError, Bucket};
pub use correlation::{pearson, CorrelationMatrix};
pub use descriptive::{describe, linear_fit, mean, Describe, LinearFit};

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::findings::{self, EvaluatedFinding, KeyFinding};
use crate::models::{Dataset, Variable};

/// Fixed SED bucket edges on the fraction scale
pub const DEFAULT_SED_EDGES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Scale PERSD was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SedScale {
    /// 0.0 ..= 1.0
    Fraction,
    /// 0 ..= 100
    Percent,
}

impl SedScale {
    /// Fraction when no value exceeds 1, otherwise percent
    pub fn detect(persd: &[f64]) -> Self {
        let max = persd
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if max > 1.0 {
            SedScale::Percent
        } else {
            SedScale::Fraction
        }
    }

    pub fn as_fraction(self, value: f64) -> f64 {
        match self {
            SedScale::Fraction => value,
            SedScale::Percent => value / 100.0,
        }
    }

    /// Percentage, clipped to 100
    pub fn as_percent(self, value: f64) -> f64 {
        let pct = match self {
            SedScale::Fraction => value * 100.0,
            SedScale::Percent => value,
        };
        pct.min(100.0)
    }
}

/// Tunables for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub sed_edges: Vec<f64>,
    pub absence_quantiles: usize,
    pub histogram_bins: usize,
    pub top_n: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sed_edges: DEFAULT_SED_EDGES.to_vec(),
            absence_quantiles: 4,
            histogram_bins: 20,
            top_n: 8,
        }
    }
}

/// Everything computed from one dataset
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub rows: usize,
    pub rows_dropped: usize,
    pub source: PathBuf,
    pub describe: Vec<(Variable, Describe)>,
    #[serde(skip)]
    pub correlations: CorrelationMatrix,
    pub sed_scale: SedScale,
    /// Mean test scores per SED bucket
    pub sed_scores: BinTable,
    /// Mean SMATH_Y2 per RALL quantile
    pub absence_quantiles: BinTable,
    pub findings: Vec<EvaluatedFinding>,
}

impl Analysis {
    pub fn describe_of(&self, variable: Variable) -> Option<&Describe> {
        self.describe
            .iter()
            .find(|(v, _)| *v == variable)
            .map(|(_, d)| d)
    }
}

/// Labels for RALL quantile buckets
pub fn quantile_labels(count: usize) -> Vec<String> {
    if count == 4 {
        ["Low", "Medium-Low", "Medium-High", "High"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        (1..=count).map(|i| format!("Q{i}")).collect()
    }
}

/// Run the statistics engine over a loaded dataset
pub fn analyze(
    dataset: &Dataset,
    settings: &AnalysisSettings,
    findings: &[KeyFinding],
) -> Result<Analysis, BinningError> {
    let correlations = CorrelationMatrix::compute(dataset);
    debug!("computed {0}x{0} correlation matrix", correlations.size());

    let describe = Variable::ALL
        .iter()
        .map(|v| (*v, descriptive::describe(&dataset.column(*v))))
        .collect();

    let persd = dataset.column(Variable::Persd);
    let sed_scale = SedScale::detect(&persd);
    let sed_fraction: Vec<f64> = persd.iter().map(|v| sed_scale.as_fraction(*v)).collect();
    info!("PERSD detected on {:?} scale", sed_scale);

    let score_columns: Vec<(Variable, Vec<f64>)> = Variable::TEST_SCORES
        .iter()
        .map(|v| (*v, dataset.column(*v)))
        .collect();
    let targets: Vec<(&str, &[f64])> = score_columns
        .iter()
        .map(|(v, c)| (v.column(), c.as_slice()))
        .collect();
    let sed_scores = group_means(
        &sed_fraction,
        &targets,
        &BinPolicy::FixedEdges(settings.sed_edges.clone()),
    )?
    .with_labels(&binning::percent_labels(&settings.sed_edges))?;

    let rall = dataset.column(Variable::Rall);
    let math = dataset.column(Variable::SmathY2);
    let mut absence_quantiles = group_means(
        &rall,
        &[(Variable::SmathY2.column(), &math)],
        &BinPolicy::Quantile {
            count: settings.absence_quantiles,
        },
    )?;
    let labels = quantile_labels(settings.absence_quantiles);
    if labels.len() == absence_quantiles.buckets.len() {
        absence_quantiles = absence_quantiles.with_labels(&labels)?;
    }

    let findings = findings::evaluate(findings, &correlations);

    Ok(Analysis {
        rows: dataset.len(),
        rows_dropped: dataset.rows_dropped(),
        source: dataset.source().to_path_buf(),
        describe,
        correlations,
        sed_scale,
        sed_scores,
        absence_quantiles,
        findings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::default_findings;
    use crate::models::SchoolRecord;

    fn dataset(persd: &[f64]) -> Dataset {
        let records = persd
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut values = [0.0; Variable::COUNT];
                for v in Variable::ALL {
                    values[v.index()] = (i * (v.index() + 1)) as f64 % 7.0 + i as f64;
                }
                values[Variable::Persd.index()] = *p;
                values[Variable::SmathY2.index()] = 700.0 - 2.0 * p;
                SchoolRecord::new(format!("{i:014}"), values)
            })
            .collect();
        Dataset::new(records, "test.csv", persd.len())
    }

    #[test]
    fn test_sed_scale_detection() {
        assert_eq!(SedScale::detect(&[0.1, 0.9, 1.0]), SedScale::Fraction);
        assert_eq!(SedScale::detect(&[5.0, 90.0]), SedScale::Percent);
        assert_eq!(SedScale::Percent.as_fraction(25.0), 0.25);
        assert_eq!(SedScale::Fraction.as_percent(1.2), 100.0);
    }

    #[test]
    fn test_analyze_percent_persd() {
        let ds = dataset(&[10.0, 30.0, 55.0, 90.0, 20.0, 60.0]);
        let analysis = analyze(&ds, &AnalysisSettings::default(), &default_findings()).unwrap();

        assert_eq!(analysis.rows, 6);
        assert_eq!(analysis.sed_scale, SedScale::Percent);
        assert_eq!(analysis.sed_scores.buckets.len(), 4);
        assert_eq!(analysis.sed_scores.buckets[0].label, "0-25%");
        assert_eq!(analysis.sed_scores.total_count(), 6);
        assert_eq!(analysis.sed_scores.targets.len(), 4);
        // 10 and 20 percent land in the first bucket
        let smath = analysis
            .sed_scores
            .targets
            .iter()
            .position(|t| t == "SMATH_Y2")
            .unwrap();
        assert!((analysis.sed_scores.mean(0, smath) - 670.0).abs() < 1e-9);
        assert_eq!(analysis.findings.len(), 5);
        assert!(
            analysis.correlations.get(Variable::Persd, Variable::SmathY2) < -0.99,
            "SMATH_Y2 is a decreasing line in PERSD"
        );
    }

    #[test]
    fn test_absence_quartile_labels() {
        let ds = dataset(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        let analysis = analyze(&ds, &AnalysisSettings::default(), &[]).unwrap();
        let labels: Vec<&str> = analysis
            .absence_quantiles
            .buckets
            .iter()
            .map(|b| b.label.as_str())
            .collect();
        if labels.len() == 4 {
            assert_eq!(labels, vec!["Low", "Medium-Low", "Medium-High", "High"]);
        }
        assert_eq!(analysis.absence_quantiles.total_count(), 8);
    }

    #[test]
    fn test_analyze_empty_dataset_has_nan_buckets() {
        let ds = Dataset::new(Vec::new(), "empty.csv", 0);
        let analysis = analyze(&ds, &AnalysisSettings::default(), &[]).unwrap();
        assert!(analysis.sed_scores.buckets.iter().all(|b| b.is_empty()));
        assert!(analysis.sed_scores.mean(0, 0).is_nan());
    }
}
