//! PNG chart rendering
//!
//! Each chart is drawn into a scratch directory inside the output
//! directory and renamed into place once the backend has flushed, so a
//! failed draw never leaves a truncated PNG under the final name.

#[cfg(feature = "charts")]
mod bars;
#[cfg(feature = "charts")]
mod heatmap;
#[cfg(feature = "charts")]
mod histogram;
#[cfg(feature = "charts")]
mod scatter;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{Dataset, Variable};
use crate::stats::Analysis;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to write chart {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to draw chart {path}: {message}")]
    Draw { path: PathBuf, message: String },
}

/// Targets that get their own top-correlation bar chart
pub const TOP_CORRELATION_TARGETS: [Variable; 2] = [Variable::SmathY2, Variable::SelaY2];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    CorrelationMatrix,
    TestScoresRelationships,
    TestScoresBySed,
    VariableDistributions,
    SedMathRelationship,
    MathByAbsenceQuartile,
    TopCorrelations(Variable),
    AnnotatedCorrelationMatrix,
}

impl ChartKind {
    pub fn file_name(&self) -> String {
        match self {
            ChartKind::CorrelationMatrix => "correlation_matrix.png".into(),
            ChartKind::TestScoresRelationships => "test_scores_relationships.png".into(),
            ChartKind::TestScoresBySed => "test_scores_by_sed.png".into(),
            ChartKind::VariableDistributions => "variable_distributions.png".into(),
            ChartKind::SedMathRelationship => "sed_mathscores_relationship.png".into(),
            ChartKind::MathByAbsenceQuartile => "math_by_absence_quartile.png".into(),
            ChartKind::TopCorrelations(v) => format!("top_correlations_{}.png", v.column()),
            ChartKind::AnnotatedCorrelationMatrix => "annotated_correlation_matrix.png".into(),
        }
    }

    /// Figure title used as the chart caption and in reports
    pub fn caption(&self) -> String {
        match self {
            ChartKind::CorrelationMatrix => "Correlation Matrix of School Variables".into(),
            ChartKind::TestScoresRelationships => {
                "Relationships Between Key Variables and Test Scores".into()
            }
            ChartKind::TestScoresBySed => {
                "Test Scores by Socioeconomically Disadvantaged Percentage".into()
            }
            ChartKind::VariableDistributions => "Distributions of Key Variables".into(),
            ChartKind::SedMathRelationship => {
                "Socioeconomic Status vs. State Math Scores".into()
            }
            ChartKind::MathByAbsenceQuartile => "Math Scores by Chronic Absence Quartile".into(),
            ChartKind::TopCorrelations(v) => format!("Top Correlations with {v}"),
            ChartKind::AnnotatedCorrelationMatrix => {
                "Annotated Correlation Matrix (Lower Triangle)".into()
            }
        }
    }

    /// Charts produced by a run, in report order
    pub fn for_run(annotated: bool) -> Vec<ChartKind> {
        let mut kinds = vec![
            ChartKind::CorrelationMatrix,
            ChartKind::TestScoresRelationships,
            ChartKind::TestScoresBySed,
            ChartKind::VariableDistributions,
            ChartKind::SedMathRelationship,
            ChartKind::MathByAbsenceQuartile,
        ];
        kinds.extend(TOP_CORRELATION_TARGETS.iter().map(|v| ChartKind::TopCorrelations(*v)));
        if annotated {
            kinds.push(ChartKind::AnnotatedCorrelationMatrix);
        }
        kinds
    }
}

/// A chart written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFile {
    pub kind: ChartKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub histogram_bins: usize,
    pub top_n: usize,
    /// Also draw the lower-triangle matrix used by the written report
    pub annotated: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            histogram_bins: 20,
            top_n: 8,
            annotated: false,
        }
    }
}

/// Render every chart for a run into `out_dir`
#[cfg(feature = "charts")]
pub fn render_all(
    dataset: &Dataset,
    analysis: &Analysis,
    out_dir: &Path,
    opts: &ChartOptions,
) -> Result<Vec<ChartFile>, ChartError> {
    std::fs::create_dir_all(out_dir).map_err(|source| ChartError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for kind in ChartKind::for_run(opts.annotated) {
        let file = match kind {
            ChartKind::CorrelationMatrix => render_png(out_dir, kind, (1200, 1000), |root| {
                heatmap::draw_matrix(root, &analysis.correlations, &kind.caption(), false)
            })?,
            ChartKind::AnnotatedCorrelationMatrix => {
                render_png(out_dir, kind, (1200, 1000), |root| {
                    heatmap::draw_matrix(root, &analysis.correlations, &kind.caption(), true)
                })?
            }
            ChartKind::TestScoresRelationships => {
                render_png(out_dir, kind, (1400, 1000), |root| {
                    scatter::draw_score_relationships(root, dataset, &analysis.correlations)
                })?
            }
            ChartKind::SedMathRelationship => render_png(out_dir, kind, (1000, 700), |root| {
                scatter::draw_sed_math(root, dataset, analysis.sed_scale, &kind.caption())
            })?,
            ChartKind::TestScoresBySed => render_png(out_dir, kind, (1400, 650), |root| {
                bars::draw_scores_by_sed(root, &analysis.sed_scores, &kind.caption())
            })?,
            ChartKind::MathByAbsenceQuartile => render_png(out_dir, kind, (1000, 650), |root| {
                bars::draw_absence_quartiles(root, &analysis.absence_quantiles, &kind.caption())
            })?,
            ChartKind::TopCorrelations(target) => {
                render_png(out_dir, kind, (1000, 650), |root| {
                    let top = analysis.correlations.top_correlations(target, opts.top_n);
                    bars::draw_top_correlations(root, &top, &kind.caption())
                })?
            }
            ChartKind::VariableDistributions => render_png(out_dir, kind, (1500, 900), |root| {
                histogram::draw_distributions(
                    root,
                    dataset,
                    analysis.sed_scale,
                    opts.histogram_bins,
                )
            })?,
        };
        tracing::info!("Rendered {}", file.path.display());
        files.push(file);
    }
    Ok(files)
}

#[cfg(not(feature = "charts"))]
pub fn render_all(
    _dataset: &Dataset,
    _analysis: &Analysis,
    _out_dir: &Path,
    _opts: &ChartOptions,
) -> Result<Vec<ChartFile>, ChartError> {
    tracing::warn!("built without the `charts` feature; no figures rendered");
    Ok(Vec::new())
}

#[cfg(feature = "charts")]
pub(crate) type Area<'a> =
    plotters::drawing::DrawingArea<plotters::prelude::BitMapBackend<'a>, plotters::coord::Shift>;

#[cfg(feature = "charts")]
pub(crate) type ChartResult = Result<(), Box<dyn std::error::Error>>;

/// Draw one PNG and move it to `out_dir/<file name>` only after it is complete
#[cfg(feature = "charts")]
pub(crate) fn render_png<F>(
    out_dir: &Path,
    kind: ChartKind,
    size: (u32, u32),
    draw: F,
) -> Result<ChartFile, ChartError>
where
    F: FnOnce(&Area<'_>) -> ChartResult,
{
    use plotters::prelude::{BitMapBackend, IntoDrawingArea, WHITE};

    let path = out_dir.join(kind.file_name());
    let io_err = |source: std::io::Error| ChartError::Io {
        path: path.clone(),
        source,
    };

    let scratch = tempfile::Builder::new()
        .prefix(".schoolstat-")
        .tempdir_in(out_dir)
        .map_err(io_err)?;
    let staged = scratch.path().join(kind.file_name());

    let drawn: ChartResult = (|| {
        let root = BitMapBackend::new(&staged, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
        Ok(())
    })();
    drawn.map_err(|e| ChartError::Draw {
        path: path.clone(),
        message: e.to_string(),
    })?;

    std::fs::rename(&staged, &path).map_err(io_err)?;
    Ok(ChartFile { kind, path })
}

/// `[min, max]` padded by 5%, widened when the data has no spread
#[cfg(feature = "charts")]
pub(crate) fn padded_range(values: &[f64]) -> std::ops::Range<f64> {
    let (lo, hi) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if lo == hi {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

/// Centered message for a panel with nothing to plot
#[cfg(feature = "charts")]
pub(crate) fn draw_placeholder(area: &Area<'_>, message: &str) -> ChartResult {
    use plotters::prelude::{IntoFont, Text, RED};
    use plotters::style::text_anchor::{HPos, Pos, VPos};

    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_string(),
        (w as i32 / 2, h as i32 / 2),
        ("sans-serif", 28)
            .into_font()
            .color(&RED)
            .pos(Pos::new(HPos::Center, VPos::Center)),
    ))?;
    Ok(())
}

#[cfg(all(test, feature = "charts"))]
mod tests {
    use super::*;
    use plotters::prelude::*;

    #[test]
    fn test_render_png_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let file = render_png(dir.path(), ChartKind::CorrelationMatrix, (64, 48), |root| {
            root.draw(&Rectangle::new([(4, 4), (40, 30)], BLUE.filled()))?;
            Ok(())
        })
        .unwrap();

        assert_eq!(file.path, dir.path().join("correlation_matrix.png"));
        let bytes = std::fs::read(&file.path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        // Only the finished chart remains; the scratch dir is gone
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_draw_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_png(dir.path(), ChartKind::TestScoresBySed, (64, 48), |_| {
            Err("boom".into())
        })
        .unwrap_err();
        assert!(matches!(err, ChartError::Draw { .. }));
        assert!(!dir.path().join("test_scores_by_sed.png").exists());
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(&[]), 0.0..1.0);
        assert_eq!(padded_range(&[2.0, 2.0]), 1.0..3.0);
        let r = padded_range(&[0.0, 10.0]);
        assert!((r.start + 0.5).abs() < 1e-12 && (r.end - 10.5).abs() < 1e-12);
    }
}
