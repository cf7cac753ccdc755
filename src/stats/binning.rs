//! Bucketing of a continuous variable and per-bucket target means
//!
//! Buckets are half-open `[lower, upper)`; the last bucket is closed so
//! the maximum lands somewhere. A bucket with no members keeps its place
//! in the table with a NaN mean.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How bucket edges are chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinPolicy {
    /// `count` buckets of equal width spanning the observed [min, max]
    EqualWidth { count: usize },
    /// Explicit ascending edges; `n` edges make `n - 1` buckets
    FixedEdges(Vec<f64>),
    /// Edges at empirical quantiles; duplicate edges collapse
    Quantile { count: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinningError {
    #[error("bin count must be at least 1")]
    ZeroBins,

    #[error("fixed binning needs at least 2 edges, got {0}")]
    TooFewEdges(usize),

    #[error("bin edges must be finite and strictly ascending: {0:?}")]
    UnsortedEdges(Vec<f64>),

    #[error("value and target columns differ in length ({values} vs {targets})")]
    LengthMismatch { values: usize, targets: usize },

    #[error("{expected} bucket labels required, got {actual}")]
    LabelCount { expected: usize, actual: usize },
}

/// One bucket of a [`BinTable`]
#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub upper_inclusive: bool,
    pub count: usize,
    /// Mean of each target among members, in [`BinTable::targets`] order
    pub means: Vec<f64>,
}

impl Bucket {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains(&self, value: f64) -> bool {
        if self.upper_inclusive {
            value >= self.lower && value <= self.upper
        } else {
            value >= self.lower && value < self.upper
        }
    }
}

/// Ordered buckets with one mean per target
#[derive(Debug, Clone, Serialize)]
pub struct BinTable {
    pub targets: Vec<String>,
    pub buckets: Vec<Bucket>,
    /// Values that fell outside the outermost edges (fixed edges only)
    pub out_of_range: usize,
}

impl BinTable {
    /// Mean of target `target` in bucket `bucket`
    pub fn mean(&self, bucket: usize, target: usize) -> f64 {
        self.buckets
            .get(bucket)
            .and_then(|b| b.means.get(target))
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Replace the generated labels, one per bucket
    pub fn with_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Result<Self, BinningError> {
        if labels.len() != self.buckets.len() {
            return Err(BinningError::LabelCount {
                expected: self.buckets.len(),
                actual: labels.len(),
            });
        }
        for (bucket, label) in self.buckets.iter_mut().zip(labels) {
            bucket.label = label.as_ref().to_string();
        }
        Ok(self)
    }
}

/// Bucket edges for `values` under `policy`.
///
/// Empty input under a data-driven policy yields NaN edges, which no value
/// can fall into. A single distinct value yields the one-bucket edge pair
/// `[v, v]`.
pub fn edges(values: &[f64], policy: &BinPolicy) -> Result<Vec<f64>, BinningError> {
    match policy {
        BinPolicy::EqualWidth { count } => {
            if *count == 0 {
                return Err(BinningError::ZeroBins);
            }
            let Some((min, max)) = finite_range(values) else {
                return Ok(vec![f64::NAN; count + 1]);
            };
            if min == max {
                return Ok(vec![min, max]);
            }
            let width = (max - min) / *count as f64;
            let mut edges: Vec<f64> = (0..*count).map(|i| min + width * i as f64).collect();
            edges.push(max);
            Ok(edges)
        }
        BinPolicy::FixedEdges(edges) => {
            if edges.len() < 2 {
                return Err(BinningError::TooFewEdges(edges.len()));
            }
            let ascending = edges.iter().all(|e| e.is_finite())
                && edges.windows(2).all(|w| w[0] < w[1]);
            if !ascending {
                return Err(BinningError::UnsortedEdges(edges.clone()));
            }
            Ok(edges.clone())
        }
        BinPolicy::Quantile { count } => {
            if *count == 0 {
                return Err(BinningError::ZeroBins);
            }
            let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            if sorted.is_empty() {
                return Ok(vec![f64::NAN; count + 1]);
            }
            sorted.sort_by(f64::total_cmp);
            let mut edges: Vec<f64> = (0..=*count)
                .map(|i| quantile(&sorted, i as f64 / *count as f64))
                .collect();
            edges.dedup();
            if edges.len() < 2 {
                let v = edges[0];
                edges = vec![v, v];
            }
            Ok(edges)
        }
    }
}

/// Linear-interpolated quantile of sorted data, `q` in [0, 1]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

/// Index of the bucket holding `value`, or `None` when outside all edges
pub fn assign(edges: &[f64], value: f64) -> Option<usize> {
    let (first, last) = (*edges.first()?, *edges.last()?);
    if edges.len() < 2 || !value.is_finite() || value < first || value > last {
        return None;
    }
    if value == last {
        return Some(edges.len() - 2);
    }
    let idx = edges.partition_point(|e| *e <= value);
    Some(idx.saturating_sub(1).min(edges.len() - 2))
}

fn default_label(lower: f64, upper: f64, closed: bool) -> String {
    if closed {
        format!("[{lower:.2}, {upper:.2}]")
    } else {
        format!("[{lower:.2}, {upper:.2})")
    }
}

/// Bucket `values` and average each named target column per bucket
pub fn group_means(
    values: &[f64],
    targets: &[(&str, &[f64])],
    policy: &BinPolicy,
) -> Result<BinTable, BinningError> {
    for (_, t) in targets {
        if t.len() != values.len() {
            return Err(BinningError::LengthMismatch {
                values: values.len(),
                targets: t.len(),
            });
        }
    }

    let edges = edges(values, policy)?;
    let n_buckets = edges.len() - 1;
    let mut counts = vec![0usize; n_buckets];
    let mut sums = vec![vec![0.0f64; targets.len()]; n_buckets];
    let mut out_of_range = 0usize;

    for (row, &value) in values.iter().enumerate() {
        match assign(&edges, value) {
            Some(b) => {
                counts[b] += 1;
                for (t, (_, column)) in targets.iter().enumerate() {
                    sums[b][t] += column[row];
                }
            }
            None => out_of_range += 1,
        }
    }

    if out_of_range > 0 {
        tracing::warn!(
            "{} value(s) fell outside bin edges {:?}",
            out_of_range,
            edges
        );
    }

    let buckets = (0..n_buckets)
        .map(|b| {
            let closed = b + 1 == n_buckets;
            let means = sums[b]
                .iter()
                .map(|s| {
                    if counts[b] == 0 {
                        f64::NAN
                    } else {
                        s / counts[b] as f64
                    }
                })
                .collect();
            Bucket {
                label: default_label(edges[b], edges[b + 1], closed),
                lower: edges[b],
                upper: edges[b + 1],
                upper_inclusive: closed,
                count: counts[b],
                means,
            }
        })
        .collect();

    Ok(BinTable {
        targets: targets.iter().map(|(name, _)| name.to_string()).collect(),
        buckets,
        out_of_range,
    })
}

/// Single-target convenience over [`group_means`]
pub fn bin_means(
    values: &[f64],
    target: &[f64],
    policy: &BinPolicy,
) -> Result<BinTable, BinningError> {
    group_means(values, &[("target", target)], policy)
}

/// Percent labels for fraction-scale edges: `0-25%`, `25-50%`, ...
pub fn percent_labels(edges: &[f64]) -> Vec<String> {
    edges
        .windows(2)
        .map(|w| format!("{}-{}%", fmt_pct(w[0]), fmt_pct(w[1])))
        .collect()
}

fn fmt_pct(fraction: f64) -> String {
    let pct = fraction * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        format!("{pct:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_rows_four_equal_width_buckets() {
        let persd = [10.0, 30.0, 55.0, 90.0];
        let math = [700.0, 650.0, 600.0, 500.0];
        let table = bin_means(&persd, &math, &BinPolicy::EqualWidth { count: 4 }).unwrap();

        assert_eq!(table.buckets.len(), 4);
        assert_eq!(table.buckets[0].lower, 10.0);
        assert_eq!(table.buckets[3].upper, 90.0);
        for (i, expected) in math.iter().enumerate() {
            assert_eq!(table.buckets[i].count, 1, "bucket {i}");
            assert_eq!(table.mean(i, 0), *expected);
        }
    }

    #[test]
    fn test_buckets_are_exhaustive_and_disjoint() {
        let values: Vec<f64> = (0..97).map(|i| (i as f64 * 7.3) % 61.0).collect();
        let target = vec![1.0; values.len()];
        for policy in [BinPolicy::EqualWidth { count: 6 }, BinPolicy::Quantile { count: 4 }] {
            let table = bin_means(&values, &target, &policy).unwrap();
            assert_eq!(table.total_count(), values.len());
            assert_eq!(table.out_of_range, 0);
            for v in &values {
                let holders = table.buckets.iter().filter(|b| b.contains(*v)).count();
                assert_eq!(holders, 1, "value {v} under {policy:?}");
            }
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(table.buckets.first().unwrap().lower, lo);
            assert_eq!(table.buckets.last().unwrap().upper, hi);
            for w in table.buckets.windows(2) {
                assert_eq!(w[0].upper, w[1].lower);
            }
        }
    }

    #[test]
    fn test_bucket_mean_matches_members() {
        let values = [0.1, 0.2, 0.3, 0.6, 0.9];
        let target = [10.0, 20.0, 30.0, 40.0, 50.0];
        let table = bin_means(
            &values,
            &target,
            &BinPolicy::FixedEdges(vec![0.0, 0.5, 1.0]),
        )
        .unwrap();
        assert_eq!(table.buckets[0].count, 3);
        assert!((table.mean(0, 0) - 20.0).abs() < 1e-12);
        assert_eq!(table.buckets[1].count, 2);
        assert!((table.mean(1, 0) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_bucket_is_nan_not_omitted() {
        let values = [0.1, 0.2, 0.9];
        let target = [1.0, 2.0, 3.0];
        let table = bin_means(
            &values,
            &target,
            &BinPolicy::FixedEdges(vec![0.0, 0.25, 0.5, 0.75, 1.0]),
        )
        .unwrap();
        assert_eq!(table.buckets.len(), 4);
        assert!(table.buckets[1].is_empty());
        assert!(table.mean(1, 0).is_nan());
        assert!(table.mean(2, 0).is_nan());
        assert_eq!(table.mean(3, 0), 3.0);
    }

    #[test]
    fn test_last_edge_inclusive_and_out_of_range_counted() {
        let values = [0.0, 1.0, 1.5, -0.1];
        let target = [1.0; 4];
        let table =
            bin_means(&values, &target, &BinPolicy::FixedEdges(vec![0.0, 0.5, 1.0])).unwrap();
        assert_eq!(table.buckets[0].count, 1);
        assert_eq!(table.buckets[1].count, 1);
        assert!(table.buckets[1].upper_inclusive);
        assert_eq!(table.out_of_range, 2);
    }

    #[test]
    fn test_constant_values_single_bucket() {
        let values = [3.0, 3.0, 3.0];
        let table = bin_means(&values, &[1.0, 2.0, 3.0], &BinPolicy::EqualWidth { count: 5 })
            .unwrap();
        assert_eq!(table.buckets.len(), 1);
        assert_eq!(table.buckets[0].count, 3);
        assert_eq!(table.mean(0, 0), 2.0);
    }

    #[test]
    fn test_empty_input_does_not_panic() {
        let table = bin_means(&[], &[], &BinPolicy::EqualWidth { count: 3 }).unwrap();
        assert_eq!(table.buckets.len(), 3);
        assert!(table.buckets.iter().all(|b| b.is_empty() && b.means[0].is_nan()));
    }

    #[test]
    fn test_invalid_policies() {
        assert_eq!(
            edges(&[1.0], &BinPolicy::EqualWidth { count: 0 }),
            Err(BinningError::ZeroBins)
        );
        assert_eq!(
            edges(&[1.0], &BinPolicy::FixedEdges(vec![1.0])),
            Err(BinningError::TooFewEdges(1))
        );
        assert!(matches!(
            edges(&[1.0], &BinPolicy::FixedEdges(vec![0.0, 0.5, 0.5])),
            Err(BinningError::UnsortedEdges(_))
        ));
        assert!(matches!(
            bin_means(&[1.0, 2.0], &[1.0], &BinPolicy::EqualWidth { count: 2 }),
            Err(BinningError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_group_means_and_labels() {
        let values = [0.1, 0.4, 0.8];
        let ela = [300.0, 200.0, 100.0];
        let math = [30.0, 20.0, 10.0];
        let table = group_means(
            &values,
            &[("ELA", &ela), ("Math", &math)],
            &BinPolicy::FixedEdges(vec![0.0, 0.5, 1.0]),
        )
        .unwrap()
        .with_labels(&percent_labels(&[0.0, 0.5, 1.0]))
        .unwrap();
        assert_eq!(table.targets, vec!["ELA", "Math"]);
        assert_eq!(table.buckets[0].label, "0-50%");
        assert_eq!(table.buckets[1].label, "50-100%");
        assert_eq!(table.mean(0, 0), 250.0);
        assert_eq!(table.mean(1, 1), 10.0);
        assert!(table.clone().with_labels(&["only one"]).is_err());
    }

    #[test]
    fn test_quantile_edges_quartiles() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let e = edges(&values, &BinPolicy::Quantile { count: 4 }).unwrap();
        assert_eq!(e, vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    }
}
