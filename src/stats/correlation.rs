//! Pearson correlation matrix over the numeric school variables
//!
//! The matrix is computed from the complete-case table produced by the
//! loader, so every pair sees the same rows. Each off-diagonal coefficient
//! is computed once and mirrored, which makes the matrix exactly symmetric.
//! A zero-variance column yields NaN for its whole row and column,
//! diagonal included.

use crate::models::{Dataset, Variable};

/// Pearson correlation of two equally long slices.
///
/// NaN when the lengths differ, fewer than two points are given, or
/// either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 || is_constant(x) || is_constant(y) {
        return f64::NAN;
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return f64::NAN;
    }
    (sxy / denom).clamp(-1.0, 1.0)
}

/// Exact-equality check; a mean-based variance test leaves rounding noise
/// for constant columns.
fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}

/// Square, symmetric matrix of coefficients indexed by [`Variable`]
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    variables: Vec<Variable>,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    /// Correlate every numeric column of the dataset
    pub fn compute(dataset: &Dataset) -> Self {
        let columns: Vec<Vec<f64>> = Variable::ALL.iter().map(|v| dataset.column(*v)).collect();
        Self::from_columns(&Variable::ALL, &columns)
    }

    /// Correlate the given columns; `columns[i]` holds `variables[i]`
    pub fn from_columns(variables: &[Variable], columns: &[Vec<f64>]) -> Self {
        let n = variables.len();
        debug_assert_eq!(n, columns.len());
        let mut values = vec![f64::NAN; n * n];
        for i in 0..n {
            values[i * n + i] = if columns[i].len() >= 2 && !is_constant(&columns[i]) {
                1.0
            } else {
                f64::NAN
            };
            for j in (i + 1)..n {
                let r = pearson(&columns[i], &columns[j]);
                values[i * n + j] = r;
                values[j * n + i] = r;
            }
        }
        Self {
            variables: variables.to_vec(),
            values,
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn size(&self) -> usize {
        self.variables.len()
    }

    fn position(&self, v: Variable) -> Option<usize> {
        self.variables.iter().position(|x| *x == v)
    }

    /// Coefficient for a pair; NaN when either variable is not in the matrix
    pub fn get(&self, a: Variable, b: Variable) -> f64 {
        match (self.position(a), self.position(b)) {
            (Some(i), Some(j)) => self.values[i * self.size() + j],
            _ => f64::NAN,
        }
    }

    /// Coefficient by matrix position
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size() + j]
    }

    /// Row-major copy of the matrix
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values
            .chunks(self.size().max(1))
            .map(|row| row.to_vec())
            .collect()
    }

    /// Other variables ranked by coefficient with `target`, highest first.
    /// Undefined coefficients sort last.
    pub fn top_correlations(&self, target: Variable, n: usize) -> Vec<(Variable, f64)> {
        let mut ranked: Vec<(Variable, f64)> = self
            .variables
            .iter()
            .copied()
            .filter(|v| *v != target)
            .map(|v| (v, self.get(target, v)))
            .collect();
        ranked.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => b.1.total_cmp(&a.1),
        });
        ranked.truncate(n);
        ranked
    }

    /// Strongest distinct pairs by absolute coefficient
    pub fn strongest_pairs(&self, n: usize) -> Vec<(Variable, Variable, f64)> {
        let size = self.size();
        let mut pairs = Vec::new();
        for i in 0..size {
            for j in (i + 1)..size {
                let r = self.at(i, j);
                if !r.is_nan() {
                    pairs.push((self.variables[i], self.variables[j], r));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        pairs.truncate(n);
        pairs
    }

    /// Min and max coefficient over the given pairs, ignoring NaN.
    /// `None` when no pair has a defined coefficient.
    pub fn observed_range(&self, pairs: &[(Variable, Variable)]) -> Option<(f64, f64)> {
        pairs
            .iter()
            .map(|(a, b)| self.get(*a, *b))
            .filter(|r| !r.is_nan())
            .fold(None, |acc, r| match acc {
                None => Some((r, r)),
                Some((lo, hi)) => Some((f64::min(lo, r), f64::max(hi, r))),
            })
    }
}
