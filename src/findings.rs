//! Key findings quoted in the reports
//!
//! A finding carries a fixed range string that is reproduced verbatim, and
//! the variable pairs whose coefficients from the current run are shown
//! next to it.

use serde::{Deserialize, Serialize};

use crate::models::Variable;
use crate::stats::CorrelationMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFinding {
    pub title: String,
    pub text: String,
    /// Reported correlation range, printed exactly as given
    pub range: String,
    #[serde(default)]
    pub pairs: Vec<(Variable, Variable)>,
}

impl KeyFinding {
    fn new(title: &str, text: &str, range: &str, pairs: Vec<(Variable, Variable)>) -> Self {
        Self {
            title: title.to_string(),
            text: text.to_string(),
            range: range.to_string(),
            pairs,
        }
    }
}

fn crossed(a: Variable, others: &[Variable]) -> Vec<(Variable, Variable)> {
    others.iter().map(|b| (a, *b)).collect()
}

/// The five findings reported when the config does not supply its own
pub fn default_findings() -> Vec<KeyFinding> {
    use Variable::*;
    vec![
        KeyFinding::new(
            "Socioeconomic Status Impact",
            "Schools with higher percentages of socioeconomically disadvantaged students \
             show significantly lower test scores in both Math and English Language Arts. \
             The correlation values range from -0.76 to -0.84.",
            "-0.76 to -0.84",
            crossed(Persd, &Variable::TEST_SCORES),
        ),
        KeyFinding::new(
            "Teacher Salary Relationship",
            "Higher teacher salaries show a modest positive correlation with test scores. \
             High-level teacher salaries correlate at approximately 0.18 with test \
             scores, suggesting that competitive compensation may contribute to student \
             achievement.",
            "approximately 0.18",
            crossed(Htchsal, &[SelaY2, SmathY2]),
        ),
        KeyFinding::new(
            "Chronic Absence Impact",
            "Higher chronic absence rates strongly correlate with lower test scores. The \
             correlation values range from -0.39 to -0.48, indicating that regular \
             attendance is an important factor in student achievement.",
            "-0.39 to -0.48",
            crossed(Rall, &Variable::TEST_SCORES),
        ),
        KeyFinding::new(
            "Salary Structure Observations",
            "There's a strong correlation (0.72-0.76) between beginning, mid-career, and \
             high-level teacher salaries, suggesting districts with higher starting \
             salaries tend to maintain competitive compensation throughout career \
             progression.",
            "0.72-0.76",
            vec![(Btchsal, Mtchsal), (Btchsal, Htchsal), (Mtchsal, Htchsal)],
        ),
        KeyFinding::new(
            "Absence Rate Patterns",
            "Absence rates strongly correlate across different student groups \
             (0.76-0.95), suggesting that absence issues tend to affect entire school \
             populations rather than being isolated to specific demographic groups.",
            "0.76-0.95",
            vec![(Rall, Rel), (Rall, Rsed), (Rel, Rsed)],
        ),
    ]
}

/// English learner absence against disadvantage and scores. Shown by the
/// HTML report after the configured findings.
pub fn english_learner_finding() -> KeyFinding {
    use Variable::*;
    KeyFinding::new(
        "English Learner Absence & Disadvantage",
        "Chronic absence rates among English Learners are moderately correlated with \
         both the percentage of socioeconomically disadvantaged students (r ≈ 0.29) \
         and lower test scores (r ≈ -0.39 for ELA, r ≈ -0.41 for Math). This suggests \
         that schools with more disadvantaged students and higher English Learner \
         absence face compounding challenges in academic achievement.",
        "r ≈ 0.29 (PERSD), r ≈ -0.39 (ELA), r ≈ -0.41 (Math)",
        vec![(Rel, Persd), (Rel, SelaY2), (Rel, SmathY2)],
    )
}

/// A finding together with what this run observed for its pairs
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedFinding {
    #[serde(flatten)]
    pub finding: KeyFinding,
    /// Min and max coefficient over the finding's pairs; `None` if none defined
    pub observed: Option<(f64, f64)>,
}

impl EvaluatedFinding {
    /// Human-readable observed range, e.g. `-0.81 to -0.77` or `0.18`
    pub fn observed_label(&self) -> String {
        match self.observed {
            None if self.finding.pairs.is_empty() => "not measured".to_string(),
            None => "n/a".to_string(),
            Some((lo, hi)) if (hi - lo).abs() < 0.005 => format!("{lo:.2}"),
            Some((lo, hi)) => format!("{lo:.2} to {hi:.2}"),
        }
    }
}

pub fn evaluate(findings: &[KeyFinding], matrix: &CorrelationMatrix) -> Vec<EvaluatedFinding> {
    findings
        .iter()
        .map(|f| EvaluatedFinding {
            finding: f.clone(),
            observed: matrix.observed_range(&f.pairs),
        })
        .collect()
}
