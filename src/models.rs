//! Core data models for schoolstat
//!
//! These models describe the school table as it flows through the
//! pipeline: the variable catalogue, one record per school, and the
//! immutable dataset the statistics are computed from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the opaque school identifier column
pub const IDENTIFIER_COLUMN: &str = "CDSCODE";

/// Numeric variables carried by every school record, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "DSAL")]
    Dsal,
    #[serde(rename = "STSAL")]
    Stsal,
    #[serde(rename = "BTCHSAL")]
    Btchsal,
    #[serde(rename = "MTCHSAL")]
    Mtchsal,
    #[serde(rename = "HTCHSAL")]
    Htchsal,
    #[serde(rename = "SELA_Y2")]
    SelaY2,
    #[serde(rename = "SMATH_Y2")]
    SmathY2,
    #[serde(rename = "DELA_Y2")]
    DelaY2,
    #[serde(rename = "DMATH_Y2")]
    DmathY2,
    #[serde(rename = "PERSD")]
    Persd,
    #[serde(rename = "RALL")]
    Rall,
    #[serde(rename = "REL")]
    Rel,
    #[serde(rename = "RSED")]
    Rsed,
}

impl Variable {
    pub const COUNT: usize = 13;

    pub const ALL: [Variable; Variable::COUNT] = [
        Variable::Dsal,
        Variable::Stsal,
        Variable::Btchsal,
        Variable::Mtchsal,
        Variable::Htchsal,
        Variable::SelaY2,
        Variable::SmathY2,
        Variable::DelaY2,
        Variable::DmathY2,
        Variable::Persd,
        Variable::Rall,
        Variable::Rel,
        Variable::Rsed,
    ];

    /// Salary columns that are min-max normalized during preparation
    pub const SALARIES: [Variable; 5] = [
        Variable::Dsal,
        Variable::Stsal,
        Variable::Btchsal,
        Variable::Mtchsal,
        Variable::Htchsal,
    ];

    pub const TEST_SCORES: [Variable; 4] = [
        Variable::SelaY2,
        Variable::SmathY2,
        Variable::DelaY2,
        Variable::DmathY2,
    ];

    pub const ABSENCE_RATES: [Variable; 3] = [Variable::Rall, Variable::Rel, Variable::Rsed];

    /// Column header as it appears in the data files
    pub fn column(&self) -> &'static str {
        match self {
            Variable::Dsal => "DSAL",
            Variable::Stsal => "STSAL",
            Variable::Btchsal => "BTCHSAL",
            Variable::Mtchsal => "MTCHSAL",
            Variable::Htchsal => "HTCHSAL",
            Variable::SelaY2 => "SELA_Y2",
            Variable::SmathY2 => "SMATH_Y2",
            Variable::DelaY2 => "DELA_Y2",
            Variable::DmathY2 => "DMATH_Y2",
            Variable::Persd => "PERSD",
            Variable::Rall => "RALL",
            Variable::Rel => "REL",
            Variable::Rsed => "RSED",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variable::Dsal => "District Salary (Normalized)",
            Variable::Stsal => "State Salary (Normalized)",
            Variable::Btchsal => "Beginning Teacher Salary (Normalized)",
            Variable::Mtchsal => "Mid-career Teacher Salary (Normalized)",
            Variable::Htchsal => "High-level Teacher Salary (Normalized)",
            Variable::SelaY2 => "State English Language Arts Test Score",
            Variable::SmathY2 => "State Mathematics Test Score",
            Variable::DelaY2 => "District English Language Arts Test Score",
            Variable::DmathY2 => "District Mathematics Test Score",
            Variable::Persd => "Percentage of Socioeconomically Disadvantaged Students",
            Variable::Rall => "Chronic Absence Rate - All Students",
            Variable::Rel => "Chronic Absence Rate - English Learners",
            Variable::Rsed => "Chronic Absence Rate - Socioeconomically Disadvantaged Students",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Variable::Dsal
            | Variable::Stsal
            | Variable::Btchsal
            | Variable::Mtchsal
            | Variable::Htchsal => Category::Salary,
            Variable::SelaY2 | Variable::SmathY2 | Variable::DelaY2 | Variable::DmathY2 => {
                Category::TestScore
            }
            Variable::Persd => Category::Socioeconomic,
            Variable::Rall | Variable::Rel | Variable::Rsed => Category::Absence,
        }
    }

    /// Position of this variable in [`Variable::ALL`] and in record storage
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Variable grouping used by the reference guide and its colour legend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Identifier,
    Salary,
    TestScore,
    Socioeconomic,
    Absence,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Identifier,
        Category::Salary,
        Category::TestScore,
        Category::Socioeconomic,
        Category::Absence,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Identifier => "Identifier",
            Category::Salary => "Salary",
            Category::TestScore => "Test Score",
            Category::Socioeconomic => "Socioeconomic",
            Category::Absence => "Absence",
        }
    }

    /// Background colour (hex) used for this category in reports
    pub fn color(&self) -> &'static str {
        match self {
            Category::Identifier => "#A9BCD0",
            Category::Salary => "#FFD699",
            Category::TestScore => "#B8E0B8",
            Category::Socioeconomic => "#C5C0E5",
            Category::Absence => "#FAB3B3",
        }
    }
}

/// One row of the variable reference guide
#[derive(Debug, Clone, Serialize)]
pub struct VariableInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
}

/// Reference guide for every column in the table, identifier first
pub fn variable_reference() -> Vec<VariableInfo> {
    let mut rows = vec![VariableInfo {
        name: IDENTIFIER_COLUMN,
        description: "Unique identifier for California schools",
        category: Category::Identifier,
    }];
    rows.extend(Variable::ALL.iter().map(|v| VariableInfo {
        name: v.column(),
        description: v.description(),
        category: v.category(),
    }));
    rows
}

/// One school's figures
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolRecord {
    pub cdscode: String,
    values: [f64; Variable::COUNT],
}

impl SchoolRecord {
    pub fn new(cdscode: impl Into<String>, values: [f64; Variable::COUNT]) -> Self {
        Self {
            cdscode: cdscode.into(),
            values,
        }
    }

    pub fn get(&self, variable: Variable) -> f64 {
        self.values[variable.index()]
    }
}

/// The loaded school table. Read once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<SchoolRecord>,
    source: PathBuf,
    rows_read: usize,
}

impl Dataset {
    pub fn new(records: Vec<SchoolRecord>, source: impl Into<PathBuf>, rows_read: usize) -> Self {
        Self {
            records,
            source: source.into(),
            rows_read,
        }
    }

    pub fn records(&self) -> &[SchoolRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Data rows present in the input before incomplete rows were dropped
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_read.saturating_sub(self.records.len())
    }

    /// Copy one variable out as a column vector
    pub fn column(&self, variable: Variable) -> Vec<f64> {
        self.records.iter().map(|r| r.get(variable)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_order_matches_index() {
        for (i, v) in Variable::ALL.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
    }

    #[test]
    fn test_reference_covers_all_columns() {
        let reference = variable_reference();
        assert_eq!(reference.len(), Variable::COUNT + 1);
        assert_eq!(reference[0].name, IDENTIFIER_COLUMN);
        assert_eq!(reference[0].category, Category::Identifier);
        assert!(reference
            .iter()
            .any(|r| r.name == "RSED" && r.category == Category::Absence));
    }

    #[test]
    fn test_dataset_column_and_drop_count() {
        let mut values = [0.0; Variable::COUNT];
        values[Variable::Persd.index()] = 42.0;
        let ds = Dataset::new(vec![SchoolRecord::new("1", values)], "x.csv", 3);
        assert_eq!(ds.column(Variable::Persd), vec![42.0]);
        assert_eq!(ds.rows_dropped(), 2);
    }

    #[test]
    fn test_variable_serde_uses_column_names() {
        let json = serde_json::to_string(&Variable::SelaY2).unwrap();
        assert_eq!(json, "\"SELA_Y2\"");
        let v: Variable = serde_json::from_str("\"RSED\"").unwrap();
        assert_eq!(v, Variable::Rsed);
    }
}
