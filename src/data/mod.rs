//! Loading the merged school table
//!
//! The loader is the only place that decides which rows exist: a row with
//! any missing or non-numeric value is dropped here (listwise deletion),
//! so every statistic and chart downstream sees the same complete cases.

pub mod prepare;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Dataset, SchoolRecord, Variable, IDENTIFIER_COLUMN};

/// Cell values treated as missing
pub const NULL_MARKERS: [&str; 6] = ["", "--", "NA", "N/A", "NaN", "null"];

/// Below this many complete rows the correlations are not worth much
pub const MIN_RECOMMENDED_ROWS: usize = 100;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open data file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column(s): {}", .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("{path} has no complete rows ({rows_read} read, all dropped)")]
    Empty { path: PathBuf, rows_read: usize },
}

/// Parse one cell; `None` for null markers and anything non-numeric
pub fn parse_cell(raw: &str) -> Option<f64> {
    let cell = raw.trim();
    if NULL_MARKERS
        .iter()
        .any(|m| cell.eq_ignore_ascii_case(m))
    {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Upper-case a header cell and strip a UTF-8 byte-order mark
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_ascii_uppercase()
}

/// CSV loader for the merged school table
#[derive(Debug, Clone, Default)]
pub struct Loader;

impl Loader {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, path: &Path) -> Result<Dataset, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_reader(file, path)
    }

    /// Load from any reader; `source` is only used for messages
    pub fn load_reader<R: Read>(&self, reader: R, source: &Path) -> Result<Dataset, LoadError> {
        let csv_err = |e: csv::Error| LoadError::Csv {
            path: source.to_path_buf(),
            source: e,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(normalize_header)
            .collect();
        let position: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        let mut missing = Vec::new();
        let id_idx = position.get(IDENTIFIER_COLUMN).copied();
        if id_idx.is_none() {
            missing.push(IDENTIFIER_COLUMN.to_string());
        }
        let mut var_idx = [0usize; Variable::COUNT];
        for v in Variable::ALL {
            match position.get(v.column()) {
                Some(i) => var_idx[v.index()] = *i,
                None => missing.push(v.column().to_string()),
            }
        }
        let id_idx = match (id_idx, missing.is_empty()) {
            (Some(i), true) => i,
            _ => {
                return Err(LoadError::MissingColumns {
                    path: source.to_path_buf(),
                    missing,
                })
            }
        };

        let mut records = Vec::new();
        let mut rows_read = 0usize;
        let mut short_rows = 0usize;
        let mut missing_counts = [0usize; Variable::COUNT];

        for result in rdr.records() {
            let row = result.map_err(csv_err)?;
            rows_read += 1;

            let Some(code) = row.get(id_idx).map(str::trim).filter(|c| !c.is_empty()) else {
                short_rows += 1;
                continue;
            };

            let mut values = [f64::NAN; Variable::COUNT];
            let mut complete = true;
            for v in Variable::ALL {
                match row.get(var_idx[v.index()]).and_then(parse_cell) {
                    Some(x) => values[v.index()] = x,
                    None => {
                        missing_counts[v.index()] += 1;
                        complete = false;
                    }
                }
            }
            if complete {
                records.push(SchoolRecord::new(code, values));
            }
        }

        for v in Variable::ALL {
            let n = missing_counts[v.index()];
            if n > 0 {
                warn!("{}: {} row(s) with missing or non-numeric values", v, n);
            }
        }
        if short_rows > 0 {
            warn!("{} row(s) without a {}", short_rows, IDENTIFIER_COLUMN);
        }

        if records.is_empty() {
            return Err(LoadError::Empty {
                path: source.to_path_buf(),
                rows_read,
            });
        }

        let dataset = Dataset::new(records, source, rows_read);
        info!(
            "Loaded {} complete rows from {} ({} dropped)",
            dataset.len(),
            source.display(),
            dataset.rows_dropped()
        );
        debug!("columns: {:?}", headers);
        Ok(dataset)
    }
}

/// Problems worth telling the user about before trusting the numbers
pub fn validate(dataset: &Dataset) -> Vec<String> {
    let mut issues = Vec::new();
    if dataset.len() < MIN_RECOMMENDED_ROWS {
        issues.push(format!(
            "only {} complete rows; correlations may be unstable (recommended: {}+)",
            dataset.len(),
            MIN_RECOMMENDED_ROWS
        ));
    }
    if dataset.rows_dropped() > 0 {
        issues.push(format!(
            "{} of {} rows dropped for missing values",
            dataset.rows_dropped(),
            dataset.rows_read()
        ));
    }
    for v in Variable::ALL {
        let column = dataset.column(v);
        if let Some(first) = column.first() {
            if column.iter().all(|x| x == first) {
                issues.push(format!("{v} is constant; its correlations are undefined"));
            }
        }
    }
    let persd_max = dataset
        .column(Variable::Persd)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    if persd_max > 100.0 {
        issues.push(format!(
            "PERSD reaches {persd_max:.1}, above 100%; values are clipped in charts"
        ));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "CDSCODE,DSAL,STSAL,BTCHSAL,MTCHSAL,HTCHSAL,SELA_Y2,SMATH_Y2,DELA_Y2,DMATH_Y2,PERSD,RALL,REL,RSED";

    fn load(text: &str) -> Result<Dataset, LoadError> {
        Loader::new().load_reader(text.as_bytes(), Path::new("inline.csv"))
    }

    #[test]
    fn test_parse_cell_markers() {
        assert_eq!(parse_cell(" 2.5 "), Some(2.5));
        for marker in ["", "--", "na", "N/A", "NaN", "NULL", "abc", "inf"] {
            assert_eq!(parse_cell(marker), None, "{marker:?}");
        }
    }

    #[test]
    fn test_load_drops_incomplete_rows() {
        let text = format!(
            "{HEADER}\n\
             01611190130229,0.5,0.4,0.3,0.2,0.1,2500,2450,2510,2460,55,10,12,14\n\
             01611190130230,0.5,--,0.3,0.2,0.1,2500,2450,2510,2460,55,10,12,14\n\
             01611190130231,0.6,0.4,0.3,0.2,0.1,2520,2470,2530,2480,40,9,NA,13\n\
             01611190130232,0.7,0.5,0.4,0.3,0.2,2540,2490,2550,2500,30,8,10,12\n"
        );
        let ds = load(&text).unwrap();
        assert_eq!(ds.rows_read(), 4);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows_dropped(), 2);
        assert_eq!(ds.records()[0].cdscode, "01611190130229");
        assert_eq!(ds.records()[1].get(Variable::Persd), 30.0);
    }

    #[test]
    fn test_headers_case_insensitive_and_extra_columns() {
        let text = format!(
            "\u{feff}{},EXTRA\n1,0.5,0.4,0.3,0.2,0.1,2500,2450,2510,2460,55,10,12,14,x\n",
            HEADER.to_lowercase()
        );
        let ds = load(&text).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].get(Variable::Rsed), 14.0);
    }

    #[test]
    fn test_missing_columns_reported() {
        let err = load("CDSCODE,DSAL\n1,0.5\n").unwrap_err();
        match err {
            LoadError::MissingColumns { missing, .. } => {
                assert!(missing.contains(&"SMATH_Y2".to_string()));
                assert!(!missing.contains(&"DSAL".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_rows_dropped_is_error() {
        let text = format!("{HEADER}\n1,--,--,--,--,--,--,--,--,--,--,--,--,--\n");
        assert!(matches!(load(&text), Err(LoadError::Empty { rows_read: 1, .. })));
    }

    #[test]
    fn test_short_row_dropped_not_fatal() {
        let text = format!(
            "{HEADER}\n1,0.5,0.4\n2,0.5,0.4,0.3,0.2,0.1,2500,2450,2510,2460,55,10,12,14\n"
        );
        let ds = load(&text).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows_dropped(), 1);
    }

    #[test]
    fn test_validate_flags_small_dataset() {
        let text = format!("{HEADER}\n1,0.5,0.4,0.3,0.2,0.1,2500,2450,2510,2460,55,10,12,14\n");
        let issues = validate(&load(&text).unwrap());
        assert!(issues.iter().any(|i| i.contains("complete rows")));
        assert!(issues.iter().any(|i| i.contains("constant")));
    }

    #[test]
    fn test_open_missing_file() {
        let err = Loader::new()
            .load(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("here.csv"));
    }
}
