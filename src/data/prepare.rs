//! Building the merged school table from the raw state extracts
//!
//! Five extracts are read, cleaned per source, inner-joined on CDSCODE,
//! reduced to complete rows, and written out as the CSV that
//! [`super::Loader`] reads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{normalize_header, NULL_MARKERS};
use crate::models::{Variable, IDENTIFIER_COLUMN};

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("raw data file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {name} data in {path}: {source}")]
    Csv {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{name} data in {path} is missing column(s): {}", .missing.join(", "))]
    MissingColumns {
        name: &'static str,
        path: PathBuf,
        missing: Vec<String>,
    },

    #[error("merged table is empty after joining and dropping incomplete rows")]
    Empty,

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How a source fills its missing cells before the join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRule {
    /// Leave missing; the row is dropped after the join
    Keep,
    /// Missing means zero
    Zero,
    /// Replace with the column mean over that source's present values
    ColumnMean,
}

/// One raw extract
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub name: &'static str,
    pub file: &'static str,
    pub delimiter: u8,
    pub footer_lines: usize,
    pub columns: &'static [Variable],
    pub missing: MissingRule,
    /// A literal `0` is a placeholder for "not reported"
    pub zero_is_missing: bool,
}

/// The extracts in join order; rows follow the first one
pub const SOURCES: [SourceSpec; 5] = [
    SourceSpec {
        name: "expenditure",
        file: "Expenditure_Data.txt",
        delimiter: b',',
        footer_lines: 5,
        columns: &[Variable::Dsal, Variable::Stsal],
        missing: MissingRule::ColumnMean,
        zero_is_missing: false,
    },
    SourceSpec {
        name: "salary",
        file: "Salary_Data.txt",
        delimiter: b',',
        footer_lines: 5,
        columns: &[Variable::Btchsal, Variable::Mtchsal, Variable::Htchsal],
        missing: MissingRule::ColumnMean,
        zero_is_missing: false,
    },
    SourceSpec {
        name: "test scores",
        file: "Test_Score_Results.txt",
        delimiter: b'\t',
        footer_lines: 0,
        columns: &Variable::TEST_SCORES,
        missing: MissingRule::Keep,
        zero_is_missing: true,
    },
    SourceSpec {
        name: "socioeconomic",
        file: "Subgroup_Data.txt",
        delimiter: b',',
        footer_lines: 0,
        columns: &[Variable::Persd],
        missing: MissingRule::Zero,
        zero_is_missing: false,
    },
    SourceSpec {
        name: "chronic absence",
        file: "Chronic_Absent.txt",
        delimiter: b'|',
        footer_lines: 0,
        columns: &Variable::ABSENCE_RATES,
        missing: MissingRule::Keep,
        zero_is_missing: false,
    },
];

/// Parsed extract: codes in file order and one value row per code
#[derive(Debug, Default)]
struct SourceTable {
    codes: Vec<String>,
    rows: Vec<Vec<f64>>,
    by_key: HashMap<String, Vec<usize>>,
}

/// Join key for a school code. Some extracts write codes as numbers, which
/// loses the leading zeros, so all-digit codes compare without them.
pub fn join_key(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = code.trim_start_matches('0');
        if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        }
    } else {
        code.to_string()
    }
}

enum Cell {
    Missing,
    Invalid,
    Value(f64),
}

fn classify(raw: &str, zero_is_missing: bool) -> Cell {
    let cell = raw.trim();
    if NULL_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m)) {
        return Cell::Missing;
    }
    // only the literal "0" is a placeholder; "0.0" is a real score
    if zero_is_missing && cell == "0" {
        return Cell::Missing;
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Value(v),
        _ => Cell::Invalid,
    }
}

/// Text of `path` without its last `footer` lines (trailing blank lines
/// are not counted)
fn read_without_footer(path: &Path, footer: usize) -> Result<String, PrepareError> {
    let text = std::fs::read_to_string(path).map_err(|source| PrepareError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if footer == 0 {
        return Ok(text);
    }
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let keep = lines.len().saturating_sub(footer);
    debug!("{}: skipping {} footer line(s)", path.display(), lines.len() - keep);
    lines.truncate(keep);
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

fn read_source(dir: &Path, spec: &SourceSpec) -> Result<SourceTable, PrepareError> {
    let path = dir.join(spec.file);
    if !path.is_file() {
        return Err(PrepareError::MissingFile(path));
    }
    let text = read_without_footer(&path, spec.footer_lines)?;
    let csv_err = |source: csv::Error| PrepareError::Csv {
        name: spec.name,
        path: path.clone(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(spec.delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(normalize_header)
        .collect();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let mut missing = Vec::new();
    let id_idx = find(IDENTIFIER_COLUMN);
    if id_idx.is_none() {
        missing.push(IDENTIFIER_COLUMN.to_string());
    }
    let mut col_idx = Vec::with_capacity(spec.columns.len());
    for v in spec.columns {
        match find(v.column()) {
            Some(i) => col_idx.push(i),
            None => missing.push(v.column().to_string()),
        }
    }
    let Some(id_idx) = id_idx.filter(|_| missing.is_empty()) else {
        return Err(PrepareError::MissingColumns {
            name: spec.name,
            path: path.clone(),
            missing,
        });
    };

    let mut table = SourceTable::default();
    let mut gaps: Vec<Vec<usize>> = vec![Vec::new(); spec.columns.len()];
    let mut invalid = vec![0usize; spec.columns.len()];

    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let Some(code) = record.get(id_idx).map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let row_idx = table.rows.len();
        let mut row = Vec::with_capacity(spec.columns.len());
        for (c, idx) in col_idx.iter().enumerate() {
            let value = match classify(record.get(*idx).unwrap_or(""), spec.zero_is_missing) {
                Cell::Value(v) => v,
                Cell::Missing => {
                    gaps[c].push(row_idx);
                    f64::NAN
                }
                Cell::Invalid => {
                    invalid[c] += 1;
                    f64::NAN
                }
            };
            row.push(value);
        }
        table
            .by_key
            .entry(join_key(code))
            .or_default()
            .push(row_idx);
        table.codes.push(code.to_string());
        table.rows.push(row);
    }

    for (c, v) in spec.columns.iter().enumerate() {
        let fill = match spec.missing {
            MissingRule::Keep => continue,
            MissingRule::Zero => 0.0,
            MissingRule::ColumnMean => {
                let present: Vec<f64> = table
                    .rows
                    .iter()
                    .map(|r| r[c])
                    .filter(|x| !x.is_nan())
                    .collect();
                crate::stats::mean(&present)
            }
        };
        if !gaps[c].is_empty() {
            debug!("{}: filling {} missing {} with {}", spec.name, gaps[c].len(), v, fill);
        }
        for &r in &gaps[c] {
            table.rows[r][c] = fill;
        }
        if invalid[c] > 0 {
            warn!("{}: {} non-numeric {} value(s)", spec.name, invalid[c], v);
        }
    }

    info!(
        "Loaded {} data: {} rows from {}",
        spec.name,
        table.rows.len(),
        path.display()
    );
    Ok(table)
}

/// Row of the merged table while joining
#[derive(Debug, Clone)]
struct MergedRow {
    code: String,
    values: [f64; Variable::COUNT],
}

fn join(rows: Vec<MergedRow>, spec: &SourceSpec, table: &SourceTable) -> Vec<MergedRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(matches) = table.by_key.get(&join_key(&row.code)) else {
            continue;
        };
        for &m in matches {
            let mut merged = row.clone();
            for (c, v) in spec.columns.iter().enumerate() {
                merged.values[v.index()] = table.rows[m][c];
            }
            out.push(merged);
        }
    }
    out
}

/// Min-max scale a column to [0, 1]; a constant column becomes all zeros
pub fn min_max_normalize(values: &mut [f64]) {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    for v in values.iter_mut() {
        *v = if range > 0.0 { (*v - lo) / range } else { 0.0 };
    }
}

/// What a preparation run produced
#[derive(Debug, Clone)]
pub struct PrepareSummary {
    pub output: PathBuf,
    /// Rows read per source, in join order
    pub source_rows: Vec<(&'static str, usize)>,
    /// Rows remaining after each join, starting with the first source alone
    pub join_rows: Vec<(&'static str, usize)>,
    pub rows_dropped: usize,
    pub rows_written: usize,
}

/// Merge the raw extracts in `raw_dir` and write the result to `out`
pub fn prepare(raw_dir: &Path, out: &Path) -> Result<PrepareSummary, PrepareError> {
    let tables = SOURCES
        .iter()
        .map(|spec| read_source(raw_dir, spec))
        .collect::<Result<Vec<_>, _>>()?;

    let source_rows = SOURCES
        .iter()
        .zip(&tables)
        .map(|(s, t)| (s.name, t.rows.len()))
        .collect();

    let (first_spec, first) = (&SOURCES[0], &tables[0]);
    let mut rows: Vec<MergedRow> = first
        .codes
        .iter()
        .zip(&first.rows)
        .map(|(code, values)| {
            let mut merged = MergedRow {
                code: code.clone(),
                values: [f64::NAN; Variable::COUNT],
            };
            for (c, v) in first_spec.columns.iter().enumerate() {
                merged.values[v.index()] = values[c];
            }
            merged
        })
        .collect();

    let mut join_rows = vec![(first_spec.name, rows.len())];
    for (spec, table) in SOURCES.iter().zip(&tables).skip(1) {
        rows = join(rows, spec, table);
        info!("After joining {}: {} rows", spec.name, rows.len());
        join_rows.push((spec.name, rows.len()));
    }

    let joined = rows.len();
    for v in Variable::ALL {
        let n = rows.iter().filter(|r| r.values[v.index()].is_nan()).count();
        if n > 0 {
            warn!(
                "Column {} has {} missing value(s) ({:.1}%)",
                v,
                n,
                n as f64 / joined as f64 * 100.0
            );
        }
    }
    rows.retain(|r| r.values.iter().all(|x| !x.is_nan()));
    let rows_dropped = joined - rows.len();
    info!("{} incomplete row(s) removed, {} remain", rows_dropped, rows.len());

    if rows.is_empty() {
        return Err(PrepareError::Empty);
    }

    for v in Variable::SALARIES {
        let mut column: Vec<f64> = rows.iter().map(|r| r.values[v.index()]).collect();
        min_max_normalize(&mut column);
        for (row, x) in rows.iter_mut().zip(column) {
            row.values[v.index()] = x;
        }
    }

    write_csv(out, &rows)?;
    info!("Wrote merged table to {}", out.display());

    Ok(PrepareSummary {
        output: out.to_path_buf(),
        source_rows,
        join_rows,
        rows_dropped,
        rows_written: rows.len(),
    })
}

fn write_csv(out: &Path, rows: &[MergedRow]) -> Result<(), PrepareError> {
    let write_err = |source: std::io::Error| PrepareError::Write {
        path: out.to_path_buf(),
        source,
    };
    let dir = match out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let tmp = tempfile::Builder::new()
        .prefix(".schoolstat-")
        .suffix(".csv")
        .tempfile_in(dir)
        .map_err(write_err)?;
    {
        let mut wtr = csv::Writer::from_writer(tmp.as_file());
        let mut header = vec![IDENTIFIER_COLUMN.to_string()];
        header.extend(Variable::ALL.iter().map(|v| v.column().to_string()));
        wtr.write_record(&header)
            .map_err(|e| write_err(e.into()))?;
        for row in rows {
            let mut record = Vec::with_capacity(Variable::COUNT + 1);
            record.push(row.code.clone());
            record.extend(row.values.iter().map(|v| v.to_string()));
            wtr.write_record(&record).map_err(|e| write_err(e.into()))?;
        }
        wtr.flush().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(out).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Loader;
    use std::fs;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    fn fixture(dir: &Path) {
        write(
            dir,
            "Expenditure_Data.txt",
            "CDSCODE,SARCYEAR,DSAL,STSAL\n\
             01000000000001,2023,100,200\n\
             01000000000002,2023,,260\n\
             01000000000003,2023,160,320\n\
             01000000000004,2023,130,240\n\
             footer 1\nfooter 2\nfooter 3\nfooter 4\nfooter 5\n",
        );
        write(
            dir,
            "Salary_Data.txt",
            "cdscode,btchsal,mtchsal,htchsal\n\
             1000000000001,40000,60000,90000\n\
             1000000000002,42000,65000,95000\n\
             1000000000003,45000,,99000\n\
             1000000000004,41000,61000,91000\n\
             a\nb\nc\nd\ne\n",
        );
        write(
            dir,
            "Test_Score_Results.txt",
            "CDSCODE\tSELA_Y2\tSMATH_Y2\tDELA_Y2\tDMATH_Y2\n\
             01000000000001\t2500\t2450\t2510\t2460\n\
             01000000000002\t2480\t--\t2490\t2440\n\
             01000000000003\t2520\t2470\t2530\t2480\n\
             01000000000004\t2460\t2430\t2470\t2420\n",
        );
        write(
            dir,
            "Subgroup_Data.txt",
            "CDSCODE,PERSD\n\
             01000000000001,55.5\n\
             01000000000002,40\n\
             01000000000003,\n\
             01000000000004,80\n",
        );
        write(
            dir,
            "Chronic_Absent.txt",
            "CDSCODE|RALL|REL|RSED\n\
             01000000000001|10.5|12|14\n\
             01000000000002|9|11|13\n\
             01000000000003|8|10|12\n\
             01000000000004|20|22|25\n",
        );
    }

    #[test]
    fn test_join_key_strips_leading_zeros() {
        assert_eq!(join_key("01611190130229"), "1611190130229");
        assert_eq!(join_key(" 1611190130229 "), "1611190130229");
        assert_eq!(join_key("000"), "0");
        assert_eq!(join_key("A01"), "A01");
    }

    #[test]
    fn test_min_max_normalize() {
        let mut v = vec![10.0, 20.0, 30.0];
        min_max_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.5, 1.0]);
        let mut c = vec![5.0, 5.0];
        min_max_normalize(&mut c);
        assert_eq!(c, vec![0.0, 0.0]);
    }

    #[test]
    fn test_classify_placeholders() {
        assert!(matches!(classify("0", true), Cell::Missing));
        assert!(matches!(classify("0", false), Cell::Value(v) if v == 0.0));
        assert!(matches!(classify(" 0 ", true), Cell::Missing));
        assert!(matches!(classify("0.0", true), Cell::Value(v) if v == 0.0));
        assert!(matches!(classify("-0", true), Cell::Value(v) if v == 0.0));
        assert!(matches!(classify("--", false), Cell::Missing));
        assert!(matches!(classify("*", false), Cell::Invalid));
    }

    #[test]
    fn test_prepare_merges_sources() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let out = dir.path().join("out").join("school_data.csv");

        let summary = prepare(dir.path(), &out).unwrap();
        assert_eq!(summary.source_rows[0], ("expenditure", 4));
        assert_eq!(summary.join_rows.last(), Some(&("chronic absence", 4)));
        // School 2 has a "--" math score
        assert_eq!(summary.rows_dropped, 1);
        assert_eq!(summary.rows_written, 3);

        let ds = Loader::new().load(&out).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records()[0].cdscode, "01000000000001");

        // Missing PERSD became 0; missing MTCHSAL got the column mean
        let third = &ds.records()[1];
        assert_eq!(third.get(Variable::Persd), 0.0);
        for v in Variable::SALARIES {
            let col = ds.column(v);
            assert!(col.iter().all(|x| (0.0..=1.0).contains(x)), "{v}");
        }
        let dsal = ds.column(Variable::Dsal);
        assert_eq!(dsal, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_prepare_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare(dir.path(), &dir.path().join("x.csv")).unwrap_err();
        assert!(matches!(err, PrepareError::MissingFile(p) if p.ends_with("Expenditure_Data.txt")));
    }

    #[test]
    fn test_prepare_no_overlap_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        write(
            dir.path(),
            "Chronic_Absent.txt",
            "CDSCODE|RALL|REL|RSED\n99|1|2|3\n",
        );
        let err = prepare(dir.path(), &dir.path().join("x.csv")).unwrap_err();
        assert!(matches!(err, PrepareError::Empty));
    }
}
