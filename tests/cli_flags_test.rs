//! CLI flag contract tests
//!
//! Runs the binary against a generated school table and checks which
//! artifacts each flag combination writes. Charts are skipped so the tests
//! do not depend on system fonts.

use std::path::Path;
use std::process::Command;

const HEADER: &str =
    "CDSCODE,DSAL,STSAL,BTCHSAL,MTCHSAL,HTCHSAL,SELA_Y2,SMATH_Y2,DELA_Y2,DMATH_Y2,PERSD,RALL,REL,RSED";

const RANGES: [&str; 5] = [
    "-0.76 to -0.84",
    "approximately 0.18",
    "-0.39 to -0.48",
    "0.72-0.76",
    "0.76-0.95",
];

fn schoolstat_bin() -> String {
    env!("CARGO_BIN_EXE_schoolstat").to_string()
}

/// Deterministic table where test scores fall as PERSD rises
fn school_csv(rows: usize) -> String {
    let mut s = format!("{HEADER}\n");
    for i in 0..rows {
        let x = i as f64 / rows as f64;
        let w = ((i * 37) % 11) as f64 / 10.0;
        let values = [
            0.3 + 0.4 * w,
            0.7 - 0.4 * w,
            0.2 + 0.5 * w,
            0.25 + 0.5 * w,
            0.3 + 0.4 * w + 0.1 * x,
            2600.0 - 120.0 * x + 15.0 * w,
            2580.0 - 150.0 * x + 10.0 * w,
            2590.0 - 110.0 * x + 12.0 * w,
            2570.0 - 140.0 * x + 8.0 * w,
            x,
            5.0 + 20.0 * x + 4.0 * w,
            6.0 + 22.0 * x + 3.0 * w,
            7.0 + 21.0 * x + 5.0 * w,
        ];
        s.push_str(&format!("{:014}", i + 1));
        for v in values {
            s.push_str(&format!(",{v:.4}"));
        }
        s.push('\n');
    }
    s
}

fn setup_workspace(rows: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join("data/school_data.csv"), school_csv(rows)).unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(schoolstat_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run schoolstat");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_base_run_writes_summary_only() {
    let dir = setup_workspace(120);
    let (code, stdout, stderr) = run(dir.path(), &["--skip-charts"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("SED BUCKETS"));

    let out = dir.path().join("output");
    let summary = std::fs::read_to_string(out.join("analysis_summary.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&summary).unwrap();
    assert_eq!(json["rows"], 120);
    assert_eq!(json["rows_dropped"], 0);
    assert!(!out.join("school_data_report.md").exists());
    assert!(!out.join("school_data_report.html").exists());
}

#[test]
fn test_with_report_contains_configured_ranges() {
    let dir = setup_workspace(120);
    let (code, _, stderr) = run(dir.path(), &["--with-report", "--skip-charts"]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let report =
        std::fs::read_to_string(dir.path().join("output/school_data_report.md")).unwrap();
    for range in RANGES {
        assert!(report.contains(range), "missing range {range}");
    }
}

#[test]
fn test_analyze_subcommand_and_output_dir() {
    let dir = setup_workspace(120);
    let (code, _, stderr) = run(
        dir.path(),
        &["analyze", "--html-report", "--skip-charts", "--output-dir", "site"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let html =
        std::fs::read_to_string(dir.path().join("site/school_data_report.html")).unwrap();
    assert!(html.contains("class=\"legend\""));
    assert!(html.contains("visualization not available."));
    assert!(html.contains("Data period: 2022-23"));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_publish_dir_gets_html_only() {
    let dir = setup_workspace(120);
    let (code, _, stderr) = run(
        dir.path(),
        &[
            "--with-report",
            "--html-report",
            "--skip-charts",
            "--publish-dir",
            "docs",
        ],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let docs = dir.path().join("docs");
    assert!(docs.join("school_data_report.html").exists());
    assert!(!docs.join("school_data_report.md").exists());
    assert!(!docs.join("analysis_summary.json").exists());
}

#[test]
fn test_missing_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let csv = school_csv(20)
        .lines()
        .map(|l| l.rsplit_once(',').map(|(head, _)| head).unwrap_or(l).to_string())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(dir.path().join("partial.csv"), csv).unwrap();

    let (code, _, stderr) = run(dir.path(), &["--data", "partial.csv", "--skip-charts"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("RSED"), "stderr: {stderr}");
    assert!(!dir.path().join("output/analysis_summary.json").exists());
}

#[test]
fn test_missing_data_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(dir.path(), &["--skip-charts"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("school_data.csv"), "stderr: {stderr}");
}

#[test]
fn test_config_findings_replace_defaults() {
    let dir = setup_workspace(120);
    std::fs::write(
        dir.path().join("schoolstat.toml"),
        r#"
[report]
title = "District Review"

[[findings]]
title = "Custom Finding"
text = "Configured text."
range = "0.11-0.22"
pairs = [["PERSD", "SMATH_Y2"]]
"#,
    )
    .unwrap();

    let (code, _, stderr) = run(dir.path(), &["--with-report", "--skip-charts"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let report =
        std::fs::read_to_string(dir.path().join("output/school_data_report.md")).unwrap();
    assert!(report.contains("District Review"));
    assert!(report.contains("0.11-0.22"));
    assert!(!report.contains("-0.76 to -0.84"));
}

#[test]
fn test_broken_config_fails() {
    let dir = setup_workspace(120);
    std::fs::write(dir.path().join("schoolstat.toml"), "[binning\nsed_edges = 1").unwrap();
    let (code, _, stderr) = run(dir.path(), &["--skip-charts"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("schoolstat.toml"), "stderr: {stderr}");
}

#[test]
fn test_validate_warns_on_small_table() {
    let dir = setup_workspace(12);
    let (code, stdout, stderr) = run(dir.path(), &["validate"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("12 schools loaded"));
    assert!(stdout.contains("recommended: 100+"));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_variables_lists_reference() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(dir.path(), &["variables"]);
    assert_eq!(code, 0);
    for name in ["CDSCODE", "PERSD", "SMATH_Y2", "RALL"] {
        assert!(stdout.contains(name), "missing {name}");
    }
}

#[test]
fn test_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run(dir.path(), &["init"]);
    assert_eq!(code, 0);
    let config = dir.path().join("schoolstat.toml");
    assert!(std::fs::read_to_string(&config)
        .unwrap()
        .contains("[[findings]]"));

    std::fs::write(&config, "# edited").unwrap();
    let (code, _, stderr) = run(dir.path(), &["init"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"), "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(&config).unwrap(), "# edited");
}
