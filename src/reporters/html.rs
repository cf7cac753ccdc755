//! HTML reporter with embedded styles and figures
//!
//! Generates a standalone page that can be viewed in any browser or
//! published as-is. Includes:
//! - Summary and key findings with their reported and observed ranges
//! - Figures embedded as base64 PNGs
//! - Colour-coded variable reference guide

use super::{ReportContext, SOURCE_NOTE, SUMMARY};
use crate::charts::ChartKind;
use crate::findings::{default_findings, english_learner_finding, evaluate, EvaluatedFinding};
use crate::models::{variable_reference, Category};
use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Figures embedded in the page: kind, alt text, caption
const FIGURES: [(ChartKind, &str, &str); 4] = [
    (
        ChartKind::SedMathRelationship,
        "Relationship between socioeconomic status and math scores",
        "Relationship between socioeconomic status and math scores showing a strong negative correlation.",
    ),
    (
        ChartKind::CorrelationMatrix,
        "Correlation matrix of key variables",
        "Correlation matrix showing relationships between various factors in the dataset.",
    ),
    (
        ChartKind::TestScoresBySed,
        "Test scores by SED bins",
        "Average test scores by percentage of socioeconomically disadvantaged students (SED bins).",
    ),
    (
        ChartKind::TestScoresRelationships,
        "Test score relationships",
        "Scatter plots showing relationships between teacher salaries, absence rates, and test scores.",
    ),
];

/// Render report as standalone HTML
pub fn render(ctx: &ReportContext<'_>) -> Result<String> {
    let mut html = String::new();

    html.push_str(&render_head(ctx));
    html.push_str("<body>\n");
    html.push_str(&format!(
        "<div class=\"date\">Generated on: {}</div>\n",
        ctx.generated.format("%B %d, %Y")
    ));
    html.push_str("<div class=\"container\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(ctx.title)));
    html.push_str(&format!(
        "<div class=\"summary\">\n    <p>{}</p>\n    <p>{} schools analyzed ({} dropped for missing values).</p>\n</div>\n",
        SUMMARY, ctx.analysis.rows, ctx.analysis.rows_dropped
    ));

    html.push_str(&render_findings(ctx));
    html.push_str(&render_figures(ctx));
    html.push_str(&render_reference());

    html.push_str(&format!("<div class=\"footer\">\n    {SOURCE_NOTE}\n</div>\n"));
    html.push_str(&format!(
        "<div class=\"year\">\n    Data period: {}\n</div>\n",
        html_escape(ctx.data_period)
    ));
    html.push_str("</div>\n</body>\n</html>\n");

    Ok(html)
}

fn render_head(ctx: &ReportContext<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>
{CSS}
    </style>
</head>
"#,
        html_escape(ctx.title)
    )
}

fn render_findings(ctx: &ReportContext<'_>) -> String {
    let mut out = String::from("<h2>Key Findings</h2>\n<div class=\"findings-container\">\n");
    for (i, ev) in ctx.analysis.findings.iter().enumerate() {
        out.push_str(&finding_card(i + 1, ev));
    }
    // the built-in set gets the English learner card; configured sets stand alone
    let findings = &ctx.analysis.findings;
    if findings.iter().map(|ev| &ev.finding).eq(default_findings().iter()) {
        for ev in evaluate(&[english_learner_finding()], &ctx.analysis.correlations) {
            out.push_str(&finding_card(findings.len() + 1, &ev));
        }
    }
    out.push_str("</div>\n");
    out
}

fn finding_card(number: usize, ev: &EvaluatedFinding) -> String {
    let f = &ev.finding;
    format!(
        r#"    <div class="finding">
        <h3>{}. {}</h3>
        <p>{}</p>
        <p class="range">Reported correlation: <strong>{}</strong> &middot; observed in this data: {}</p>
    </div>
"#,
        number,
        html_escape(&f.title),
        html_escape(&f.text),
        html_escape(&f.range),
        html_escape(&ev.observed_label())
    )
}

/// Base64 of the figure's PNG, if it was rendered and is readable
fn embedded(ctx: &ReportContext<'_>, kind: ChartKind) -> Option<String> {
    let file = ctx.figure(kind)?;
    match std::fs::read(&file.path) {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(e) => {
            tracing::warn!("Error loading image {}: {}", file.path.display(), e);
            None
        }
    }
}

fn render_figures(ctx: &ReportContext<'_>) -> String {
    let mut out = String::from("<h2>Data Visualizations</h2>\n");
    for (n, (kind, alt, caption)) in FIGURES.iter().enumerate() {
        match embedded(ctx, *kind) {
            Some(b64) => out.push_str(&format!(
                r#"<div class="visualization">
    <img src="data:image/png;base64,{}" alt="{}">
    <p class="caption">Figure {}: {}</p>
</div>
"#,
                b64,
                alt,
                n + 1,
                caption
            )),
            None => out.push_str(&format!(
                "<p class=\"unavailable\">{} visualization not available.</p>\n",
                kind.caption()
            )),
        }
    }
    out
}

fn render_reference() -> String {
    let mut out = String::from(
        "<h2>Variable Reference Guide</h2>\n\
         <p>This reference table explains the variables used in the analysis.</p>\n\
         <div class=\"legend\">\n",
    );
    for category in Category::ALL {
        out.push_str(&format!(
            r#"    <div class="legend-item">
        <div class="color-box" style="background-color: {};"></div>
        <span>{} Variables</span>
    </div>
"#,
            category.color(),
            category.label()
        ));
    }
    out.push_str(
        "</div>\n<table class=\"variable-table\">\n    <tr>\n        <th>Variable</th>\n        <th>Description</th>\n    </tr>\n",
    );
    let reference = variable_reference();
    for category in Category::ALL {
        for info in reference.iter().filter(|r| r.category == category) {
            out.push_str(&format!(
                "    <tr style=\"background-color: {};\">\n        <td><strong>{}</strong></td>\n        <td>{}</td>\n    </tr>\n",
                category.color(),
                info.name,
                html_escape(info.description)
            ));
        }
    }
    out.push_str("</table>\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// Embedded CSS
const CSS: &str = r#"
body {
    font-family: 'Segoe UI', Arial, sans-serif;
    line-height: 1.6;
    color: #333;
    max-width: 1000px;
    margin: 0 auto;
    padding: 20px;
    background-color: #f9f9f9;
}
.container {
    background-color: white;
    border-radius: 8px;
    box-shadow: 0 4px 6px rgba(0,0,0,0.1);
    padding: 30px;
    margin-bottom: 30px;
}
h1, h2 { color: #2c3e50; }
h1 {
    text-align: center;
    font-size: 28px;
    margin-bottom: 30px;
    border-bottom: 2px solid #3498db;
    padding-bottom: 15px;
}
h2 { font-size: 22px; margin-top: 30px; margin-bottom: 15px; }
.findings-container { margin-top: 30px; }
.finding {
    margin-bottom: 25px;
    padding-left: 15px;
    border-left: 4px solid #3498db;
}
.finding h3 { color: #2c3e50; font-size: 20px; margin-bottom: 10px; }
.finding p { color: #34495e; font-size: 16px; margin-left: 5px; }
.finding .range { font-size: 14px; color: #555; }
.visualization { margin: 30px 0; text-align: center; }
.visualization img {
    max-width: 100%;
    box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    border-radius: 4px;
}
.caption { font-style: italic; color: #666; margin-top: 10px; font-size: 14px; }
.unavailable { color: #999; font-style: italic; }
.footer {
    margin-top: 40px;
    text-align: center;
    font-style: italic;
    color: #7f8c8d;
    font-size: 14px;
    border-top: 1px solid #e0e0e0;
    padding-top: 15px;
}
.year { margin-top: 10px; text-align: center; color: #3498db; font-weight: bold; }
.date { text-align: right; font-size: 14px; color: #7f8c8d; margin-bottom: 20px; }
.summary {
    background-color: #f8f9fa;
    padding: 15px;
    border-left: 4px solid #3498db;
    margin: 20px 0;
}
.variable-table { width: 100%; border-collapse: collapse; margin: 20px 0; }
.variable-table th, .variable-table td {
    padding: 10px;
    text-align: left;
    border-bottom: 1px solid #ddd;
}
.variable-table th { background-color: #f2f2f2; font-weight: bold; }
.legend { display: flex; flex-wrap: wrap; justify-content: center; margin: 20px 0; }
.legend-item { display: flex; align-items: center; margin: 5px 10px; }
.color-box { width: 20px; height: 20px; margin-right: 5px; border: 1px solid #ddd; }
"#;
