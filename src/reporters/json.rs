//! JSON reporter
//!
//! Writes the computed tables as pretty-printed JSON for further
//! processing. Undefined values (NaN) come out as `null`.

use super::ReportContext;
use anyhow::Result;
use serde_json::{json, Map, Value};

/// Render the analysis summary as JSON
pub fn render(ctx: &ReportContext<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_value(ctx)?)?)
}

fn to_value(ctx: &ReportContext<'_>) -> Result<Value> {
    let a = ctx.analysis;

    let mut describe = Map::new();
    for (v, d) in &a.describe {
        describe.insert(v.column().to_string(), serde_json::to_value(d)?);
    }

    let variables: Vec<&str> = a.correlations.variables().iter().map(|v| v.column()).collect();

    Ok(json!({
        "title": ctx.title,
        "data_period": ctx.data_period,
        "generated": ctx.generated.to_rfc3339(),
        "source": a.source.display().to_string(),
        "rows": a.rows,
        "rows_dropped": a.rows_dropped,
        "sed_scale": a.sed_scale,
        "describe": describe,
        "correlation": {
            "variables": variables,
            "matrix": a.correlations.rows(),
        },
        "sed_scores": a.sed_scores,
        "absence_quartiles": a.absence_quantiles,
        "findings": a.findings,
        "figures": ctx
            .figures
            .iter()
            .map(|f| f.kind.file_name())
            .collect::<Vec<_>>(),
    }))
}
