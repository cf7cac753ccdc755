use plotters::prelude::*;

use super::{draw_placeholder, Area, ChartResult};
use crate::models::{Dataset, Variable};
use crate::stats::{bin_means, BinPolicy, SedScale};

const FILL: RGBColor = RGBColor(70, 130, 180);

const PANELS: [Variable; 6] = [
    Variable::Btchsal,
    Variable::Mtchsal,
    Variable::Htchsal,
    Variable::SmathY2,
    Variable::SelaY2,
    Variable::Persd,
];

/// 2x3 grid of histograms; PERSD is shown as a percentage
pub(crate) fn draw_distributions(
    root: &Area<'_>,
    dataset: &Dataset,
    scale: SedScale,
    bins: usize,
) -> ChartResult {
    let panels = root.split_evenly((2, 3));
    for (area, variable) in panels.iter().zip(PANELS) {
        let mut values = dataset.column(variable);
        let mut title = format!("Distribution of {variable}");
        if variable == Variable::Persd {
            values.iter_mut().for_each(|v| *v = scale.as_percent(*v));
            title.push_str(" (%)");
        }
        histogram_panel(area, &title, &values, bins)?;
    }
    Ok(())
}

fn histogram_panel(area: &Area<'_>, title: &str, values: &[f64], bins: usize) -> ChartResult {
    if values.is_empty() {
        return draw_placeholder(area, "NO VALID DATA AVAILABLE");
    }
    // Binning the column against itself gives per-bucket counts
    let table = bin_means(values, values, &BinPolicy::EqualWidth { count: bins.max(1) })?;
    let x_lo = table.buckets.first().map(|b| b.lower).unwrap_or(0.0);
    let mut x_hi = table.buckets.last().map(|b| b.upper).unwrap_or(1.0);
    if x_hi <= x_lo {
        x_hi = x_lo + 1.0;
    }
    let max_count = table.buckets.iter().map(|b| b.count).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0f64..(max_count as f64 * 1.1).max(1.0))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(BLACK.mix(0.05))
        .y_desc("Count")
        .x_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    chart.draw_series(table.buckets.iter().map(|b| {
        let upper = if b.upper > b.lower { b.upper } else { x_hi };
        Rectangle::new([(b.lower, 0.0), (upper, b.count as f64)], FILL.mix(0.8).filled())
    }))?;
    chart.draw_series(table.buckets.iter().map(|b| {
        let upper = if b.upper > b.lower { b.upper } else { x_hi };
        Rectangle::new([(b.lower, 0.0), (upper, b.count as f64)], BLACK.mix(0.6))
    }))?;
    Ok(())
}
