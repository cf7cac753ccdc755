use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::heatmap::diverging;
use super::{draw_placeholder, Area, ChartResult};
use crate::models::Variable;
use crate::stats::BinTable;

const ELA: RGBColor = RGBColor(31, 119, 180);
const MATH: RGBColor = RGBColor(255, 127, 14);
const NO_DATA: RGBColor = RGBColor(150, 150, 150);

/// Label for the bucket nearest `x`, blank between buckets
fn bucket_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Upper y bound leaving headroom for value labels
fn y_ceiling(table: &BinTable, targets: &[usize]) -> f64 {
    let max = table
        .buckets
        .iter()
        .flat_map(|b| targets.iter().map(move |t| b.means[*t]))
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() && max > 0.0 {
        max * 1.15
    } else {
        1.0
    }
}

/// Grouped bars, one group per bucket and one bar per target. Empty
/// buckets get a hatched grey placeholder instead of a bar.
fn grouped_bars(
    area: &Area<'_>,
    caption: &str,
    y_desc: &str,
    table: &BinTable,
    series: &[(usize, RGBColor)],
) -> ChartResult {
    let k = table.buckets.len();
    if k == 0 {
        return draw_placeholder(area, "NO VALID DATA AVAILABLE");
    }
    let labels: Vec<String> = table.buckets.iter().map(|b| b.label.clone()).collect();
    let targets: Vec<usize> = series.iter().map(|(t, _)| *t).collect();
    let y_max = y_ceiling(table, &targets);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(k as f64 - 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_labels(k * 2 + 1)
        .x_label_formatter(&|x| bucket_label(&labels, *x))
        .y_desc(y_desc)
        .draw()?;

    let group_width = 0.8;
    let bar_width = group_width / series.len() as f64;
    for (s, (target, color)) in series.iter().enumerate() {
        let color = *color;
        let offset = -group_width / 2.0 + bar_width * s as f64;
        let bars: Vec<(f64, f64)> = table
            .buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(i, b)| (i as f64 + offset, b.means[*target]))
            .collect();

        chart
            .draw_series(bars.iter().map(|&(x0, v)| {
                Rectangle::new([(x0, 0.0), (x0 + bar_width * 0.95, v)], color.filled())
            }))?
            .label(table.targets[*target].clone())
            .legend(move |(lx, ly)| {
                Rectangle::new([(lx, ly - 5), (lx + 15, ly + 5)], color.filled())
            });

        chart.draw_series(bars.iter().map(|&(x0, v)| {
            Text::new(
                format!("{v:.0}"),
                (x0 + bar_width / 2.0, v),
                ("sans-serif", 12)
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Bottom)),
            )
        }))?;
    }

    let placeholder_height = y_max * 0.3;
    for (i, _) in table.buckets.iter().enumerate().filter(|(_, b)| b.is_empty()) {
        let x0 = i as f64 - group_width / 2.0;
        let x1 = x0 + group_width;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, 0.0), (x1, placeholder_height)],
            NO_DATA.mix(0.25).filled(),
        )))?;
        chart.draw_series((0..8).map(|h| {
            let a = x0 + group_width * h as f64 / 8.0;
            let b = (a + group_width / 4.0).min(x1);
            let top = placeholder_height * (b - a) / (group_width / 4.0);
            PathElement::new(vec![(a, 0.0), (b, top)], NO_DATA)
        }))?;
        chart.draw_series(std::iter::once(Text::new(
            "no data",
            (i as f64, placeholder_height),
            ("sans-serif", 14)
                .into_font()
                .color(&NO_DATA)
                .pos(Pos::new(HPos::Center, VPos::Bottom)),
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    Ok(())
}

fn target_index(table: &BinTable, variable: Variable) -> Option<usize> {
    table.targets.iter().position(|t| t == variable.column())
}

/// State scores and district scores side by side, bucketed by SED share
pub(crate) fn draw_scores_by_sed(root: &Area<'_>, table: &BinTable, caption: &str) -> ChartResult {
    let (title_area, body) = root.split_vertically(50);
    title_area.titled(caption, ("sans-serif", 26))?;
    let panels = body.split_evenly((1, 2));

    let groups = [
        ("State Test Scores", Variable::SelaY2, Variable::SmathY2),
        ("District Test Scores", Variable::DelaY2, Variable::DmathY2),
    ];
    for (area, (title, ela, math)) in panels.iter().zip(groups) {
        let series: Vec<(usize, RGBColor)> = [(ela, ELA), (math, MATH)]
            .into_iter()
            .filter_map(|(v, c)| target_index(table, v).map(|t| (t, c)))
            .collect();
        grouped_bars(area, title, "Average Score", table, &series)?;
    }
    Ok(())
}

pub(crate) fn draw_absence_quartiles(
    root: &Area<'_>,
    table: &BinTable,
    caption: &str,
) -> ChartResult {
    let Some(math) = target_index(table, Variable::SmathY2) else {
        return draw_placeholder(root, "NO VALID DATA AVAILABLE");
    };
    grouped_bars(root, caption, "Average State Math Score", table, &[(math, MATH)])
}

/// Horizontal bars, strongest correlation on top
pub(crate) fn draw_top_correlations(
    root: &Area<'_>,
    top: &[(Variable, f64)],
    caption: &str,
) -> ChartResult {
    let defined: Vec<(Variable, f64)> = top.iter().copied().filter(|(_, r)| !r.is_nan()).collect();
    if defined.is_empty() {
        return draw_placeholder(root, "NO VALID DATA AVAILABLE");
    }
    let n = defined.len();
    // Row 0 is drawn at the top
    let names: Vec<String> = defined.iter().rev().map(|(v, _)| v.to_string()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(100)
        .build_cartesian_2d(-1f64..1f64, -0.5f64..(n as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .light_line_style(BLACK.mix(0.05))
        .y_labels(n * 2 + 1)
        .y_label_formatter(&|y| bucket_label(&names, *y))
        .x_desc("Correlation Coefficient")
        .draw()?;

    chart.draw_series(defined.iter().enumerate().map(|(i, (_, r))| {
        let y = (n - 1 - i) as f64;
        Rectangle::new([(0.0, y - 0.35), (*r, y + 0.35)], diverging(*r).filled())
    }))?;

    chart.draw_series(defined.iter().enumerate().map(|(i, (_, r))| {
        let y = (n - 1 - i) as f64;
        let anchor = if *r >= 0.0 { HPos::Left } else { HPos::Right };
        Text::new(
            format!("{r:.2}"),
            (*r, y),
            ("sans-serif", 13)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(anchor, VPos::Center)),
        )
    }))?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, -0.5), (0.0, n as f64 - 0.5)],
        BLACK,
    )))?;
    Ok(())
}
