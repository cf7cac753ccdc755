use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{Area, ChartResult};
use crate::stats::CorrelationMatrix;

const NAN_CELL: RGBColor = RGBColor(200, 200, 200);

/// Blue (-1) through light grey (0) to red (+1)
pub(crate) fn diverging(r: f64) -> RGBColor {
    const NEG: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const POS: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if r.is_nan() {
        return NAN_CELL;
    }
    let t = r.clamp(-1.0, 1.0);
    let (from, to, f) = if t < 0.0 { (MID, NEG, -t) } else { (MID, POS, t) };
    let lerp = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

fn segment(i: usize) -> SegmentValue<i32> {
    SegmentValue::Exact(i as i32)
}

fn center(i: usize) -> SegmentValue<i32> {
    SegmentValue::CenterOf(i as i32)
}

/// Annotated heatmap; with `lower_only` the upper triangle is left blank
pub(crate) fn draw_matrix(
    root: &Area<'_>,
    matrix: &CorrelationMatrix,
    caption: &str,
    lower_only: bool,
) -> ChartResult {
    let n = matrix.size();
    let names: Vec<&'static str> = matrix.variables().iter().map(|v| v.column()).collect();
    // Row 0 is drawn at the top
    let row_at = |y: i32| n as i32 - 1 - y;

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(90)
        .y_label_area_size(100)
        .build_cartesian_2d((0..n as i32).into_segmented(), (0..n as i32).into_segmented())?;

    let x_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => names.get(*i as usize).copied().unwrap_or("").to_string(),
        _ => String::new(),
    };
    let y_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => names
            .get(row_at(*i) as usize)
            .copied()
            .unwrap_or("")
            .to_string(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .x_label_style(("sans-serif", 13).into_font().transform(FontTransform::Rotate90))
        .y_label_style(("sans-serif", 13))
        .draw()?;

    let cells: Vec<(usize, usize, f64)> = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .filter(|(i, j)| !lower_only || j <= i)
        .map(|(i, j)| (i, j, matrix.at(i, j)))
        .collect();

    chart.draw_series(cells.iter().map(|&(i, j, r)| {
        let y = n - 1 - i;
        Rectangle::new(
            [(segment(j), segment(y)), (segment(j + 1), segment(y + 1))],
            diverging(r).filled(),
        )
    }))?;

    let font_size = if n > 10 { 12 } else { 15 };
    chart.draw_series(cells.iter().map(|&(i, j, r)| {
        let y = n - 1 - i;
        let text = if r.is_nan() {
            "n/a".to_string()
        } else {
            format!("{r:.2}")
        };
        let color = if r.abs() > 0.6 { &WHITE } else { &BLACK };
        Text::new(
            text,
            (center(j), center(y)),
            ("sans-serif", font_size)
                .into_font()
                .color(color)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;

    Ok(())
}
