use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{draw_placeholder, padded_range, Area, ChartResult};
use crate::models::{Dataset, Variable};
use crate::stats::{linear_fit, pearson, CorrelationMatrix, SedScale};

const POINT: RGBColor = RGBColor(31, 119, 180);
const TREND: RGBColor = RGBColor(214, 39, 40);

/// Predictor/score pairs of the 2x2 relationship grid
const RELATIONSHIP_PANELS: [(Variable, Variable); 4] = [
    (Variable::Htchsal, Variable::SmathY2),
    (Variable::Htchsal, Variable::SelaY2),
    (Variable::Rall, Variable::SmathY2),
    (Variable::Rall, Variable::SelaY2),
];

pub(crate) fn draw_score_relationships(
    root: &Area<'_>,
    dataset: &Dataset,
    matrix: &CorrelationMatrix,
) -> ChartResult {
    let panels = root.split_evenly((2, 2));
    for (area, (x_var, y_var)) in panels.iter().zip(RELATIONSHIP_PANELS) {
        let x = dataset.column(x_var);
        let y = dataset.column(y_var);
        let caption = format!("{} vs {}", x_var.description(), y_var);
        scatter_panel(
            area,
            &caption,
            (x.as_slice(), x_var.column()),
            (y.as_slice(), y_var.column()),
            matrix.get(x_var, y_var),
        )?;
    }
    Ok(())
}

/// One scatter with its least-squares line; `r` goes in the legend
fn scatter_panel(
    area: &Area<'_>,
    caption: &str,
    (x, x_desc): (&[f64], &str),
    (y, y_desc): (&[f64], &str),
    r: f64,
) -> ChartResult {
    if x.is_empty() {
        return draw_placeholder(area, "NO VALID DATA AVAILABLE");
    }
    let x_range = padded_range(x);
    let y_range = padded_range(y);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_range)?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| Circle::new((xi, yi), 2, POINT.mix(0.5).filled())),
    )?;

    if let Some(fit) = linear_fit(x, y) {
        let label = if r.is_nan() {
            "r undefined".to_string()
        } else {
            format!("r = {r:.2}")
        };
        chart
            .draw_series(LineSeries::new(
                [x_range.start, x_range.end]
                    .into_iter()
                    .map(|xv| (xv, fit.predict(xv))),
                TREND.stroke_width(2),
            ))?
            .label(label)
            .legend(|(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], TREND));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }
    Ok(())
}

/// PERSD (as a percentage) against state math scores
pub(crate) fn draw_sed_math(
    root: &Area<'_>,
    dataset: &Dataset,
    scale: SedScale,
    caption: &str,
) -> ChartResult {
    let persd: Vec<f64> = dataset
        .column(Variable::Persd)
        .into_iter()
        .map(|v| scale.as_percent(v))
        .collect();
    let math = dataset.column(Variable::SmathY2);

    if persd.is_empty() {
        return draw_placeholder(root, "NO VALID DATA AVAILABLE");
    }

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..100f64, padded_range(&math))?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_desc("Socioeconomically Disadvantaged Students (%)")
        .y_desc("State Math Score (SMATH_Y2)")
        .x_label_formatter(&|v| format!("{v:.0}%"))
        .draw()?;

    chart.draw_series(
        persd
            .iter()
            .zip(&math)
            .map(|(&xi, &yi)| Circle::new((xi, yi), 3, POINT.mix(0.6).filled())),
    )?;

    let r = pearson(&persd, &math);
    if let Some(fit) = linear_fit(&persd, &math) {
        let equation = format!("y = {:.2}x + {:.2}", fit.slope, fit.intercept);
        chart
            .draw_series(LineSeries::new(
                [0.0, 100.0].into_iter().map(|xv| (xv, fit.predict(xv))),
                TREND.stroke_width(2),
            ))?
            .label(equation)
            .legend(|(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], TREND));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    let annotation = if r.is_nan() {
        "Correlation: undefined".to_string()
    } else {
        format!("Correlation: {r:.3}")
    };
    let (w, _) = root.dim_in_pixel();
    root.draw(&Text::new(
        annotation,
        (w as i32 / 2, 60),
        ("sans-serif", 18)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top)),
    ))?;
    Ok(())
}
