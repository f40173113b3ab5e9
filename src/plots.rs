//! Diagnostic figures
//!
//! SVG renderings of the analysis outputs. Layout and styling are kept minimal;
//! the figures exist to eyeball calibration, not for publication polish.
use crate::coverage::SplitCoverage;
use crate::data::AllometryData;
use crate::errors::CoverageError;
use crate::splits::AssembledPredictions;
use plotters::prelude::*;
use std::path::Path;

const FIG_WIDTH: u32 = 900;
const FIG_HEIGHT: u32 = 340;

fn plot_err<E: std::fmt::Display>(e: E) -> CoverageError {
    CoverageError::UnableToWrite(e.to_string())
}

fn padded_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pad = 0.05 * (max - min).max(f64::EPSILON);
    (min - pad, max + pad)
}

// Multiplicative padding keeps log-scale ranges positive.
fn log_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (min * 0.9, max * 1.1)
}

fn linspace(a: f64, b: f64, m: usize) -> Vec<f64> {
    if m == 0 {
        return Vec::new();
    }
    if m == 1 {
        return vec![a];
    }
    let step = (b - a) / (m - 1) as f64;
    (0..m).map(|i| a + step * i as f64).collect()
}

/// Scatter of the allometry data on the raw and the log scale, side by side.
pub fn plot_data_scatter<P: AsRef<Path>>(data: &AllometryData, path: P) -> Result<(), CoverageError> {
    let root = SVGBackend::new(path.as_ref(), (FIG_WIDTH, FIG_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((1, 2));

    let (x_min, x_max) = padded_range(&data.crown_area);
    let (y_min, y_max) = padded_range(&data.foliage_mass);
    let mut chart = ChartBuilder::on(&panels[0])
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("crown area (m^2/plant)")
        .y_desc("foliage dry mass (kg/plant)")
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(
            data.crown_area
                .iter()
                .zip(&data.foliage_mass)
                .map(|(&x, &y)| Circle::new((x, y), 2, BLUE.mix(0.3).filled())),
        )
        .map_err(plot_err)?;

    let (x_min, x_max) = padded_range(&data.log_crown_area);
    let (y_min, y_max) = padded_range(&data.log_foliage_mass);
    let mut chart = ChartBuilder::on(&panels[1])
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("log crown area (log(m^2))")
        .y_desc("log foliage dry mass (log(kg))")
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(
            data.log_crown_area
                .iter()
                .zip(&data.log_foliage_mass)
                .map(|(&x, &y)| Circle::new((x, y), 2, BLUE.mix(0.3).filled())),
        )
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Per-split train/test coverage of both methods, extrapolating splits on the
/// left panel and random splits on the right, with the nominal level marked.
pub fn plot_split_coverage<P: AsRef<Path>>(
    coverages: &[SplitCoverage],
    level: f64,
    path: P,
) -> Result<(), CoverageError> {
    if coverages.is_empty() {
        return Err(CoverageError::EmptyData("split coverages".to_string()));
    }
    let root = SVGBackend::new(path.as_ref(), (FIG_WIDTH, FIG_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((1, 2));

    let mm = coverages.len() / 2;
    let halves = [&coverages[..mm], &coverages[mm..]];
    let titles = ["biomass: extrapolating splits", "biomass: random splits"];
    for (panel, (half, title)) in panels.iter().zip(halves.iter().zip(titles)) {
        let m = half.len();
        let xs_train = linspace(0.0, 0.40, m);
        let xs_test = linspace(0.6, 1.0, m);
        let mut chart = ChartBuilder::on(panel)
            .margin(10)
            .caption(title, ("sans-serif", 14))
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(-0.05f64..1.05f64, 0.0f64..1.05f64)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("split index (train left, test right)")
            .y_desc("coverage")
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(LineSeries::new(vec![(-0.05, level), (1.05, level)], &RED))
            .map_err(plot_err)?;

        // qrf: hollow circles on the train side, filled on the test side.
        chart
            .draw_series(half.iter().zip(&xs_train).map(|(c, &x)| Circle::new((x, c.qrf.train), 3, &BLUE)))
            .map_err(plot_err)?
            .label("qrf")
            .legend(|(x, y)| Circle::new((x, y), 3, BLUE.filled()));
        chart
            .draw_series(
                half.iter()
                    .zip(&xs_test)
                    .map(|(c, &x)| Circle::new((x, c.qrf.test), 3, BLUE.filled())),
            )
            .map_err(plot_err)?;
        // xtra-qrf: triangles.
        chart
            .draw_series(
                half.iter()
                    .zip(&xs_train)
                    .map(|(c, &x)| TriangleMarker::new((x, c.xtra.train), 4, &GREEN)),
            )
            .map_err(plot_err)?
            .label("xtra-qrf")
            .legend(|(x, y)| TriangleMarker::new((x, y), 4, GREEN.filled()));
        chart
            .draw_series(
                half.iter()
                    .zip(&xs_test)
                    .map(|(c, &x)| TriangleMarker::new((x, c.xtra.test), 4, GREEN.filled())),
            )
            .map_err(plot_err)?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
    }
    root.present().map_err(plot_err)
}

/// Data scatter on log-log axes with the assembled interval bands overlaid, one
/// panel per method. Points are colored by the split that predicted them.
pub fn plot_quantile_bands<P: AsRef<Path>>(
    data: &AllometryData,
    preds: &AssembledPredictions,
    path: P,
) -> Result<(), CoverageError> {
    let n = data.len();
    if preds.qrf.len() != n {
        return Err(CoverageError::LengthMismatch(
            "assembled predictions".to_string(),
            preds.qrf.len(),
            n,
        ));
    }
    let root = SVGBackend::new(path.as_ref(), (FIG_WIDTH, FIG_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((1, 2));

    // Band polylines follow the predictor order; the end points are dropped as
    // they sit on the convex-hull boundary of the fit.
    let mut sorting: Vec<usize> = (0..n).collect();
    sorting.sort_by(|&a, &b| {
        data.log_crown_area[a]
            .partial_cmp(&data.log_crown_area[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let sorting: &[usize] = if n >= 3 { &sorting[1..n - 1] } else { &[] };

    let (x_min, x_max) = log_range(&data.crown_area);
    let (y_min, y_max) = log_range(&data.foliage_mass);

    let bands = [(&preds.qrf, "qrf"), (&preds.xtra, "xtra-qrf")];
    for (panel, (bounds, title)) in panels.iter().zip(bands) {
        let mut chart = ChartBuilder::on(panel)
            .margin(10)
            .caption(title, ("sans-serif", 14))
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d((x_min..x_max).log_scale(), (y_min..y_max).log_scale())
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("crown area (m^2/plant)")
            .y_desc("foliage dry mass (kg/plant)")
            .draw()
            .map_err(plot_err)?;
        chart
            .draw_series((0..n).map(|i| {
                let color = Palette99::pick(preds.split_id[i]).mix(0.4);
                Circle::new((data.crown_area[i], data.foliage_mass[i]), 2, color.filled())
            }))
            .map_err(plot_err)?;
        // Bounds live on the log scale; exponentiate back for the raw-scale axes.
        chart
            .draw_series(LineSeries::new(
                sorting.iter().map(|&i| (data.crown_area[i], bounds.lower()[i].exp())),
                &BLACK,
            ))
            .map_err(plot_err)?;
        chart
            .draw_series(LineSeries::new(
                sorting.iter().map(|&i| (data.crown_area[i], bounds.upper()[i].exp())),
                &BLACK,
            ))
            .map_err(plot_err)?;
    }
    root.present().map_err(plot_err)
}

/// Smoothed coverage curves of both methods over the extrapolation-score rank.
pub fn plot_rolling_coverage<P: AsRef<Path>>(
    qrf: &[f64],
    xtra: &[f64],
    level: f64,
    path: P,
) -> Result<(), CoverageError> {
    if qrf.len() != xtra.len() {
        return Err(CoverageError::LengthMismatch("rolling curves".to_string(), qrf.len(), xtra.len()));
    }
    if qrf.is_empty() {
        return Err(CoverageError::EmptyData("rolling curves".to_string()));
    }
    let root = SVGBackend::new(path.as_ref(), (FIG_WIDTH / 2, FIG_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let n = qrf.len();
    let y_min = qrf
        .iter()
        .chain(xtra)
        .cloned()
        .fold(level, f64::min);
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption("biomass", ("sans-serif", 14))
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..(n as f64), (y_min - 0.05).max(0.0)..1.05f64)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("extrapolation score rank")
        .y_desc("smoothed coverage")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            xtra.iter().enumerate().map(|(i, &c)| (i as f64, c)),
            &GREEN,
        ))
        .map_err(plot_err)?
        .label("xtra-qrf")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], GREEN));
    chart
        .draw_series(LineSeries::new(
            qrf.iter().enumerate().map(|(i, &c)| (i as f64, c)),
            &BLUE,
        ))
        .map_err(plot_err)?
        .label("qrf")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE));
    chart
        .draw_series(LineSeries::new(vec![(0.0, level), (n as f64, level)], &RED))
        .map_err(plot_err)?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)
}
