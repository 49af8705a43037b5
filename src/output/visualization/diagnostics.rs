//! Diagnostic plots for integration results
//!
//! # Available functions
//!
//! - [`plot_invariant_drift`]: `|I_k(t) - I_k(0)|` per invariant, log scale
//! - [`plot_convergence`]: terminal error against step size, log-log, one curve per stage count
//! - [`plot_profiles`]: spatial profiles of a grid model (e.g. Burgers snapshots)
//!
//! # Usage
//!
//! ```rust,ignore
//! use avfet_rs::output::visualization::{plot_convergence, plot_invariant_drift};
//!
//! let trajectory = AvfetIntegrator::new().solve(&scenario, &config)?;
//! plot_invariant_drift(&trajectory, "drift.png", None)?;
//!
//! let points = convergence_study(&[1, 2], &[4, 5, 6, 7], |c| c)?;
//! plot_convergence(&points, "convergence.svg", None)?;
//! ```

use plotters::prelude::*;

use super::config::{NO_TITLE, PlotConfig};
use crate::error::OutputError;
use crate::models::ConvergencePoint;
use crate::solver::Trajectory;

/// Floor for values drawn on a logarithmic axis (exact conservation gives zeros)
const LOG_FLOOR: f64 = 1e-18;

fn plot_error<E: std::fmt::Display>(error: E) -> OutputError {
    OutputError::Plot(error.to_string())
}

/// Labelled series sharing one plot
struct Series {
    label: String,
    points: Vec<(f64, f64)>,
}

/// Axis bounds over all series
fn bounds(series: &[Series]) -> (f64, f64, f64, f64) {
    series.iter().flat_map(|s| s.points.iter()).fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
    )
}

// =================================================================================================
// Public API
// =================================================================================================

/// Plot the drift `|I_k(t_n) - I_k(t_0)|` of every tracked invariant
///
/// Zero drift (exact conservation to round-off) is drawn at `1e-18`.
///
/// # Errors
///
/// Returns `OutputError::InvalidData` for an empty trajectory and
/// `OutputError::Plot` if the backend cannot write to `output_path`.
pub fn plot_invariant_drift(
    trajectory: &Trajectory,
    output_path: &str,
    config: Option<&PlotConfig>,
) -> Result<(), OutputError> {
    if trajectory.is_empty() || trajectory.invariant_names.is_empty() {
        return Err(OutputError::InvalidData(
            "Trajectory has no invariant history to plot".to_string(),
        ));
    }

    let default_config = PlotConfig::drift(NO_TITLE);
    let config = config.unwrap_or(&default_config);

    let series: Vec<Series> = trajectory
        .invariant_names
        .iter()
        .filter_map(|name| {
            let values = trajectory.invariant_series(name)?;
            let initial = *values.first()?;
            Some(Series {
                label: name.clone(),
                points: trajectory
                    .time_points
                    .iter()
                    .zip(values.iter())
                    .map(|(t, v)| (*t, (v - initial).abs().max(LOG_FLOOR)))
                    .collect(),
            })
        })
        .collect();

    draw_to_path(output_path, config, &series, Axes::LogY)
}

/// Plot terminal error against step size on log-log axes
///
/// Points are grouped by stage count, one curve per `s`.
///
/// # Errors
///
/// Returns `OutputError::InvalidData` if `points` is empty or contains a
/// non-positive step size or error.
pub fn plot_convergence(
    points: &[ConvergencePoint],
    output_path: &str,
    config: Option<&PlotConfig>,
) -> Result<(), OutputError> {
    if points.is_empty() {
        return Err(OutputError::InvalidData("No convergence points provided".to_string()));
    }
    if points.iter().any(|p| !(p.timestep > 0.0) || !(p.error > 0.0)) {
        return Err(OutputError::InvalidData(
            "Convergence points need positive step sizes and errors".to_string(),
        ));
    }

    let default_config = PlotConfig::convergence(NO_TITLE);
    let config = config.unwrap_or(&default_config);

    let mut stages: Vec<usize> = points.iter().map(|p| p.stages).collect();
    stages.sort_unstable();
    stages.dedup();

    let series: Vec<Series> = stages
        .iter()
        .map(|&s| {
            let mut curve: Vec<(f64, f64)> = points
                .iter()
                .filter(|p| p.stages == s)
                .map(|p| (p.timestep, p.error))
                .collect();
            curve.sort_by(|a, b| a.0.total_cmp(&b.0));
            Series {
                label: format!("s = {s}"),
                points: curve,
            }
        })
        .collect();

    draw_to_path(output_path, config, &series, Axes::LogLog)
}

/// Plot spatial profiles over a shared grid
///
/// Each profile is a `(label, values)` pair with one value per grid point.
///
/// # Errors
///
/// Returns `OutputError::InvalidData` if no profile is given or a profile
/// length differs from the grid.
pub fn plot_profiles(
    grid: &[f64],
    profiles: &[(String, Vec<f64>)],
    output_path: &str,
    config: Option<&PlotConfig>,
) -> Result<(), OutputError> {
    if profiles.is_empty() || grid.is_empty() {
        return Err(OutputError::InvalidData("No profiles provided".to_string()));
    }
    if let Some((label, values)) = profiles.iter().find(|(_, v)| v.len() != grid.len()) {
        return Err(OutputError::InvalidData(format!(
            "Profile '{}' has {} values for {} grid points",
            label,
            values.len(),
            grid.len()
        )));
    }

    let default_config = PlotConfig::profile(NO_TITLE);
    let config = config.unwrap_or(&default_config);

    let series: Vec<Series> = profiles
        .iter()
        .map(|(label, values)| Series {
            label: label.clone(),
            points: grid.iter().copied().zip(values.iter().copied()).collect(),
        })
        .collect();

    draw_to_path(output_path, config, &series, Axes::Linear)
}

// =================================================================================================
// Private Plot Implementations
// =================================================================================================

#[derive(Clone, Copy)]
enum Axes {
    Linear,
    LogY,
    LogLog,
}

fn draw_to_path(
    output_path: &str,
    config: &PlotConfig,
    series: &[Series],
    axes: Axes,
) -> Result<(), OutputError> {
    let ext = std::path::Path::new(output_path)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("png");

    match ext {
        "svg" => {
            let backend = SVGBackend::new(output_path, (config.width, config.height));
            plot_series_impl(backend, series, config, axes)
        }
        _ => {
            let backend = BitMapBackend::new(output_path, (config.width, config.height));
            plot_series_impl(backend, series, config, axes)
        }
    }
}

/// Render labelled line series with the given drawing backend
fn plot_series_impl<DB: DrawingBackend>(
    backend: DB,
    series: &[Series],
    config: &PlotConfig,
    axes: Axes,
) -> Result<(), OutputError>
where
    DB::ErrorType: 'static,
{
    let root = backend.into_drawing_area();
    root.fill(&config.background).map_err(plot_error)?;

    let (x_min, x_max, y_min, y_max) = bounds(series);

    match axes {
        Axes::Linear => {
            let pad = 0.05 * (y_max - y_min).abs().max(1e-12);
            let mut chart = ChartBuilder::on(&root)
                .caption(&config.title, ("sans-serif", 40).into_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, (y_min - pad)..(y_max + pad))
                .map_err(plot_error)?;

            if config.show_grid {
                chart
                    .configure_mesh()
                    .x_desc(&config.xlabel)
                    .y_desc(&config.ylabel)
                    .x_label_formatter(&|x| format!("{:.2}", x))
                    .y_label_formatter(&|y| format!("{:.3}", y))
                    .draw()
                    .map_err(plot_error)?;
            }

            for (k, s) in series.iter().enumerate() {
                let color = config.get_series_color(k);
                chart
                    .draw_series(LineSeries::new(
                        s.points.iter().copied(),
                        ShapeStyle::from(&color).stroke_width(config.line_width),
                    ))
                    .map_err(plot_error)?
                    .label(s.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            }

            chart
                .configure_series_labels()
                .background_style(&config.background.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(plot_error)?;
        }
        Axes::LogY => {
            let mut chart = ChartBuilder::on(&root)
                .caption(&config.title, ("sans-serif", 40).into_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(80)
                .build_cartesian_2d(x_min..x_max, (y_min..(y_max * 10.0)).log_scale())
                .map_err(plot_error)?;

            if config.show_grid {
                chart
                    .configure_mesh()
                    .x_desc(&config.xlabel)
                    .y_desc(&config.ylabel)
                    .x_label_formatter(&|x| format!("{:.2}", x))
                    .y_label_formatter(&|y| format!("{:.0e}", y))
                    .draw()
                    .map_err(plot_error)?;
            }

            for (k, s) in series.iter().enumerate() {
                let color = config.get_series_color(k);
                chart
                    .draw_series(LineSeries::new(
                        s.points.iter().copied(),
                        ShapeStyle::from(&color).stroke_width(config.line_width),
                    ))
                    .map_err(plot_error)?
                    .label(s.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            }

            chart
                .configure_series_labels()
                .background_style(&config.background.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(plot_error)?;
        }
        Axes::LogLog => {
            let mut chart = ChartBuilder::on(&root)
                .caption(&config.title, ("sans-serif", 40).into_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(80)
                .build_cartesian_2d(
                    ((x_min * 0.8)..(x_max * 1.25)).log_scale(),
                    ((y_min * 0.5)..(y_max * 2.0)).log_scale(),
                )
                .map_err(plot_error)?;

            if config.show_grid {
                chart
                    .configure_mesh()
                    .x_desc(&config.xlabel)
                    .y_desc(&config.ylabel)
                    .x_label_formatter(&|x| format!("{:.1e}", x))
                    .y_label_formatter(&|y| format!("{:.0e}", y))
                    .draw()
                    .map_err(plot_error)?;
            }

            for (k, s) in series.iter().enumerate() {
                let color = config.get_series_color(k);
                chart
                    .draw_series(LineSeries::new(
                        s.points.iter().copied(),
                        ShapeStyle::from(&color).stroke_width(config.line_width),
                    ))
                    .map_err(plot_error)?
                    .label(s.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                    )
                    .map_err(plot_error)?;
            }

            chart
                .configure_series_labels()
                .background_style(&config.background.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(plot_error)?;
        }
    }

    root.present().map_err(plot_error)?;
    Ok(())
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn point(stages: usize, timestep: f64, error: f64) -> ConvergencePoint {
        ConvergencePoint {
            stages,
            timestep,
            error,
        }
    }

    #[test]
    fn test_bounds_cover_all_series() {
        let series = vec![
            Series {
                label: "a".to_string(),
                points: vec![(0.0, 1.0), (1.0, 3.0)],
            },
            Series {
                label: "b".to_string(),
                points: vec![(0.5, -2.0), (2.0, 0.0)],
            },
        ];
        assert_eq!(bounds(&series), (0.0, 2.0, -2.0, 3.0));
    }

    #[test]
    fn test_convergence_rejects_empty_points() {
        let err = plot_convergence(&[], "unused.png", None).unwrap_err();
        assert!(matches!(err, OutputError::InvalidData(_)));
    }

    #[test]
    fn test_convergence_rejects_zero_error() {
        let points = vec![point(1, 0.1, 1e-3), point(1, 0.05, 0.0)];
        let err = plot_convergence(&points, "unused.png", None).unwrap_err();
        assert!(matches!(err, OutputError::InvalidData(_)));
    }

    #[test]
    fn test_profiles_reject_length_mismatch() {
        let grid = vec![0.0, 0.5, 1.0];
        let profiles = vec![("t = 0".to_string(), vec![1.0, 2.0])];
        let err = plot_profiles(&grid, &profiles, "unused.png", None).unwrap_err();
        assert!(matches!(err, OutputError::InvalidData(_)));
    }
}
