//! Example: Kepler Problem, Conservation and Convergence
//!
//! **Phase 1: One period** (`s = 1`, `h = 2π/64`)
//! - Streams the invariant history to CSV and state snapshots to JSON lines
//! - Plots the drift `|I(t) - I(0)|` of every invariant
//!
//! **Phase 2: Convergence** (`s = 1, 2`, `h = 2π·2^{-k}`, `k = 6..9`)
//! - Terminal error `|q(2π) - q(0)|` after one period
//! - One `dt error` file per stage count, plus a log-log plot
//!
//! Output goes to the system temporary directory.

use std::f64::consts::PI;
use std::time::Instant;

use avfet_rs::models::KeplerProblem;
use avfet_rs::models::kepler::{convergence_study, observed_orders};
use avfet_rs::output::export::{CsvConfig, CsvMetadata, CsvSink, append_convergence_point};
use avfet_rs::output::{PlotConfig, SinkChain, SnapshotSink, plot_convergence, plot_invariant_drift};
use avfet_rs::scheme::AvfetIntegrator;
use avfet_rs::solver::{IntegratorConfiguration, Scenario};

/// Prints a titled section banner to stdout.
fn print_section(title: &str) {
    println!("\n═══════════════════════════════════════════════════════");
    println!("  {title}");
    println!("═══════════════════════════════════════════════════════\n");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    print_section("Kepler Problem - AV-FET Integration");

    let tmp_dir = std::env::temp_dir();

    // =============================================================================================
    // Phase 1: one period
    // =============================================================================================

    let model = KeplerProblem::new();
    let period = model.period().unwrap_or(2.0 * PI);
    let timestep = period / 64.0;

    println!("Orbit:");
    println!("  p(0)   : (0, 2)");
    println!("  q(0)   : (0.4, 0)");
    println!("  Period : {:.6}", period);
    println!("  dt     : {:.6}\n", timestep);

    let scenario = Scenario::new(Box::new(model));
    let config = IntegratorConfiguration::new(timestep, period, 1);

    let csv_path = tmp_dir.join("kepler_invariants.csv");
    let snapshot_path = tmp_dir.join("kepler_states.jsonl");

    let metadata = CsvMetadata::from_simulation("Kepler", "AV-FET", timestep, period, 1);
    let mut csv = CsvSink::create(&csv_path, CsvConfig::default().with_metadata(metadata))?;
    let mut snapshots = SnapshotSink::with_stride(&snapshot_path, 4)?;
    let mut sinks = SinkChain::new().with(&mut csv).with(&mut snapshots);

    let start = Instant::now();
    let trajectory = AvfetIntegrator::new().solve_with_sink(&scenario, &config, &mut sinks)?;
    let elapsed = start.elapsed().as_secs_f64();

    println!("Integrated {} steps in {:.3} s", trajectory.len() - 1, elapsed);
    for name in &trajectory.invariant_names {
        let drift = trajectory.max_drift(name).unwrap_or(f64::NAN);
        println!("  {:<18}: max drift {:.3e}", name, drift);
    }
    println!(
        "  Terminal error    : {:.3e}",
        KeplerProblem::terminal_error(&trajectory.final_state)
    );

    let drift_path = tmp_dir.join("kepler_drift.png");
    plot_invariant_drift(
        &trajectory,
        &drift_path.to_string_lossy(),
        Some(&PlotConfig::drift("Kepler, s = 1, dt = 2π/64")),
    )?;

    println!("\nFiles:");
    println!("  {}", csv_path.display());
    println!("  {}", snapshot_path.display());
    println!("  {}", drift_path.display());

    // =============================================================================================
    // Phase 2: convergence
    // =============================================================================================

    print_section("Convergence Study");

    let stages = [1, 2];
    let exponents = [6, 7, 8, 9];

    let start = Instant::now();
    let points = convergence_study(&stages, &exponents, |config| config)?;
    println!("Study completed in {:.3} s\n", start.elapsed().as_secs_f64());

    for &s in &stages {
        let path = tmp_dir.join(format!("kepler_convergence_s{}.txt", s));
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let series: Vec<_> = points.iter().filter(|p| p.stages == s).copied().collect();
        println!("s = {} (expected order {}):", s, 2 * s);
        for point in &series {
            append_convergence_point(&path, point.timestep, point.error)?;
            println!("  dt = {:.4e}  error = {:.4e}", point.timestep, point.error);
        }
        let orders: Vec<String> = observed_orders(&series)
            .iter()
            .map(|order| format!("{:.2}", order))
            .collect();
        println!("  observed orders: [{}]", orders.join(", "));
        println!("  {}\n", path.display());
    }

    let plot_path = tmp_dir.join("kepler_convergence.png");
    plot_convergence(
        &points,
        &plot_path.to_string_lossy(),
        Some(&PlotConfig::convergence("Kepler: terminal error after one period")),
    )?;
    println!("Plot: {}", plot_path.display());

    Ok(())
}
