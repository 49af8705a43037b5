//! Example: Viscous Burgers, Energy Decay With Exact Mass Conservation
//!
//! Periodic Burgers equation, `N = 64` cells on `[0, 1)`, initial profile
//! `sin(2πx) + ½`, integrated with `s = 2`.
//!
//! - Energy decreases by exactly the logged dissipation on every step
//! - Mass is preserved to solver tolerance
//! - A second run starts from the zero-mean projection of the same profile
//!
//! Output (system temporary directory): invariant CSV, profile plot and
//! drift plot.

use std::time::Instant;

use avfet_rs::models::ViscousBurgers;
use avfet_rs::output::export::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
use avfet_rs::output::{ConsoleSink, PlotConfig, plot_invariant_drift, plot_profiles};
use avfet_rs::physics::PhysicalModel;
use avfet_rs::scheme::AvfetIntegrator;
use avfet_rs::solver::{Integrator, IntegratorConfiguration, Scenario, Trajectory};

/// Prints a titled section banner to stdout.
fn print_section(title: &str) {
    println!("\n═══════════════════════════════════════════════════════");
    println!("  {title}");
    println!("═══════════════════════════════════════════════════════\n");
}

/// Largest `|H_{n+1} - H_n + D_n|` over the run
fn energy_balance_defect(trajectory: &Trajectory) -> f64 {
    let energy = trajectory.invariant_series("Energy").unwrap_or_default();
    energy
        .windows(2)
        .zip(trajectory.dissipation_series())
        .map(|(pair, dissipation)| (pair[1] - pair[0] + dissipation).abs())
        .fold(0.0, f64::max)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    print_section("Viscous Burgers - AV-FET Integration");

    // ====== Parameters ======

    let cells = 64;
    let viscosity = 0.01;
    let timestep = 0.005;
    let total_duration = 0.5;
    let stages = 2;

    println!("Parameters:");
    println!("  N (cells)  : {}", cells);
    println!("  ν          : {}", viscosity);
    println!("  dt         : {}", timestep);
    println!("  T          : {}", total_duration);
    println!("  s          : {}\n", stages);

    let tmp_dir = std::env::temp_dir();
    let model = ViscousBurgers::new(cells, viscosity)?;
    let grid = model.grid();
    let component_names = model.component_names();

    let config = IntegratorConfiguration::new(timestep, total_duration, stages);

    // ====== Run with the shifted sine ======

    let scenario = Scenario::new(Box::new(model.clone()));
    let mut console = ConsoleSink::new();

    let start = Instant::now();
    let trajectory = AvfetIntegrator::new().solve_with_sink(&scenario, &config, &mut console)?;
    println!("Integrated {} steps in {:.3} s", trajectory.len() - 1, start.elapsed().as_secs_f64());

    let energy = trajectory.invariant_series("Energy").unwrap_or_default();
    let total_dissipation: f64 = trajectory.dissipation_series().iter().sum();
    println!("  Energy      : {:.10} -> {:.10}", energy[0], energy[energy.len() - 1]);
    println!("  Σ D         : {:.10}", total_dissipation);
    println!("  Balance     : max |ΔH + D| = {:.3e}", energy_balance_defect(&trajectory));
    println!("  Mass drift  : {:.3e}", trajectory.max_drift("Mass").unwrap_or(f64::NAN));

    // ====== Zero-mean run ======

    print_section("Zero-Mean Initial Profile");

    let zero_mean = model.with_zero_mean()?;
    let zero_mean_scenario = Scenario::new(Box::new(zero_mean));
    let zero_mean_trajectory = AvfetIntegrator::new().solve(&zero_mean_scenario, &config)?;
    println!(
        "  Mass        : {:.3e} (max drift {:.3e})",
        zero_mean_trajectory.records[0].invariant_values[1],
        zero_mean_trajectory.max_drift("Mass").unwrap_or(f64::NAN)
    );
    println!("  Balance     : max |ΔH + D| = {:.3e}", energy_balance_defect(&zero_mean_trajectory));

    // ====== Export ======

    print_section("Output");

    let csv_path = tmp_dir.join("burgers_invariants.csv");
    let states_path = tmp_dir.join("burgers_states.csv");
    let exporter = CsvExporter::new(
        CsvConfig::default().with_metadata(CsvMetadata::from_trajectory(&trajectory)),
    );
    exporter.export_invariants(&trajectory, &csv_path)?;
    exporter.export_states(&trajectory, &component_names, Some(11), &states_path)?;

    let profile_path = tmp_dir.join("burgers_profiles.png");
    let last = trajectory.len() - 1;
    let profiles: Vec<(String, Vec<f64>)> = [0, last / 2, last]
        .iter()
        .map(|&index| {
            (
                format!("t = {:.3}", trajectory.time_points[index]),
                trajectory.states[index].iter().copied().collect(),
            )
        })
        .collect();
    plot_profiles(
        &grid,
        &profiles,
        &profile_path.to_string_lossy(),
        Some(&PlotConfig::profile("Viscous Burgers, ν = 0.01")),
    )?;

    let drift_path = tmp_dir.join("burgers_drift.png");
    plot_invariant_drift(&trajectory, &drift_path.to_string_lossy(), None)?;

    println!("  {}", csv_path.display());
    println!("  {}", states_path.display());
    println!("  {}", profile_path.display());
    println!("  {}", drift_path.display());

    Ok(())
}
