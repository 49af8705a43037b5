//! Conservation tests on the Kepler problem
//!
//! Energy and both Runge-Lenz components are preserved to solver tolerance
//! over a full period; the angular momentum follows from
//! `|A|² = 1 + 2 H L²` and is preserved as well.

use std::f64::consts::PI;

use avfet_rs::models::KeplerProblem;
use avfet_rs::physics::PhysicalModel;
use avfet_rs::solver::{Integrator, IntegratorConfiguration, Scenario};
use avfet_rs::scheme::AvfetIntegrator;

const CONSERVED: [&str; 3] = ["Hamiltonian", "Runge-Lenz 1", "Runge-Lenz 2"];

#[test]
fn test_one_period_with_one_stage() {
    let scenario = Scenario::new(Box::new(KeplerProblem::new()));
    let config = IntegratorConfiguration::new(2.0 * PI / 32.0, 2.0 * PI, 1);

    let trajectory = AvfetIntegrator::new().solve(&scenario, &config).unwrap();
    assert_eq!(trajectory.len(), 33);

    for name in CONSERVED {
        let drift = trajectory.max_drift(name).unwrap();
        println!("{}: max drift {:.3e}", name, drift);
        assert!(drift < 1e-10, "{} drifted by {:e}", name, drift);
    }

    let angular = trajectory.max_drift("Angular momentum").unwrap();
    assert!(angular < 1e-10, "Angular momentum drifted by {:e}", angular);

    // Conservative model: no dissipation on any step
    assert!(trajectory.dissipation_series().iter().all(|d| d.abs() < 1e-12));
}

#[test]
fn test_two_stages_preserve_invariants() {
    let scenario = Scenario::new(Box::new(KeplerProblem::new()));
    let timestep = 2.0 * PI / 32.0;
    let config = IntegratorConfiguration::new(timestep, 8.0 * timestep, 2);

    let trajectory = AvfetIntegrator::new().solve(&scenario, &config).unwrap();
    assert_eq!(trajectory.len(), 9);
    assert_eq!(trajectory.metadata["stages"], "2");

    for name in CONSERVED {
        let drift = trajectory.max_drift(name).unwrap();
        assert!(drift < 1e-10, "{} drifted by {:e}", name, drift);
    }
}

#[test]
fn test_without_conservation_only_energy_is_exact() {
    let scenario = Scenario::new(Box::new(KeplerProblem::new()));
    let config = IntegratorConfiguration::new(2.0 * PI / 32.0, 2.0 * PI, 1).without_conservation();

    let trajectory = AvfetIntegrator::new().solve(&scenario, &config).unwrap();
    assert_eq!(trajectory.len(), 33);
    assert!(trajectory.max_drift("Hamiltonian").unwrap() < 1e-10);
    assert_eq!(trajectory.metadata["auxiliary_fields"], "1");
}

#[test]
fn test_initial_record_matches_model() {
    let model = KeplerProblem::new();
    let expected = model.invariants().values(&model.initial_state()).unwrap();

    let scenario = Scenario::new(Box::new(model));
    let config = IntegratorConfiguration::new(0.1, 0.2, 1);
    let trajectory = AvfetIntegrator::new().solve(&scenario, &config).unwrap();

    let first = &trajectory.records[0];
    assert_eq!(first.step, 0);
    assert_eq!(first.time, 0.0);
    assert_eq!(first.invariant_values, expected);
    assert_eq!(trajectory.records[2].step, 2);
}
