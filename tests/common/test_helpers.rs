//! Helper functions for integration tests

use avfet_rs::solver::Trajectory;
use nalgebra::DVector;

/// Assert that two states are close (within tolerance), element by element
pub fn assert_states_close(
    state1: &DVector<f64>,
    state2: &DVector<f64>,
    tolerance: f64,
    message: &str,
) {
    assert_eq!(state1.len(), state2.len(), "{}: Dimension mismatch", message);

    for (i, (&v1, &v2)) in state1.iter().zip(state2.iter()).enumerate() {
        let diff = (v1 - v2).abs();
        assert!(
            diff < tolerance,
            "{}: Element {} differs by {} (tolerance {})",
            message,
            i,
            diff,
            tolerance
        );
    }
}

/// `max_n |H_{n+1} - H_n + D_n|` over a trajectory
pub fn max_energy_balance_defect(trajectory: &Trajectory, energy: &str) -> f64 {
    let series = trajectory.invariant_series(energy).unwrap();
    series
        .windows(2)
        .zip(trajectory.records.iter().skip(1))
        .map(|(pair, record)| (pair[1] - pair[0] + record.dissipation).abs())
        .fold(0.0, f64::max)
}

/// Compute relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}
