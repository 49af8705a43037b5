//! Order of accuracy on the Kepler reference orbit
//!
//! The terminal error `|q(2π) - q(0)|` after one period should fall by
//! roughly `2^{2s}` per halving of the step.

use avfet_rs::models::kepler::{convergence_study, observed_orders, timestep_for};

#[test]
fn test_one_stage_is_second_order() {
    let points = convergence_study(&[1], &[6, 7, 8], |config| config).unwrap();
    assert_eq!(points.len(), 3);

    for point in &points {
        println!("dt = {:.4e}: error = {:.4e}", point.timestep, point.error);
    }

    for pair in points.windows(2) {
        assert!(
            pair[1].error < pair[0].error,
            "error did not decrease: {:e} -> {:e}",
            pair[0].error,
            pair[1].error
        );
    }

    let ratio = points[1].error / points[2].error;
    assert!(ratio > 2.5, "convergence ratio {} too small", ratio);

    let orders = observed_orders(&points);
    assert_eq!(orders.len(), 2);
    assert!(*orders.last().unwrap() > 1.5, "observed orders {:?}", orders);
}

#[test]
fn test_study_reports_requested_steps() {
    let points = convergence_study(&[1, 2], &[6], |config| config).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].stages, 1);
    assert_eq!(points[1].stages, 2);
    assert_eq!(points[0].timestep, timestep_for(6));

    // Higher degree in time is more accurate at the same step
    assert!(points[1].error < points[0].error);
}

#[test]
fn test_configure_hook_is_applied() {
    // An override below the mass degree is rejected for s = 2
    let result = convergence_study(&[2], &[4], |config| {
        config.with_quadrature_degree("evolution", 1)
    });
    assert!(result.is_err());
}
