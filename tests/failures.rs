//! Failure reporting and the halted state

use avfet_rs::error::{FailureCause, IntegrationError};
use avfet_rs::output::NullSink;
use avfet_rs::physics::PhysicalModel;
use avfet_rs::scheme::{AvfetIntegrator, StepperPhase, TimeStepper};
use avfet_rs::solver::{Integrator, IntegratorConfiguration, Scenario};

mod common;
use common::{DuplicateEnergy, RootConstrained};

#[test]
fn test_invalid_invariant_domain_is_physical_invalidity() {
    let model = RootConstrained::new([1.0, 0.0, -0.5]);
    let config = IntegratorConfiguration::new(0.1, 1.0, 1);
    let mut stepper = TimeStepper::new(&model, &config).unwrap();

    let error = stepper.step(&model.initial_state(), 0).unwrap_err();
    assert_eq!(error.step(), Some(1));
    assert_eq!(error.cause(), Some(FailureCause::PhysicalInvalidity));
    match &error {
        IntegrationError::Step { time, .. } => assert_eq!(*time, 0.0),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(stepper.phase(), StepperPhase::Failed);

    // Halted until reset, even from a valid state
    let valid = nalgebra::DVector::from_vec(vec![1.0, 0.0, 0.5]);
    assert!(matches!(stepper.step(&valid, 1), Err(IntegrationError::Halted)));

    stepper.reset();
    let outcome = stepper.step(&valid, 1).unwrap();
    assert_eq!(outcome.record.step, 2);
    assert!((outcome.state[2] - 0.5).abs() < 1e-12);
}

#[test]
fn test_invalid_initial_state_fails_diagnostics() {
    let scenario = Scenario::new(Box::new(RootConstrained::new([1.0, 0.0, -0.5])));
    let config = IntegratorConfiguration::new(0.1, 1.0, 1);
    let error = AvfetIntegrator::new().solve(&scenario, &config).unwrap_err();
    assert!(matches!(error, IntegrationError::Diagnostics { step: 0, .. }));
}

#[test]
fn test_parallel_gradients_are_correction_singularity() {
    let model = DuplicateEnergy::new();
    let config = IntegratorConfiguration::new(0.1, 1.0, 1);
    let mut stepper = TimeStepper::new(&model, &config).unwrap();

    let error = stepper.run(&model.initial_state(), &mut NullSink).unwrap_err();
    assert_eq!(error.step(), Some(1));
    assert_eq!(error.cause(), Some(FailureCause::CorrectionSingularity));
    assert_eq!(stepper.phase(), StepperPhase::Failed);
}

#[test]
fn test_duplicate_energy_runs_without_conservation() {
    let scenario = Scenario::new(Box::new(DuplicateEnergy::new()));
    let config = IntegratorConfiguration::new(0.1, 0.3, 1).without_conservation();
    let trajectory = AvfetIntegrator::new().solve(&scenario, &config).unwrap();
    assert_eq!(trajectory.len(), 4);
    assert!(trajectory.max_drift("H").unwrap() < 1e-12);
}

#[test]
fn test_unknown_quadrature_term_is_rejected() {
    let scenario = Scenario::new(Box::new(DuplicateEnergy::new()));
    let config = IntegratorConfiguration::new(0.1, 0.3, 1).with_quadrature_degree("entropy", 4);
    let error = AvfetIntegrator::new().solve(&scenario, &config).unwrap_err();
    assert!(matches!(
        error,
        IntegrationError::Config(avfet_rs::error::ConfigError::UnknownTerm(_))
    ));
}
