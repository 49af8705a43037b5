//! Restart idempotence
//!
//! With the default `FromState` initial guess a step depends on nothing but
//! its start state, so integrating `2N` steps in one run or as two runs of
//! `N` gives the same end state.

use std::f64::consts::PI;

use avfet_rs::models::KeplerProblem;
use avfet_rs::output::NullSink;
use avfet_rs::physics::PhysicalModel;
use avfet_rs::scheme::{StepperPhase, TimeStepper};
use avfet_rs::solver::{InitialGuess, Integrator, IntegratorConfiguration, Scenario};
use avfet_rs::scheme::AvfetIntegrator;

mod common;
use common::{Rotation, assert_states_close};

const STEP: f64 = 2.0 * PI / 32.0;

#[test]
fn test_split_run_matches_single_run() {
    let integrator = AvfetIntegrator::new();

    let full = integrator
        .solve(
            &Scenario::new(Box::new(KeplerProblem::new())),
            &IntegratorConfiguration::new(STEP, 8.0 * STEP, 1),
        )
        .unwrap();

    let half_config = IntegratorConfiguration::new(STEP, 4.0 * STEP, 1);
    let first = integrator
        .solve(&Scenario::new(Box::new(KeplerProblem::new())), &half_config)
        .unwrap();
    let restarted = Scenario::with_initial_state(Box::new(KeplerProblem::new()), first.final_state.clone());
    let second = integrator.solve(&restarted, &half_config).unwrap();

    assert_states_close(&full.states[4], &first.final_state, 1e-13, "midpoint");
    assert_states_close(&full.final_state, &second.final_state, 1e-13, "end state");
}

#[test]
fn test_stepper_reuse_after_reset() {
    let model = Rotation::new([1.0, 0.5, 0.2]);
    let config = IntegratorConfiguration::new(0.1, 0.5, 2);
    let mut stepper = TimeStepper::new(&model, &config).unwrap();

    let first = stepper.run(&model.initial_state(), &mut NullSink).unwrap();
    assert_eq!(stepper.phase(), StepperPhase::Converged);

    // run() resets internally
    let second = stepper.run(&model.initial_state(), &mut NullSink).unwrap();
    assert_states_close(&first.final_state, &second.final_state, 1e-15, "rerun");
}

#[test]
fn test_previous_solution_guess_reaches_same_state() {
    let model = Rotation::new([1.0, 0.5, 0.2]);
    let base = IntegratorConfiguration::new(0.1, 1.0, 2);
    let warm = base.clone().with_initial_guess(InitialGuess::PreviousSolution);

    let cold_run = TimeStepper::new(&model, &base)
        .unwrap()
        .run(&model.initial_state(), &mut NullSink)
        .unwrap();
    let warm_run = TimeStepper::new(&model, &warm)
        .unwrap()
        .run(&model.initial_state(), &mut NullSink)
        .unwrap();

    // Same discrete solution, different Newton path
    assert_states_close(&cold_run.final_state, &warm_run.final_state, 1e-12, "warm start");
}

#[test]
fn test_previous_solution_guess_over_kepler_period() {
    let scenario = Scenario::new(Box::new(KeplerProblem::new()));
    let cold = IntegratorConfiguration::new(STEP, 2.0 * PI, 1);
    let warm = cold.clone().with_initial_guess(InitialGuess::PreviousSolution);

    let integrator = AvfetIntegrator::new();
    let cold_run = integrator.solve(&scenario, &cold).unwrap();
    let warm_run = integrator.solve(&scenario, &warm).unwrap();

    assert_eq!(warm_run.len(), 33);
    for name in ["Hamiltonian", "Runge-Lenz 1", "Runge-Lenz 2"] {
        let drift = warm_run.max_drift(name).unwrap();
        assert!(drift < 1e-10, "{} drifted by {:e}", name, drift);
    }
    assert_states_close(&cold_run.final_state, &warm_run.final_state, 1e-10, "perihelion return");
}
