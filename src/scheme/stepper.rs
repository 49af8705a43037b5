//! Time stepping
//!
//! # Step lifecycle
//!
//! ```text
//!            step()                 solve ok
//!   Idle ──────────► StepPending ──► Solving ──────────► Converged ─┐
//!    ▲                                  │                          │ step()
//!    │ reset()                          │ any failure              │
//!    │                                  ▼                          ▼
//!    └───────────────────────────── Failed          StepPending (next step)
//! ```
//!
//! A failed stepper refuses further steps ([`IntegrationError::Halted`])
//! until it is reset. No partial state is ever accepted: the trajectory
//! only grows after a converged solve, a finite end state, a non-negative
//! dissipation estimate and successful invariant evaluation.
//!
//! # Loop
//!
//! Steps are taken while `t < T - h/2`, with `t_n = n h` computed from the
//! step index so that round-off does not accumulate.

use nalgebra::DVector;

use crate::error::{
    ConfigError, EvalError, FailureCause, IntegrationError, ResidualError, SolveError,
};
use crate::output::sink::{LogSink, NullSink};
use crate::physics::traits::PhysicalModel;
use crate::scheme::residual::ResidualAssembler;
use crate::solver::{
    self, InitialGuess, Integrator, IntegratorConfiguration, NewtonSolver, NonlinearSolver,
    Scenario, SolveReport, SolverOptions, StepRecord, Trajectory,
};

/// Phase of the step state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperPhase {
    Idle,
    StepPending,
    Solving,
    Converged,
    Failed,
}

/// Accepted step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// State at the end of the step
    pub state: DVector<f64>,
    pub record: StepRecord,
    /// Converged enlarged state (state coefficients and auxiliary fields)
    pub solution: DVector<f64>,
}

// =================================================================================================
// Time stepper
// =================================================================================================

pub struct TimeStepper<'a> {
    model: &'a dyn PhysicalModel,
    assembler: ResidualAssembler<'a>,
    solver: Box<dyn NonlinearSolver + 'a>,
    config: IntegratorConfiguration,
    phase: StepperPhase,
    /// Converged solution of the last accepted step
    prior: Option<DVector<f64>>,
}

impl<'a> TimeStepper<'a> {
    /// Stepper with the default Newton solver, configured from `config.solver_options`
    pub fn new(
        model: &'a dyn PhysicalModel,
        config: &IntegratorConfiguration,
    ) -> Result<Self, ConfigError> {
        let options = SolverOptions::from_parameters(&config.solver_options)?;
        Self::with_solver(model, config, Box::new(NewtonSolver::new(options)))
    }

    /// Stepper with a caller-provided nonlinear solver
    pub fn with_solver(
        model: &'a dyn PhysicalModel,
        config: &IntegratorConfiguration,
        solver: Box<dyn NonlinearSolver + 'a>,
    ) -> Result<Self, ConfigError> {
        let assembler = ResidualAssembler::new(model, config)?;
        log::debug!(
            "AV-FET stepper for `{}`: s = {}, h = {}, {} auxiliary fields, solver {}",
            model.name(),
            config.stages,
            config.timestep,
            assembler.fields().field_count(),
            solver.name()
        );
        Ok(Self {
            model,
            assembler,
            solver,
            config: config.clone(),
            phase: StepperPhase::Idle,
            prior: None,
        })
    }

    pub fn phase(&self) -> StepperPhase {
        self.phase
    }

    pub fn assembler(&self) -> &ResidualAssembler<'a> {
        &self.assembler
    }

    pub fn config(&self) -> &IntegratorConfiguration {
        &self.config
    }

    /// Back to `Idle`, forgetting the previous solution
    pub fn reset(&mut self) {
        self.phase = StepperPhase::Idle;
        self.prior = None;
    }

    fn fail(&mut self, error: IntegrationError) -> IntegrationError {
        self.phase = StepperPhase::Failed;
        log::error!("{}", error);
        error
    }

    fn check_dimension(&self, state: &DVector<f64>) -> Result<(), ConfigError> {
        let expected = self.model.dimension();
        if state.len() != expected {
            return Err(ConfigError::StateDimension {
                expected,
                found: state.len(),
            });
        }
        Ok(())
    }

    fn initial_guess(
        &self,
        previous: &DVector<f64>,
        policy: InitialGuess,
    ) -> Result<DVector<f64>, SolveError> {
        self.assembler
            .fields()
            .initial_guess(previous, policy, self.prior.as_ref())
            .map_err(|source| {
                SolveError::Residual(ResidualError::Evaluation {
                    term: "initial_guess".to_string(),
                    source,
                })
            })
    }

    fn solve_from(
        &self,
        previous: &DVector<f64>,
        guess: DVector<f64>,
    ) -> Result<SolveReport, SolveError> {
        let problem = self.assembler.bind(previous);
        self.solver.solve(&problem, guess)
    }

    fn step_failure(&mut self, step: usize, time: f64, source: SolveError) -> IntegrationError {
        let cause = FailureCause::of(&source);
        self.fail(IntegrationError::Step {
            step,
            time,
            cause,
            source,
        })
    }

    /// Advance from `previous` at `t_n = n h`, with `n = step_index`
    ///
    /// Errors name step `n + 1` and the start time `t_n`.
    pub fn step(
        &mut self,
        previous: &DVector<f64>,
        step_index: usize,
    ) -> Result<StepOutcome, IntegrationError> {
        if self.phase == StepperPhase::Failed {
            return Err(IntegrationError::Halted);
        }
        // Rejected before stepping: the phase is left untouched
        self.check_dimension(previous)?;

        let h = self.config.timestep;
        let step = step_index + 1;
        let start = step_index as f64 * h;
        self.phase = StepperPhase::StepPending;

        // ====== Step 1: Initial guess ======
        let policy = self.config.initial_guess;
        let guess = match self.initial_guess(previous, policy) {
            Ok(guess) => guess,
            Err(source) => return Err(self.step_failure(step, start, source)),
        };
        let warm = policy == InitialGuess::PreviousSolution && self.prior.is_some();

        // ====== Step 2: Nonlinear solve ======
        self.phase = StepperPhase::Solving;
        let mut report = self.solve_from(previous, guess);
        if warm && let Err(error) = &report {
            log::warn!(
                "Step {}: warm start failed ({}), retrying from the previous state",
                step,
                error
            );
            report = self
                .initial_guess(previous, InitialGuess::FromState)
                .and_then(|guess| self.solve_from(previous, guess));
        }
        let report = match report {
            Ok(report) => report,
            Err(source) => return Err(self.step_failure(step, start, source)),
        };

        // ====== Step 3: Acceptance checks ======
        let state = self.assembler.fields().end_state(&report.solution);
        if let Err(source) = solver::validate_state(&state) {
            return Err(self.step_failure(step, start, source));
        }

        let dissipation = self.assembler.dissipation(previous, &report.solution);
        if dissipation < -self.config.dissipation_tolerance {
            return Err(self.fail(IntegrationError::NegativeDissipation {
                step,
                time: start,
                value: dissipation,
            }));
        }

        let invariant_values = match self.model.invariants().values(&state) {
            Ok(values) => values,
            Err(source) => return Err(self.fail(IntegrationError::Diagnostics { step, source })),
        };

        // ====== Step 4: Accept ======
        log::debug!(
            "Step {} accepted: {} Newton iterations, |F| = {:.3e}, D = {:.3e}",
            step,
            report.iterations,
            report.residual_norm,
            dissipation
        );
        self.prior = Some(report.solution.clone());
        self.phase = StepperPhase::Converged;

        Ok(StepOutcome {
            state,
            record: StepRecord {
                step,
                time: step as f64 * h,
                invariant_values,
                dissipation,
                newton_iterations: report.iterations,
                residual_norm: report.residual_norm,
            },
            solution: report.solution,
        })
    }

    /// Integrate from `initial` over the configured duration
    ///
    /// Every accepted record (the initial condition included) is handed to
    /// `sink` before the next step starts.
    pub fn run(
        &mut self,
        initial: &DVector<f64>,
        sink: &mut dyn LogSink,
    ) -> Result<Trajectory, IntegrationError> {
        self.check_dimension(initial)?;
        self.reset();

        let invariants = self.model.invariants();
        let names = invariants.names();
        sink.begin(&names)?;

        // ====== Initial record ======
        let initial_values = invariants
            .values(initial)
            .map_err(|source: EvalError| IntegrationError::Diagnostics { step: 0, source })?;
        let initial_record = StepRecord {
            step: 0,
            time: 0.0,
            invariant_values: initial_values,
            dissipation: 0.0,
            newton_iterations: 0,
            residual_norm: 0.0,
        };
        sink.record(&initial_record, initial)?;

        let mut trajectory = Trajectory::new(names, initial.clone());
        trajectory.push(initial.clone(), initial_record);

        // ====== Time loop ======
        let steps = self.config.time_steps();
        let mut current = initial.clone();
        for step_index in 0..steps {
            let outcome = self.step(&current, step_index)?;
            sink.record(&outcome.record, &outcome.state)?;
            trajectory.push(outcome.state.clone(), outcome.record);
            current = outcome.state;
        }
        sink.finish()?;

        log::info!(
            "{}: {} steps of h = {} with s = {} completed",
            self.model.name(),
            steps,
            self.config.timestep,
            self.config.stages
        );

        Ok(trajectory)
    }
}

// =================================================================================================
// Integrator
// =================================================================================================

/// Auxiliary-variable finite element in time integrator
#[derive(Debug, Clone, Copy, Default)]
pub struct AvfetIntegrator;

impl AvfetIntegrator {
    pub fn new() -> Self {
        Self
    }

    /// Like [`Integrator::solve`], streaming records to `sink`
    pub fn solve_with_sink(
        &self,
        scenario: &Scenario,
        config: &IntegratorConfiguration,
        sink: &mut dyn LogSink,
    ) -> Result<Trajectory, IntegrationError> {
        // ====== Step 1: Validation ======
        config.validate()?;
        scenario.validate()?;

        // ====== Step 2: Integration ======
        let mut stepper = TimeStepper::new(scenario.model.as_ref(), config)?;
        let mut trajectory = stepper.run(&scenario.initial_state, sink)?;

        // ====== Step 3: Metadata ======
        trajectory.add_metadata("integrator", self.name());
        trajectory.add_metadata("model", scenario.get_model_name());
        trajectory.add_metadata("stages", &config.stages.to_string());
        trajectory.add_metadata("timestep", &config.timestep.to_string());
        trajectory.add_metadata("total_duration", &config.total_duration.to_string());
        trajectory.add_metadata("conservation", &config.conservation.to_string());
        trajectory.add_metadata(
            "auxiliary_fields",
            &stepper.assembler().fields().field_count().to_string(),
        );

        Ok(trajectory)
    }
}

impl Integrator for AvfetIntegrator {
    fn solve(
        &self,
        scenario: &Scenario,
        config: &IntegratorConfiguration,
    ) -> Result<Trajectory, IntegrationError> {
        self.solve_with_sink(scenario, config, &mut NullSink)
    }

    fn name(&self) -> &str {
        "AV-FET"
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::expr::Expr;
    use crate::physics::invariants::{InvariantSet, Quadrature};
    use crate::solver::NonlinearProblem;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Rotation in the (x, y) plane, `z` conserved
    struct Rotation {
        invariants: InvariantSet,
    }

    impl Rotation {
        fn new() -> Self {
            let x = Expr::var(0);
            let y = Expr::var(1);
            let z = Expr::var(2);
            let invariants = InvariantSet::builder(3)
                .energy(
                    "H",
                    0.5 * (x.clone() * x.clone() + y.clone() * y.clone() + z.clone() * z.clone()),
                    Quadrature::Polynomial,
                )
                .conserved("z", z, Quadrature::Polynomial)
                .build()
                .unwrap();
            Self { invariants }
        }
    }

    impl PhysicalModel for Rotation {
        fn dimension(&self) -> usize {
            3
        }

        fn invariants(&self) -> &InvariantSet {
            &self.invariants
        }

        fn apply_structure(&self, _state: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![-w[1], w[0], 0.0])
        }

        fn initial_state(&self) -> DVector<f64> {
            DVector::from_vec(vec![1.0, 0.0, 0.5])
        }

        fn name(&self) -> &str {
            "Rotation"
        }
    }

    /// Solver that always stalls
    struct Stalling;

    impl NonlinearSolver for Stalling {
        fn solve(
            &self,
            _problem: &dyn NonlinearProblem,
            _initial_guess: DVector<f64>,
        ) -> Result<SolveReport, SolveError> {
            Err(SolveError::NonConvergence {
                iterations: 3,
                residual: 1.0,
            })
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    /// Newton solver whose second call stalls
    struct StallsOnSecondCall {
        inner: NewtonSolver,
        calls: Cell<usize>,
    }

    impl StallsOnSecondCall {
        fn new() -> Self {
            Self {
                inner: NewtonSolver::new(SolverOptions::default()),
                calls: Cell::new(0),
            }
        }
    }

    impl NonlinearSolver for StallsOnSecondCall {
        fn solve(
            &self,
            problem: &dyn NonlinearProblem,
            initial_guess: DVector<f64>,
        ) -> Result<SolveReport, SolveError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == 1 {
                return Err(SolveError::NonConvergence {
                    iterations: 50,
                    residual: 1.0,
                });
            }
            self.inner.solve(problem, initial_guess)
        }

        fn name(&self) -> &str {
            "stalls-on-second-call"
        }
    }

    #[test]
    fn test_failed_warm_start_retries_from_state() {
        let model = Rotation::new();
        let config = IntegratorConfiguration::new(0.1, 0.2, 1)
            .with_initial_guess(InitialGuess::PreviousSolution);
        let mut stepper =
            TimeStepper::with_solver(&model, &config, Box::new(StallsOnSecondCall::new())).unwrap();

        let trajectory = stepper.run(&model.initial_state(), &mut NullSink).unwrap();
        assert_eq!(trajectory.len(), 3);
        assert!(trajectory.max_drift("z").unwrap() < 1e-12);
    }

    #[test]
    fn test_cold_start_is_not_retried() {
        let model = Rotation::new();
        let config = IntegratorConfiguration::new(0.1, 0.2, 1);
        let mut stepper =
            TimeStepper::with_solver(&model, &config, Box::new(StallsOnSecondCall::new())).unwrap();

        let error = stepper.run(&model.initial_state(), &mut NullSink).unwrap_err();
        assert_eq!(error.step(), Some(2));
        assert_eq!(error.cause(), Some(FailureCause::NonConvergence));
    }

    #[test]
    fn test_rotation_preserves_energy_and_height() {
        let model = Rotation::new();
        let config = IntegratorConfiguration::new(0.1, 1.0, 1);
        let mut stepper = TimeStepper::new(&model, &config).unwrap();
        let trajectory = stepper.run(&model.initial_state(), &mut NullSink).unwrap();

        assert_eq!(trajectory.len(), 11);
        assert_eq!(trajectory.records.len(), trajectory.time_points.len());
        assert!(trajectory.max_drift("H").unwrap() < 1e-12);
        assert!(trajectory.max_drift("z").unwrap() < 1e-12);
        assert_relative_eq!(*trajectory.time_points.last().unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(stepper.phase(), StepperPhase::Converged);
    }

    #[test]
    fn test_failed_step_halts_until_reset() {
        let model = Rotation::new();
        let config = IntegratorConfiguration::new(0.1, 1.0, 1);
        let mut stepper = TimeStepper::with_solver(&model, &config, Box::new(Stalling)).unwrap();
        let initial = model.initial_state();

        let error = stepper.step(&initial, 4).unwrap_err();
        assert_eq!(error.step(), Some(5));
        assert_eq!(error.cause(), Some(FailureCause::NonConvergence));
        match error {
            IntegrationError::Step { time, .. } => assert_relative_eq!(time, 0.4),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(stepper.phase(), StepperPhase::Failed);
        assert!(matches!(stepper.step(&initial, 5), Err(IntegrationError::Halted)));

        stepper.reset();
        assert_eq!(stepper.phase(), StepperPhase::Idle);
    }

    #[test]
    fn test_mismatched_state_is_config_error() {
        let model = Rotation::new();
        let config = IntegratorConfiguration::new(0.1, 1.0, 1);
        let mut stepper = TimeStepper::new(&model, &config).unwrap();
        let wrong = DVector::from_vec(vec![1.0, 0.0, 0.5, 2.0]);

        assert!(matches!(
            stepper.run(&wrong, &mut NullSink),
            Err(IntegrationError::Config(ConfigError::StateDimension {
                expected: 3,
                found: 4
            }))
        ));
        assert!(matches!(
            stepper.step(&DVector::zeros(2), 0),
            Err(IntegrationError::Config(ConfigError::StateDimension {
                expected: 3,
                found: 2
            }))
        ));
        assert_ne!(stepper.phase(), StepperPhase::Failed);

        // Still usable with a valid state
        let outcome = stepper.step(&model.initial_state(), 0).unwrap();
        assert_eq!(outcome.record.step, 1);
    }

    #[test]
    fn test_integrator_adds_metadata() {
        let scenario = Scenario::new(Box::new(Rotation::new()));
        let config = IntegratorConfiguration::new(0.25, 0.5, 1);
        let trajectory = AvfetIntegrator::new().solve(&scenario, &config).unwrap();
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.metadata["integrator"], "AV-FET");
        assert_eq!(trajectory.metadata["model"], "Rotation");
        assert_eq!(trajectory.metadata["auxiliary_fields"], "2");
    }

    #[test]
    fn test_integrator_rejects_bad_initial_state() {
        let scenario = Scenario::with_initial_state(Box::new(Rotation::new()), DVector::zeros(2));
        let config = IntegratorConfiguration::new(0.25, 0.5, 1);
        assert!(matches!(
            AvfetIntegrator::new().solve(&scenario, &config),
            Err(IntegrationError::Config(ConfigError::StateDimension { .. }))
        ));
    }
}
