//! Integrator and nonlinear-solver traits and types
//!
//! # Design Philosophy
//!
//! - [`IntegratorConfiguration`] says HOW to integrate (step, duration,
//!   stages, quadrature overrides, solver options)
//! - [`Integrator`] is the stable entry point: scenario + configuration in,
//!   [`Trajectory`] out
//! - [`NonlinearSolver`] / [`NonlinearProblem`] are the seam between the
//!   residual assembly and the root finder; options travel opaquely
//!
//! Configurations are plain serde structs and can be read from JSON:
//!
//! ```rust
//! use avfet_rs::solver::IntegratorConfiguration;
//!
//! let config = IntegratorConfiguration::from_json(r#"{
//!     "timestep": 0.05,
//!     "total_duration": 1.0,
//!     "stages": 2,
//!     "solver_options": { "snes_atol": "1e-13", "snes_linesearch_type": "bt" }
//! }"#).unwrap();
//! assert_eq!(config.stages, 2);
//! assert!(config.conservation);
//! ```

use std::collections::{BTreeMap, HashMap};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, IntegrationError, ResidualError, SolveError};
use crate::solver::scenario::Scenario;

// =================================================================================================
// Initial guess policy
// =================================================================================================

/// How the Newton iteration of each step is seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialGuess {
    /// State coefficients equal to the previous state, auxiliary fields equal
    /// to the invariant gradients at the previous state. Depends on nothing
    /// but the previous state, so restarts are reproducible.
    #[default]
    FromState,

    /// State coefficients equal to the previous state, auxiliary fields
    /// taken from the previous converged solution. `FromState` is used on
    /// the first step and as a retry when the warm-started solve fails.
    PreviousSolution,
}

// =================================================================================================
// Integrator configuration
// =================================================================================================

/// Configuration of an AV-FET integration
///
/// # Examples
///
/// ```rust
/// use avfet_rs::solver::IntegratorConfiguration;
///
/// let config = IntegratorConfiguration::new(0.1, 2.0, 2)
///     .with_quadrature_degree("evolution", 8)
///     .with_solver_option("snes_rtol", 1e-12);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.time_steps(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfiguration {
    /// Step size `h`
    pub timestep: f64,

    /// Total duration `T`
    pub total_duration: f64,

    /// Degrees of freedom per field on each step (`s`)
    pub stages: usize,

    /// Quadrature degree per term id (`"evolution"`, `"mass"` or an invariant name)
    pub quadrature_degree_override: BTreeMap<String, usize>,

    /// Options forwarded to the nonlinear solver
    pub solver_options: BTreeMap<String, String>,

    /// Enforce conserved invariants through the skew correction
    pub conservation: bool,

    pub initial_guess: InitialGuess,

    /// Dissipation estimates below `-dissipation_tolerance` are fatal
    pub dissipation_tolerance: f64,
}

impl Default for IntegratorConfiguration {
    fn default() -> Self {
        Self {
            timestep: 0.01,
            total_duration: 1.0,
            stages: 1,
            quadrature_degree_override: BTreeMap::new(),
            solver_options: BTreeMap::new(),
            conservation: true,
            initial_guess: InitialGuess::FromState,
            dissipation_tolerance: 1e-12,
        }
    }
}

impl IntegratorConfiguration {
    pub fn new(timestep: f64, total_duration: f64, stages: usize) -> Self {
        Self {
            timestep,
            total_duration,
            stages,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration (missing fields take their defaults)
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Builder pattern: override the quadrature degree of one term
    pub fn with_quadrature_degree(mut self, term: &str, degree: usize) -> Self {
        self.quadrature_degree_override
            .insert(term.to_string(), degree);
        self
    }

    /// Builder pattern: forward an option to the nonlinear solver
    pub fn with_solver_option<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.solver_options.insert(key.to_string(), value.to_string());
        self
    }

    /// Builder pattern: disable the conservation correction
    pub fn without_conservation(mut self) -> Self {
        self.conservation = false;
        self
    }

    pub fn with_initial_guess(mut self, policy: InitialGuess) -> Self {
        self.initial_guess = policy;
        self
    }

    /// Number of steps taken by the `t < T - h/2` loop
    pub fn time_steps(&self) -> usize {
        let h = self.timestep;
        let threshold = self.total_duration - 0.5 * h;
        if !(h > 0.0) || !threshold.is_finite() || threshold <= 0.0 {
            return 0;
        }
        let mut steps = (threshold / h).ceil() as usize;
        // Align with the `n h < T - h/2` comparison under round-off
        while steps > 0 && ((steps - 1) as f64) * h >= threshold {
            steps -= 1;
        }
        while (steps as f64) * h < threshold {
            steps += 1;
        }
        steps
    }

    /// Validate configuration
    ///
    /// Term names of quadrature overrides are checked later, against the
    /// model's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(invalid("timestep", "must be positive and finite"));
        }
        if !self.total_duration.is_finite() || self.total_duration <= 0.0 {
            return Err(invalid("total_duration", "must be positive and finite"));
        }
        if self.timestep > self.total_duration {
            return Err(invalid("timestep", "must not exceed total_duration"));
        }
        if self.stages == 0 {
            return Err(invalid("stages", "must be at least 1"));
        }
        let minimum = 2 * self.stages - 2;
        for (term, degree) in &self.quadrature_degree_override {
            if *degree < minimum {
                return Err(invalid(
                    term,
                    &format!("quadrature degree {} is below the required {}", degree, minimum),
                ));
            }
        }
        if !self.dissipation_tolerance.is_finite() || self.dissipation_tolerance < 0.0 {
            return Err(invalid("dissipation_tolerance", "must be non-negative"));
        }
        SolverOptions::from_parameters(&self.solver_options)?;
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

// =================================================================================================
// Nonlinear solver options
// =================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSearch {
    /// Full Newton step
    Basic,
    /// Step halving until the residual norm decreases
    Backtracking,
    /// Quadratic model of the squared residual norm, backtracking fallback
    L2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolver {
    Lu,
    Qr,
}

/// Newton solver options
///
/// Keys accepted by [`SolverOptions::from_parameters`]:
///
/// | key | alias | meaning |
/// |-----|-------|---------|
/// | `snes_atol` | `atol` | absolute residual tolerance |
/// | `snes_rtol` | `rtol` | residual reduction tolerance |
/// | `snes_stol` | `stol` | relative step tolerance |
/// | `snes_max_it` | `max_it` | iteration limit |
/// | `snes_linesearch_type` | `linesearch` | `basic`, `bt`, `l2` |
/// | `pc_type` | `linear_solver` | `lu`, `qr` |
/// | `parallel_threshold` | | Jacobian columns evaluated in parallel from this size |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub atol: f64,
    pub rtol: f64,
    pub stol: f64,
    pub max_iterations: usize,
    pub line_search: LineSearch,
    pub linear_solver: LinearSolver,
    pub parallel_threshold: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            atol: 1e-14,
            rtol: 1e-14,
            stol: 1e-12,
            max_iterations: 50,
            line_search: LineSearch::L2,
            linear_solver: LinearSolver::Lu,
            parallel_threshold: 64,
        }
    }
}

impl SolverOptions {
    /// Build options from string parameters; unknown keys are logged and ignored
    pub fn from_parameters(parameters: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut options = Self::default();

        for (key, value) in parameters {
            match key.as_str() {
                "snes_atol" | "atol" => options.atol = parse_tolerance(key, value)?,
                "snes_rtol" | "rtol" => options.rtol = parse_tolerance(key, value)?,
                "snes_stol" | "stol" => options.stol = parse_tolerance(key, value)?,
                "snes_max_it" | "max_it" => {
                    options.max_iterations = parse_count(key, value)?;
                }
                "snes_linesearch_type" | "linesearch" => {
                    options.line_search = match value.as_str() {
                        "basic" | "none" => LineSearch::Basic,
                        "bt" | "backtracking" => LineSearch::Backtracking,
                        "l2" => LineSearch::L2,
                        other => {
                            return Err(invalid(key, &format!("unknown line search `{}`", other)));
                        }
                    }
                }
                "pc_type" | "linear_solver" => {
                    options.linear_solver = match value.as_str() {
                        "lu" => LinearSolver::Lu,
                        "qr" => LinearSolver::Qr,
                        other => {
                            return Err(invalid(key, &format!("unknown linear solver `{}`", other)));
                        }
                    }
                }
                "parallel_threshold" => {
                    options.parallel_threshold = parse_count(key, value)?;
                }
                _ => log::warn!("Ignoring unknown solver option `{}` = `{}`", key, value),
            }
        }

        Ok(options)
    }
}

fn parse_tolerance(key: &str, value: &str) -> Result<f64, ConfigError> {
    match value.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(parsed),
        _ => Err(invalid(key, &format!("`{}` is not a non-negative number", value))),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(invalid(key, &format!("`{}` is not a positive integer", value))),
    }
}

// =================================================================================================
// Nonlinear problem / solver seam
// =================================================================================================

/// A square system `F(x) = 0`
pub trait NonlinearProblem: Sync {
    fn dimension(&self) -> usize;

    fn residual(&self, x: &DVector<f64>) -> Result<DVector<f64>, ResidualError>;
}

/// Outcome of a converged nonlinear solve
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub solution: DVector<f64>,
    pub iterations: usize,
    pub residual_norm: f64,
}

/// Root finder used by every step and by the constrained projector
pub trait NonlinearSolver {
    fn solve(
        &self,
        problem: &dyn NonlinearProblem,
        initial_guess: DVector<f64>,
    ) -> Result<SolveReport, SolveError>;

    fn name(&self) -> &str;
}

// =================================================================================================
// Trajectory
// =================================================================================================

/// Diagnostics of one accepted step (step 0 is the initial condition)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub time: f64,
    /// Invariant values at the end of the step, in registration order
    pub invariant_values: Vec<f64>,
    /// `∫ w_0 · K w_0 dt` over the step (zero for conservative models)
    pub dissipation: f64,
    pub newton_iterations: usize,
    pub residual_norm: f64,
}

/// Result of an integration: states, diagnostics and metadata
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub time_points: Vec<f64>,
    pub states: Vec<DVector<f64>>,
    pub records: Vec<StepRecord>,
    pub invariant_names: Vec<String>,
    pub final_state: DVector<f64>,
    pub metadata: HashMap<String, String>,
}

impl Trajectory {
    pub fn new(invariant_names: Vec<String>, initial_state: DVector<f64>) -> Self {
        Self {
            time_points: Vec::new(),
            states: Vec::new(),
            records: Vec::new(),
            invariant_names,
            final_state: initial_state,
            metadata: HashMap::new(),
        }
    }

    /// Append an accepted state and its record
    pub fn push(&mut self, state: DVector<f64>, record: StepRecord) {
        self.time_points.push(record.time);
        self.final_state = state.clone();
        self.states.push(state);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Time series of one invariant
    pub fn invariant_series(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.invariant_names.iter().position(|n| n == name)?;
        Some(
            self.records
                .iter()
                .map(|record| record.invariant_values[index])
                .collect(),
        )
    }

    /// `max_n |I(t_n) - I(t_0)|`
    pub fn max_drift(&self, name: &str) -> Option<f64> {
        let series = self.invariant_series(name)?;
        let initial = *series.first()?;
        Some(
            series
                .iter()
                .map(|value| (value - initial).abs())
                .fold(0.0, f64::max),
        )
    }

    /// Dissipation estimate of every step (initial record excluded)
    pub fn dissipation_series(&self) -> Vec<f64> {
        self.records.iter().skip(1).map(|r| r.dissipation).collect()
    }
}

// =================================================================================================
// Integrator trait
// =================================================================================================

/// Stable entry point of a time integrator
pub trait Integrator {
    fn solve(
        &self,
        scenario: &Scenario,
        config: &IntegratorConfiguration,
    ) -> Result<Trajectory, IntegrationError>;

    fn name(&self) -> &str;
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_is_valid() {
        let config = IntegratorConfiguration::default();
        assert!(config.validate().is_ok());
        assert!(config.conservation);
        assert_eq!(config.initial_guess, InitialGuess::FromState);
    }

    #[test]
    fn test_invalid_timestep() {
        let config = IntegratorConfiguration::new(-0.1, 1.0, 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
        let config = IntegratorConfiguration::new(2.0, 1.0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_stages_rejected() {
        let config = IntegratorConfiguration::new(0.1, 1.0, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quadrature_override_below_mass_degree() {
        let config = IntegratorConfiguration::new(0.1, 1.0, 3).with_quadrature_degree("H", 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_time_steps_loop_count() {
        let config = IntegratorConfiguration::new(std::f64::consts::PI / 16.0, std::f64::consts::PI, 1);
        assert_eq!(config.time_steps(), 16);
        let config = IntegratorConfiguration::new(0.3, 1.0, 1);
        assert_eq!(config.time_steps(), 3);
        // T below h/2: no step
        assert_eq!(IntegratorConfiguration::new(0.1, 0.04, 1).time_steps(), 0);
        assert_eq!(IntegratorConfiguration::new(0.1, 0.06, 1).time_steps(), 1);
    }

    #[test]
    fn test_time_steps_matches_loop_condition() {
        let period = 2.0 * std::f64::consts::PI;
        for (h, t) in [(0.1, 1.0), (0.01, 0.1), (period / 32.0, period), (0.005, 0.5)] {
            let config = IntegratorConfiguration::new(h, t, 1);
            let mut expected = 0;
            while (expected as f64) * h < t - 0.5 * h {
                expected += 1;
            }
            assert_eq!(config.time_steps(), expected, "h = {}, T = {}", h, t);
        }
    }

    #[test]
    fn test_time_steps_for_tiny_timestep() {
        let config = IntegratorConfiguration::new(1e-12, 1.0, 1);
        let steps = config.time_steps();
        assert!((steps as f64 - 1e12).abs() <= 1.0, "{} steps", steps);
    }

    #[test]
    fn test_json_round_trip_keeps_defaults() {
        let config = IntegratorConfiguration::from_json(r#"{"timestep": 0.5, "total_duration": 2.0}"#)
            .unwrap();
        assert_eq!(config.stages, 1);
        assert_eq!(config.dissipation_tolerance, 1e-12);
        let text = config.to_json().unwrap();
        assert_eq!(IntegratorConfiguration::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_json_parse_error() {
        assert!(matches!(
            IntegratorConfiguration::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_solver_options_from_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert("snes_atol".to_string(), "1e-10".to_string());
        parameters.insert("max_it".to_string(), "7".to_string());
        parameters.insert("snes_linesearch_type".to_string(), "bt".to_string());
        parameters.insert("pc_type".to_string(), "qr".to_string());
        parameters.insert("mat_type".to_string(), "aij".to_string());

        let options = SolverOptions::from_parameters(&parameters).unwrap();
        assert_eq!(options.atol, 1e-10);
        assert_eq!(options.max_iterations, 7);
        assert_eq!(options.line_search, LineSearch::Backtracking);
        assert_eq!(options.linear_solver, LinearSolver::Qr);
    }

    #[test]
    fn test_solver_options_reject_bad_values() {
        let mut parameters = BTreeMap::new();
        parameters.insert("snes_rtol".to_string(), "tiny".to_string());
        assert!(SolverOptions::from_parameters(&parameters).is_err());

        let mut parameters = BTreeMap::new();
        parameters.insert("snes_linesearch_type".to_string(), "cp".to_string());
        assert!(SolverOptions::from_parameters(&parameters).is_err());
    }

    #[test]
    fn test_trajectory_series_and_drift() {
        let names = vec!["H".to_string(), "L".to_string()];
        let mut trajectory = Trajectory::new(names, DVector::zeros(1));
        for (step, h) in [1.0, 1.0 + 1e-12, 1.0 - 3e-12].iter().enumerate() {
            trajectory.push(
                DVector::from_element(1, step as f64),
                StepRecord {
                    step,
                    time: step as f64 * 0.1,
                    invariant_values: vec![*h, 2.0],
                    dissipation: 0.0,
                    newton_iterations: 1,
                    residual_norm: 0.0,
                },
            );
        }
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.invariant_series("L").unwrap(), vec![2.0; 3]);
        assert!((trajectory.max_drift("H").unwrap() - 3e-12).abs() < 1e-16);
        assert!(trajectory.invariant_series("missing").is_none());
        assert_eq!(trajectory.final_state[0], 2.0);
    }
}
