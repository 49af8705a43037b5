//! Kepler two-body problem
//!
//! # Mathematical Background
//!
//! State `z = (p_0, p_1, q_0, q_1)` (momentum, then position) with the
//! canonical Poisson structure
//!
//! ```text
//! dz/dt = B ∇H(z),     B = [[0, -I], [I, 0]]
//! H(p, q) = ½ |p|² - 1 / |q|
//! ```
//!
//! ## Invariants
//!
//! | name               | expression                    | role      |
//! |--------------------|-------------------------------|-----------|
//! | `Hamiltonian`      | `½ |p|² - 1/|q|`              | energy    |
//! | `Angular momentum` | `L = p_1 q_0 - p_0 q_1`       | monitored |
//! | `Runge-Lenz 1`     | `L p_1 - q_0 / |q|`           | conserved |
//! | `Runge-Lenz 2`     | `-L p_0 - q_1 / |q|`          | conserved |
//!
//! All three non-quadratic invariants use [`Quadrature::Exact`].
//! The angular momentum is quadratic and is preserved by the scheme without
//! a correction field of its own.
//!
//! ## Reference orbit
//!
//! `p = (0, 2)`, `q = (0.4, 0)` gives `H = -½`, hence semi-major axis 1 and
//! period `2π`. After one period the exact solution returns to `q = (0.4, 0)`,
//! which makes `|q(2π) - (0.4, 0)|` a direct measure of the global error.

use std::f64::consts::PI;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;
use crate::physics::expr::{Expr, sqrt};
use crate::physics::invariants::{InvariantSet, Quadrature};
use crate::physics::traits::PhysicalModel;
use crate::solver::{Integrator, IntegratorConfiguration, Scenario};
use crate::scheme::AvfetIntegrator;

/// Position of the reference orbit at `t = 0` and after every period
pub const PERIAPSIS: [f64; 2] = [0.4, 0.0];

/// Kepler problem in the plane
#[derive(Debug, Clone)]
pub struct KeplerProblem {
    invariants: InvariantSet,
    initial: DVector<f64>,
}

impl KeplerProblem {
    /// Reference orbit `p = (0, 2)`, `q = (0.4, 0)`
    pub fn new() -> Self {
        Self::with_initial_state(DVector::from_vec(vec![0.0, 2.0, PERIAPSIS[0], PERIAPSIS[1]]))
    }

    /// Custom initial state `(p_0, p_1, q_0, q_1)`
    pub fn with_initial_state(initial: DVector<f64>) -> Self {
        Self {
            invariants: kepler_invariants(),
            initial,
        }
    }

    /// Orbital period `2π a^{3/2}` with `a = -1 / (2H)`, for bound orbits
    pub fn period(&self) -> Option<f64> {
        let energy = self.invariants.energy().value(&self.initial).ok()?;
        if energy >= 0.0 {
            return None;
        }
        let semi_major_axis = -0.5 / energy;
        Some(2.0 * PI * semi_major_axis.powf(1.5))
    }

    /// Distance of the position in `state` from the periapsis of the reference orbit
    pub fn terminal_error(state: &DVector<f64>) -> f64 {
        let dq0 = state[2] - PERIAPSIS[0];
        let dq1 = state[3] - PERIAPSIS[1];
        (dq0 * dq0 + dq1 * dq1).sqrt()
    }
}

impl Default for KeplerProblem {
    fn default() -> Self {
        Self::new()
    }
}

fn kepler_invariants() -> InvariantSet {
    let p0 = Expr::var(0);
    let p1 = Expr::var(1);
    let q0 = Expr::var(2);
    let q1 = Expr::var(3);

    let radius = sqrt(q0.clone() * q0.clone() + q1.clone() * q1.clone());
    let hamiltonian = 0.5 * (p0.clone() * p0.clone() + p1.clone() * p1.clone()) - 1.0 / radius.clone();
    let angular = p1.clone() * q0.clone() - p0.clone() * q1.clone();
    let lenz_1 = angular.clone() * p1 - q0 / radius.clone();
    let lenz_2 = -(angular.clone() * p0) - q1 / radius;

    InvariantSet::builder(4)
        .energy("Hamiltonian", hamiltonian, Quadrature::Exact)
        .monitored("Angular momentum", angular)
        .conserved("Runge-Lenz 1", lenz_1, Quadrature::Exact)
        .conserved("Runge-Lenz 2", lenz_2, Quadrature::Exact)
        .build()
        .expect("KeplerProblem: static invariant registration must be valid")
}

impl PhysicalModel for KeplerProblem {
    fn dimension(&self) -> usize {
        4
    }

    fn invariants(&self) -> &InvariantSet {
        &self.invariants
    }

    fn apply_structure(&self, _state: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![-w[2], -w[3], w[0], w[1]])
    }

    fn initial_state(&self) -> DVector<f64> {
        self.initial.clone()
    }

    fn name(&self) -> &str {
        "Kepler"
    }

    fn description(&self) -> Option<&str> {
        Some("Planar two-body problem with Runge-Lenz vector conservation")
    }

    fn component_names(&self) -> Vec<String> {
        ["p0", "p1", "q0", "q1"].iter().map(|s| s.to_string()).collect()
    }
}

// =================================================================================================
// Convergence study
// =================================================================================================

/// Terminal error of one run of the study
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    pub stages: usize,
    pub timestep: f64,
    pub error: f64,
}

/// `2π · 2^{-exponent}`
pub fn timestep_for(exponent: i32) -> f64 {
    2.0 * PI * 2f64.powi(-exponent)
}

/// Integrate the reference orbit over one period for every `(stages, 2π·2^{-k})`
///
/// `configure` may adjust each configuration (solver options, quadrature)
/// before the run.
pub fn convergence_study<F>(
    stages: &[usize],
    exponents: &[i32],
    configure: F,
) -> Result<Vec<ConvergencePoint>, IntegrationError>
where
    F: Fn(IntegratorConfiguration) -> IntegratorConfiguration,
{
    let scenario = Scenario::new(Box::new(KeplerProblem::new()));
    let integrator = AvfetIntegrator::new();
    let mut points = Vec::with_capacity(stages.len() * exponents.len());

    for &s in stages {
        for &exponent in exponents {
            let timestep = timestep_for(exponent);
            let config = configure(IntegratorConfiguration::new(timestep, 2.0 * PI, s));
            let trajectory = integrator.solve(&scenario, &config)?;
            let error = KeplerProblem::terminal_error(&trajectory.final_state);
            log::info!("dt = {:.6e}, stages = {}: error = {:.6e}", timestep, s, error);
            points.push(ConvergencePoint {
                stages: s,
                timestep,
                error,
            });
        }
    }

    Ok(points)
}

/// Observed orders `log2(e_k / e_{k+1})` between consecutive halvings
pub fn observed_orders(points: &[ConvergencePoint]) -> Vec<f64> {
    points
        .windows(2)
        .filter(|pair| pair[0].stages == pair[1].stages)
        .map(|pair| (pair[0].error / pair[1].error).log2() / (pair[0].timestep / pair[1].timestep).log2())
        .collect()
}

// =================================================================================================
// Tests
// =================================================================================================
