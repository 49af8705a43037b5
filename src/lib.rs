//! avfet-rs: Auxiliary-Variable Finite Elements in Time
//!
//! Structure-preserving time integrators for systems written in
//! skew-gradient form
//!
//! ```text
//! du/dt = (B(u) - K(u)) ∇H(u)
//! ```
//!
//! with `B` skew-symmetric and `K` positive semi-definite. Each step solves a
//! continuous-Galerkin-in-time problem in which the gradients of the energy
//! and of every conserved invariant are replaced by auxiliary fields. The
//! energy then changes by exactly the logged dissipation and every conserved
//! invariant is preserved to solver tolerance, whatever its polynomial degree.
//!
//! # Architecture
//!
//! avfet-rs keeps two concerns apart:
//!
//! 1. **Physics**: models define the structure `B`, the dissipation `K` and
//!    the invariants as symbolic expressions ([`physics`], [`models`])
//! 2. **Numerics**: the time element, quadrature, residual assembly and the
//!    nonlinear solve ([`discretization`], [`scheme`], [`solver`])
//!
//! # Quick Start
//!
//! ```rust
//! use avfet_rs::prelude::*;
//! use std::f64::consts::PI;
//!
//! # fn main() -> Result<(), IntegrationError> {
//! // 1. Model and scenario
//! let scenario = Scenario::new(Box::new(KeplerProblem::new()));
//!
//! // 2. Four steps of h = 2π/64 with s = 1
//! let timestep = 2.0 * PI / 64.0;
//! let config = IntegratorConfiguration::new(timestep, 4.0 * timestep, 1);
//!
//! // 3. Integrate
//! let trajectory = AvfetIntegrator::new().solve(&scenario, &config)?;
//!
//! // 4. Energy and Runge-Lenz vector are preserved
//! assert_eq!(trajectory.len(), 5);
//! assert!(trajectory.max_drift("Hamiltonian").unwrap() < 1e-10);
//! assert!(trajectory.max_drift("Runge-Lenz 1").unwrap() < 1e-10);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`physics`]: Symbolic expressions, invariants and the model trait
//! - [`discretization`]: Gauss quadrature and Lagrange time elements
//! - [`scheme`]: Auxiliary fields, skew correction, residual, stepper, projector
//! - [`solver`]: Configuration, Newton solver, trajectories
//! - [`models`]: Kepler problem and viscous Burgers equation
//! - [`output`]: Streaming sinks, CSV export and plots
//! - [`error`]: Error types of every layer

pub mod error;

// Core modules
pub mod discretization;
pub mod physics;
pub mod scheme;
pub mod solver;

pub mod models;
pub mod output;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use avfet_rs::prelude::*;
    //! ```
    pub use crate::error::{ConfigError, FailureCause, IntegrationError};
    pub use crate::models::{KeplerProblem, ViscousBurgers};
    pub use crate::output::{LogSink, NullSink};
    pub use crate::physics::{Expr, InvariantSet, PhysicalModel, Quadrature};
    pub use crate::scheme::{AvfetIntegrator, ConstrainedProjector, TimeStepper};
    pub use crate::solver::{
        InitialGuess, Integrator, IntegratorConfiguration, Scenario, Trajectory,
    };
}
