//! Physical models in skew-gradient form
//!
//! All models implement the [`PhysicalModel`](crate::physics::PhysicalModel) trait.
//! The integrator calls `apply_structure` / `apply_dissipation` at every
//! quadrature node: models are responsible for the physics (structure,
//! dissipation, invariants), the integrator for the time discretization.
//!
//! # Available Models
//!
//! ## [`KeplerProblem`]: conservative ODE
//!
//! Planar two-body problem. Energy and both Runge–Lenz components are
//! preserved exactly; non-polynomial invariants use exact quadrature. The
//! [`kepler::convergence_study`] sweep measures the terminal error over one
//! period.
//!
//! ## [`ViscousBurgers`]: dissipative PDE
//!
//! Periodic Burgers equation on a uniform grid. Mass is conserved exactly,
//! the energy decays by the logged dissipation estimate.

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod burgers;
pub mod kepler;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use burgers::ViscousBurgers;
pub use kepler::{ConvergencePoint, KeplerProblem, convergence_study};
