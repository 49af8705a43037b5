//! Integrator configuration, scenarios and the nonlinear solver
//!
//! # Core Concepts
//!
//! ## The Architecture (WHAT vs HOW)
//!
//! 1. **Scenario** ([`Scenario`]) - WHAT to integrate
//!    - Physical model (structure, dissipation, invariants)
//!    - Initial state
//!
//! 2. **Configuration** ([`IntegratorConfiguration`]) - HOW to integrate
//!    - Step size, duration, stages
//!    - Quadrature overrides, solver options, initial-guess policy
//!
//! 3. **Integrator** ([`Integrator`] trait) - The method
//!    - Implemented by [`crate::scheme::AvfetIntegrator`]
//!    - Returns a [`Trajectory`] with per-step diagnostics
//!
//! Each step reduces to one square nonlinear system, handed to a
//! [`NonlinearSolver`] (by default the damped [`NewtonSolver`]).
//!
//! # Module Organization
//!
//! - **`traits`**: configuration, options, solver seam, trajectory
//! - **`newton`**: damped Newton with finite-difference Jacobian
//! - **`scenario`**: model + initial state
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Physical Model │  (B, K, invariants)
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ Scenario        │ ← WHAT to integrate
//! │ (model + z_0)   │
//! └────────┬────────┘
//!          │
//! ┌────────▼──────────────────┐
//! │ IntegratorConfiguration   │ ← HOW to integrate
//! └────────┬──────────────────┘
//!          │
//! ┌────────▼────────┐     ┌──────────────────┐
//! │ TimeStepper     │────►│ NonlinearSolver  │ one solve per step
//! └────────┬────────┘     └──────────────────┘
//!          │
//! ┌────────▼────────────┐
//! │ Trajectory          │ ← states + invariant log
//! └─────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns a typed error from [`crate::error`]:
//!
//! ```rust,ignore
//! match integrator.solve(&scenario, &config) {
//!     Ok(trajectory) => println!("{} states", trajectory.len()),
//!     Err(e) => eprintln!("integration stopped at step {:?}: {}", e.step(), e),
//! }
//! ```

// =================================================================================================
// Module Declarations
// =================================================================================================
mod newton;
mod scenario;
mod traits;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use newton::NewtonSolver;
pub use scenario::Scenario;
pub use traits::{
    InitialGuess, Integrator, IntegratorConfiguration, LineSearch, LinearSolver,
    NonlinearProblem, NonlinearSolver, SolveReport, SolverOptions, StepRecord, Trajectory,
};

// =================================================================================================
// Helper Functions
// =================================================================================================

use nalgebra::DVector;

use crate::error::{EvalError, ResidualError, SolveError};

/// Validate an accepted state for numerical issues
///
/// A converged solve can still hand back NaN or Inf when the residual
/// itself overflowed; those states must never enter the trajectory.
///
/// # Example
///
/// ```rust,ignore
/// validate_state(&state)?;
/// ```
pub(crate) fn validate_state(state: &DVector<f64>) -> Result<(), SolveError> {
    if state.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SolveError::Residual(ResidualError::Evaluation {
            term: "state".to_string(),
            source: EvalError::NonFinite,
        }))
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_state() {
        assert!(validate_state(&DVector::from_vec(vec![1.0, -2.0])).is_ok());
        assert!(validate_state(&DVector::from_vec(vec![1.0, f64::NAN])).is_err());
        assert!(validate_state(&DVector::from_vec(vec![f64::INFINITY])).is_err());
    }
}
