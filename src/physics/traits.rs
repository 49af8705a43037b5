//! Physical model trait
//!
//! A model supplies the semi-discrete ODE in skew-gradient form
//!
//! ```text
//! dz/dt = (B(z) - K(z)) ∇H(z)
//! ```
//!
//! where `B` is skew-symmetric (the structure operator), `K` is symmetric
//! positive semi-definite (the dissipation operator, absent for conservative
//! models) and `H` is the energy registered in the model's [`InvariantSet`].
//!
//! Operators are supplied as actions on vectors, never as assembled matrices.

use nalgebra::DVector;

use crate::physics::invariants::InvariantSet;

// =================================================================================================
// Physical Model Trait
// =================================================================================================

/// Trait for physical models
///
/// # Responsibility
///
/// Provides the equations (structure, dissipation, invariants). The time
/// integration is the integrator's job.
///
/// # Contract
///
/// - `apply_structure(z, ·)` is skew-symmetric for every `z`
/// - `apply_dissipation(z, ·)`, when present, is symmetric positive semi-definite
/// - every vector has length [`PhysicalModel::dimension`]
pub trait PhysicalModel: Send + Sync {
    /// Length of the state vector
    fn dimension(&self) -> usize;

    /// Registered invariants (energy, conserved, monitored)
    fn invariants(&self) -> &InvariantSet;

    /// `B(z) w`
    fn apply_structure(&self, state: &DVector<f64>, w: &DVector<f64>) -> DVector<f64>;

    /// `K(z) w`, or `None` for conservative models
    fn apply_dissipation(&self, _state: &DVector<f64>, _w: &DVector<f64>) -> Option<DVector<f64>> {
        None
    }

    /// Whether [`PhysicalModel::apply_dissipation`] is active
    fn is_dissipative(&self) -> bool {
        false
    }

    /// Default initial condition
    fn initial_state(&self) -> DVector<f64>;

    /// Name of the model (used to display and logging)
    fn name(&self) -> &str;

    /// Description of the model (option)
    fn description(&self) -> Option<&str> {
        None
    }

    /// Labels of the state components (used for export headers)
    fn component_names(&self) -> Vec<String> {
        (0..self.dimension()).map(|i| format!("z{}", i)).collect()
    }
}

// =================================================================================================
// Tests
// =================================================================================================
