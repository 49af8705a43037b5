//! Physical models
//!
//! This module provides the model-side API of the integrator:
//!
//! - **[`expr`]**: symbolic scalar expressions with differentiation and
//!   checked evaluation
//! - **[`invariants`]**: registered invariants (energy, conserved, monitored)
//! - **[`traits`]**: the [`PhysicalModel`] trait
//!
//! # Architecture
//!
//! Physical models are **separate from the integrator**:
//! - The model provides the **equations**: structure operator `B`,
//!   optional dissipation `K`, and the invariants
//! - The integrator provides the **method**: auxiliary fields, skew
//!   correction, residual assembly and time stepping
//!
//! # Implementing a New Physical Model
//!
//! ```rust
//! use avfet_rs::physics::{PhysicalModel, InvariantSet, Quadrature};
//! use avfet_rs::physics::expr::Expr;
//! use nalgebra::DVector;
//!
//! struct Pendulum {
//!     invariants: InvariantSet,
//! }
//!
//! impl Pendulum {
//!     fn new() -> Self {
//!         let p = Expr::var(0);
//!         let q = Expr::var(1);
//!         // H = p²/2 + q²/2 (small-angle)
//!         let energy = 0.5 * p.clone() * p + 0.5 * q.clone() * q;
//!         let invariants = InvariantSet::builder(2)
//!             .energy("H", energy, Quadrature::Polynomial)
//!             .build()
//!             .unwrap();
//!         Self { invariants }
//!     }
//! }
//!
//! impl PhysicalModel for Pendulum {
//!     fn dimension(&self) -> usize { 2 }
//!     fn invariants(&self) -> &InvariantSet { &self.invariants }
//!     fn apply_structure(&self, _z: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
//!         DVector::from_vec(vec![-w[1], w[0]])
//!     }
//!     fn initial_state(&self) -> DVector<f64> { DVector::from_vec(vec![0.0, 1.0]) }
//!     fn name(&self) -> &str { "Pendulum" }
//! }
//! # let _ = Pendulum::new();
//! ```
//!
//! # Available Models
//!
//! See [`crate::models`]: Kepler two-body problem and viscous Burgers.

// module declaration
pub mod expr;
pub mod invariants;
pub mod traits;

// re-export commonly used types for convenience
pub use expr::Expr;
pub use invariants::{Invariant, InvariantRole, InvariantSet, InvariantSetBuilder, Quadrature};
pub use traits::PhysicalModel;
