//! Auxiliary-variable finite element in time (AV-FET) scheme
//!
//! # Module Organization
//!
//! - **`auxiliary`**: auxiliary fields, enlarged-state layout, defining equations
//! - **`correction`**: skew-symmetric correction `ΔB` for conserved invariants
//! - **`residual`**: per-step residual with per-term quadrature
//! - **`stepper`**: step state machine, time loop, [`AvfetIntegrator`]
//! - **`projector`**: saddle-point projection onto linear constraints
//!
//! # One step
//!
//! ```text
//! z_n ──► initial guess ──► Newton on F(c, w_0, w_1..w_m) = 0 ──► z_{n+1} = c_s
//!                                   │
//!                 at every quadrature node:
//!                 F = (B - K) w_0,  λ = Gram⁻¹ ⟨w_k, F⟩,  drift = F - ΔB w_0
//! ```

pub mod auxiliary;
pub mod correction;
pub mod projector;
pub mod residual;
pub mod stepper;

pub use auxiliary::{AuxiliaryField, AuxiliaryFieldModel};
pub use correction::{SkewCorrection, SkewCorrectionSolver};
pub use projector::{ConstrainedProjector, Projection};
pub use residual::{ResidualAssembler, StepResidual, EVOLUTION_TERM, MASS_TERM};
pub use stepper::{AvfetIntegrator, StepOutcome, StepperPhase, TimeStepper};
