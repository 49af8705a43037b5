//! Error types
//!
//! One enum per layer, converted upward with `#[from]`:
//!
//! ```text
//! EvalError ──┐
//!             ├──► ResidualError ──► SolveError ──┐
//! CorrectionError ┘                               ├──► IntegrationError
//! ConfigError ────────────────────────────────────┤
//! OutputError ────────────────────────────────────┘
//! ```
//!
//! A failed step is reported through [`IntegrationError::Step`], which carries
//! the step index, the simulation time and a [`FailureCause`] classification
//! so that callers can react without matching on nested sources.

use thiserror::Error;

// =================================================================================================
// Configuration
// =================================================================================================

/// Invalid configuration, invariant registration or model setup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Exactly one energy invariant is required, found {found}")]
    EnergyCount { found: usize },

    #[error("Duplicate invariant name `{0}`")]
    DuplicateInvariant(String),

    #[error("Invariant `{name}` references variable {index} but the state has dimension {dimension}")]
    VariableOutOfState {
        name: String,
        index: usize,
        dimension: usize,
    },

    #[error("Conservation correction is enabled but no conserved invariant is registered")]
    NoConservedInvariants,

    #[error("Unknown quadrature term `{0}`")]
    UnknownTerm(String),

    #[error("Initial state has dimension {found}, model expects {expected}")]
    StateDimension { expected: usize, found: usize },

    #[error("Could not parse configuration: {0}")]
    Parse(String),
}

// =================================================================================================
// Expression evaluation
// =================================================================================================

/// Physical invalidity found while evaluating an expression.
///
/// Evaluating an invariant or its gradient outside its domain is always an
/// error, never a silent NaN.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Logarithm of non-positive value {0:e}")]
    NonPositiveLogArgument(f64),

    #[error("Square root of negative value {0:e}")]
    NegativeSqrtArgument(f64),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Non-finite value produced")]
    NonFinite,

    #[error("Variable index {index} out of range for state of dimension {dimension}")]
    VariableOutOfRange { index: usize, dimension: usize },
}

// =================================================================================================
// Skew correction
// =================================================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrectionError {
    /// The energy gradient field vanished at a quadrature node.
    #[error("Base auxiliary field is degenerate (norm {norm:e})")]
    DegenerateBaseField { norm: f64 },

    /// The Gram system of the conserved gradients is (numerically) singular.
    #[error("Correction system is singular (condition estimate {condition:e})")]
    Singular { condition: f64 },

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

// =================================================================================================
// Residual assembly
// =================================================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResidualError {
    #[error("Physical invalidity in `{term}`: {source}")]
    Evaluation {
        term: String,
        #[source]
        source: EvalError,
    },

    #[error(transparent)]
    Correction(#[from] CorrectionError),

    #[error("Enlarged state has length {found}, expected {expected}")]
    Layout { expected: usize, found: usize },
}

// =================================================================================================
// Nonlinear solve
// =================================================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("Nonlinear solve did not converge after {iterations} iterations (residual: {residual:.2e})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("Jacobian is singular at iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error(transparent)]
    Residual(#[from] ResidualError),
}

// =================================================================================================
// Output
// =================================================================================================

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Plotting error: {0}")]
    Plot(String),
}

// =================================================================================================
// Integration
// =================================================================================================

/// Classification of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    CorrectionSingularity,
    NonConvergence,
    PhysicalInvalidity,
    LinearSolve,
}

impl FailureCause {
    /// Classify a solver failure.
    pub fn of(error: &SolveError) -> Self {
        match error {
            SolveError::NonConvergence { .. } => FailureCause::NonConvergence,
            SolveError::SingularJacobian { .. } => FailureCause::LinearSolve,
            SolveError::Residual(ResidualError::Correction(_)) => FailureCause::CorrectionSingularity,
            SolveError::Residual(ResidualError::Evaluation { .. }) => FailureCause::PhysicalInvalidity,
            SolveError::Residual(ResidualError::Layout { .. }) => FailureCause::LinearSolve,
        }
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureCause::CorrectionSingularity => "correction singularity",
            FailureCause::NonConvergence => "non-convergence",
            FailureCause::PhysicalInvalidity => "physical invalidity",
            FailureCause::LinearSolve => "linear solve failure",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Step {step} (t = {time:.6}) failed: {cause}: {source}")]
    Step {
        step: usize,
        time: f64,
        cause: FailureCause,
        #[source]
        source: SolveError,
    },

    #[error("Step {step} (t = {time:.6}) produced negative dissipation {value:e}")]
    NegativeDissipation { step: usize, time: f64, value: f64 },

    #[error("Invariant evaluation failed after step {step}: {source}")]
    Diagnostics {
        step: usize,
        #[source]
        source: EvalError,
    },

    #[error("Integrator halted after a failed step; restart from an accepted state")]
    Halted,

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl IntegrationError {
    /// Step index at which the failure occurred, if any.
    pub fn step(&self) -> Option<usize> {
        match self {
            IntegrationError::Step { step, .. }
            | IntegrationError::NegativeDissipation { step, .. }
            | IntegrationError::Diagnostics { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Failure classification for solver failures.
    pub fn cause(&self) -> Option<FailureCause> {
        match self {
            IntegrationError::Step { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

/// Convenience alias for integration results.
pub type IntegrationResult<T> = Result<T, IntegrationError>;
