//! Registered invariants of a physical model
//!
//! An [`InvariantSet`] holds the scalar functionals the integrator must respect:
//!
//! - exactly one **energy** (drives the base auxiliary field `w_0`; conserved
//!   for conservative models, dissipated at the logged rate otherwise)
//! - any number of **conserved** invariants (each gets its own auxiliary
//!   field and is preserved exactly by the skew correction)
//! - any number of **monitored** invariants (evaluated and logged only)
//!
//! Gradients are derived symbolically at registration time.
//!
//! ```rust
//! use avfet_rs::physics::expr::Expr;
//! use avfet_rs::physics::{InvariantSet, Quadrature};
//!
//! let x = Expr::var(0);
//! let y = Expr::var(1);
//! let invariants = InvariantSet::builder(2)
//!     .energy("H", 0.5 * (x.clone() * x.clone() + y.clone() * y.clone()), Quadrature::Polynomial)
//!     .monitored("x", x)
//!     .build()
//!     .unwrap();
//! assert_eq!(invariants.len(), 2);
//! assert_eq!(invariants.conserved_count(), 0);
//! ```

use std::collections::HashSet;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EvalError};
use crate::physics::expr::Expr;

/// Role of an invariant in the scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantRole {
    Energy,
    Conserved,
    Monitored,
}

/// Quadrature accuracy used for the invariant's gradient term
///
/// - `Polynomial`: degree `2s`, exact for quadratic invariants
/// - `Exact`: high fixed degree, for non-polynomial invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrature {
    Polynomial,
    Exact,
}

/// Degree used by [`Quadrature::Exact`]
pub const EXACT_QUADRATURE_DEGREE: usize = 25;

impl Quadrature {
    /// Quadrature degree for a scheme with `stages` degrees of freedom per field
    pub fn degree(&self, stages: usize) -> usize {
        match self {
            Quadrature::Polynomial => 2 * stages,
            Quadrature::Exact => EXACT_QUADRATURE_DEGREE,
        }
    }
}

/// A scalar functional `I(z)` with its symbolic gradient
#[derive(Debug, Clone)]
pub struct Invariant {
    name: String,
    role: InvariantRole,
    expression: Expr,
    gradient: Vec<Expr>,
    quadrature: Quadrature,
}

impl Invariant {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> InvariantRole {
        self.role
    }

    pub fn quadrature(&self) -> Quadrature {
        self.quadrature
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    /// Value `I(z)`
    pub fn value(&self, state: &DVector<f64>) -> Result<f64, EvalError> {
        self.expression.eval(state.as_slice())
    }

    /// Gradient `∇I(z)`
    pub fn gradient_at(&self, state: &DVector<f64>) -> Result<DVector<f64>, EvalError> {
        let mut gradient = DVector::zeros(self.gradient.len());
        for (component, derivative) in self.gradient.iter().enumerate() {
            gradient[component] = derivative.eval(state.as_slice())?;
        }
        Ok(gradient)
    }
}

// =================================================================================================
// Invariant set
// =================================================================================================

#[derive(Debug, Clone)]
pub struct InvariantSet {
    dimension: usize,
    invariants: Vec<Invariant>,
    energy: usize,
}

impl InvariantSet {
    /// Start registering invariants for a state of dimension `dimension`
    pub fn builder(dimension: usize) -> InvariantSetBuilder {
        InvariantSetBuilder {
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invariant> {
        self.invariants.iter()
    }

    pub fn as_slice(&self) -> &[Invariant] {
        &self.invariants
    }

    pub fn get(&self, name: &str) -> Option<&Invariant> {
        self.invariants.iter().find(|inv| inv.name == name)
    }

    /// The distinguished energy
    pub fn energy(&self) -> &Invariant {
        &self.invariants[self.energy]
    }

    /// Conserved invariants in registration order
    pub fn conserved(&self) -> impl Iterator<Item = &Invariant> {
        self.invariants
            .iter()
            .filter(|inv| inv.role == InvariantRole::Conserved)
    }

    pub fn conserved_count(&self) -> usize {
        self.conserved().count()
    }

    /// Names in registration order (the order of [`InvariantSet::values`])
    pub fn names(&self) -> Vec<String> {
        self.invariants.iter().map(|inv| inv.name.clone()).collect()
    }

    /// Evaluate every invariant at `state`, in registration order
    pub fn values(&self, state: &DVector<f64>) -> Result<Vec<f64>, EvalError> {
        self.invariants.iter().map(|inv| inv.value(state)).collect()
    }
}

// =================================================================================================
// Builder
// =================================================================================================

pub struct InvariantSetBuilder {
    dimension: usize,
    entries: Vec<(String, InvariantRole, Expr, Quadrature)>,
}

impl InvariantSetBuilder {
    pub fn energy(mut self, name: &str, expression: Expr, quadrature: Quadrature) -> Self {
        self.entries
            .push((name.to_string(), InvariantRole::Energy, expression, quadrature));
        self
    }

    pub fn conserved(mut self, name: &str, expression: Expr, quadrature: Quadrature) -> Self {
        self.entries
            .push((name.to_string(), InvariantRole::Conserved, expression, quadrature));
        self
    }

    pub fn monitored(mut self, name: &str, expression: Expr) -> Self {
        self.entries.push((
            name.to_string(),
            InvariantRole::Monitored,
            expression,
            Quadrature::Exact,
        ));
        self
    }

    /// Validate and derive gradients
    ///
    /// # Errors
    ///
    /// - not exactly one energy
    /// - duplicate names
    /// - an expression referencing a variable outside the state
    pub fn build(self) -> Result<InvariantSet, ConfigError> {
        let energies: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.1 == InvariantRole::Energy)
            .map(|(index, _)| index)
            .collect();

        if energies.len() != 1 {
            return Err(ConfigError::EnergyCount { found: energies.len() });
        }

        let mut seen = HashSet::new();
        for (name, _, expression, _) in &self.entries {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateInvariant(name.clone()));
            }
            if let Some(index) = expression.max_variable()
                && index >= self.dimension
            {
                return Err(ConfigError::VariableOutOfState {
                    name: name.clone(),
                    index,
                    dimension: self.dimension,
                });
            }
        }

        let dimension = self.dimension;
        let invariants = self
            .entries
            .into_iter()
            .map(|(name, role, expression, quadrature)| {
                let gradient = expression.gradient(dimension);
                Invariant {
                    name,
                    role,
                    expression,
                    gradient,
                    quadrature,
                }
            })
            .collect();

        Ok(InvariantSet {
            dimension,
            invariants,
            energy: energies[0],
        })
    }
}

// =================================================================================================
// Tests
// =================================================================================================
