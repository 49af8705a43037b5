//! Auxiliary fields and the enlarged state
//!
//! # Layout
//!
//! For a state of dimension `d` and `s` stages, the unknown vector of one
//! step is the concatenation of `1 + 1 + m` blocks of `s · d` entries:
//!
//! ```text
//! [ c_1 … c_s | w_0 coefficients | w_1 coefficients | … | w_m coefficients ]
//!   state        energy gradient    conserved gradients
//! ```
//!
//! Within a block, coefficient `i` of component `a` sits at `i · d + a`.
//! The residual uses the same layout (evolution rows first, then one block
//! of defining equations per field).
//!
//! # Defining equations
//!
//! Each field `w_f` is the L²-projection in time of the gradient of its
//! invariant onto discontinuous polynomials of degree `s - 1`:
//!
//! ```text
//! ∫ w_f φ_i dt - ∫ ∇I_f(u(t)) φ_i dt = 0     for every test function φ_i
//! ```

use std::ops::Range;

use nalgebra::DVector;

use crate::discretization::Tabulation;
use crate::error::{ConfigError, EvalError, ResidualError};
use crate::physics::invariants::{Invariant, InvariantRole, InvariantSet};
use crate::solver::InitialGuess;

/// One auxiliary field and the invariant it represents
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryField {
    /// Term id (the invariant name)
    pub name: String,
    /// Index into the [`InvariantSet`]
    pub invariant: usize,
}

/// Auxiliary-field model of one scheme: layout, projections, initial guess
#[derive(Debug, Clone)]
pub struct AuxiliaryFieldModel<'a> {
    invariants: &'a InvariantSet,
    fields: Vec<AuxiliaryField>,
    stages: usize,
    dimension: usize,
}

impl<'a> AuxiliaryFieldModel<'a> {
    /// Allocate `w_0` plus one field per conserved invariant (when `conservation`)
    pub fn new(
        invariants: &'a InvariantSet,
        stages: usize,
        conservation: bool,
    ) -> Result<Self, ConfigError> {
        if stages == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "stages".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let mut fields = Vec::new();
        for (index, invariant) in invariants.iter().enumerate() {
            if invariant.role() == InvariantRole::Energy {
                fields.insert(
                    0,
                    AuxiliaryField {
                        name: invariant.name().to_string(),
                        invariant: index,
                    },
                );
            } else if conservation && invariant.role() == InvariantRole::Conserved {
                fields.push(AuxiliaryField {
                    name: invariant.name().to_string(),
                    invariant: index,
                });
            }
        }

        if conservation && fields.len() == 1 {
            return Err(ConfigError::NoConservedInvariants);
        }

        Ok(Self {
            invariants,
            fields,
            stages,
            dimension: invariants.dimension(),
        })
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn fields(&self) -> &[AuxiliaryField] {
        &self.fields
    }

    /// `1 + m`
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of corrected invariants `m`
    pub fn conserved_count(&self) -> usize {
        self.fields.len() - 1
    }

    pub fn invariant(&self, field: usize) -> &Invariant {
        &self.invariants.as_slice()[self.fields[field].invariant]
    }

    fn block_len(&self) -> usize {
        self.stages * self.dimension
    }

    /// Length of the enlarged state
    pub fn unknowns(&self) -> usize {
        (1 + self.field_count()) * self.block_len()
    }

    pub fn state_block(&self) -> Range<usize> {
        0..self.block_len()
    }

    pub fn field_block(&self, field: usize) -> Range<usize> {
        let start = (1 + field) * self.block_len();
        start..start + self.block_len()
    }

    // =============================================================================================
    // Evaluation on the time element
    // =============================================================================================

    /// `u(τ) = z_n ℓ_0(τ) + Σ_j c_j ℓ_j(τ)` from a row of trial values
    pub fn state_at(&self, previous: &DVector<f64>, x: &DVector<f64>, trial: &[f64]) -> DVector<f64> {
        let d = self.dimension;
        let mut value = previous * trial[0];
        for j in 1..=self.stages {
            let start = (j - 1) * d;
            value.axpy(trial[j], &x.rows(start, d), 1.0);
        }
        value
    }

    /// Field `field` at a node, from a row of test-basis values
    pub fn field_at(&self, x: &DVector<f64>, field: usize, test: &[f64]) -> DVector<f64> {
        let d = self.dimension;
        let block = self.field_block(field).start;
        let mut value = DVector::zeros(d);
        for (i, phi) in test.iter().enumerate() {
            value.axpy(*phi, &x.rows(block + i * d, d), 1.0);
        }
        value
    }

    /// All conserved fields at a node
    pub fn conserved_at(&self, x: &DVector<f64>, test: &[f64]) -> Vec<DVector<f64>> {
        (1..self.field_count())
            .map(|field| self.field_at(x, field, test))
            .collect()
    }

    /// Final state `u(t_n + h) = c_s`
    pub fn end_state(&self, x: &DVector<f64>) -> DVector<f64> {
        let d = self.dimension;
        x.rows((self.stages - 1) * d, d).into_owned()
    }

    // =============================================================================================
    // Defining equations
    // =============================================================================================

    /// Add the weak projection residual of every field into `residual`
    ///
    /// `mass` integrates `∫ w_f φ_i`; `rules[f]` integrates the gradient term
    /// of field `f` with that invariant's own accuracy.
    pub fn assemble_defining_equations(
        &self,
        previous: &DVector<f64>,
        x: &DVector<f64>,
        mass: &Tabulation,
        rules: &[&Tabulation],
        residual: &mut DVector<f64>,
    ) -> Result<(), ResidualError> {
        let d = self.dimension;

        for (field, tab) in rules.iter().enumerate().take(self.field_count()) {
            let block = self.field_block(field).start;

            for q in 0..mass.len() {
                let value = self.field_at(x, field, &mass.test[q]);
                for (i, phi) in mass.test[q].iter().enumerate() {
                    let mut rows = residual.rows_mut(block + i * d, d);
                    rows.axpy(mass.weights[q] * phi, &value, 1.0);
                }
            }

            let invariant = self.invariant(field);
            for q in 0..tab.len() {
                let u = self.state_at(previous, x, &tab.trial[q]);
                let gradient = invariant
                    .gradient_at(&u)
                    .map_err(|source| ResidualError::Evaluation {
                        term: self.fields[field].name.clone(),
                        source,
                    })?;
                for (i, phi) in tab.test[q].iter().enumerate() {
                    let mut rows = residual.rows_mut(block + i * d, d);
                    rows.axpy(-tab.weights[q] * phi, &gradient, 1.0);
                }
            }
        }

        Ok(())
    }

    // =============================================================================================
    // Initial guess
    // =============================================================================================

    /// Seed for the Newton iteration of a step starting at `previous`
    ///
    /// State coefficients always start at `previous`. `prior` is the converged
    /// solution of the previous step; under [`InitialGuess::PreviousSolution`]
    /// its auxiliary fields replace the gradients at `previous`.
    pub fn initial_guess(
        &self,
        previous: &DVector<f64>,
        policy: InitialGuess,
        prior: Option<&DVector<f64>>,
    ) -> Result<DVector<f64>, EvalError> {
        let d = self.dimension;
        let mut guess = DVector::zeros(self.unknowns());

        for j in 0..self.stages {
            guess.rows_mut(j * d, d).copy_from(previous);
        }

        if let (InitialGuess::PreviousSolution, Some(prior_solution)) = (policy, prior)
            && prior_solution.len() == guess.len()
        {
            let start = self.stages * d;
            let len = guess.len() - start;
            guess
                .rows_mut(start, len)
                .copy_from(&prior_solution.rows(start, len));
            return Ok(guess);
        }

        for field in 0..self.field_count() {
            let gradient = self.invariant(field).gradient_at(previous)?;
            let block = self.field_block(field).start;
            for i in 0..self.stages {
                guess.rows_mut(block + i * d, d).copy_from(&gradient);
            }
        }
        Ok(guess)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
