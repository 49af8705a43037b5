//! Residual of one AV-FET step
//!
//! # Terms
//!
//! Tested against every discontinuous test function `φ_i` on `[t_n, t_n + h]`:
//!
//! 1. **Evolution** (term id `"evolution"`)
//!
//!    ```text
//!    ∫ (u' - (B(u) - K(u) - ΔB) w_0) φ_i dt
//!    ```
//!
//!    where `ΔB` is rebuilt at every quadrature node from the current
//!    auxiliary fields (see [`crate::scheme::correction`]).
//!
//! 2. **Defining equations** of every auxiliary field (term id `"mass"` for
//!    `∫ w φ_i`, the invariant name for `∫ ∇I(u) φ_i`), see
//!    [`crate::scheme::auxiliary`].
//!
//! # Quadrature
//!
//! | term         | default degree                       |
//! |--------------|--------------------------------------|
//! | `evolution`  | `3s`                                 |
//! | `mass`       | `2s`                                 |
//! | invariant    | `2s` (`Polynomial`) or 25 (`Exact`)  |
//!
//! Any entry can be overridden through
//! [`IntegratorConfiguration::quadrature_degree_override`]. Tabulations are
//! built once, when the assembler is created; binding a new step only
//! swaps the previous state.

use std::collections::BTreeMap;

use nalgebra::DVector;

use crate::discretization::{QuadratureRule, Tabulation, TimeElement};
use crate::error::{ConfigError, ResidualError};
use crate::physics::traits::PhysicalModel;
use crate::scheme::auxiliary::AuxiliaryFieldModel;
use crate::scheme::correction::SkewCorrectionSolver;
use crate::solver::{IntegratorConfiguration, NonlinearProblem};

/// Term id of the evolution equation
pub const EVOLUTION_TERM: &str = "evolution";

/// Term id of the auxiliary mass integrals
pub const MASS_TERM: &str = "mass";

pub struct ResidualAssembler<'a> {
    model: &'a dyn PhysicalModel,
    fields: AuxiliaryFieldModel<'a>,
    timestep: f64,
    correction: SkewCorrectionSolver,
    tabulations: BTreeMap<usize, Tabulation>,
    evolution_degree: usize,
    mass_degree: usize,
    field_degrees: Vec<usize>,
}

impl<'a> ResidualAssembler<'a> {
    /// Build the assembler of `model` under `config`
    ///
    /// # Errors
    ///
    /// - invalid configuration
    /// - a quadrature override naming an unknown term
    /// - conservation requested without conserved invariants
    pub fn new(
        model: &'a dyn PhysicalModel,
        config: &IntegratorConfiguration,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let invariants = model.invariants();
        let stages = config.stages;
        let fields = AuxiliaryFieldModel::new(invariants, stages, config.conservation)?;

        // ====== Term degrees ======
        let overrides = &config.quadrature_degree_override;
        for term in overrides.keys() {
            if term != EVOLUTION_TERM && term != MASS_TERM && invariants.get(term).is_none() {
                return Err(ConfigError::UnknownTerm(term.clone()));
            }
        }

        let degree_of = |term: &str, default: usize| overrides.get(term).copied().unwrap_or(default);
        let evolution_degree = degree_of(EVOLUTION_TERM, 3 * stages);
        let mass_degree = degree_of(MASS_TERM, 2 * stages);
        let field_degrees: Vec<usize> = (0..fields.field_count())
            .map(|field| {
                let invariant = fields.invariant(field);
                degree_of(invariant.name(), invariant.quadrature().degree(stages))
            })
            .collect();

        // ====== Tabulations, one per distinct degree ======
        let element = TimeElement::new(stages);
        let mut tabulations = BTreeMap::new();
        for degree in std::iter::once(evolution_degree)
            .chain(std::iter::once(mass_degree))
            .chain(field_degrees.iter().copied())
        {
            tabulations
                .entry(degree)
                .or_insert_with(|| element.tabulate(&QuadratureRule::for_degree(degree)));
        }

        Ok(Self {
            model,
            fields,
            timestep: config.timestep,
            correction: SkewCorrectionSolver::default(),
            tabulations,
            evolution_degree,
            mass_degree,
            field_degrees,
        })
    }

    /// Builder pattern: replace the correction tolerances
    pub fn with_correction_solver(mut self, correction: SkewCorrectionSolver) -> Self {
        self.correction = correction;
        self
    }

    pub fn fields(&self) -> &AuxiliaryFieldModel<'a> {
        &self.fields
    }

    pub fn model(&self) -> &'a dyn PhysicalModel {
        self.model
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Quadrature degree in use for a term id
    pub fn term_degree(&self, term: &str) -> Option<usize> {
        match term {
            EVOLUTION_TERM => Some(self.evolution_degree),
            MASS_TERM => Some(self.mass_degree),
            _ => self
                .fields
                .fields()
                .iter()
                .position(|field| field.name == term)
                .map(|field| self.field_degrees[field]),
        }
    }

    fn tabulation(&self, degree: usize) -> &Tabulation {
        &self.tabulations[&degree]
    }

    /// Residual of the step starting at `previous`, for enlarged state `x`
    pub fn residual(
        &self,
        previous: &DVector<f64>,
        x: &DVector<f64>,
    ) -> Result<DVector<f64>, ResidualError> {
        let n = self.fields.unknowns();
        if x.len() != n {
            return Err(ResidualError::Layout {
                expected: n,
                found: x.len(),
            });
        }

        let d = self.fields.dimension();
        let mut residual = DVector::zeros(n);

        // ====== Evolution ======
        let tab = self.tabulation(self.evolution_degree);
        for q in 0..tab.len() {
            let u = self.fields.state_at(previous, x, &tab.trial[q]);
            let du = self.fields.state_at(previous, x, &tab.trial_derivative[q]);
            let w0 = self.fields.field_at(x, 0, &tab.test[q]);

            let mut drift = self.flux(&u, &w0);

            if self.fields.conserved_count() > 0 {
                let conserved = self.fields.conserved_at(x, &tab.test[q]);
                let correction = self.correction.solve(&w0, &conserved, &drift)?;
                drift -= correction.apply(&w0);
            }

            let integrand = du - drift * self.timestep;
            for (i, phi) in tab.test[q].iter().enumerate() {
                residual
                    .rows_mut(i * d, d)
                    .axpy(tab.weights[q] * phi, &integrand, 1.0);
            }
        }

        // ====== Defining equations ======
        let rules: Vec<&Tabulation> = self
            .field_degrees
            .iter()
            .map(|degree| self.tabulation(*degree))
            .collect();
        self.fields.assemble_defining_equations(
            previous,
            x,
            self.tabulation(self.mass_degree),
            &rules,
            &mut residual,
        )?;

        Ok(residual)
    }

    /// Dissipation estimate `∫ w_0 · K(u) w_0 dt` of a converged step
    pub fn dissipation(&self, previous: &DVector<f64>, x: &DVector<f64>) -> f64 {
        if !self.model.is_dissipative() {
            return 0.0;
        }
        let tab = self.tabulation(self.evolution_degree);
        let mut total = 0.0;
        for q in 0..tab.len() {
            let u = self.fields.state_at(previous, x, &tab.trial[q]);
            let w0 = self.fields.field_at(x, 0, &tab.test[q]);
            if let Some(damping) = self.model.apply_dissipation(&u, &w0) {
                total += tab.weights[q] * w0.dot(&damping);
            }
        }
        total * self.timestep
    }

    /// Model flux `(B(u) - K(u)) w` at one node
    pub(crate) fn flux(&self, u: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
        let mut flux = self.model.apply_structure(u, w);
        if self.model.is_dissipative()
            && let Some(damping) = self.model.apply_dissipation(u, w)
        {
            flux -= damping;
        }
        flux
    }

    /// Bind the previous state of one step
    pub fn bind<'s>(&'s self, previous: &'s DVector<f64>) -> StepResidual<'s, 'a> {
        StepResidual {
            assembler: self,
            previous,
        }
    }
}

/// The residual of one step as a [`NonlinearProblem`]
pub struct StepResidual<'s, 'a> {
    assembler: &'s ResidualAssembler<'a>,
    previous: &'s DVector<f64>,
}

impl NonlinearProblem for StepResidual<'_, '_> {
    fn dimension(&self) -> usize {
        self.assembler.fields.unknowns()
    }

    fn residual(&self, x: &DVector<f64>) -> Result<DVector<f64>, ResidualError> {
        self.assembler.residual(self.previous, x)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
