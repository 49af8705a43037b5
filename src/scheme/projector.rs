//! Constrained projection onto the kernel of linear operators
//!
//! Given a target `t`, an SPD mass matrix `M` (identity by default) and
//! constraint operators `C_1 … C_n`, find `(u, p_1 … p_n)` with
//!
//! ```text
//! M (u - t) - Σ_k C_kᵀ p_k = 0
//!            -C_k u        = 0      for every k
//! ```
//!
//! `u` is the `M`-orthogonal projection of `t` onto `∩_k ker C_k` and `p_k`
//! are the multipliers. The saddle-point system is handed to a
//! [`NonlinearSolver`], so the same solver options as the time stepper apply.

use nalgebra::{DMatrix, DVector};

use crate::error::{ResidualError, SolveError};
use crate::solver::{NewtonSolver, NonlinearProblem, NonlinearSolver, SolverOptions};

/// Relative singular-value threshold of the constraint rank check
const RANK_TOLERANCE: f64 = 1e-12;

/// Result of a projection
#[derive(Debug, Clone)]
pub struct Projection {
    pub state: DVector<f64>,
    /// One multiplier vector per constraint operator
    pub multipliers: Vec<DVector<f64>>,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct ConstrainedProjector {
    dimension: usize,
    constraints: Vec<DMatrix<f64>>,
    mass: Option<DMatrix<f64>>,
    options: SolverOptions,
}

impl ConstrainedProjector {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            constraints: Vec::new(),
            mass: None,
            options: SolverOptions::default(),
        }
    }

    /// Builder pattern: add a constraint operator (`rows × dimension`)
    pub fn with_constraint(mut self, operator: DMatrix<f64>) -> Self {
        self.constraints.push(operator);
        self
    }

    /// Builder pattern: add the scalar constraint `c · u = 0`
    pub fn with_linear_functional(self, coefficients: DVector<f64>) -> Self {
        let row = DMatrix::from_row_slice(1, coefficients.len(), coefficients.as_slice());
        self.with_constraint(row)
    }

    pub fn with_mass_matrix(mut self, mass: DMatrix<f64>) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Builder pattern: options forwarded to the nonlinear solver
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn multiplier_len(&self) -> usize {
        self.constraints.iter().map(|c| c.nrows()).sum()
    }

    /// Project with the default Newton solver
    pub fn project(&self, target: &DVector<f64>) -> Result<Projection, SolveError> {
        self.project_with(&NewtonSolver::new(self.options.clone()), target)
    }

    /// Project with a caller-provided solver
    ///
    /// # Errors
    ///
    /// - `Residual(Layout)` if the target, mass matrix or a constraint does
    ///   not match the dimension
    /// - `SingularJacobian { iteration: 0 }` if the constraints are linearly
    ///   dependent (the saddle-point matrix is singular)
    pub fn project_with(
        &self,
        solver: &dyn NonlinearSolver,
        target: &DVector<f64>,
    ) -> Result<Projection, SolveError> {
        let d = self.dimension;

        // ====== Step 1: Shapes ======
        let layout = |found: usize| {
            SolveError::Residual(ResidualError::Layout { expected: d, found })
        };
        if target.len() != d {
            return Err(layout(target.len()));
        }
        if let Some(mass) = &self.mass
            && (mass.nrows() != d || mass.ncols() != d)
        {
            return Err(layout(mass.nrows()));
        }
        if let Some(operator) = self.constraints.iter().find(|c| c.ncols() != d) {
            return Err(layout(operator.ncols()));
        }

        // ====== Step 2: Constraint rank ======
        let rows = self.multiplier_len();
        if rows > 0 {
            if rows > d {
                return Err(SolveError::SingularJacobian { iteration: 0 });
            }
            let stacked = self.stacked_constraints();
            let singular_values = stacked.svd(false, false).singular_values;
            let largest = singular_values.max();
            let rank = singular_values
                .iter()
                .filter(|sigma| **sigma > RANK_TOLERANCE * largest)
                .count();
            if rank < rows {
                return Err(SolveError::SingularJacobian { iteration: 0 });
            }
        }

        // ====== Step 3: Saddle-point solve ======
        let problem = SaddlePoint {
            projector: self,
            target,
        };
        let mut guess = DVector::zeros(d + rows);
        guess.rows_mut(0, d).copy_from(target);
        let report = solver.solve(&problem, guess)?;

        let state = report.solution.rows(0, d).into_owned();
        let mut multipliers = Vec::with_capacity(self.constraints.len());
        let mut offset = d;
        for operator in &self.constraints {
            multipliers.push(report.solution.rows(offset, operator.nrows()).into_owned());
            offset += operator.nrows();
        }

        log::debug!(
            "Projected onto {} constraints in {} iterations",
            self.constraints.len(),
            report.iterations
        );

        Ok(Projection {
            state,
            multipliers,
            iterations: report.iterations,
        })
    }

    fn stacked_constraints(&self) -> DMatrix<f64> {
        let mut stacked = DMatrix::zeros(self.multiplier_len(), self.dimension);
        let mut offset = 0;
        for operator in &self.constraints {
            stacked
                .rows_mut(offset, operator.nrows())
                .copy_from(operator);
            offset += operator.nrows();
        }
        stacked
    }
}

struct SaddlePoint<'p> {
    projector: &'p ConstrainedProjector,
    target: &'p DVector<f64>,
}

impl NonlinearProblem for SaddlePoint<'_> {
    fn dimension(&self) -> usize {
        self.projector.dimension + self.projector.multiplier_len()
    }

    fn residual(&self, x: &DVector<f64>) -> Result<DVector<f64>, ResidualError> {
        let d = self.projector.dimension;
        if x.len() != self.dimension() {
            return Err(ResidualError::Layout {
                expected: self.dimension(),
                found: x.len(),
            });
        }

        let u = x.rows(0, d).into_owned();
        let difference = &u - self.target;
        let mut residual = DVector::zeros(x.len());
        {
            let mut primal = residual.rows_mut(0, d);
            match &self.projector.mass {
                Some(mass) => primal.copy_from(&(mass * &difference)),
                None => primal.copy_from(&difference),
            }
        }

        let mut offset = d;
        for operator in &self.projector.constraints {
            let r = operator.nrows();
            let multiplier = x.rows(offset, r);
            let reaction = operator.transpose() * multiplier;
            residual.rows_mut(0, d).axpy(-1.0, &reaction, 1.0);
            let violation = operator * &u;
            residual.rows_mut(offset, r).axpy(-1.0, &violation, 0.0);
            offset += r;
        }

        Ok(residual)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
