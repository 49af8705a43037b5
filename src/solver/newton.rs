//! Damped Newton solver with a finite-difference Jacobian
//!
//! # Algorithm
//!
//! ```text
//! F_0 = F(x_0)
//! repeat:
//!     stop if |F| <= atol or |F| <= rtol |F_0|
//!     J  = central-difference Jacobian at x
//!     dx = J^{-1} (-F)                      (dense LU or QR)
//!     stop if |dx| <= stol |x|              (after applying dx)
//!     x  = x + α dx                         (α from the line search)
//! ```
//!
//! Residual evaluation failures inside the line search (physical
//! invalidity at a trial point) shrink the step instead of aborting.
//!
//! # Parallelism
//!
//! With the `parallel` feature, Jacobian columns are evaluated with Rayon
//! once the problem dimension reaches [`SolverOptions::parallel_threshold`].

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{ResidualError, SolveError};
use crate::solver::traits::{
    LineSearch, LinearSolver, NonlinearProblem, NonlinearSolver, SolveReport, SolverOptions,
};

/// Relative finite-difference increment
const FD_INCREMENT: f64 = 6e-6;

/// Maximum number of step halvings in the line search
const MAX_HALVINGS: usize = 10;

// =================================================================================================
// Newton Solver
// =================================================================================================

#[derive(Debug, Clone, Default)]
pub struct NewtonSolver {
    options: SolverOptions,
}

impl NewtonSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Central-difference Jacobian
    pub fn jacobian(
        &self,
        problem: &dyn NonlinearProblem,
        x: &DVector<f64>,
    ) -> Result<DMatrix<f64>, ResidualError> {
        let n = x.len();

        let column = |j: usize| -> Result<DVector<f64>, ResidualError> {
            let h = FD_INCREMENT * x[j].abs().max(1.0);
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[j] += h;
            minus[j] -= h;
            let f_plus = problem.residual(&plus)?;
            let f_minus = problem.residual(&minus)?;
            Ok((f_plus - f_minus) / (2.0 * h))
        };

        #[cfg(feature = "parallel")]
        let columns: Vec<DVector<f64>> = if n >= self.options.parallel_threshold {
            (0..n).into_par_iter().map(column).collect::<Result<_, _>>()?
        } else {
            (0..n).map(column).collect::<Result<_, _>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let columns: Vec<DVector<f64>> = (0..n).map(column).collect::<Result<_, _>>()?;

        let rows = problem.dimension();
        let mut jacobian = DMatrix::zeros(rows, n);
        for (j, col) in columns.iter().enumerate() {
            jacobian.set_column(j, col);
        }
        Ok(jacobian)
    }

    fn linear_solve(
        &self,
        jacobian: DMatrix<f64>,
        rhs: &DVector<f64>,
        iteration: usize,
    ) -> Result<DVector<f64>, SolveError> {
        let solution = match self.options.linear_solver {
            LinearSolver::Lu => jacobian.lu().solve(rhs),
            LinearSolver::Qr => jacobian.qr().solve(rhs),
        };
        match solution {
            Some(dx) if dx.iter().all(|v| v.is_finite()) => Ok(dx),
            _ => Err(SolveError::SingularJacobian { iteration }),
        }
    }

    /// Try `x + α dx`, treating evaluation errors as an infinite residual
    fn trial(
        problem: &dyn NonlinearProblem,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        alpha: f64,
    ) -> Option<(DVector<f64>, DVector<f64>, f64)> {
        let candidate = x + dx * alpha;
        match problem.residual(&candidate) {
            Ok(f) => {
                let norm = f.norm();
                norm.is_finite().then_some((candidate, f, norm))
            }
            Err(error) => {
                log::debug!("Line search: residual failed at α = {:.3e}: {}", alpha, error);
                None
            }
        }
    }

    fn backtrack(
        problem: &dyn NonlinearProblem,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        norm: f64,
        start: f64,
    ) -> Option<(DVector<f64>, DVector<f64>, f64)> {
        let mut alpha = start;
        for _ in 0..=MAX_HALVINGS {
            if let Some(accepted) = Self::trial(problem, x, dx, alpha)
                && accepted.2 < norm
            {
                return Some(accepted);
            }
            alpha *= 0.5;
        }
        None
    }

    /// Minimiser of the quadratic through `|F|²` at α = 0, 1/2, 1
    fn l2_step(
        problem: &dyn NonlinearProblem,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        norm: f64,
    ) -> Option<(DVector<f64>, DVector<f64>, f64)> {
        let full = Self::trial(problem, x, dx, 1.0);
        let half = Self::trial(problem, x, dx, 0.5);

        if let (Some(full), Some(half)) = (&full, &half) {
            let g0 = norm * norm;
            let g_half = half.2 * half.2;
            let g1 = full.2 * full.2;
            // g(α) = a α² + b α + g0
            let a = 2.0 * g1 - 4.0 * g_half + 2.0 * g0;
            let b = 4.0 * g_half - g1 - 3.0 * g0;
            let alpha = if a > 0.0 { (-b / (2.0 * a)).clamp(0.1, 1.0) } else { 1.0 };

            let best = if (alpha - 1.0).abs() < 1e-12 {
                Some(full.clone())
            } else {
                Self::trial(problem, x, dx, alpha)
            };
            let candidates = [best, Some(full.clone()), Some(half.clone())];
            let chosen = candidates
                .into_iter()
                .flatten()
                .min_by(|l, r| l.2.total_cmp(&r.2));
            if let Some(chosen) = chosen
                && chosen.2 < norm
            {
                return Some(chosen);
            }
        }

        Self::backtrack(problem, x, dx, norm, 0.25)
    }
}

impl NonlinearSolver for NewtonSolver {
    fn solve(
        &self,
        problem: &dyn NonlinearProblem,
        initial_guess: DVector<f64>,
    ) -> Result<SolveReport, SolveError> {
        let options = &self.options;

        let mut x = initial_guess;
        let mut f = problem.residual(&x)?;
        let mut norm = f.norm();
        let initial_norm = norm;

        for iteration in 0..options.max_iterations {
            log::debug!("Newton iteration {}: |F| = {:.3e}", iteration, norm);

            // ====== Convergence ======
            if norm <= options.atol || (iteration > 0 && norm <= options.rtol * initial_norm) {
                return Ok(SolveReport {
                    solution: x,
                    iterations: iteration,
                    residual_norm: norm,
                });
            }

            // ====== Newton direction ======
            let jacobian = self.jacobian(problem, &x)?;
            let dx = self.linear_solve(jacobian, &(-&f), iteration)?;

            if dx.norm() <= options.stol * x.norm() {
                x += &dx;
                let f_new = problem.residual(&x)?;
                return Ok(SolveReport {
                    solution: x,
                    iterations: iteration + 1,
                    residual_norm: f_new.norm(),
                });
            }

            // ====== Line search ======
            let accepted = match options.line_search {
                LineSearch::Basic => Self::trial(problem, &x, &dx, 1.0),
                LineSearch::Backtracking => Self::backtrack(problem, &x, &dx, norm, 1.0),
                LineSearch::L2 => Self::l2_step(problem, &x, &dx, norm),
            };

            match accepted {
                Some((x_new, f_new, norm_new)) => {
                    x = x_new;
                    f = f_new;
                    norm = norm_new;
                }
                None => {
                    log::warn!(
                        "Line search failed at iteration {} (|F| = {:.3e})",
                        iteration,
                        norm
                    );
                    return Err(SolveError::NonConvergence {
                        iterations: iteration + 1,
                        residual: norm,
                    });
                }
            }
        }

        if norm <= options.atol || norm <= options.rtol * initial_norm {
            return Ok(SolveReport {
                solution: x,
                iterations: options.max_iterations,
                residual_norm: norm,
            });
        }

        Err(SolveError::NonConvergence {
            iterations: options.max_iterations,
            residual: norm,
        })
    }

    fn name(&self) -> &str {
        "Newton (finite-difference Jacobian)"
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use approx::assert_relative_eq;

    /// x² = 2, y = x + 1
    struct Quadratic;

    impl NonlinearProblem for Quadratic {
        fn dimension(&self) -> usize {
            2
        }

        fn residual(&self, x: &DVector<f64>) -> Result<DVector<f64>, ResidualError> {
            Ok(DVector::from_vec(vec![x[0] * x[0] - 2.0, x[1] - x[0] - 1.0]))
        }
    }

    /// ln(x) = 0, undefined for x <= 0
    struct Logarithm;

    impl NonlinearProblem for Logarithm {
        fn dimension(&self) -> usize {
            1
        }

        fn residual(&self, x: &DVector<f64>) -> Result<DVector<f64>, ResidualError> {
            if x[0] <= 0.0 {
                return Err(ResidualError::Evaluation {
                    term: "log".to_string(),
                    source: EvalError::NonPositiveLogArgument(x[0]),
                });
            }
            Ok(DVector::from_element(1, x[0].ln()))
        }
    }

    /// Rank-deficient linear system
    struct Degenerate;

    impl NonlinearProblem for Degenerate {
        fn dimension(&self) -> usize {
            2
        }

        fn residual(&self, x: &DVector<f64>) -> Result<DVector<f64>, ResidualError> {
            let s = x[0] + x[1];
            Ok(DVector::from_vec(vec![s - 1.0, s - 1.0]))
        }
    }

    #[test]
    fn test_converges_on_quadratic() {
        for line_search in [LineSearch::Basic, LineSearch::Backtracking, LineSearch::L2] {
            let solver = NewtonSolver::new(SolverOptions {
                line_search,
                ..Default::default()
            });
            let report = solver
                .solve(&Quadratic, DVector::from_vec(vec![1.0, 0.0]))
                .unwrap();
            assert_relative_eq!(report.solution[0], 2.0_f64.sqrt(), epsilon = 1e-12);
            assert_relative_eq!(report.solution[1], 2.0_f64.sqrt() + 1.0, epsilon = 1e-12);
            assert!(report.iterations < 10);
        }
    }

    #[test]
    fn test_jacobian_matches_analytic() {
        let solver = NewtonSolver::default();
        let jacobian = solver
            .jacobian(&Quadratic, &DVector::from_vec(vec![3.0, 1.0]))
            .unwrap();
        assert_relative_eq!(jacobian[(0, 0)], 6.0, epsilon = 1e-8);
        assert_relative_eq!(jacobian[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jacobian[(1, 0)], -1.0, epsilon = 1e-10);
        assert_relative_eq!(jacobian[(1, 1)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_line_search_recovers_from_invalid_trial_point() {
        // Full Newton step from x = 10 lands at 10 - 10 ln 10 < 0
        let solver = NewtonSolver::new(SolverOptions {
            line_search: LineSearch::Backtracking,
            ..Default::default()
        });
        let report = solver.solve(&Logarithm, DVector::from_element(1, 10.0)).unwrap();
        assert_relative_eq!(report.solution[0], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_invalid_initial_guess_is_reported() {
        let solver = NewtonSolver::default();
        let error = solver.solve(&Logarithm, DVector::from_element(1, -1.0)).unwrap_err();
        assert!(matches!(error, SolveError::Residual(ResidualError::Evaluation { .. })));
    }

    #[test]
    fn test_singular_jacobian() {
        let solver = NewtonSolver::default();
        let error = solver.solve(&Degenerate, DVector::zeros(2)).unwrap_err();
        assert_eq!(error, SolveError::SingularJacobian { iteration: 0 });
    }

    #[test]
    fn test_iteration_limit() {
        let solver = NewtonSolver::new(SolverOptions {
            max_iterations: 1,
            line_search: LineSearch::Basic,
            ..Default::default()
        });
        let error = solver
            .solve(&Quadratic, DVector::from_vec(vec![10.0, 0.0]))
            .unwrap_err();
        assert!(matches!(error, SolveError::NonConvergence { iterations: 1, .. }));
    }
}
