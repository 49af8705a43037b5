//! Polynomial spaces on one time step
//!
//! With `s` stages, on the reference interval `τ ∈ [0, 1]` (`t = t_n + τ h`):
//!
//! - the **state** is continuous of degree `s`: `u(τ) = Σ_{j=0..s} c_j ℓ_j(τ)`
//!   with Lagrange polynomials at the equispaced nodes `j / s`. `c_0` is the
//!   previous state and `c_s` is the new one.
//! - the **auxiliary fields** and the **test functions** are discontinuous
//!   of degree `s - 1`: Lagrange polynomials `φ_i` at the `s` Gauss–Legendre
//!   nodes.
//!
//! A [`Tabulation`] stores every basis value a quadrature rule needs, so the
//! residual loop never re-evaluates polynomials.

use crate::discretization::quadrature::QuadratureRule;

/// Lagrange basis on a fixed set of distinct nodes
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeBasis {
    nodes: Vec<f64>,
}

impl LagrangeBasis {
    pub fn new(nodes: Vec<f64>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// `ℓ_j(τ)` for every `j`
    pub fn values(&self, tau: f64) -> Vec<f64> {
        (0..self.nodes.len())
            .map(|j| {
                self.nodes
                    .iter()
                    .enumerate()
                    .filter(|(m, _)| *m != j)
                    .map(|(_, &xm)| (tau - xm) / (self.nodes[j] - xm))
                    .product()
            })
            .collect()
    }

    /// `ℓ_j'(τ)` for every `j`
    pub fn derivatives(&self, tau: f64) -> Vec<f64> {
        let n = self.nodes.len();
        (0..n)
            .map(|j| {
                let xj = self.nodes[j];
                let mut total = 0.0;
                for k in (0..n).filter(|&k| k != j) {
                    let mut term = 1.0 / (xj - self.nodes[k]);
                    for m in (0..n).filter(|&m| m != j && m != k) {
                        term *= (tau - self.nodes[m]) / (xj - self.nodes[m]);
                    }
                    total += term;
                }
                total
            })
            .collect()
    }
}

/// Basis values at the nodes of one quadrature rule
#[derive(Debug, Clone)]
pub struct Tabulation {
    /// Quadrature weights on `[0, 1]`
    pub weights: Vec<f64>,
    /// `trial[q][j] = ℓ_j(τ_q)`, `j = 0..=s`
    pub trial: Vec<Vec<f64>>,
    /// `trial_derivative[q][j] = dℓ_j/dτ(τ_q)`
    pub trial_derivative: Vec<Vec<f64>>,
    /// `test[q][i] = φ_i(τ_q)`, `i = 0..s`
    pub test: Vec<Vec<f64>>,
}

impl Tabulation {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// The time element of an `s`-stage scheme
#[derive(Debug, Clone)]
pub struct TimeElement {
    stages: usize,
    trial: LagrangeBasis,
    test: LagrangeBasis,
}

impl TimeElement {
    pub fn new(stages: usize) -> Self {
        let stages = stages.max(1);
        let trial_nodes = (0..=stages).map(|j| j as f64 / stages as f64).collect();
        let test_nodes = QuadratureRule::gauss_legendre(stages).points().to_vec();
        Self {
            stages,
            trial: LagrangeBasis::new(trial_nodes),
            test: LagrangeBasis::new(test_nodes),
        }
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    pub fn trial_basis(&self) -> &LagrangeBasis {
        &self.trial
    }

    pub fn test_basis(&self) -> &LagrangeBasis {
        &self.test
    }

    pub fn tabulate(&self, rule: &QuadratureRule) -> Tabulation {
        let points = rule.points();
        Tabulation {
            weights: rule.weights().to_vec(),
            trial: points.iter().map(|&t| self.trial.values(t)).collect(),
            trial_derivative: points.iter().map(|&t| self.trial.derivatives(t)).collect(),
            test: points.iter().map(|&t| self.test.values(t)).collect(),
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
