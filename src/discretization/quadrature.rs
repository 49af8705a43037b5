//! Gauss–Legendre quadrature on the reference interval `[0, 1]`
//!
//! Rules are selected by the polynomial degree they must integrate exactly:
//! an `n`-point rule is exact up to degree `2n - 1`, so degree `p` needs
//! `p / 2 + 1` points.

use std::f64::consts::PI;

/// Nodes and weights on `[0, 1]` (weights sum to one)
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule {
    points: Vec<f64>,
    weights: Vec<f64>,
    degree: usize,
}

impl QuadratureRule {
    /// `n`-point Gauss–Legendre rule (`n >= 1`)
    pub fn gauss_legendre(n: usize) -> Self {
        let n = n.max(1);
        let mut points = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);

        for i in 0..n {
            // Roots of P_n by Newton iteration from the Chebyshev-like guess
            let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            let mut derivative = 1.0;
            for _ in 0..100 {
                let (p, dp) = legendre_with_derivative(n, x);
                derivative = dp;
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-16 {
                    break;
                }
            }
            let (_, dp) = legendre_with_derivative(n, x);
            if dp.is_finite() && dp != 0.0 {
                derivative = dp;
            }

            // Map [-1, 1] -> [0, 1]; nodes come out ascending
            points.push(0.5 * (1.0 - x));
            weights.push(1.0 / ((1.0 - x * x) * derivative * derivative));
        }

        Self {
            points,
            weights,
            degree: 2 * n - 1,
        }
    }

    /// Smallest Gauss–Legendre rule exact for polynomials of `degree`
    pub fn for_degree(degree: usize) -> Self {
        Self::gauss_legendre(degree / 2 + 1)
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Highest polynomial degree integrated exactly
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// `∫_0^1 f(τ) dτ`
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.points
            .iter()
            .zip(&self.weights)
            .map(|(&t, &w)| w * f(t))
            .sum()
    }
}

/// `(P_n(x), P_n'(x))` by the three-term recurrence
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut previous = 1.0;
    let mut current = x;
    for k in 2..=n {
        let k = k as f64;
        let next = ((2.0 * k - 1.0) * x * current - (k - 1.0) * previous) / k;
        previous = current;
        current = next;
    }
    let derivative = n as f64 * (x * current - previous) / (x * x - 1.0);
    (current, derivative)
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_point_rule_is_midpoint() {
        let rule = QuadratureRule::gauss_legendre(1);
        assert_eq!(rule.len(), 1);
        assert_relative_eq!(rule.points()[0], 0.5, epsilon = 1e-15);
        assert_relative_eq!(rule.weights()[0], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_two_point_rule_nodes() {
        let rule = QuadratureRule::gauss_legendre(2);
        let offset = 0.5 / 3.0_f64.sqrt();
        assert_relative_eq!(rule.points()[0], 0.5 - offset, epsilon = 1e-15);
        assert_relative_eq!(rule.points()[1], 0.5 + offset, epsilon = 1e-15);
        assert_relative_eq!(rule.weights()[0], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_weights_sum_to_one() {
        for n in 1..=13 {
            let rule = QuadratureRule::gauss_legendre(n);
            let total: f64 = rule.weights().iter().sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-14);
            assert!(rule.points().windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn test_exactness_up_to_degree() {
        for degree in 0..=25 {
            let rule = QuadratureRule::for_degree(degree);
            assert!(rule.degree() >= degree);
            let integral = rule.integrate(|t| t.powi(degree as i32));
            assert_relative_eq!(integral, 1.0 / (degree as f64 + 1.0), epsilon = 1e-14);
        }
    }

    #[test]
    fn test_exact_degree_uses_thirteen_points() {
        assert_eq!(QuadratureRule::for_degree(25).len(), 13);
    }
}
