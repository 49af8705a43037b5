//! Skew-symmetric correction enforcing conserved invariants
//!
//! At each evolution quadrature node the drift applied to `w_0` is
//! `F - ΔB w_0`, where `F = (B - K) w_0` is the model flux and
//!
//! ```text
//! ΔB = Σ_i λ_i (w_i ⊗ w_0 - w_0 ⊗ w_i)
//! ```
//!
//! `ΔB` is skew by construction, so it never changes the energy balance.
//! The coefficients `λ` make the corrected drift orthogonal to every
//! conserved gradient `w_k`:
//!
//! ```text
//! Σ_j (⟨w_k, w_j⟩|w_0|² - ⟨w_k, w_0⟩⟨w_j, w_0⟩) λ_j = ⟨w_k, F⟩
//! ```
//!
//! The `m × m` system is the Gram matrix of the conserved gradients projected
//! orthogonally to `w_0`, scaled by `|w_0|²`. It is singular when those
//! projections are linearly dependent, which is reported, never regularised.

use nalgebra::{DMatrix, DVector};

use crate::error::CorrectionError;

/// Solver for the correction coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewCorrectionSolver {
    /// Smallest admissible singular value relative to the system scale
    pub singularity_tolerance: f64,
    /// Smallest admissible `|w_0|`
    pub degeneracy_tolerance: f64,
}

impl Default for SkewCorrectionSolver {
    fn default() -> Self {
        Self {
            singularity_tolerance: 1e-12,
            degeneracy_tolerance: 1e-14,
        }
    }
}

impl SkewCorrectionSolver {
    pub fn new(singularity_tolerance: f64, degeneracy_tolerance: f64) -> Self {
        Self {
            singularity_tolerance,
            degeneracy_tolerance,
        }
    }

    /// Compute `λ` for base field `base`, conserved fields `fields` and flux `flux`
    pub fn solve(
        &self,
        base: &DVector<f64>,
        fields: &[DVector<f64>],
        flux: &DVector<f64>,
    ) -> Result<SkewCorrection, CorrectionError> {
        let dimension = base.len();
        if flux.len() != dimension {
            return Err(CorrectionError::DimensionMismatch {
                expected: dimension,
                found: flux.len(),
            });
        }
        if let Some(field) = fields.iter().find(|f| f.len() != dimension) {
            return Err(CorrectionError::DimensionMismatch {
                expected: dimension,
                found: field.len(),
            });
        }

        let m = fields.len();
        if m == 0 {
            return Ok(SkewCorrection {
                coefficients: DVector::zeros(0),
                base: base.clone(),
                fields: Vec::new(),
            });
        }

        let base_norm_sq = base.norm_squared();
        if base_norm_sq.sqrt() <= self.degeneracy_tolerance {
            return Err(CorrectionError::DegenerateBaseField {
                norm: base_norm_sq.sqrt(),
            });
        }

        // ====== Assemble the m × m system ======
        let projections: Vec<f64> = fields.iter().map(|w| w.dot(base)).collect();
        let mut lhs = DMatrix::zeros(m, m);
        let mut rhs = DVector::zeros(m);
        let mut scale: f64 = 0.0;
        for i in 0..m {
            rhs[i] = fields[i].dot(flux);
            scale = scale.max(fields[i].norm_squared() * base_norm_sq);
            for j in 0..m {
                lhs[(i, j)] = fields[i].dot(&fields[j]) * base_norm_sq - projections[i] * projections[j];
            }
        }

        // ====== Singularity check ======
        let singular_values = lhs.clone().svd(false, false).singular_values;
        let largest = singular_values.max();
        let smallest = singular_values.min();
        let reference = largest.max(scale);
        if !(smallest > self.singularity_tolerance * reference) {
            let condition = if smallest > 0.0 { reference / smallest } else { f64::INFINITY };
            return Err(CorrectionError::Singular { condition });
        }

        let coefficients = lhs
            .lu()
            .solve(&rhs)
            .ok_or(CorrectionError::Singular { condition: f64::INFINITY })?;

        Ok(SkewCorrection {
            coefficients,
            base: base.clone(),
            fields: fields.to_vec(),
        })
    }
}

/// The correction `ΔB` at one quadrature node
#[derive(Debug, Clone)]
pub struct SkewCorrection {
    coefficients: DVector<f64>,
    base: DVector<f64>,
    fields: Vec<DVector<f64>>,
}

impl SkewCorrection {
    /// `λ`
    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    /// `ΔB v = Σ_i λ_i (w_i (w_0 · v) - w_0 (w_i · v))`, without forming `ΔB`
    pub fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        let base_dot = self.base.dot(v);
        let mut result = DVector::zeros(v.len());
        for (lambda, field) in self.coefficients.iter().zip(&self.fields) {
            result.axpy(lambda * base_dot, field, 1.0);
            result.axpy(-lambda * field.dot(v), &self.base, 1.0);
        }
        result
    }

    /// Dense `ΔB` as an explicit sum of antisymmetrised outer products
    pub fn operator(&self) -> DMatrix<f64> {
        let n = self.base.len();
        let mut matrix = DMatrix::zeros(n, n);
        for (lambda, field) in self.coefficients.iter().zip(&self.fields) {
            let outer = field * self.base.transpose();
            matrix += (&outer - outer.transpose()) * *lambda;
        }
        matrix
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vector(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn test_corrected_drift_is_orthogonal_to_conserved_fields() {
        let base = vector(&[1.0, 0.5, -0.3, 0.2]);
        let fields = vec![vector(&[0.0, 1.0, 0.4, -1.0]), vector(&[0.7, -0.2, 1.1, 0.3])];
        let flux = vector(&[-0.3, 0.2, 1.0, 0.5]);

        let correction = SkewCorrectionSolver::default()
            .solve(&base, &fields, &flux)
            .unwrap();
        let drift = &flux - correction.apply(&base);

        for field in &fields {
            assert_relative_eq!(field.dot(&drift), 0.0, epsilon = 1e-13);
        }
        // Energy direction untouched
        assert_relative_eq!(base.dot(&correction.apply(&base)), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_operator_is_skew_and_matches_apply() {
        let base = vector(&[0.3, -1.0, 2.0]);
        let fields = vec![vector(&[1.0, 1.0, 0.0])];
        let flux = vector(&[0.5, 0.1, -0.2]);
        let correction = SkewCorrectionSolver::default()
            .solve(&base, &fields, &flux)
            .unwrap();

        let matrix = correction.operator();
        let symmetric_part = &matrix + matrix.transpose();
        assert!(symmetric_part.norm() < 1e-14);

        let v = vector(&[0.2, -0.7, 1.3]);
        let dense = &matrix * &v;
        let matrix_free = correction.apply(&v);
        for i in 0..3 {
            assert_relative_eq!(dense[i], matrix_free[i], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_no_conserved_fields_means_no_correction() {
        let base = vector(&[1.0, 2.0]);
        let correction = SkewCorrectionSolver::default()
            .solve(&base, &[], &vector(&[0.0, 1.0]))
            .unwrap();
        assert_eq!(correction.apply(&base), DVector::zeros(2));
    }

    #[test]
    fn test_field_parallel_to_base_is_singular() {
        let base = vector(&[1.0, 2.0, 3.0]);
        let fields = vec![base.clone() * 2.0];
        let error = SkewCorrectionSolver::default()
            .solve(&base, &fields, &vector(&[1.0, 0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(error, CorrectionError::Singular { .. }));
    }

    #[test]
    fn test_dependent_fields_are_singular() {
        let base = vector(&[1.0, 0.0, 0.0]);
        let fields = vec![vector(&[0.0, 1.0, 1.0]), vector(&[1.0, 2.0, 2.0])];
        let error = SkewCorrectionSolver::default()
            .solve(&base, &fields, &vector(&[0.0, 1.0, 0.0]))
            .unwrap_err();
        assert!(matches!(error, CorrectionError::Singular { .. }));
    }

    #[test]
    fn test_degenerate_base_field() {
        let error = SkewCorrectionSolver::default()
            .solve(&DVector::zeros(2), &[vector(&[1.0, 0.0])], &vector(&[0.0, 1.0]))
            .unwrap_err();
        assert!(matches!(error, CorrectionError::DegenerateBaseField { .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let error = SkewCorrectionSolver::default()
            .solve(&vector(&[1.0, 0.0]), &[vector(&[1.0])], &vector(&[0.0, 1.0]))
            .unwrap_err();
        assert_eq!(error, CorrectionError::DimensionMismatch { expected: 2, found: 1 });
    }
}
