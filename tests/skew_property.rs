//! Property tests of the skew correction
//!
//! For random base fields, conserved fields and fluxes, the corrected drift
//! `F - ΔB w_0` must be orthogonal to every conserved field while `ΔB`
//! stays skew, so it never touches the energy.

use avfet_rs::scheme::SkewCorrectionSolver;
use nalgebra::DVector;
use proptest::prelude::*;

const DIMENSION: usize = 4;

fn vector() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-2.0_f64..2.0_f64, DIMENSION)
}

/// Component of `v` orthogonal to `base`, normalised
fn orthogonal_direction(v: &DVector<f64>, base: &DVector<f64>) -> Option<DVector<f64>> {
    let unit = base.normalize();
    let rest = v - &unit * unit.dot(v);
    (rest.norm() > 0.2 * v.norm()).then(|| rest.normalize())
}

/// Conserved fields whose projections off the base are far from dependent
fn well_conditioned(base: &DVector<f64>, fields: &[DVector<f64>]) -> bool {
    if base.norm() < 0.1 || fields.iter().any(|f| f.norm() < 0.1) {
        return false;
    }
    let directions: Option<Vec<_>> = fields.iter().map(|f| orthogonal_direction(f, base)).collect();
    match directions {
        Some(d) if d.len() == 2 => d[0].dot(&d[1]).abs() < 0.9,
        Some(_) => true,
        None => false,
    }
}

// Golden case: z conserved in a rotation, flux already orthogonal
#[test]
fn golden_orthogonal_flux_needs_no_correction() {
    let base = DVector::from_vec(vec![1.0, 0.5, 0.2, 0.0]);
    let field = DVector::from_vec(vec![0.0, 0.0, 1.0, 0.0]);
    let flux = DVector::from_vec(vec![-0.5, 1.0, 0.0, 0.0]);
    let correction = SkewCorrectionSolver::default()
        .solve(&base, std::slice::from_ref(&field), &flux)
        .unwrap();
    assert!(correction.coefficients()[0].abs() < 1e-15);
}

proptest! {
    #[test]
    fn prop_corrected_drift_is_orthogonal(
        base in vector(),
        first in vector(),
        second in vector(),
        flux in vector(),
        two_fields in any::<bool>(),
    ) {
        let base = DVector::from_vec(base);
        let flux = DVector::from_vec(flux);
        let mut fields = vec![DVector::from_vec(first)];
        if two_fields {
            fields.push(DVector::from_vec(second));
        }
        prop_assume!(well_conditioned(&base, &fields));

        let correction = SkewCorrectionSolver::default().solve(&base, &fields, &flux);
        prop_assert!(correction.is_ok());
        let correction = correction.unwrap();

        let drift = &flux - correction.apply(&base);
        let scale = flux.norm() * fields.iter().map(|f| f.norm()).fold(1.0, f64::max);
        for field in &fields {
            prop_assert!(field.dot(&drift).abs() < 1e-9 * scale.max(1.0));
        }

        // Skew: no work against the base field
        let work = base.dot(&correction.apply(&base));
        prop_assert!(work.abs() < 1e-9 * base.norm_squared() * correction.coefficients().amax().max(1.0) * scale.max(1.0));

        let operator = correction.operator();
        let asymmetry = (&operator + operator.transpose()).amax();
        prop_assert!(asymmetry < 1e-12 * operator.amax().max(1.0));
    }
}
