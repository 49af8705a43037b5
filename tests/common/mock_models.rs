//! Small models for integration tests
//!
//! All three rotate the `(x, y)` plane and leave `z` untouched, so their
//! exact flow is known: `H = ½|u|²` and `z` are constant.

use avfet_rs::physics::{Expr, InvariantSet, PhysicalModel, Quadrature};
use nalgebra::DVector;

fn energy() -> Expr {
    let x = Expr::var(0);
    let y = Expr::var(1);
    let z = Expr::var(2);
    0.5 * (x.clone() * x + y.clone() * y + z.clone() * z)
}

fn rotate(w: &DVector<f64>) -> DVector<f64> {
    DVector::from_vec(vec![-w[1], w[0], 0.0])
}

// =================================================================================================
// Rotation: z conserved
// =================================================================================================

/// Rigid rotation about the z axis with `z` registered as conserved
pub struct Rotation {
    invariants: InvariantSet,
    initial: DVector<f64>,
}

impl Rotation {
    pub fn new(initial: [f64; 3]) -> Self {
        let invariants = InvariantSet::builder(3)
            .energy("H", energy(), Quadrature::Polynomial)
            .conserved("z", Expr::var(2), Quadrature::Polynomial)
            .build()
            .unwrap();
        Self {
            invariants,
            initial: DVector::from_row_slice(&initial),
        }
    }
}

impl PhysicalModel for Rotation {
    fn dimension(&self) -> usize {
        3
    }

    fn invariants(&self) -> &InvariantSet {
        &self.invariants
    }

    fn apply_structure(&self, _state: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
        rotate(w)
    }

    fn initial_state(&self) -> DVector<f64> {
        self.initial.clone()
    }

    fn name(&self) -> &str {
        "Rotation"
    }
}

// =================================================================================================
// RootConstrained: conserved sqrt(z), undefined for z < 0
// =================================================================================================

/// Rotation with the conserved invariant `sqrt(z)`
///
/// Any state with `z < 0` is outside the domain of the invariant.
pub struct RootConstrained {
    invariants: InvariantSet,
    initial: DVector<f64>,
}

impl RootConstrained {
    pub fn new(initial: [f64; 3]) -> Self {
        let invariants = InvariantSet::builder(3)
            .energy("H", energy(), Quadrature::Polynomial)
            .conserved("root z", Expr::var(2).sqrt(), Quadrature::Exact)
            .build()
            .unwrap();
        Self {
            invariants,
            initial: DVector::from_row_slice(&initial),
        }
    }
}

impl PhysicalModel for RootConstrained {
    fn dimension(&self) -> usize {
        3
    }

    fn invariants(&self) -> &InvariantSet {
        &self.invariants
    }

    fn apply_structure(&self, _state: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
        rotate(w)
    }

    fn initial_state(&self) -> DVector<f64> {
        self.initial.clone()
    }

    fn name(&self) -> &str {
        "Root-constrained rotation"
    }
}

// =================================================================================================
// DuplicateEnergy: conserved copy of H
// =================================================================================================

/// Rotation whose only conserved invariant is a copy of the energy
///
/// The conserved gradient is parallel to the energy gradient everywhere,
/// so the correction system is singular.
pub struct DuplicateEnergy {
    invariants: InvariantSet,
}

impl DuplicateEnergy {
    pub fn new() -> Self {
        let invariants = InvariantSet::builder(3)
            .energy("H", energy(), Quadrature::Polynomial)
            .conserved("H copy", energy(), Quadrature::Polynomial)
            .build()
            .unwrap();
        Self { invariants }
    }
}

impl PhysicalModel for DuplicateEnergy {
    fn dimension(&self) -> usize {
        3
    }

    fn invariants(&self) -> &InvariantSet {
        &self.invariants
    }

    fn apply_structure(&self, _state: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
        rotate(w)
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::from_vec(vec![1.0, 0.0, 0.5])
    }

    fn name(&self) -> &str {
        "Duplicate energy"
    }
}
