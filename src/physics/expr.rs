//! Symbolic scalar expressions over the state vector
//!
//! Invariants are written once as an [`Expr`] tree; their gradients are
//! obtained by symbolic differentiation and evaluated at quadrature nodes.
//!
//! # Example
//!
//! ```rust
//! use avfet_rs::physics::expr::{Expr, sqrt};
//!
//! // 1 / |q| for q = (z2, z3)
//! let q0 = Expr::var(2);
//! let q1 = Expr::var(3);
//! let inv_r = 1.0 / sqrt(q0.clone() * q0 + q1.clone() * q1);
//!
//! let grad = inv_r.gradient(4);
//! let value = grad[2].eval(&[0.0, 0.0, 2.0, 0.0]).unwrap();
//! assert!((value + 0.25).abs() < 1e-15);
//! ```
//!
//! Evaluation is checked: a logarithm of a non-positive number, a square root
//! of a negative number, a division by zero or any non-finite intermediate
//! returns an [`EvalError`] instead of propagating NaN.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::EvalError;

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(f64),
    /// Component `i` of the state vector
    Variable(usize),
    Sum(Box<Expr>, Box<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Quotient(Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    PowI(Box<Expr>, i32),
    Sqrt(Box<Expr>),
    Ln(Box<Expr>),
    Exp(Box<Expr>),
}

// =================================================================================================
// Construction (with light simplification)
// =================================================================================================

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Constant(value)
    }

    pub fn var(index: usize) -> Self {
        Expr::Variable(index)
    }

    /// Sum of a sequence of expressions (zero when empty)
    ///
    /// Terms are combined pairwise, so the tree depth grows with the
    /// logarithm of the number of terms and long sums over grid cells can
    /// be differentiated and evaluated recursively.
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Self {
        let mut level: Vec<Expr> = terms.into_iter().collect();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut terms = level.into_iter();
            while let Some(a) = terms.next() {
                next.push(match terms.next() {
                    Some(b) => a + b,
                    None => a,
                });
            }
            level = next;
        }
        level.pop().unwrap_or(Expr::Constant(0.0))
    }

    /// Height of the expression tree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        match self {
            Expr::Constant(_) | Expr::Variable(_) => 1,
            Expr::Sum(a, b) | Expr::Product(a, b) | Expr::Quotient(a, b) => {
                1 + a.depth().max(b.depth())
            }
            Expr::Negate(a) | Expr::PowI(a, _) | Expr::Sqrt(a) | Expr::Ln(a) | Expr::Exp(a) => {
                1 + a.depth()
            }
        }
    }

    fn as_constant(&self) -> Option<f64> {
        match self {
            Expr::Constant(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_constant() == Some(0.0)
    }

    fn is_one(&self) -> bool {
        self.as_constant() == Some(1.0)
    }

    fn make_sum(a: Expr, b: Expr) -> Expr {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::Constant(x + y),
            (Some(x), _) if x == 0.0 => b,
            (_, Some(y)) if y == 0.0 => a,
            _ => Expr::Sum(Box::new(a), Box::new(b)),
        }
    }

    fn make_product(a: Expr, b: Expr) -> Expr {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::Constant(x * y),
            (Some(x), _) if x == 0.0 => Expr::Constant(0.0),
            (_, Some(y)) if y == 0.0 => Expr::Constant(0.0),
            (Some(x), _) if x == 1.0 => b,
            (_, Some(y)) if y == 1.0 => a,
            (Some(x), _) if x == -1.0 => Expr::make_negate(b),
            (_, Some(y)) if y == -1.0 => Expr::make_negate(a),
            _ => Expr::Product(Box::new(a), Box::new(b)),
        }
    }

    fn make_quotient(a: Expr, b: Expr) -> Expr {
        if a.is_zero() && !b.is_zero() {
            return Expr::Constant(0.0);
        }
        if b.is_one() {
            return a;
        }
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) if y != 0.0 => Expr::Constant(x / y),
            _ => Expr::Quotient(Box::new(a), Box::new(b)),
        }
    }

    fn make_negate(a: Expr) -> Expr {
        match a {
            Expr::Constant(c) => Expr::Constant(-c),
            Expr::Negate(inner) => *inner,
            other => Expr::Negate(Box::new(other)),
        }
    }

    /// Integer power
    pub fn powi(self, exponent: i32) -> Expr {
        match exponent {
            0 => Expr::Constant(1.0),
            1 => self,
            _ => match self.as_constant() {
                Some(c) if c != 0.0 || exponent > 0 => Expr::Constant(c.powi(exponent)),
                _ => Expr::PowI(Box::new(self), exponent),
            },
        }
    }

    pub fn sqrt(self) -> Expr {
        Expr::Sqrt(Box::new(self))
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(Box::new(self))
    }

    pub fn exp(self) -> Expr {
        match self.as_constant() {
            Some(c) if c == 0.0 => Expr::Constant(1.0),
            _ => Expr::Exp(Box::new(self)),
        }
    }

    // =============================================================================================
    // Differentiation
    // =============================================================================================

    /// Partial derivative with respect to state component `index`
    pub fn diff(&self, index: usize) -> Expr {
        match self {
            Expr::Constant(_) => Expr::Constant(0.0),
            Expr::Variable(i) => Expr::Constant(if *i == index { 1.0 } else { 0.0 }),
            Expr::Sum(a, b) => a.diff(index) + b.diff(index),
            Expr::Product(a, b) => {
                a.diff(index) * (**b).clone() + (**a).clone() * b.diff(index)
            }
            Expr::Quotient(a, b) => {
                let da = a.diff(index);
                let db = b.diff(index);
                da / (**b).clone() - (**a).clone() * db / (**b).clone().powi(2)
            }
            Expr::Negate(a) => -a.diff(index),
            Expr::PowI(a, n) => {
                Expr::Constant(*n as f64) * (**a).clone().powi(n - 1) * a.diff(index)
            }
            Expr::Sqrt(a) => a.diff(index) / (2.0 * self.clone()),
            Expr::Ln(a) => a.diff(index) / (**a).clone(),
            Expr::Exp(a) => self.clone() * a.diff(index),
        }
    }

    /// Symbolic gradient with respect to the first `dimension` state components
    pub fn gradient(&self, dimension: usize) -> Vec<Expr> {
        (0..dimension).map(|i| self.diff(i)).collect()
    }

    /// Largest variable index referenced, if any
    pub fn max_variable(&self) -> Option<usize> {
        match self {
            Expr::Constant(_) => None,
            Expr::Variable(i) => Some(*i),
            Expr::Sum(a, b) | Expr::Product(a, b) | Expr::Quotient(a, b) => {
                match (a.max_variable(), b.max_variable()) {
                    (Some(x), Some(y)) => Some(x.max(y)),
                    (x, y) => x.or(y),
                }
            }
            Expr::Negate(a) | Expr::PowI(a, _) | Expr::Sqrt(a) | Expr::Ln(a) | Expr::Exp(a) => {
                a.max_variable()
            }
        }
    }

    // =============================================================================================
    // Evaluation
    // =============================================================================================

    /// Evaluate at `state`, rejecting physically invalid intermediates
    pub fn eval(&self, state: &[f64]) -> Result<f64, EvalError> {
        let value = match self {
            Expr::Constant(c) => *c,
            Expr::Variable(i) => *state.get(*i).ok_or(EvalError::VariableOutOfRange {
                index: *i,
                dimension: state.len(),
            })?,
            Expr::Sum(a, b) => a.eval(state)? + b.eval(state)?,
            Expr::Product(a, b) => a.eval(state)? * b.eval(state)?,
            Expr::Quotient(a, b) => {
                let denominator = b.eval(state)?;
                if denominator == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                a.eval(state)? / denominator
            }
            Expr::Negate(a) => -a.eval(state)?,
            Expr::PowI(a, n) => {
                let base = a.eval(state)?;
                if base == 0.0 && *n < 0 {
                    return Err(EvalError::DivisionByZero);
                }
                base.powi(*n)
            }
            Expr::Sqrt(a) => {
                let argument = a.eval(state)?;
                if argument < 0.0 {
                    return Err(EvalError::NegativeSqrtArgument(argument));
                }
                argument.sqrt()
            }
            Expr::Ln(a) => {
                let argument = a.eval(state)?;
                if argument <= 0.0 {
                    return Err(EvalError::NonPositiveLogArgument(argument));
                }
                argument.ln()
            }
            Expr::Exp(a) => a.eval(state)?.exp(),
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

// =================================================================================================
// Free-function helpers
// =================================================================================================

pub fn sqrt(expr: Expr) -> Expr {
    expr.sqrt()
}

pub fn ln(expr: Expr) -> Expr {
    expr.ln()
}

pub fn exp(expr: Expr) -> Expr {
    expr.exp()
}

pub fn powi(expr: Expr, exponent: i32) -> Expr {
    expr.powi(exponent)
}

// =================================================================================================
// Operators
// =================================================================================================

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::make_sum(self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::make_sum(self, Expr::make_negate(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::make_product(self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::make_quotient(self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::make_negate(self)
    }
}

impl Add<f64> for Expr {
    type Output = Expr;
    fn add(self, rhs: f64) -> Expr {
        self + Expr::Constant(rhs)
    }
}

impl Sub<f64> for Expr {
    type Output = Expr;
    fn sub(self, rhs: f64) -> Expr {
        self - Expr::Constant(rhs)
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;
    fn mul(self, rhs: f64) -> Expr {
        self * Expr::Constant(rhs)
    }
}

impl Div<f64> for Expr {
    type Output = Expr;
    fn div(self, rhs: f64) -> Expr {
        self / Expr::Constant(rhs)
    }
}

impl Add<Expr> for f64 {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Constant(self) + rhs
    }
}

impl Sub<Expr> for f64 {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Constant(self) - rhs
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Constant(self) * rhs
    }
}

impl Div<Expr> for f64 {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Constant(self) / rhs
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(c) => write!(f, "{}", c),
            Expr::Variable(i) => write!(f, "z{}", i),
            Expr::Sum(a, b) => write!(f, "({} + {})", a, b),
            Expr::Product(a, b) => write!(f, "{}*{}", a, b),
            Expr::Quotient(a, b) => write!(f, "{}/{}", a, b),
            Expr::Negate(a) => write!(f, "-{}", a),
            Expr::PowI(a, n) => write!(f, "{}^{}", a, n),
            Expr::Sqrt(a) => write!(f, "sqrt({})", a),
            Expr::Ln(a) => write!(f, "ln({})", a),
            Expr::Exp(a) => write!(f, "exp({})", a),
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
