//! Discretization of one time step
//!
//! - [`quadrature`]: Gauss–Legendre rules selected by exactness degree
//! - [`basis`]: continuous trial space for the state, discontinuous space for
//!   auxiliary fields and test functions, and their tabulation at quadrature nodes

pub mod basis;
pub mod quadrature;

pub use basis::{LagrangeBasis, Tabulation, TimeElement};
pub use quadrature::QuadratureRule;
