//! Common utilities for integration tests

#![allow(dead_code, unused_imports)]

pub mod mock_models;
pub mod test_helpers;

// Re-export commonly used items
pub use mock_models::{DuplicateEnergy, Rotation, RootConstrained};
pub use test_helpers::{assert_states_close, max_energy_balance_defect, relative_error};
