//! Export module for integration results.
//!
//! # Architecture
//!
//! This module defines the [`Exporter`] trait that abstracts the export format.
//! Each format is an independent implementation in its own sub-module.
//! Adding a new format means adding a file, without modifying existing code.
//!
//! # Available formats
//!
//! | Format     | Module                          |
//! |------------|---------------------------------|
//! | CSV        | [`csv`]                         |
//! | JSON lines | [`crate::output::snapshot`] (states only, streaming) |
//!
//! # Usage example
//!
//! ```rust,ignore
//! use avfet_rs::output::export::{CsvExporter, Exporter};
//!
//! let exporter = CsvExporter::default();
//!
//! // Invariant history
//! exporter.export_invariants(&trajectory, Path::new("kepler.csv"))?;
//!
//! // States, downsampled to 200 rows
//! exporter.export_states(&trajectory, &model.component_names(), Some(200), Path::new("states.csv"))?;
//! ```

pub mod csv;

pub use csv::{
    CsvConfig, CsvExporter, CsvMetadata, CsvSink, append_convergence_point, export_states_csv,
    export_trajectory_csv, read_convergence_points,
};

use std::path::Path;

use crate::solver::Trajectory;

/// Abstraction trait for all export formats.
///
/// # Associated type `Error`
///
/// Each format manages its own errors via the associated type.
/// This avoids systematic boxing (`Box<dyn Error>`) and allows
/// the caller to react precisely based on the error type.
///
/// # Parameter `n_points`
///
/// - `None`: exports every accepted state
/// - `Some(n)`: uniformly downsamples to `n` rows, always keeping the
///   **first and last** states
pub trait Exporter {
    /// Error type specific to this export format.
    type Error: std::error::Error;

    /// Exports the invariant history (time, invariants, dissipation).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the path is invalid or the directory does not exist
    /// - `trajectory` contains no data or non-finite values
    fn export_invariants(&self, trajectory: &Trajectory, path: &Path) -> Result<(), Self::Error>;

    /// Exports the state history, one column per component name.
    fn export_states(
        &self,
        trajectory: &Trajectory,
        component_names: &[String],
        n_points: Option<usize>,
        path: &Path,
    ) -> Result<(), Self::Error>;
}
