//! Output of integration results
//!
//! - **Sinks**: per-step streaming ([`LogSink`]) to the log, CSV or JSON lines
//! - **Export**: whole-trajectory CSV export after a run
//! - **Visualization**: PNG/SVG plots using plotters
//!
//! # Architecture
//!
//! ```text
//! output/
//! ├── mod.rs              ← This file
//! ├── sink.rs             ← LogSink trait, console sink, fan-out
//! ├── snapshot.rs         ← JSON-lines state snapshots
//! ├── export/             ← Data export
//! │   ├── mod.rs
//! │   └── csv.rs
//! └── visualization/      ← Plots
//!     ├── mod.rs
//!     ├── config.rs
//!     └── diagnostics.rs
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use avfet_rs::output::{CsvSink, SinkChain, SnapshotSink, plot_invariant_drift};
//!
//! let mut csv = CsvSink::create("kepler.csv", CsvConfig::default())?;
//! let mut snapshots = SnapshotSink::with_stride("kepler.jsonl", 10)?;
//! let mut sinks = SinkChain::new().with(&mut csv).with(&mut snapshots);
//!
//! let trajectory = AvfetIntegrator::new().solve_with_sink(&scenario, &config, &mut sinks)?;
//! plot_invariant_drift(&trajectory, "drift.png", None)?;
//! ```
//!
//! A sink failure aborts the run: the integrator does not keep going with a
//! half-written log.

pub mod export;
pub mod sink;
pub mod snapshot;
pub mod visualization;

// Re-export commonly used items for convenience
pub use sink::{ConsoleSink, LogSink, NullSink, SinkChain};
pub use snapshot::{Snapshot, SnapshotSink, read_snapshots};

pub use export::{CsvConfig, CsvExporter, CsvMetadata, CsvSink, Exporter, export_trajectory_csv};

pub use visualization::{PlotConfig, plot_convergence, plot_invariant_drift, plot_profiles};
