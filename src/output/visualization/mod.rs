//! Visualization of integration results
//!
//! This module provides diagnostic plots using the `plotters` library.
//!
//! # Organization
//!
//! - **config**: Shared plot configuration (`PlotConfig`)
//! - **diagnostics**: Invariant drift, convergence and profile plots
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use avfet_rs::output::visualization::{plot_invariant_drift, PlotConfig};
//!
//! let trajectory = AvfetIntegrator::new().solve(&scenario, &config)?;
//!
//! // Default config
//! plot_invariant_drift(&trajectory, "drift.png", None)?;
//!
//! // Custom title
//! let plot = PlotConfig::drift("Kepler, s = 2");
//! plot_invariant_drift(&trajectory, "drift.svg", Some(&plot))?;
//! ```
//!
//! # Which Function
//!
//! | Use Case | Function |
//! |----------|----------|
//! | Conservation check over time | `plot_invariant_drift` |
//! | Order of accuracy | `plot_convergence` |
//! | Spatial snapshots of a grid model | `plot_profiles` |

pub mod config;
pub mod diagnostics;

pub use config::{IntoOptionalTitle, NO_TITLE, PlotConfig};

pub use diagnostics::{plot_convergence, plot_invariant_drift, plot_profiles};
