//! Per-step diagnostic sinks
//!
//! The time stepper hands every accepted record to a [`LogSink`] as soon as
//! the step is accepted, so a run that fails half-way still leaves the
//! accepted prefix on disk.
//!
//! Available sinks:
//!
//! - [`NullSink`]: discards everything
//! - [`ConsoleSink`]: one `log::info!` line per step
//! - [`crate::output::export::CsvSink`]: invariant history as CSV
//! - [`crate::output::SnapshotSink`]: full states as JSON lines
//! - [`SinkChain`]: fan-out to several sinks

use nalgebra::DVector;

use crate::error::OutputError;
use crate::solver::StepRecord;

/// Receiver of accepted steps
pub trait LogSink {
    /// Called once before the initial record, with the invariant names
    fn begin(&mut self, _invariant_names: &[String]) -> Result<(), OutputError> {
        Ok(())
    }

    /// Called for the initial condition and after every accepted step
    fn record(&mut self, record: &StepRecord, state: &DVector<f64>) -> Result<(), OutputError>;

    /// Called once after the last step
    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Sink that drops every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn record(&mut self, _record: &StepRecord, _state: &DVector<f64>) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Sink that logs invariant values through the `log` facade
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    names: Vec<String>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for ConsoleSink {
    fn begin(&mut self, invariant_names: &[String]) -> Result<(), OutputError> {
        self.names = invariant_names.to_vec();
        Ok(())
    }

    fn record(&mut self, record: &StepRecord, _state: &DVector<f64>) -> Result<(), OutputError> {
        let values: Vec<String> = self
            .names
            .iter()
            .zip(&record.invariant_values)
            .map(|(name, value)| format!("{} = {:.16e}", name, value))
            .collect();
        log::info!(
            "t = {:.6} | {} | D = {:.3e} | {} its",
            record.time,
            values.join(", "),
            record.dissipation,
            record.newton_iterations
        );
        Ok(())
    }
}

/// Forward every call to a list of sinks, in order
#[derive(Default)]
pub struct SinkChain<'a> {
    sinks: Vec<&'a mut dyn LogSink>,
}

impl<'a> SinkChain<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Builder pattern: append a sink
    pub fn with(mut self, sink: &'a mut dyn LogSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for SinkChain<'_> {
    fn begin(&mut self, invariant_names: &[String]) -> Result<(), OutputError> {
        for sink in self.sinks.iter_mut() {
            sink.begin(invariant_names)?;
        }
        Ok(())
    }

    fn record(&mut self, record: &StepRecord, state: &DVector<f64>) -> Result<(), OutputError> {
        for sink in self.sinks.iter_mut() {
            sink.record(record, state)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        for sink in self.sinks.iter_mut() {
            sink.finish()?;
        }
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
