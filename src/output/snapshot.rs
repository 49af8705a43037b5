//! JSON-lines state snapshots
//!
//! One JSON object per accepted step (every `stride`-th step, the initial
//! condition always included):
//!
//! ```text
//! {"step":0,"time":0.0,"state":[0.0,2.0,0.4,0.0],"invariants":[-0.5,0.8,0.6,0.0]}
//! {"step":1,"time":0.19634954084936207,"state":[...],"invariants":[...]}
//! ```
//!
//! The format is meant for external visualisation tools; [`read_snapshots`]
//! parses it back.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::OutputError;
use crate::output::sink::LogSink;
use crate::solver::StepRecord;

/// One line of a snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: usize,
    pub time: f64,
    pub state: Vec<f64>,
    pub invariants: Vec<f64>,
}

/// [`LogSink`] writing [`Snapshot`] lines
pub struct SnapshotSink {
    writer: BufWriter<File>,
    stride: usize,
}

impl SnapshotSink {
    /// Write every accepted step
    pub fn create(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        Self::with_stride(path, 1)
    }

    /// Write every `stride`-th step (the initial record is always written)
    pub fn with_stride(path: impl AsRef<Path>, stride: usize) -> Result<Self, OutputError> {
        if stride == 0 {
            return Err(OutputError::InvalidData("Snapshot stride must be positive".to_string()));
        }
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            stride,
        })
    }
}

impl LogSink for SnapshotSink {
    fn record(&mut self, record: &StepRecord, state: &DVector<f64>) -> Result<(), OutputError> {
        if record.step % self.stride != 0 {
            return Ok(());
        }
        let snapshot = Snapshot {
            step: record.step,
            time: record.time,
            state: state.iter().copied().collect(),
            invariants: record.invariant_values.clone(),
        };
        serde_json::to_writer(&mut self.writer, &snapshot)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Parse a snapshot file
pub fn read_snapshots(path: impl AsRef<Path>) -> Result<Vec<Snapshot>, OutputError> {
    let reader = BufReader::new(File::open(path)?);
    let mut snapshots = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        snapshots.push(serde_json::from_str(&line)?);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn record(step: usize) -> StepRecord {
        StepRecord {
            step,
            time: 0.25 * step as f64,
            invariant_values: vec![1.0, -2.0],
            dissipation: 0.0,
            newton_iterations: 1,
            residual_norm: 0.0,
        }
    }

    #[test]
    fn test_snapshots_are_read_back() {
        let file = NamedTempFile::new().unwrap();
        {
            let mut sink = SnapshotSink::with_stride(file.path(), 2).unwrap();
            for step in 0..5 {
                let state = DVector::from_element(3, step as f64);
                sink.record(&record(step), &state).unwrap();
            }
            sink.finish().unwrap();
        }

        let snapshots = read_snapshots(file.path()).unwrap();
        let steps: Vec<usize> = snapshots.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![0, 2, 4]);
        assert_eq!(snapshots[1].state, vec![2.0; 3]);
        assert_eq!(snapshots[2].time, 1.0);
        assert_eq!(snapshots[0].invariants, vec![1.0, -2.0]);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let file = NamedTempFile::new().unwrap();
        assert!(SnapshotSink::with_stride(file.path(), 0).is_err());
    }
}
