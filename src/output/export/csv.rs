//! CSV export of AV-FET trajectories
//!
//! This module writes integration data to CSV (Comma-Separated Values), which
//! is readable by Python pandas, gnuplot, spreadsheets and most analysis tools.
//!
//! # Features
//!
//! - **Invariant history**: time, every registered invariant, dissipation estimate
//! - **State history**: time and every state component (optionally downsampled)
//! - **Streaming**: [`CsvSink`] appends one line per accepted step
//! - **Convergence studies**: [`append_convergence_point`] appends `dt error` lines
//! - **Metadata support**: optional `#` header with integration parameters
//! - **Validation**: empty data, mismatched lengths, NaN or Inf
//!
//! # Quick Examples
//!
//! ## Invariant history
//!
//! ```rust,ignore
//! use avfet_rs::output::export::export_trajectory_csv;
//!
//! let trajectory = AvfetIntegrator::new().solve(&scenario, &config)?;
//! export_trajectory_csv(&trajectory, "kepler.csv", None)?;
//! ```
//!
//! **Output** (`kepler.csv`):
//! ```csv
//! time,Hamiltonian,Angular momentum,Runge-Lenz 1,Runge-Lenz 2,dissipation
//! 0.000000000000e0,-5.000000000000e-1,8.000000000000e-1,6.000000000000e-1,0.000000000000e0,0.000000000000e0
//! ...
//! ```
//!
//! ## With Metadata
//!
//! ```rust,ignore
//! use avfet_rs::output::export::{export_trajectory_csv, CsvConfig, CsvMetadata};
//!
//! let config = CsvConfig::default().with_metadata(CsvMetadata::from_trajectory(&trajectory));
//! export_trajectory_csv(&trajectory, "kepler.csv", Some(&config))?;
//! ```
//!
//! **Output** (`kepler.csv`):
//! ```csv
//! # AV-FET Integration Data
//! # Generated: 2026-02-11T15:30:00Z
//! # Model: Kepler
//! # Integrator: AV-FET
//! # Timestep: 0.19634954084936207
//! # Stages: 1
//! #
//! time,Hamiltonian,...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::DVector;

use crate::error::OutputError;
use crate::output::export::Exporter;
use crate::output::sink::LogSink;
use crate::solver::{StepRecord, Trajectory};

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Fields
///
/// - `delimiter`: Column separator (default: ',')
/// - `decimal_separator`: Decimal point character (default: '.')
/// - `precision`: Number of significant decimals (default: 12)
/// - `scientific`: Scientific notation (default: true, drifts are tiny)
/// - `include_metadata`: Add header comments with integration info
/// - `metadata`: Integration metadata to include
/// - `time_header`: Custom header for the time column
///
/// # Example
///
/// ```rust,ignore
/// let config = CsvConfig {
///     delimiter: ';',
///     precision: 16,
///     include_metadata: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places (default: 12)
    pub precision: usize,

    /// Scientific notation (default: true)
    pub scientific: bool,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    /// Metadata to include in header
    pub metadata: Option<CsvMetadata>,

    /// Custom header for time column (default: "time")
    pub time_header: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 12,
            scientific: true,
            include_metadata: false,
            metadata: None,
            time_header: "time".to_string(),
        }
    }
}

impl CsvConfig {
    /// Create config with European CSV format (semicolon, comma for decimal)
    pub fn european() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        }
    }

    /// Create config with full double precision (16 decimal places)
    pub fn high_precision() -> Self {
        Self {
            precision: 16,
            ..Default::default()
        }
    }

    /// Builder pattern: set delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder pattern: set precision
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Builder pattern: enable metadata
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata for CSV header comments
///
/// All fields are optional. Only non-None fields will be included in the CSV header.
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    /// Model name (e.g., "Kepler")
    pub model_name: Option<String>,

    /// Integrator name (e.g., "AV-FET")
    pub integrator_name: Option<String>,

    /// Step size `h`
    pub timestep: Option<f64>,

    /// Total duration `T`
    pub total_duration: Option<f64>,

    /// Stages `s`
    pub stages: Option<usize>,

    /// Additional custom parameters
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    /// Create metadata from explicit integration parameters
    pub fn from_simulation(
        model: &str,
        integrator: &str,
        timestep: f64,
        total_duration: f64,
        stages: usize,
    ) -> Self {
        Self {
            model_name: Some(model.to_string()),
            integrator_name: Some(integrator.to_string()),
            timestep: Some(timestep),
            total_duration: Some(total_duration),
            stages: Some(stages),
            ..Default::default()
        }
    }

    /// Create metadata from the metadata map of a trajectory
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let text = |key: &str| trajectory.metadata.get(key).cloned();
        let number = |key: &str| trajectory.metadata.get(key).and_then(|v| v.parse::<f64>().ok());

        let mut metadata = Self {
            model_name: text("model"),
            integrator_name: text("integrator"),
            timestep: number("timestep"),
            total_duration: number("total_duration"),
            stages: trajectory
                .metadata
                .get("stages")
                .and_then(|v| v.parse::<usize>().ok()),
            ..Default::default()
        };

        let mut extra: Vec<(&String, &String)> = trajectory
            .metadata
            .iter()
            .filter(|(key, _)| {
                !matches!(
                    key.as_str(),
                    "model" | "integrator" | "timestep" | "total_duration" | "stages"
                )
            })
            .collect();
        extra.sort();
        for (key, value) in extra {
            metadata.add_custom(key.clone(), value.clone());
        }
        metadata
    }

    /// Add custom parameter
    pub fn add_custom(&mut self, key: String, value: String) {
        self.custom.push((key, value));
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Write metadata header comments
fn write_metadata_header<W: Write>(writer: &mut W, metadata: &CsvMetadata) -> Result<(), OutputError> {
    writeln!(writer, "# AV-FET Integration Data")?;

    // Timestamp (current time)
    let now = chrono::Utc::now();
    writeln!(writer, "# Generated: {}", now.to_rfc3339())?;

    if let Some(model) = &metadata.model_name {
        writeln!(writer, "# Model: {}", model)?;
    }
    if let Some(integrator) = &metadata.integrator_name {
        writeln!(writer, "# Integrator: {}", integrator)?;
    }
    if let Some(timestep) = metadata.timestep {
        writeln!(writer, "# Timestep: {}", timestep)?;
    }
    if let Some(total_duration) = metadata.total_duration {
        writeln!(writer, "# Total Duration: {}", total_duration)?;
    }
    if let Some(stages) = metadata.stages {
        writeln!(writer, "# Stages: {}", stages)?;
    }

    for (key, value) in &metadata.custom {
        writeln!(writer, "# {}: {}", key, value)?;
    }

    writeln!(writer, "#")?;

    Ok(())
}

/// Format number with configured precision, notation and decimal separator
fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = if config.scientific {
        format!("{:.prec$e}", value, prec = config.precision)
    } else {
        format!("{:.prec$}", value, prec = config.precision)
    };

    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

fn write_row<W: Write>(writer: &mut W, values: &[f64], config: &CsvConfig) -> Result<(), OutputError> {
    let row: Vec<String> = values.iter().map(|v| format_number(*v, config)).collect();
    writeln!(writer, "{}", row.join(&config.delimiter.to_string()))?;
    Ok(())
}

fn invariant_header(names: &[String], config: &CsvConfig) -> String {
    let mut header = vec![config.time_header.clone()];
    header.extend(names.iter().cloned());
    header.push("dissipation".to_string());
    header.join(&config.delimiter.to_string())
}

fn record_row(record: &StepRecord) -> Vec<f64> {
    let mut row = Vec::with_capacity(record.invariant_values.len() + 2);
    row.push(record.time);
    row.extend_from_slice(&record.invariant_values);
    row.push(record.dissipation);
    row
}

/// Indices of a uniform downsampling to `n_points`, first and last always kept
fn downsample_indices(len: usize, n_points: Option<usize>) -> Vec<usize> {
    match n_points {
        Some(n) if n >= 2 && n < len => {
            let mut indices: Vec<usize> = (0..n)
                .map(|i| ((i as f64) * (len - 1) as f64 / (n - 1) as f64).round() as usize)
                .collect();
            indices.dedup();
            indices
        }
        _ => (0..len).collect(),
    }
}

fn validate_trajectory(trajectory: &Trajectory) -> Result<(), OutputError> {
    if trajectory.is_empty() {
        return Err(OutputError::InvalidData(
            "Empty data: trajectory has no records".to_string(),
        ));
    }
    if trajectory.records.len() != trajectory.time_points.len()
        || trajectory.states.len() != trajectory.time_points.len()
    {
        return Err(OutputError::InvalidData(format!(
            "Data length mismatch: {} time points, {} records, {} states",
            trajectory.time_points.len(),
            trajectory.records.len(),
            trajectory.states.len()
        )));
    }
    if trajectory.time_points.iter().any(|t| !t.is_finite()) {
        return Err(OutputError::InvalidData(
            "Invalid data: NaN or Inf detected in time series".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Export Functions
// =============================================================================

/// Export the invariant history of a trajectory
///
/// Columns: time, one column per invariant (registration order), dissipation.
///
/// # Errors
///
/// - Empty trajectory
/// - Mismatched lengths
/// - NaN or Inf values
/// - File creation errors
pub fn export_trajectory_csv(
    trajectory: &Trajectory,
    output_path: impl AsRef<Path>,
    configuration: Option<&CsvConfig>,
) -> Result<(), OutputError> {
    // ============================= Validation =============================

    validate_trajectory(trajectory)?;
    for record in &trajectory.records {
        if record.invariant_values.len() != trajectory.invariant_names.len() {
            return Err(OutputError::InvalidData(format!(
                "Record {} has {} invariant values for {} names",
                record.step,
                record.invariant_values.len(),
                trajectory.invariant_names.len()
            )));
        }
        if record.invariant_values.iter().any(|v| !v.is_finite()) {
            return Err(OutputError::InvalidData(format!(
                "Invalid data: NaN or Inf detected in invariants of record {}",
                record.step
            )));
        }
    }

    // ============================= Configuration ==========================

    let binding = CsvConfig::default();
    let configuration = configuration.unwrap_or(&binding);

    // ============================= Write ==================================

    let mut file = BufWriter::new(File::create(output_path)?);

    if configuration.include_metadata
        && let Some(metadata) = &configuration.metadata
    {
        write_metadata_header(&mut file, metadata)?;
    }

    writeln!(file, "{}", invariant_header(&trajectory.invariant_names, configuration))?;
    for record in &trajectory.records {
        write_row(&mut file, &record_row(record), configuration)?;
    }
    file.flush()?;

    Ok(())
}

/// Export the state history of a trajectory
///
/// Columns: time, then one column per entry of `component_names`.
/// `n_points` downsamples uniformly, keeping the first and last state.
pub fn export_states_csv(
    trajectory: &Trajectory,
    component_names: &[String],
    n_points: Option<usize>,
    output_path: impl AsRef<Path>,
    configuration: Option<&CsvConfig>,
) -> Result<(), OutputError> {
    // ============================= Validation =============================

    validate_trajectory(trajectory)?;
    if let Some(state) = trajectory.states.iter().find(|s| s.len() != component_names.len()) {
        return Err(OutputError::InvalidData(format!(
            "Data length mismatch: state of length {} versus {} component names",
            state.len(),
            component_names.len()
        )));
    }
    if trajectory.states.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
        return Err(OutputError::InvalidData(
            "Invalid data: NaN or Inf detected in states".to_string(),
        ));
    }

    let binding = CsvConfig::default();
    let configuration = configuration.unwrap_or(&binding);

    // ============================= Write ==================================

    let mut file = BufWriter::new(File::create(output_path)?);

    if configuration.include_metadata
        && let Some(metadata) = &configuration.metadata
    {
        write_metadata_header(&mut file, metadata)?;
    }

    let mut header = vec![configuration.time_header.clone()];
    header.extend(component_names.iter().cloned());
    writeln!(file, "{}", header.join(&configuration.delimiter.to_string()))?;

    for index in downsample_indices(trajectory.len(), n_points) {
        let mut row = vec![trajectory.time_points[index]];
        row.extend(trajectory.states[index].iter());
        write_row(&mut file, &row, configuration)?;
    }
    file.flush()?;

    Ok(())
}

/// Append one `dt error` line to a convergence file (created if missing)
pub fn append_convergence_point(
    output_path: impl AsRef<Path>,
    timestep: f64,
    error: f64,
) -> Result<(), OutputError> {
    if !timestep.is_finite() || !error.is_finite() {
        return Err(OutputError::InvalidData(format!(
            "Invalid convergence point: dt = {}, error = {}",
            timestep, error
        )));
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_path)?;
    writeln!(file, "{} {}", timestep, error)?;
    Ok(())
}

/// Read back a file written by [`append_convergence_point`]
pub fn read_convergence_points(path: impl AsRef<Path>) -> Result<Vec<(f64, f64)>, OutputError> {
    let text = std::fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace().map(str::parse::<f64>);
            match (fields.next(), fields.next()) {
                (Some(Ok(dt)), Some(Ok(error))) => Ok((dt, error)),
                _ => Err(OutputError::InvalidData(format!(
                    "Malformed convergence line `{}`",
                    line
                ))),
            }
        })
        .collect()
}

// =============================================================================
// Exporter / Sink
// =============================================================================

/// [`Exporter`] writing CSV files
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    pub config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }
}

impl Exporter for CsvExporter {
    type Error = OutputError;

    fn export_invariants(&self, trajectory: &Trajectory, path: &Path) -> Result<(), Self::Error> {
        export_trajectory_csv(trajectory, path, Some(&self.config))
    }

    fn export_states(
        &self,
        trajectory: &Trajectory,
        component_names: &[String],
        n_points: Option<usize>,
        path: &Path,
    ) -> Result<(), Self::Error> {
        export_states_csv(trajectory, component_names, n_points, path, Some(&self.config))
    }
}

/// [`LogSink`] appending the invariant history line by line
///
/// Every line is flushed when written, so the file holds exactly the
/// accepted steps even if the run halts.
pub struct CsvSink {
    writer: BufWriter<File>,
    config: CsvConfig,
}

impl CsvSink {
    pub fn create(path: impl AsRef<Path>, config: CsvConfig) -> Result<Self, OutputError> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            config,
        })
    }
}

impl LogSink for CsvSink {
    fn begin(&mut self, invariant_names: &[String]) -> Result<(), OutputError> {
        if self.config.include_metadata
            && let Some(metadata) = &self.config.metadata
        {
            write_metadata_header(&mut self.writer, metadata)?;
        }
        writeln!(self.writer, "{}", invariant_header(invariant_names, &self.config))?;
        self.writer.flush()?;
        Ok(())
    }

    fn record(&mut self, record: &StepRecord, _state: &DVector<f64>) -> Result<(), OutputError> {
        write_row(&mut self.writer, &record_row(record), &self.config)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
