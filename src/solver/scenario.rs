//! Simulation scenario definition
//!
//! A scenario combines a physical model with the initial state to integrate from.
use nalgebra::DVector;

use crate::error::ConfigError;
use crate::physics::traits::PhysicalModel;

/// Simulation scenario
///
/// Defines a specific case to simulate:
/// - Physical model (equations and invariants)
/// - Initial state
///
/// # Design
///
/// The same scenario can be integrated with different configurations.
/// This is the "WHAT to solve" (not "HOW to solve").
///
/// # Examples
///
/// ```rust,ignore
/// let scenario = Scenario::new(Box::new(KeplerProblem::new()));
///
/// let coarse = integrator.solve(&scenario, &IntegratorConfiguration::new(0.1, 6.28, 1))?;
/// let fine = integrator.solve(&scenario, &IntegratorConfiguration::new(0.05, 6.28, 2))?;
/// ```
pub struct Scenario {
    /// Physical model (equations)
    pub model: Box<dyn PhysicalModel>,

    /// State at `t = 0`
    pub initial_state: DVector<f64>,
}

impl Scenario {
    /// Create a scenario starting from the model's default initial state
    pub fn new(model: Box<dyn PhysicalModel>) -> Self {
        let initial_state = model.initial_state();
        Self { model, initial_state }
    }

    /// Create a scenario with an explicit initial state
    pub fn with_initial_state(model: Box<dyn PhysicalModel>, initial_state: DVector<f64>) -> Self {
        Self { model, initial_state }
    }

    /// Verify that the initial state fits the model
    pub fn validate(&self) -> Result<(), ConfigError> {
        let expected = self.model.dimension();
        if self.initial_state.len() != expected {
            return Err(ConfigError::StateDimension {
                expected,
                found: self.initial_state.len(),
            });
        }
        if self.initial_state.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "initial_state".to_string(),
                reason: "contains NaN or Inf".to_string(),
            });
        }
        if self.model.invariants().dimension() != expected {
            return Err(ConfigError::StateDimension {
                expected,
                found: self.model.invariants().dimension(),
            });
        }
        Ok(())
    }

    /// Get model name
    pub fn get_model_name(&self) -> &str {
        self.model.name()
    }

    /// State dimension
    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.get_model_name())
            .field("dimension", &self.dimension())
            .field("dissipative", &self.model.is_dissipative())
            .field("invariants", &self.model.invariants().names())
            .field("initial_state", &self.initial_state.as_slice())
            .finish()
    }
}

// ================================================================================================
// Tests
// ================================================================================================
