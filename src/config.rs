use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QnetError, QnetResult};
use crate::quantum::gates;

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Quantum channel delay
    pub quantum_delay_ns: u64,
    /// Delay of the classical correction message
    pub classical_delay_ns: u64,
    /// Stored on channels; qubits are always delivered
    pub loss_probability: f64,
    /// Seed for measurement randomness, entropy when absent
    pub seed: Option<u64>,
    /// Gates preparing the teleported qubit from |0>
    pub preparation: Vec<String>,
    /// Trials for the statistics experiments
    pub trials: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            quantum_delay_ns: 2000,
            classical_delay_ns: 100,
            loss_probability: 0.0,
            seed: None,
            preparation: vec!["x".to_string(), "h".to_string()],
            trials: 1000,
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> QnetResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> QnetResult<Self> {
        let config: SimulationConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QnetResult<()> {
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(QnetError::Config(format!(
                "loss_probability must be within [0, 1], got {}",
                self.loss_probability
            )));
        }
        for name in &self.preparation {
            let gate = gates::by_name(name)?;
            if gate.nrows() != 2 {
                return Err(QnetError::Config(format!(
                    "preparation gate {} is not a single-qubit gate",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn quantum_delay(&self) -> Duration {
        Duration::from_nanos(self.quantum_delay_ns)
    }

    pub fn classical_delay(&self) -> Duration {
        Duration::from_nanos(self.classical_delay_ns)
    }

    /// Seed for a named component, distinct per name when a seed is set
    pub fn component_seed(&self, salt: u64) -> Option<u64> {
        self.seed.map(|s| s.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(salt))
    }
}
