use super::traits::ConfigSection;
use crate::error::{DistevoError, Result};
use serde::{Deserialize, Serialize};

/// Shape of the bundled reference genome and its synthetic trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub number_inputs: usize,
    pub number_outputs: usize,
    pub training_iterations: usize,
    pub learning_rate: f64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            number_inputs: 3,
            number_outputs: 1,
            training_iterations: 10,
            learning_rate: 0.1,
        }
    }
}

impl ConfigSection for NetworkSettings {
    fn section_name() -> &'static str {
        "network"
    }

    fn validate(&self) -> Result<()> {
        if self.number_inputs == 0 || self.number_outputs == 0 {
            return Err(DistevoError::Configuration(
                "network needs at least one input and one output".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(DistevoError::Configuration(format!(
                "network.learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
