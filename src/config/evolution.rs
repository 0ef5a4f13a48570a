use super::traits::ConfigSection;
use crate::error::{DistevoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSettings {
    /// Generation budget
    pub max_genomes: u64,
    pub seed: Option<u64>,
    pub max_mutations: u32,
    /// Fitness log and global best are written here when set
    pub output_directory: Option<PathBuf>,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            max_genomes: 1000,
            seed: None,
            max_mutations: 2,
            output_directory: None,
        }
    }
}

impl ConfigSection for EvolutionSettings {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.max_genomes == 0 {
            return Err(DistevoError::Configuration(
                "evolution.max_genomes must be at least 1".to_string(),
            ));
        }
        if self.max_mutations == 0 {
            return Err(DistevoError::Configuration(
                "evolution.max_mutations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
