use super::traits::{check_rate, ConfigSection};
use crate::engines::generation::distance::NeatDistance;
use crate::engines::generation::operators::OperatorRates;
use crate::error::{DistevoError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Neat,
    Island,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciationSettings {
    pub strategy: StrategyKind,
    pub mutation_rate: f64,
    pub intra_group_crossover_rate: f64,
    pub inter_group_crossover_rate: f64,

    // island
    pub number_of_islands: usize,
    pub max_island_size: usize,

    // neat
    pub species_threshold: f64,
    pub neat_c1: f64,
    pub neat_c2: f64,
    pub neat_c3: f64,
    pub stagnation_limit: Option<u64>,
}

impl Default for SpeciationSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Island,
            mutation_rate: 0.70,
            intra_group_crossover_rate: 0.20,
            inter_group_crossover_rate: 0.10,
            number_of_islands: 4,
            max_island_size: 10,
            species_threshold: 2.0,
            neat_c1: 1.0,
            neat_c2: 1.0,
            neat_c3: 0.0,
            stagnation_limit: None,
        }
    }
}

impl SpeciationSettings {
    pub fn operator_rates(&self) -> Result<OperatorRates> {
        OperatorRates::new(
            self.mutation_rate,
            self.intra_group_crossover_rate,
            self.inter_group_crossover_rate,
        )
    }

    pub fn neat_distance(&self) -> NeatDistance {
        NeatDistance::new(self.neat_c1, self.neat_c2, self.neat_c3)
    }
}

impl ConfigSection for SpeciationSettings {
    fn section_name() -> &'static str {
        "speciation"
    }

    fn validate(&self) -> Result<()> {
        let section = Self::section_name();
        check_rate(section, "mutation_rate", self.mutation_rate)?;
        check_rate(section, "intra_group_crossover_rate", self.intra_group_crossover_rate)?;
        check_rate(section, "inter_group_crossover_rate", self.inter_group_crossover_rate)?;
        self.operator_rates()?;

        match self.strategy {
            StrategyKind::Island => {
                if self.number_of_islands == 0 || self.max_island_size == 0 {
                    return Err(DistevoError::Configuration(
                        "speciation.number_of_islands and max_island_size must be at least 1".to_string(),
                    ));
                }
            }
            StrategyKind::Neat => {
                if !(self.species_threshold > 0.0) {
                    return Err(DistevoError::Configuration(format!(
                        "speciation.species_threshold must be positive, got {}",
                        self.species_threshold
                    )));
                }
                check_rate(section, "neat_c1", self.neat_c1)?;
                check_rate(section, "neat_c2", self.neat_c2)?;
                check_rate(section, "neat_c3", self.neat_c3)?;
                if self.stagnation_limit == Some(0) {
                    return Err(DistevoError::Configuration(
                        "speciation.stagnation_limit must be at least 1 when set".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
