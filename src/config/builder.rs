use super::manager::AppConfig;
use crate::engines::evaluation::trainer::SyntheticTrainer;
use crate::engines::generation::evolution_engine::{EvolutionConfig, EvolutionEngine};
use crate::engines::generation::island::IslandSpeciationStrategy;
use crate::engines::generation::neat::{NeatSettings, NeatSpeciationStrategy};
use crate::engines::generation::network::{network_operators, NetworkGenome};
use crate::engines::generation::strategy::SpeciationStrategy;
use crate::config::speciation::StrategyKind;
use crate::error::Result;

impl AppConfig {
    pub fn seed_genome(&self) -> NetworkGenome {
        NetworkGenome::minimal(self.network.number_inputs, self.network.number_outputs)
    }

    pub fn build_strategy(&self) -> Result<Box<dyn SpeciationStrategy<NetworkGenome>>> {
        let speciation = &self.speciation;
        let rates = speciation.operator_rates()?;

        let strategy: Box<dyn SpeciationStrategy<NetworkGenome>> = match speciation.strategy {
            StrategyKind::Island => Box::new(IslandSpeciationStrategy::new(
                speciation.number_of_islands,
                speciation.max_island_size,
                rates,
                self.seed_genome(),
            )?),
            StrategyKind::Neat => {
                let settings = NeatSettings {
                    rates,
                    species_threshold: speciation.species_threshold,
                    distance: speciation.neat_distance(),
                    stagnation_limit: speciation.stagnation_limit,
                    shuffle_seed: self.shuffle_seed(),
                };
                Box::new(NeatSpeciationStrategy::new(settings, self.seed_genome())?)
            }
        };
        Ok(strategy)
    }

    /// Species permutation seed: the run seed when set, otherwise fresh entropy
    pub(crate) fn shuffle_seed(&self) -> u64 {
        self.evolution.seed.unwrap_or_else(rand::random)
    }

    pub fn build_engine(&self) -> Result<EvolutionEngine<NetworkGenome>> {
        let config = EvolutionConfig {
            max_genomes: self.evolution.max_genomes,
            seed: self.evolution.seed,
            output_directory: self.evolution.output_directory.clone(),
        };
        EvolutionEngine::new(
            config,
            self.build_strategy()?,
            network_operators(self.evolution.max_mutations),
        )
    }

    pub fn trainer(&self) -> SyntheticTrainer {
        SyntheticTrainer {
            iterations: self.network.training_iterations,
            learning_rate: self.network.learning_rate,
            ..SyntheticTrainer::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_configured_strategy() {
        let mut config = AppConfig::default();
        assert_eq!(config.build_strategy().unwrap().name(), "island");
        assert_eq!(config.build_strategy().unwrap().group_count(), 4);

        config.speciation.strategy = StrategyKind::Neat;
        let neat = config.build_strategy().unwrap();
        assert_eq!(neat.name(), "neat");
        assert_eq!(neat.group_count(), 1);
    }

    #[test]
    fn test_shuffle_seed_follows_run_seed() {
        let mut config = AppConfig::default();
        config.evolution.seed = Some(5);
        assert_eq!(config.shuffle_seed(), 5);

        config.evolution.seed = None;
        let draws: Vec<u64> = (0..4).map(|_| config.shuffle_seed()).collect();
        assert!(draws.iter().any(|&d| d != draws[0]));
    }

    #[test]
    fn test_engine_uses_budget() {
        let mut config = AppConfig::default();
        config.evolution.max_genomes = 3;
        config.evolution.seed = Some(5);
        let mut engine = config.build_engine().unwrap();
        for _ in 0..3 {
            assert!(engine.generate_genome().unwrap().is_some());
        }
        assert!(engine.generate_genome().unwrap().is_none());
    }
}
