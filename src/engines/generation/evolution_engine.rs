use crate::engines::generation::{
    fitness_log::FitnessLog,
    genome::Genome,
    operators::GenomeOperators,
    strategy::SpeciationStrategy,
};
use crate::error::Result;
use crate::types::{GenerationId, GroupId, InsertResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

pub struct EvolutionConfig {
    pub max_genomes: u64, // Generation budget
    pub seed: Option<u64>,
    pub output_directory: Option<PathBuf>,
}

/// Drives one speciation strategy under a genome budget
pub struct EvolutionEngine<G: Genome> {
    config: EvolutionConfig,
    strategy: Box<dyn SpeciationStrategy<G>>,
    operators: GenomeOperators<G>,
    rng: StdRng,
    callback: Option<Box<dyn ProgressCallback>>,
    fitness_log: Option<FitnessLog>,
    budget_reported: bool,
}

pub trait ProgressCallback: Send {
    fn on_genome_generated(&mut self, generation_id: GenerationId, group_id: GroupId);
    fn on_genome_inserted(&mut self, evaluated: u64, result: InsertResult, best_fitness: Option<f64>);
    fn on_budget_exhausted(&mut self, generated: u64);
}

impl<G: Genome> EvolutionEngine<G> {
    pub fn new(
        config: EvolutionConfig,
        strategy: Box<dyn SpeciationStrategy<G>>,
        operators: GenomeOperators<G>,
    ) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let fitness_log = match &config.output_directory {
            Some(dir) => Some(FitnessLog::create(dir, strategy.as_ref())?),
            None => None,
        };

        log::info!(
            "evolution engine ready: strategy {}, budget {} genomes",
            strategy.name(),
            config.max_genomes
        );

        Ok(Self {
            config,
            strategy,
            operators,
            rng,
            callback: None,
            fitness_log,
            budget_reported: false,
        })
    }

    pub fn with_callback<C: ProgressCallback + 'static>(mut self, callback: C) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Next genome to train, or `None` once the budget is spent
    pub fn generate_genome(&mut self) -> Result<Option<G>> {
        if self.is_finished() {
            if !self.budget_reported {
                self.budget_reported = true;
                if let Some(cb) = self.callback.as_mut() {
                    cb.on_budget_exhausted(self.strategy.generated_genomes());
                }
            }
            return Ok(None);
        }

        let genome = self.strategy.generate_genome(&mut self.rng, &mut self.operators)?;
        if let Some(cb) = self.callback.as_mut() {
            cb.on_genome_generated(genome.generation_id(), genome.group_id());
        }
        Ok(Some(genome))
    }

    /// Insert a trained genome; the caller keeps its own copy
    pub fn insert_genome(&mut self, genome: &G) -> Result<InsertResult> {
        let result = self.strategy.insert_genome(genome);

        if let Some(cb) = self.callback.as_mut() {
            cb.on_genome_inserted(
                self.strategy.evaluated_genomes(),
                result,
                self.strategy.best_fitness(),
            );
        }

        if let Some(fitness_log) = self.fitness_log.as_mut() {
            fitness_log.append(self.strategy.as_ref())?;
            if result == InsertResult::NewGlobalBest {
                let path = fitness_log.write_global_best(genome)?;
                log::debug!("wrote global best genome to {}", path.display());
            }
        }

        Ok(result)
    }

    pub fn is_finished(&self) -> bool {
        self.strategy.generated_genomes() >= self.config.max_genomes
    }

    pub fn max_genomes(&self) -> u64 {
        self.config.max_genomes
    }

    pub fn strategy(&self) -> &dyn SpeciationStrategy<G> {
        self.strategy.as_ref()
    }

    pub fn best_genome(&self) -> Option<&G> {
        self.strategy.best_genome()
    }
}
