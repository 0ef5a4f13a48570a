use crate::engines::generation::distance::NeatDistance;
use crate::engines::generation::genome::Genome;
use crate::engines::generation::group::{Group, GroupInsert};
use crate::engines::generation::operators::{GenomeOperators, OperatorRates};
use crate::engines::generation::strategy::{
    advance_cursor, generate_for_group, is_better, GlobalBest, SpeciationStrategy, StrategyCounters,
};
use crate::error::{DistevoError, Result};
use crate::types::{GroupId, InsertResult, Lineage};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Tunables of the NEAT strategy
#[derive(Debug, Clone)]
pub struct NeatSettings {
    pub rates: OperatorRates,
    pub species_threshold: f64,
    pub distance: NeatDistance,
    /// Insertions without a new global best before the worst species is dropped
    pub stagnation_limit: Option<u64>,
    /// Seed for the species permutation drawn on every insertion
    pub shuffle_seed: u64,
}

/// Species created on demand by genomic distance
pub struct NeatSpeciationStrategy<G: Genome> {
    settings: NeatSettings,
    species: Vec<Group<G>>,
    seed_genome: G,
    generation_species: usize,
    next_species_id: GroupId,
    counters: StrategyCounters,
    global_best: GlobalBest,
    insertions_without_improvement: u64,
    shuffle_rng: StdRng,
}

impl<G: Genome> NeatSpeciationStrategy<G> {
    /// Create the first species and place the seed genome (generation id 0) in it
    pub fn new(settings: NeatSettings, mut seed_genome: G) -> Result<Self> {
        if !(settings.species_threshold > 0.0) {
            return Err(DistevoError::Configuration(format!(
                "species threshold must be positive, got {}",
                settings.species_threshold
            )));
        }

        seed_genome.set_generation_id(0);
        seed_genome.set_group_id(0);
        seed_genome.set_lineage(Lineage::Seed);

        let shuffle_rng = StdRng::seed_from_u64(settings.shuffle_seed);
        let mut strategy = Self {
            settings,
            species: vec![Group::species(0)],
            seed_genome: seed_genome.clone(),
            generation_species: 0,
            next_species_id: 1,
            counters: StrategyCounters::starting_at(1),
            global_best: GlobalBest::default(),
            insertions_without_improvement: 0,
            shuffle_rng,
        };

        strategy.species[0].insert(&seed_genome);
        strategy.global_best.offer(&seed_genome);
        log::info!("initialized the first species with seed genome");
        Ok(strategy)
    }

    pub fn species_threshold(&self) -> f64 {
        self.settings.species_threshold
    }

    pub fn seed_genome(&self) -> &G {
        &self.seed_genome
    }

    /// Resolve the recorded global best through the species that own it
    pub fn global_best_genome(&self) -> Option<&G> {
        let id = self.global_best.generation_id?;
        self.species
            .iter()
            .flat_map(|s| s.genomes())
            .find(|g| g.generation_id() == id)
    }

    pub fn distance(&self, g1: &G, g2: &G) -> f64 {
        self.settings.distance.distance(g1, g2)
    }

    /// First-fit placement over a fresh random permutation of the species
    fn place(&mut self, genome: &G) -> GroupInsert {
        let mut order: Vec<usize> = (0..self.species.len()).collect();
        order.shuffle(&mut self.shuffle_rng);
        log::debug!("species order for genome {}: {:?}", genome.generation_id(), order);

        for idx in order {
            let accepts = match self.species[idx].latest_genome() {
                None => true,
                Some(representative) => {
                    self.settings.distance.distance(representative, genome) < self.settings.species_threshold
                }
            };
            if accepts {
                log::debug!(
                    "inserting genome {} into species {}",
                    genome.generation_id(),
                    self.species[idx].id()
                );
                return self.species[idx].insert(genome);
            }
        }

        let mut species = Group::species(self.next_species_id);
        self.next_species_id += 1;
        let outcome = species.insert(genome);
        log::info!(
            "genome {} founded species {}, {} species total",
            genome.generation_id(),
            species.id(),
            self.species.len() + 1
        );
        self.species.push(species);
        outcome
    }

    fn check_stagnation(&mut self, improved: bool) {
        let Some(limit) = self.settings.stagnation_limit else {
            return;
        };
        if improved {
            self.insertions_without_improvement = 0;
            return;
        }
        self.insertions_without_improvement += 1;
        if self.insertions_without_improvement < limit || self.species.len() <= 1 {
            return;
        }
        self.insertions_without_improvement = 0;

        let best_id = self.global_best.generation_id;
        let mut worst: Option<usize> = None;
        for (idx, species) in self.species.iter().enumerate() {
            if best_id.map_or(false, |id| species.contains(id)) {
                continue;
            }
            match worst {
                Some(w) if !is_better(self.species[w].best_fitness(), species.best_fitness()) => {}
                _ => worst = Some(idx),
            }
        }

        if let Some(idx) = worst {
            let removed = self.species.remove(idx);
            log::warn!(
                "population stagnated for {} insertions, removing species {} ({} genomes)",
                limit,
                removed.id(),
                removed.len()
            );
            if idx < self.generation_species {
                self.generation_species -= 1;
            }
            if self.generation_species >= self.species.len() {
                self.generation_species = 0;
            }
        }
    }
}

impl<G: Genome> SpeciationStrategy<G> for NeatSpeciationStrategy<G> {
    fn name(&self) -> &'static str {
        "neat"
    }

    fn group_label(&self) -> &'static str {
        "species"
    }

    fn generate_genome(&mut self, rng: &mut StdRng, operators: &mut GenomeOperators<G>) -> Result<G> {
        if self.species.is_empty() {
            return Err(DistevoError::Invariant("no species to generate from".to_string()));
        }
        let current = self.generation_species;
        log::debug!(
            "generating from species {} ({} genomes)",
            self.species[current].id(),
            self.species[current].len()
        );

        let mut genome = generate_for_group(
            &self.species,
            current,
            &self.settings.rates,
            rng,
            operators,
            Some(&self.seed_genome),
        )?;

        genome.set_generation_id(self.counters.next_generation_id());
        genome.set_group_id(self.species[current].id());
        self.generation_species = advance_cursor(current, self.species.len());
        Ok(genome)
    }

    fn insert_genome(&mut self, genome: &G) -> InsertResult {
        self.counters.evaluated += 1;

        if self.species.iter().any(|s| s.contains(genome.generation_id())) {
            log::debug!("genome {} already inserted, ignoring", genome.generation_id());
            return InsertResult::NotInserted;
        }

        if self.place(genome) == GroupInsert::Rejected {
            return InsertResult::NotInserted;
        }

        let improved = self.global_best.offer(genome);
        self.check_stagnation(improved);
        if improved {
            InsertResult::NewGlobalBest
        } else {
            InsertResult::InsertedNotBest
        }
    }

    fn groups(&self) -> &[Group<G>] {
        &self.species
    }

    fn generated_genomes(&self) -> u64 {
        self.counters.generated
    }

    fn evaluated_genomes(&self) -> u64 {
        self.counters.evaluated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::network::{network_operators, NetworkGenome};

    fn settings(threshold: f64) -> NeatSettings {
        NeatSettings {
            rates: OperatorRates::new(0.5, 0.3, 0.2).unwrap(),
            species_threshold: threshold,
            distance: NeatDistance::new(1.0, 1.0, 0.5),
            stagnation_limit: None,
            shuffle_seed: 7,
        }
    }

    fn trained(id: u64, fitness: f64, weight_shift: f64) -> NetworkGenome {
        let mut genome = NetworkGenome::minimal(2, 1);
        for edge in genome.edges_mut() {
            edge.weight += weight_shift;
        }
        genome.set_generation_id(id);
        genome.set_fitness(Some(fitness));
        genome
    }

    #[test]
    fn test_seed_occupies_first_species() {
        let strategy = NeatSpeciationStrategy::new(settings(1.0), NetworkGenome::minimal(2, 1)).unwrap();
        assert_eq!(strategy.group_count(), 1);
        assert_eq!(strategy.groups()[0].len(), 1);
        assert_eq!(strategy.generated_genomes(), 0);
        assert!(strategy.best_genome().is_some());
    }

    #[test]
    fn test_close_genomes_share_a_species() {
        let mut strategy = NeatSpeciationStrategy::new(settings(1.0), NetworkGenome::minimal(2, 1)).unwrap();
        for id in 1..=5 {
            let result = strategy.insert_genome(&trained(id, 10.0 - id as f64, 0.2));
            assert!(result.was_inserted());
        }
        assert_eq!(strategy.group_count(), 1);
        assert_eq!(strategy.groups()[0].len(), 6);
        assert_eq!(strategy.evaluated_genomes(), 5);
    }

    #[test]
    fn test_distant_genome_founds_species() {
        let mut strategy = NeatSpeciationStrategy::new(settings(1.0), NetworkGenome::minimal(2, 1)).unwrap();
        strategy.insert_genome(&trained(1, 3.0, 0.0));
        assert_eq!(strategy.group_count(), 1);

        // Weight difference 10 * c3 0.5 = distance 5.0
        strategy.insert_genome(&trained(2, 4.0, 10.0));
        assert_eq!(strategy.group_count(), 2);
        assert_eq!(strategy.groups()[1].genomes()[0].group_id(), strategy.groups()[1].id());
    }

    #[test]
    fn test_worse_genome_is_never_new_global_best() {
        let mut strategy = NeatSpeciationStrategy::new(settings(1.0), NetworkGenome::minimal(2, 1)).unwrap();
        assert_eq!(strategy.insert_genome(&trained(1, 2.0, 0.0)), InsertResult::NewGlobalBest);
        assert_eq!(strategy.insert_genome(&trained(2, 5.0, 0.0)), InsertResult::InsertedNotBest);
        assert_eq!(strategy.insert_genome(&trained(3, 1.0, 0.0)), InsertResult::NewGlobalBest);
        assert_eq!(strategy.global_best_genome().unwrap().generation_id(), 3);
        assert_eq!(strategy.worst_fitness(), None); // the untrained seed is the worst
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut strategy = NeatSpeciationStrategy::new(settings(1.0), NetworkGenome::minimal(2, 1)).unwrap();
        let genome = trained(1, 2.0, 0.0);
        assert!(strategy.insert_genome(&genome).was_inserted());
        assert_eq!(strategy.insert_genome(&genome), InsertResult::NotInserted);
    }

    #[test]
    fn test_generation_cycles_species() {
        let mut strategy = NeatSpeciationStrategy::new(settings(1.0), NetworkGenome::minimal(2, 1)).unwrap();
        strategy.insert_genome(&trained(1, 3.0, 10.0));
        assert_eq!(strategy.group_count(), 2);

        let mut rng = StdRng::seed_from_u64(1);
        let mut operators = network_operators(1);
        let first = strategy.generate_genome(&mut rng, &mut operators).unwrap();
        let second = strategy.generate_genome(&mut rng, &mut operators).unwrap();
        let third = strategy.generate_genome(&mut rng, &mut operators).unwrap();

        assert_eq!(first.group_id(), strategy.groups()[0].id());
        assert_eq!(second.group_id(), strategy.groups()[1].id());
        assert_eq!(third.group_id(), strategy.groups()[0].id());
        assert_eq!(first.lineage(), Lineage::Mutation);
        assert!(first.generation_id() < second.generation_id());
        assert!(!third.is_output_unreachable());
    }

    #[test]
    fn test_stagnation_removes_worst_species() {
        let mut config = settings(1.0);
        config.stagnation_limit = Some(2);
        let mut strategy = NeatSpeciationStrategy::new(config, NetworkGenome::minimal(2, 1)).unwrap();

        strategy.insert_genome(&trained(1, 1.0, 0.0));
        strategy.insert_genome(&trained(2, 8.0, 10.0));
        assert_eq!(strategy.group_count(), 2);

        // Second non-improving insertion triggers the cull
        strategy.insert_genome(&trained(3, 9.0, 0.0));
        assert_eq!(strategy.group_count(), 1);
        assert_eq!(strategy.best_fitness(), Some(1.0));
    }
}
