use crate::engines::generation::genome::Genome;
use crate::engines::generation::group::{Group, GroupInsert};
use crate::engines::generation::operators::{GenomeOperators, OperatorRates};
use crate::engines::generation::strategy::{
    advance_cursor, generate_for_group, GlobalBest, SpeciationStrategy, StrategyCounters,
};
use crate::error::{DistevoError, Result};
use crate::types::{GroupId, InsertResult, Lineage};
use rand::rngs::StdRng;

/// Fixed set of capacity-bounded islands, genomes routed by their group id
pub struct IslandSpeciationStrategy<G: Genome> {
    rates: OperatorRates,
    islands: Vec<Group<G>>,
    max_island_size: usize,
    generation_island: usize,
    /// Parent for islands that are still empty
    seed_genome: G,
    counters: StrategyCounters,
    global_best: GlobalBest,
}

impl<G: Genome> IslandSpeciationStrategy<G> {
    pub fn new(
        number_of_islands: usize,
        max_island_size: usize,
        rates: OperatorRates,
        mut seed_genome: G,
    ) -> Result<Self> {
        if number_of_islands == 0 || max_island_size == 0 {
            return Err(DistevoError::Configuration(format!(
                "need at least one island of size >= 1, got {} islands of size {}",
                number_of_islands, max_island_size
            )));
        }

        seed_genome.set_generation_id(0);
        seed_genome.set_lineage(Lineage::Seed);

        let islands = (0..number_of_islands)
            .map(|i| Group::island(i as GroupId, max_island_size))
            .collect();

        Ok(Self {
            rates,
            islands,
            max_island_size,
            generation_island: 0,
            seed_genome,
            counters: StrategyCounters::starting_at(1),
            global_best: GlobalBest::default(),
        })
    }

    pub fn max_island_size(&self) -> usize {
        self.max_island_size
    }

    /// Every island has reached its capacity
    pub fn islands_full(&self) -> bool {
        self.islands.iter().all(|island| island.is_full())
    }

    pub fn seed_genome(&self) -> &G {
        &self.seed_genome
    }
}

impl<G: Genome> SpeciationStrategy<G> for IslandSpeciationStrategy<G> {
    fn name(&self) -> &'static str {
        "island"
    }

    fn group_label(&self) -> &'static str {
        "island"
    }

    fn generate_genome(&mut self, rng: &mut StdRng, operators: &mut GenomeOperators<G>) -> Result<G> {
        let current = self.generation_island;
        log::debug!(
            "generating for island {} ({}/{} genomes)",
            current,
            self.islands[current].len(),
            self.max_island_size
        );

        let mut genome = generate_for_group(
            &self.islands,
            current,
            &self.rates,
            rng,
            operators,
            Some(&self.seed_genome),
        )?;

        genome.set_generation_id(self.counters.next_generation_id());
        genome.set_group_id(self.islands[current].id());
        self.generation_island = advance_cursor(current, self.islands.len());
        Ok(genome)
    }

    fn insert_genome(&mut self, genome: &G) -> InsertResult {
        self.counters.evaluated += 1;

        let island = genome.group_id() as usize;
        if island >= self.islands.len() {
            log::warn!(
                "genome {} targets island {} but only {} exist",
                genome.generation_id(),
                island,
                self.islands.len()
            );
            return InsertResult::NotInserted;
        }

        if self.islands.iter().any(|i| i.contains(genome.generation_id())) {
            log::debug!("genome {} already inserted, ignoring", genome.generation_id());
            return InsertResult::NotInserted;
        }

        if self.islands[island].insert(genome) == GroupInsert::Rejected {
            return InsertResult::NotInserted;
        }

        if self.global_best.offer(genome) {
            InsertResult::NewGlobalBest
        } else {
            InsertResult::InsertedNotBest
        }
    }

    fn groups(&self) -> &[Group<G>] {
        &self.islands
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
    use rand::SeedableRng;

    fn strategy(islands: usize, size: usize) -> IslandSpeciationStrategy<NetworkGenome> {
        IslandSpeciationStrategy::new(
            islands,
            size,
            OperatorRates::new(0.6, 0.2, 0.2).unwrap(),
            NetworkGenome::minimal(2, 2),
        )
        .unwrap()
    }

    #[test]
    fn test_generation_is_round_robin() {
        let mut islands = strategy(3, 4);
        let mut rng = StdRng::seed_from_u64(21);
        let mut operators = network_operators(2);

        let groups: Vec<_> = (0..6)
            .map(|_| islands.generate_genome(&mut rng, &mut operators).unwrap().group_id())
            .collect();
        assert_eq!(groups, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(islands.generated_genomes(), 6);
    }

    #[test]
    fn test_insert_routes_by_group_id() {
        let mut islands = strategy(2, 3);
        let mut genome = NetworkGenome::minimal(2, 2);
        genome.set_generation_id(1);
        genome.set_group_id(1);
        genome.set_fitness(Some(0.5));

        assert_eq!(islands.insert_genome(&genome), InsertResult::NewGlobalBest);
        assert_eq!(islands.groups()[0].len(), 0);
        assert_eq!(islands.groups()[1].len(), 1);
    }

    #[test]
    fn test_unknown_island_not_inserted() {
        let mut islands = strategy(2, 3);
        let mut genome = NetworkGenome::minimal(2, 2);
        genome.set_generation_id(1);
        genome.set_group_id(5);
        assert_eq!(islands.insert_genome(&genome), InsertResult::NotInserted);
        assert_eq!(islands.evaluated_genomes(), 1);
    }

    #[test]
    fn test_full_islands_keep_their_count() {
        let mut islands = strategy(2, 2);
        let mut id = 1;
        for island in 0..2 {
            for fitness in [5.0, 6.0] {
                let mut genome = NetworkGenome::minimal(2, 2);
                genome.set_generation_id(id);
                genome.set_group_id(island);
                genome.set_fitness(Some(fitness));
                islands.insert_genome(&genome);
                id += 1;
            }
        }
        assert!(islands.islands_full());

        let mut better = NetworkGenome::minimal(2, 2);
        better.set_generation_id(id);
        better.set_group_id(0);
        better.set_fitness(Some(1.0));
        assert_eq!(islands.insert_genome(&better), InsertResult::NewGlobalBest);

        assert_eq!(islands.group_count(), 2);
        assert_eq!(islands.groups()[0].len(), 2);
        assert!(islands.islands_full());
        assert_eq!(islands.groups()[0].worst_fitness(), Some(5.0));
    }

    #[test]
    fn test_empty_island_mutates_seed() {
        let mut islands = strategy(2, 2);
        let mut rng = StdRng::seed_from_u64(4);
        let mut operators = network_operators(1);
        let genome = islands.generate_genome(&mut rng, &mut operators).unwrap();
        assert_eq!(genome.lineage(), Lineage::Mutation);
        assert_eq!(genome.generation_id(), 1);
        assert!(!genome.is_output_unreachable());
    }
}
