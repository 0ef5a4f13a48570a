use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing identity assigned when a genome is generated
pub type GenerationId = u64;

/// Identifier of a species or island
pub type GroupId = u32;

/// Process rank in the distributed run (0 = coordinator)
pub type Rank = usize;

/// Rank of the coordinator process
pub const COORDINATOR_RANK: Rank = 0;

/// Which operator produced a genome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Lineage {
    #[default]
    Seed,
    Mutation,
    IntraGroupCrossover,
    InterGroupCrossover,
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lineage::Seed => "seed",
            Lineage::Mutation => "mutation",
            Lineage::IntraGroupCrossover => "intra_group_crossover",
            Lineage::InterGroupCrossover => "inter_group_crossover",
        };
        f.write_str(name)
    }
}

/// Outcome of inserting a trained genome into a speciation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    NotInserted,
    NewGlobalBest,
    InsertedNotBest,
}

impl InsertResult {
    pub fn was_inserted(&self) -> bool {
        !matches!(self, InsertResult::NotInserted)
    }
}

/// Compare two validation errors, treating an untrained genome as worse than any trained one
pub fn compare_fitness(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    fitness_key(a)
        .partial_cmp(&fitness_key(b))
        .unwrap_or(std::cmp::Ordering::Equal)
}

/// Sort key for a possibly-undefined fitness (lower is better)
pub fn fitness_key(fitness: Option<f64>) -> f64 {
    match fitness {
        Some(f) if !f.is_nan() => f,
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_untrained_is_worse_than_trained() {
        assert_eq!(compare_fitness(Some(10.0), None), Ordering::Less);
        assert_eq!(compare_fitness(None, Some(10.0)), Ordering::Greater);
        assert_eq!(compare_fitness(None, None), Ordering::Equal);
    }

    #[test]
    fn test_nan_fitness_sorts_last() {
        assert_eq!(compare_fitness(Some(f64::NAN), Some(1.0)), Ordering::Greater);
    }
}
