use crate::engines::generation::genome::Genome;
use crate::engines::generation::group::Group;
use crate::engines::generation::operators::{GenomeOperators, Operator, OperatorRates};
use crate::error::{DistevoError, Result};
use crate::types::{compare_fitness, InsertResult, Lineage};
use rand::rngs::StdRng;
use rand::Rng;
use std::cmp::Ordering;

/// Upper bound on operator retries for a single generated genome
pub const MAX_GENERATION_ATTEMPTS: usize = 10_000;

/// Owner of every group; decides what gets evaluated next and where results go
pub trait SpeciationStrategy<G: Genome>: Send {
    fn name(&self) -> &'static str;

    /// Produce one structurally valid genome for the group under the cursor
    fn generate_genome(&mut self, rng: &mut StdRng, operators: &mut GenomeOperators<G>) -> Result<G>;

    /// Insert a copy of a trained genome
    fn insert_genome(&mut self, genome: &G) -> InsertResult;

    fn groups(&self) -> &[Group<G>];

    fn generated_genomes(&self) -> u64;

    fn evaluated_genomes(&self) -> u64;

    fn best_genome(&self) -> Option<&G> {
        self.groups()
            .iter()
            .filter_map(|g| g.best_genome())
            .min_by(|a, b| compare_fitness(a.fitness(), b.fitness()))
    }

    fn worst_genome(&self) -> Option<&G> {
        self.groups()
            .iter()
            .filter_map(|g| g.worst_genome())
            .max_by(|a, b| compare_fitness(a.fitness(), b.fitness()))
    }

    fn best_fitness(&self) -> Option<f64> {
        self.best_genome().and_then(|g| g.fitness())
    }

    fn worst_fitness(&self) -> Option<f64> {
        self.worst_genome().and_then(|g| g.fitness())
    }

    fn group_count(&self) -> usize {
        self.groups().len()
    }

    /// CSV header columns with per-group best/worst fitness
    fn strategy_information_headers(&self) -> String {
        self.groups()
            .iter()
            .map(|g| format!(",{}_{}_best_fitness,{0}_{1}_worst_fitness", self.group_label(), g.id()))
            .collect()
    }

    /// CSV values matching [`SpeciationStrategy::strategy_information_headers`]
    fn strategy_information_values(&self) -> String {
        self.groups()
            .iter()
            .map(|g| format!(",{},{}", format_fitness(g.best_fitness()), format_fitness(g.worst_fitness())))
            .collect()
    }

    fn group_label(&self) -> &'static str {
        "group"
    }

    /// Log every group and its members
    fn log_population(&self) {
        log::info!("{} population: {} groups", self.name(), self.group_count());
        for group in self.groups() {
            log::info!(
                "  {} {}: {} genomes, best {}, worst {}",
                self.group_label(),
                group.id(),
                group.len(),
                format_fitness(group.best_fitness()),
                format_fitness(group.worst_fitness()),
            );
            for genome in group.genomes() {
                log::info!(
                    "    genome {} ({}): {}",
                    genome.generation_id(),
                    genome.lineage(),
                    format_fitness(genome.fitness())
                );
            }
        }
    }
}

pub fn format_fitness(fitness: Option<f64>) -> String {
    match fitness {
        Some(f) => format!("{:.6}", f),
        None => "untrained".to_string(),
    }
}

/// Bookkeeping shared by every strategy
#[derive(Debug, Clone, Default)]
pub struct StrategyCounters {
    /// Genomes returned by `generate_genome`
    pub generated: u64,
    /// Calls to `insert_genome`
    pub evaluated: u64,
    next_generation_id: u64,
}

impl StrategyCounters {
    /// Counters whose first generated genome gets `first_id`
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            generated: 0,
            evaluated: 0,
            next_generation_id: first_id,
        }
    }

    pub fn next_generation_id(&mut self) -> u64 {
        let id = self.next_generation_id;
        self.next_generation_id += 1;
        self.generated += 1;
        id
    }
}

/// Global best tracking: the id of the best genome and its fitness, never the genome itself
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalBest {
    pub generation_id: Option<u64>,
    pub fitness: Option<f64>,
}

impl GlobalBest {
    /// Record `genome` if it strictly improves on the best seen so far
    pub fn offer<G: Genome>(&mut self, genome: &G) -> bool {
        let Some(fitness) = genome.fitness().filter(|f| !f.is_nan()) else {
            return false;
        };
        let improved = match self.fitness {
            None => true,
            Some(best) => fitness < best,
        };
        if improved {
            self.generation_id = Some(genome.generation_id());
            self.fitness = Some(fitness);
        }
        improved
    }
}

/// Run the operator-selection rule against `groups[current]` until a valid child appears
///
/// Groups with fewer than two members can only reproduce by mutation. An empty group
/// mutates `fallback_parent` (the seed genome) instead.
pub fn generate_for_group<G: Genome>(
    groups: &[Group<G>],
    current: usize,
    rates: &OperatorRates,
    rng: &mut StdRng,
    operators: &mut GenomeOperators<G>,
    fallback_parent: Option<&G>,
) -> Result<G> {
    let group = groups.get(current).ok_or_else(|| {
        DistevoError::Invariant(format!(
            "generation cursor {} is outside {} groups",
            current,
            groups.len()
        ))
    })?;

    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = if group.len() < 2 {
            let parent = group.random_genome(rng).or(fallback_parent).ok_or_else(|| {
                DistevoError::Invariant(format!("group {} has no genome to mutate", group.id()))
            })?;
            operators.mutate_copy(parent, rng)
        } else {
            produce_candidate(groups, current, rates, rng, operators)?
        };

        if candidate.is_output_unreachable() {
            log::debug!("discarding candidate for group {}: outputs unreachable", group.id());
            continue;
        }
        return Ok(candidate);
    }

    Err(DistevoError::Generation(format!(
        "no structurally valid genome for group {} after {} attempts",
        group.id(),
        MAX_GENERATION_ATTEMPTS
    )))
}

fn produce_candidate<G: Genome>(
    groups: &[Group<G>],
    current: usize,
    rates: &OperatorRates,
    rng: &mut StdRng,
    operators: &mut GenomeOperators<G>,
) -> Result<G> {
    let group = &groups[current];
    let missing = || DistevoError::Invariant(format!("group {} lost its members", group.id()));

    match rates.select(rng.gen::<f64>(), groups.len()) {
        Operator::Mutation => {
            let parent = group.random_genome(rng).ok_or_else(missing)?;
            Ok(operators.mutate_copy(parent, rng))
        }
        Operator::IntraGroupCrossover => {
            let (a, b) = group.two_random_genomes(rng).ok_or_else(missing)?;
            Ok(operators.crossover(a, b, Lineage::IntraGroupCrossover, rng))
        }
        Operator::InterGroupCrossover => {
            let a = group.random_genome(rng).ok_or_else(missing)?;

            let mut other = rng.gen_range(0..groups.len() - 1);
            if other >= current {
                other += 1;
            }
            match groups[other].best_genome() {
                Some(b) => Ok(operators.crossover(a, b, Lineage::InterGroupCrossover, rng)),
                // An empty foreign group has no best genome to contribute
                None => Ok(operators.mutate_copy(a, rng)),
            }
        }
    }
}

/// Advance a round-robin cursor, wrapping to 0
pub fn advance_cursor(cursor: usize, group_count: usize) -> usize {
    if group_count == 0 || cursor + 1 >= group_count {
        0
    } else {
        cursor + 1
    }
}

/// True when fitness `a` is strictly better (lower) than `b`
pub(crate) fn is_better(a: Option<f64>, b: Option<f64>) -> bool {
    compare_fitness(a, b) == Ordering::Less
}
