use crate::engines::generation::genome::Genome;
use crate::error::{DistevoError, Result};
use crate::types::{compare_fitness, Lineage};
use rand::rngs::StdRng;
use std::cmp::Ordering;

/// Mutation operator: apply up to `max_mutations` structural changes in place
pub type MutateFn<G> = Box<dyn FnMut(u32, &mut G, &mut StdRng) + Send>;

/// Crossover operator: the first parent is the fitter one and dominates structure
pub type CrossoverFn<G> = Box<dyn FnMut(&G, &G, &mut StdRng) -> G + Send>;

/// Caller-supplied reproduction operators
pub struct GenomeOperators<G: Genome> {
    pub max_mutations: u32,
    mutate: MutateFn<G>,
    crossover: CrossoverFn<G>,
}

impl<G: Genome> GenomeOperators<G> {
    pub fn new(max_mutations: u32, mutate: MutateFn<G>, crossover: CrossoverFn<G>) -> Self {
        Self {
            max_mutations,
            mutate,
            crossover,
        }
    }

    /// Mutate a copy of `parent` and tag it as a mutation child
    pub fn mutate_copy(&mut self, parent: &G, rng: &mut StdRng) -> G {
        let mut child = parent.clone();
        (self.mutate)(self.max_mutations, &mut child, rng);
        child.set_lineage(Lineage::Mutation);
        child
    }

    /// Cross two parents, passing the fitter one first
    pub fn crossover(&mut self, a: &G, b: &G, lineage: Lineage, rng: &mut StdRng) -> G {
        let (more_fit, less_fit) = order_by_fitness(a, b);
        let mut child = (self.crossover)(more_fit, less_fit, rng);
        child.set_lineage(lineage);
        child
    }
}

/// Return the two parents with the fitter (lower error) one first
pub fn order_by_fitness<'a, G: Genome>(a: &'a G, b: &'a G) -> (&'a G, &'a G) {
    match compare_fitness(a.fitness(), b.fitness()) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    }
}

/// Which reproduction operator to apply for the next genome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Mutation,
    IntraGroupCrossover,
    InterGroupCrossover,
}

/// Operator rates stored as cumulative boundaries over [0, 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorRates {
    mutation_bound: f64,
    intra_bound: f64,
    inter_bound: f64,
}

impl OperatorRates {
    /// Build the boundaries, rescaling the rates proportionally when they do not sum to 1
    pub fn new(mutation_rate: f64, intra_rate: f64, inter_rate: f64) -> Result<Self> {
        let rates = [mutation_rate, intra_rate, inter_rate];
        if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(DistevoError::Configuration(format!(
                "Operator rates must be finite and non-negative, got {:?}",
                rates
            )));
        }

        let sum: f64 = rates.iter().sum();
        if sum <= 0.0 {
            return Err(DistevoError::Configuration(
                "Operator rates must have a positive sum".to_string(),
            ));
        }

        let mutation = mutation_rate / sum;
        let intra = intra_rate / sum;

        Ok(Self {
            mutation_bound: mutation,
            intra_bound: mutation + intra,
            inter_bound: 1.0,
        })
    }

    pub fn mutation_bound(&self) -> f64 {
        self.mutation_bound
    }

    pub fn intra_bound(&self) -> f64 {
        self.intra_bound
    }

    pub fn inter_bound(&self) -> f64 {
        self.inter_bound
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_bound
    }

    pub fn intra_group_crossover_rate(&self) -> f64 {
        self.intra_bound - self.mutation_bound
    }

    pub fn inter_group_crossover_rate(&self) -> f64 {
        self.inter_bound - self.intra_bound
    }

    /// Map a uniform draw in [0, 1) to an operator
    ///
    /// Inter-group crossover falls back to intra-group crossover when there is no
    /// other group to draw the second parent from.
    pub fn select(&self, r: f64, group_count: usize) -> Operator {
        if r < self.mutation_bound {
            Operator::Mutation
        } else if r < self.intra_bound || group_count <= 1 {
            Operator::IntraGroupCrossover
        } else {
            Operator::InterGroupCrossover
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rates_already_normalized() {
        let rates = OperatorRates::new(0.5, 0.3, 0.2).unwrap();
        assert!((rates.mutation_bound() - 0.5).abs() < 1e-12);
        assert!((rates.intra_bound() - 0.8).abs() < 1e-12);
        assert_eq!(rates.inter_bound(), 1.0);
    }

    #[test]
    fn test_rates_are_rescaled() {
        let rates = OperatorRates::new(2.0, 1.0, 1.0).unwrap();
        assert!((rates.mutation_rate() - 0.5).abs() < 1e-12);
        assert!((rates.intra_group_crossover_rate() - 0.25).abs() < 1e-12);
        assert!((rates.inter_group_crossover_rate() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(OperatorRates::new(0.0, 0.0, 0.0).is_err());
        assert!(OperatorRates::new(-0.1, 0.5, 0.5).is_err());
        assert!(OperatorRates::new(f64::NAN, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_select_operator() {
        let rates = OperatorRates::new(0.5, 0.3, 0.2).unwrap();
        assert_eq!(rates.select(0.1, 3), Operator::Mutation);
        assert_eq!(rates.select(0.6, 3), Operator::IntraGroupCrossover);
        assert_eq!(rates.select(0.9, 3), Operator::InterGroupCrossover);
        // A single group cannot supply a foreign parent
        assert_eq!(rates.select(0.9, 1), Operator::IntraGroupCrossover);
    }

    proptest! {
        #[test]
        fn prop_cumulative_bounds_sum_to_one(
            m in 0.0f64..10.0,
            intra in 0.0f64..10.0,
            inter in 0.0f64..10.0,
        ) {
            prop_assume!(m + intra + inter > 1e-9);
            let rates = OperatorRates::new(m, intra, inter).unwrap();
            let total = rates.mutation_rate()
                + rates.intra_group_crossover_rate()
                + rates.inter_group_crossover_rate();
            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert!(rates.mutation_bound() <= rates.intra_bound());
            prop_assert!(rates.intra_bound() <= rates.inter_bound() + 1e-12);
        }
    }
}
