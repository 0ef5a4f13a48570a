use crate::engines::generation::genome::Genome;
use crate::engines::generation::network::NetworkGenome;
use crate::error::{DistevoError, Result};

/// Worker-side training step: fits the genome and returns its validation error
pub trait Trainer<G: Genome>: Send {
    fn train(&mut self, genome: &mut G) -> Result<f64>;
}

/// Dataset-free trainer for [`NetworkGenome`]
///
/// Runs a fixed number of descent steps pulling every enabled weight toward
/// `target_weight`, then scores the network by its remaining weight error plus a
/// penalty on distance from `target_hidden_nodes`.
#[derive(Debug, Clone)]
pub struct SyntheticTrainer {
    pub iterations: usize,
    pub learning_rate: f64,
    pub target_weight: f64,
    pub target_hidden_nodes: usize,
}

impl Default for SyntheticTrainer {
    fn default() -> Self {
        Self {
            iterations: 10,
            learning_rate: 0.1,
            target_weight: 0.5,
            target_hidden_nodes: 3,
        }
    }
}

impl SyntheticTrainer {
    fn validation_error(&self, genome: &NetworkGenome) -> f64 {
        let enabled: Vec<f64> = genome
            .edges()
            .iter()
            .filter(|e| e.enabled)
            .map(|e| (e.weight - self.target_weight).abs())
            .collect();
        let weight_error = if enabled.is_empty() {
            1.0
        } else {
            enabled.iter().sum::<f64>() / enabled.len() as f64
        };
        let structure_error =
            (genome.hidden_node_count() as f64 - self.target_hidden_nodes as f64).abs() * 0.25;
        weight_error + structure_error
    }
}

impl Trainer<NetworkGenome> for SyntheticTrainer {
    fn train(&mut self, genome: &mut NetworkGenome) -> Result<f64> {
        if genome.is_output_unreachable() {
            return Err(DistevoError::Training(format!(
                "genome {} has unreachable outputs",
                genome.generation_id()
            )));
        }

        for _ in 0..self.iterations {
            for edge in genome.edges_mut().iter_mut().filter(|e| e.enabled) {
                let gradient = edge.weight - self.target_weight;
                edge.weight -= self.learning_rate * gradient;
            }
        }

        let error = self.validation_error(genome);
        genome.set_fitness(Some(error));
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_sets_fitness() {
        let mut genome = NetworkGenome::minimal(2, 1);
        let mut trainer = SyntheticTrainer::default();
        let error = trainer.train(&mut genome).unwrap();
        assert_eq!(genome.fitness(), Some(error));
    }

    #[test]
    fn test_more_iterations_reduce_error() {
        let mut short = NetworkGenome::minimal(2, 1);
        let mut long = short.clone();
        let short_error = SyntheticTrainer { iterations: 1, ..Default::default() }
            .train(&mut short)
            .unwrap();
        let long_error = SyntheticTrainer { iterations: 50, ..Default::default() }
            .train(&mut long)
            .unwrap();
        assert!(long_error < short_error);
    }

    #[test]
    fn test_unreachable_genome_fails() {
        let mut genome = NetworkGenome::minimal(1, 1);
        genome.edges_mut()[0].enabled = false;
        assert!(SyntheticTrainer::default().train(&mut genome).is_err());
    }
}
