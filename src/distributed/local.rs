use crate::distributed::coordinator::{Coordinator, CoordinatorStats};
use crate::distributed::transport::{ChannelTransport, Transport};
use crate::distributed::worker::{Worker, WorkerStats};
use crate::engines::evaluation::trainer::Trainer;
use crate::engines::generation::evolution_engine::EvolutionEngine;
use crate::engines::generation::genome::Genome;
use crate::error::{DistevoError, Result};
use crate::types::Rank;
use std::sync::{Arc, Mutex};
use std::thread;

/// Outcome of an in-process run
#[derive(Debug)]
pub struct LocalRunSummary {
    pub coordinator: CoordinatorStats,
    pub workers: Vec<WorkerStats>,
}

/// Run one coordinator and `worker_count` workers as threads of this process
///
/// The coordinator serves on the calling thread. Worker trainers come from
/// `make_trainer`, called once per worker rank.
pub fn run_local<G, R, F>(
    engine: Arc<Mutex<EvolutionEngine<G>>>,
    worker_count: usize,
    make_trainer: F,
) -> Result<LocalRunSummary>
where
    G: Genome,
    R: Trainer<G> + 'static,
    F: Fn(Rank) -> R,
{
    if worker_count == 0 {
        return Err(DistevoError::Configuration("worker_count must be at least 1".to_string()));
    }

    let mut mesh = ChannelTransport::mesh(worker_count + 1).into_iter();
    let coordinator_transport = mesh
        .next()
        .ok_or_else(|| DistevoError::Invariant("empty transport mesh".to_string()))?;

    let mut handles = Vec::with_capacity(worker_count);
    for transport in mesh {
        let rank = transport.rank();
        let trainer = make_trainer(rank);
        let handle = thread::Builder::new()
            .name(format!("distevo-worker-{}", rank))
            .spawn(move || Worker::<G, ChannelTransport, R>::new(transport, trainer).run())?;
        handles.push(handle);
    }

    let coordinator_result = Coordinator::new(coordinator_transport, engine).and_then(|mut c| c.run());

    let mut workers = Vec::with_capacity(worker_count);
    let mut first_worker_error = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(stats)) => workers.push(stats),
            Ok(Err(error)) => {
                first_worker_error.get_or_insert(error);
            }
            Err(_) => {
                first_worker_error.get_or_insert(DistevoError::Invariant("worker thread panicked".to_string()));
            }
        }
    }

    let coordinator = coordinator_result?;
    if let Some(error) = first_worker_error {
        return Err(error);
    }

    Ok(LocalRunSummary { coordinator, workers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::evaluation::trainer::SyntheticTrainer;
    use crate::engines::generation::evolution_engine::EvolutionConfig;
    use crate::engines::generation::island::IslandSpeciationStrategy;
    use crate::engines::generation::network::{network_operators, NetworkGenome};
    use crate::engines::generation::operators::OperatorRates;

    fn island_engine(max_genomes: u64) -> Arc<Mutex<EvolutionEngine<NetworkGenome>>> {
        let rates = OperatorRates::new(0.7, 0.2, 0.1).unwrap();
        let strategy = IslandSpeciationStrategy::new(2, 5, rates, NetworkGenome::minimal(2, 1)).unwrap();
        let config = EvolutionConfig {
            max_genomes,
            seed: Some(11),
            output_directory: None,
        };
        let engine = EvolutionEngine::new(config, Box::new(strategy), network_operators(2)).unwrap();
        Arc::new(Mutex::new(engine))
    }

    #[test]
    fn test_local_run_spends_whole_budget() {
        let engine = island_engine(12);
        let summary = run_local(Arc::clone(&engine), 3, |_| SyntheticTrainer::default()).unwrap();

        assert_eq!(summary.coordinator.genomes_sent, 12);
        assert_eq!(summary.coordinator.genomes_inserted, 12);
        assert_eq!(summary.coordinator.terminates_sent, 3);
        assert_eq!(summary.workers.len(), 3);
        let trained: u64 = summary.workers.iter().map(|w| w.genomes_trained).sum();
        assert_eq!(trained, 12);

        let engine = engine.lock().unwrap();
        assert_eq!(engine.strategy().generated_genomes(), 12);
        assert_eq!(engine.strategy().evaluated_genomes(), 12);
        assert!(engine.best_genome().is_some());
    }

    #[test]
    fn test_zero_workers_is_a_configuration_error() {
        let result = run_local(island_engine(4), 0, |_| SyntheticTrainer::default());
        assert!(matches!(result, Err(DistevoError::Configuration(_))));
    }

    #[test]
    fn test_worker_ranks_start_at_one() {
        let mesh = ChannelTransport::mesh(3);
        let ranks: Vec<Rank> = mesh.iter().map(|t| t.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }
}
