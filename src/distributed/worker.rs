use crate::distributed::message::{receive_genome, send_genome, send_work_request, Tag};
use crate::distributed::transport::Transport;
use crate::engines::evaluation::trainer::Trainer;
use crate::engines::generation::genome::Genome;
use crate::error::{DistevoError, Result};
use crate::types::{compare_fitness, COORDINATOR_RANK};
use std::cmp::Ordering;
use std::marker::PhantomData;

/// Exit code passed to [`Transport::abort`] on a fatal worker error
pub const WORKER_ABORT_CODE: i32 = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    pub work_requests: u64,
    pub genomes_trained: u64,
    pub training_failures: u64,
    pub best_fitness: Option<f64>,
}

/// Compute role: request, train, return, until told to stop
pub struct Worker<G: Genome, T: Transport, R: Trainer<G>> {
    transport: T,
    trainer: R,
    stats: WorkerStats,
    _genome: PhantomData<fn() -> G>,
}

impl<G: Genome, T: Transport, R: Trainer<G>> Worker<G, T, R> {
    pub fn new(transport: T, trainer: R) -> Self {
        Self {
            transport,
            trainer,
            stats: WorkerStats::default(),
            _genome: PhantomData,
        }
    }

    pub fn rank(&self) -> usize {
        self.transport.rank()
    }

    pub fn run(&mut self) -> Result<WorkerStats> {
        let name = format!("worker_{}", self.transport.rank());
        match self.serve(&name) {
            Ok(()) => {
                log::info!("[{}] terminated after training {} genomes", name, self.stats.genomes_trained);
                Ok(self.stats.clone())
            }
            Err(error) => {
                log::error!("[{}] failed: {}", name, error);
                if !matches!(error, DistevoError::Aborted { .. }) {
                    self.transport.abort(WORKER_ABORT_CODE);
                }
                Err(error)
            }
        }
    }

    fn serve(&mut self, name: &str) -> Result<()> {
        loop {
            send_work_request(&self.transport, COORDINATOR_RANK)?;
            self.stats.work_requests += 1;

            let packet = self.transport.recv_from(COORDINATOR_RANK)?;
            match Tag::from_code(packet.tag) {
                Some(Tag::Terminate) => return Ok(()),
                Some(Tag::GenomeLength) => {
                    let mut genome: G = receive_genome(&mut self.transport, COORDINATOR_RANK, &packet)?;
                    log::debug!("[{}] training genome {}", name, genome.generation_id());
                    self.train(name, &mut genome);
                    send_genome(&self.transport, COORDINATOR_RANK, &genome)?;
                }
                _ => {
                    return Err(DistevoError::UnknownTag {
                        tag: packet.tag,
                        from_rank: COORDINATOR_RANK,
                    })
                }
            }
        }
    }

    /// A failed training step returns the genome untrained rather than starving the slot
    fn train(&mut self, name: &str, genome: &mut G) {
        match self.trainer.train(genome) {
            Ok(fitness) => {
                self.stats.genomes_trained += 1;
                if compare_fitness(Some(fitness), self.stats.best_fitness) == Ordering::Less {
                    self.stats.best_fitness = Some(fitness);
                }
            }
            Err(error) => {
                self.stats.training_failures += 1;
                log::warn!("[{}] training genome {} failed: {}", name, genome.generation_id(), error);
            }
        }
    }
}
