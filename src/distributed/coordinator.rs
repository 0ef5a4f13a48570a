use crate::distributed::message::{receive_genome, send_genome, send_terminate, Packet, Tag};
use crate::distributed::transport::Transport;
use crate::engines::generation::evolution_engine::EvolutionEngine;
use crate::engines::generation::genome::Genome;
use crate::error::{DistevoError, Result};
use crate::types::{InsertResult, Rank};
use std::sync::{Arc, Mutex, MutexGuard};

/// Exit code passed to [`Transport::abort`] on a fatal coordinator error
pub const COORDINATOR_ABORT_CODE: i32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub work_requests: u64,
    pub genomes_sent: u64,
    pub genomes_received: u64,
    /// Results handed to `insert_genome`, accepted or not
    pub genomes_inserted: u64,
    pub new_global_bests: u64,
    pub terminates_sent: usize,
}

/// Master role: hands out genomes on request and folds trained results back in
///
/// The engine lock is taken only around `generate_genome` / `insert_genome`, never
/// while waiting on the transport.
pub struct Coordinator<G: Genome, T: Transport> {
    transport: T,
    engine: Arc<Mutex<EvolutionEngine<G>>>,
    worker_count: usize,
    stats: CoordinatorStats,
}

impl<G: Genome, T: Transport> Coordinator<G, T> {
    pub fn new(transport: T, engine: Arc<Mutex<EvolutionEngine<G>>>) -> Result<Self> {
        let worker_count = transport.size().saturating_sub(1);
        if worker_count == 0 {
            return Err(DistevoError::Configuration(
                "a distributed run needs at least one worker".to_string(),
            ));
        }
        Ok(Self {
            transport,
            engine,
            worker_count,
            stats: CoordinatorStats::default(),
        })
    }

    pub fn engine(&self) -> Arc<Mutex<EvolutionEngine<G>>> {
        Arc::clone(&self.engine)
    }

    pub fn stats(&self) -> &CoordinatorStats {
        &self.stats
    }

    /// Serve until every worker has been sent a terminate; abort the run on any fatal error
    pub fn run(&mut self) -> Result<CoordinatorStats> {
        log::info!("coordinator serving {} workers", self.worker_count);
        match self.serve() {
            Ok(()) => {
                log::info!(
                    "coordinator finished: {} genomes sent, {} results inserted",
                    self.stats.genomes_sent,
                    self.stats.genomes_inserted
                );
                Ok(self.stats.clone())
            }
            Err(error) => {
                log::error!("coordinator failed: {}", error);
                // Workers of a star transport only reach the coordinator, so a worker
                // abort is relayed to every other rank from here
                self.transport.abort(COORDINATOR_ABORT_CODE);
                Err(error)
            }
        }
    }

    fn serve(&mut self) -> Result<()> {
        while self.stats.terminates_sent < self.worker_count {
            let (source, packet) = self.transport.recv_any()?;
            log::debug!("coordinator received tag {} from rank {}", packet.tag, source);

            match Tag::from_code(packet.tag) {
                Some(Tag::WorkRequest) => self.handle_work_request(source)?,
                Some(Tag::GenomeLength) => self.handle_result(source, &packet)?,
                _ => {
                    return Err(DistevoError::UnknownTag {
                        tag: packet.tag,
                        from_rank: source,
                    })
                }
            }
        }
        Ok(())
    }

    fn handle_work_request(&mut self, source: Rank) -> Result<()> {
        self.stats.work_requests += 1;
        let next = self.lock_engine()?.generate_genome()?;

        match next {
            None => {
                log::info!("terminating worker {}", source);
                send_terminate(&self.transport, source)?;
                self.stats.terminates_sent += 1;
                log::debug!("sent {} of {} terminates", self.stats.terminates_sent, self.worker_count);
            }
            Some(genome) => {
                send_genome(&self.transport, source, &genome)?;
                self.stats.genomes_sent += 1;
            }
        }
        Ok(())
    }

    fn handle_result(&mut self, source: Rank, length_packet: &Packet) -> Result<()> {
        let genome: G = receive_genome(&mut self.transport, source, length_packet)?;
        self.stats.genomes_received += 1;

        let result = self.lock_engine()?.insert_genome(&genome)?;
        self.stats.genomes_inserted += 1;
        if result == InsertResult::NewGlobalBest {
            self.stats.new_global_bests += 1;
        }
        log::debug!(
            "genome {} from rank {} inserted: {:?}",
            genome.generation_id(),
            source,
            result
        );
        Ok(())
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, EvolutionEngine<G>>> {
        self.engine
            .lock()
            .map_err(|_| DistevoError::Invariant("evolution engine lock poisoned".to_string()))
    }
}
