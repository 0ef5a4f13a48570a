use super::evolution_engine::ProgressCallback;
use crate::types::{GenerationId, GroupId, InsertResult};

/// Logs generation and insertion events through the `log` facade
pub struct LogProgressCallback {
    report_every: u64,
}

impl LogProgressCallback {
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every: report_every.max(1),
        }
    }
}

impl Default for LogProgressCallback {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ProgressCallback for LogProgressCallback {
    fn on_genome_generated(&mut self, generation_id: GenerationId, group_id: GroupId) {
        log::debug!("generated genome {} for group {}", generation_id, group_id);
    }

    fn on_genome_inserted(&mut self, evaluated: u64, result: InsertResult, best_fitness: Option<f64>) {
        if result == InsertResult::NewGlobalBest {
            log::info!("new global best after {} evaluations: {:?}", evaluated, best_fitness);
        } else if evaluated % self.report_every == 0 {
            log::info!("evaluated {} genomes, best fitness {:?}", evaluated, best_fitness);
        }
    }

    fn on_budget_exhausted(&mut self, generated: u64) {
        log::info!("genome budget exhausted after {} genomes", generated);
    }
}

// For progress reporting across threads
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    Generated { generation_id: GenerationId, group_id: GroupId },
    Inserted { evaluated: u64, result: InsertResult, best_fitness: Option<f64> },
    BudgetExhausted { generated: u64 },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_genome_generated(&mut self, generation_id: GenerationId, group_id: GroupId) {
        let _ = self.sender.send(ProgressMessage::Generated { generation_id, group_id });
    }

    fn on_genome_inserted(&mut self, evaluated: u64, result: InsertResult, best_fitness: Option<f64>) {
        let _ = self.sender.send(ProgressMessage::Inserted {
            evaluated,
            result,
            best_fitness,
        });
    }

    fn on_budget_exhausted(&mut self, generated: u64) {
        let _ = self.sender.send(ProgressMessage::BudgetExhausted { generated });
    }
}
