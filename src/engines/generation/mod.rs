pub mod genome;
pub mod operators;
pub mod group;
pub mod distance;
pub mod strategy;
pub mod neat;
pub mod island;
pub mod evolution_engine;
pub mod fitness_log;
pub mod progress;
pub mod network;

pub use genome::Genome;
pub use operators::{GenomeOperators, Operator, OperatorRates};
pub use group::{Group, GroupInsert, GroupKind};
pub use distance::NeatDistance;
pub use strategy::SpeciationStrategy;
pub use neat::{NeatSettings, NeatSpeciationStrategy};
pub use island::IslandSpeciationStrategy;
pub use evolution_engine::{EvolutionEngine, EvolutionConfig, ProgressCallback};
pub use progress::{LogProgressCallback, ChannelProgressCallback, ProgressMessage};
pub use network::{network_operators, NetworkGenome};
