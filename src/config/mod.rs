pub mod traits;
pub mod evolution;
pub mod speciation;
pub mod distributed;
pub mod network;
pub mod manager;
mod builder;

pub use manager::{AppConfig, ConfigManager};
pub use evolution::EvolutionSettings;
pub use speciation::{SpeciationSettings, StrategyKind};
pub use distributed::{DistributedSettings, Role, TransportKind};
pub use network::NetworkSettings;
pub use traits::ConfigSection;
