pub mod trainer;

pub use trainer::{SyntheticTrainer, Trainer};
