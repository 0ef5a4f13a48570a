//! Coordinator/worker protocol over a pluggable point-to-point transport

pub mod coordinator;
pub mod frame;
pub mod local;
pub mod message;
pub mod tcp;
pub mod transport;
pub mod worker;

pub use coordinator::{Coordinator, CoordinatorStats};
pub use local::{run_local, LocalRunSummary};
pub use message::{Packet, Tag};
pub use tcp::TcpTransport;
pub use transport::{ChannelTransport, Transport};
pub use worker::{Worker, WorkerStats};
