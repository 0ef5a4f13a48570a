use super::traits::ConfigSection;
use crate::distributed::frame::DEFAULT_MAX_FRAME_BYTES;
use crate::error::{DistevoError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Worker threads in this process
    Local,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coordinator,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributedSettings {
    pub transport: TransportKind,
    /// Only read for the tcp transport
    pub role: Role,
    pub worker_count: usize,
    pub bind_address: String,
    pub coordinator_address: String,
    pub connect_attempts: usize,
    pub connect_retry_ms: u64,
    pub max_frame_bytes: usize,
}

impl Default for DistributedSettings {
    fn default() -> Self {
        Self {
            transport: TransportKind::Local,
            role: Role::Coordinator,
            worker_count: 4,
            bind_address: "0.0.0.0:7420".to_string(),
            coordinator_address: "127.0.0.1:7420".to_string(),
            connect_attempts: 50,
            connect_retry_ms: 200,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ConfigSection for DistributedSettings {
    fn section_name() -> &'static str {
        "distributed"
    }

    fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(DistevoError::Configuration(
                "distributed.worker_count must be at least 1".to_string(),
            ));
        }
        if self.max_frame_bytes < 4 {
            return Err(DistevoError::Configuration(
                "distributed.max_frame_bytes is too small to carry a length prefix".to_string(),
            ));
        }
        if self.transport == TransportKind::Tcp && self.connect_attempts == 0 {
            return Err(DistevoError::Configuration(
                "distributed.connect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
