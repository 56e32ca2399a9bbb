use std::time::Duration;

use rfidgate_frame::{MAX_FRAME_SIZE, MAX_WIRE_FRAME_SIZE, MIN_FRAME_SIZE};

use crate::error::{Result, ServerError};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:54329";

/// Quiet period after the last detection before a burst is published.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub const DEFAULT_TOPIC: &str = "tjg.rfid";

/// Gateway configuration, fixed once the listener starts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`host:port`).
    pub listen_addr: String,
    /// Debounce window for merging detections.
    pub debounce: Duration,
    /// Largest frame accepted; also the reassembly buffer capacity.
    pub max_frame_size: usize,
    /// Bus topic readings are published on.
    pub topic: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            max_frame_size: MAX_FRAME_SIZE,
            topic: DEFAULT_TOPIC.to_string(),
        }
    }
}

impl ServerConfig {
    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(ServerError::Config(
                "listen address must not be empty".into(),
            ));
        }
        if self.debounce.is_zero() {
            return Err(ServerError::Config(
                "debounce must be greater than zero".into(),
            ));
        }
        if !(MIN_FRAME_SIZE..=MAX_WIRE_FRAME_SIZE).contains(&self.max_frame_size) {
            return Err(ServerError::Config(format!(
                "max frame size {} outside {MIN_FRAME_SIZE}..={MAX_WIRE_FRAME_SIZE}",
                self.max_frame_size
            )));
        }
        if self.topic.trim().is_empty() {
            return Err(ServerError::Config("topic must not be empty".into()));
        }
        Ok(())
    }

    /// Socket read size: a quarter of the maximum frame.
    pub fn read_chunk_size(&self) -> usize {
        (self.max_frame_size / 4).max(1)
    }
}
