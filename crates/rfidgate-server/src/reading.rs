use std::time::{SystemTime, UNIX_EPOCH};

use rfidgate_frame::TagDetection;
use serde::{Deserialize, Serialize};

/// Value of the `type` field of every reading.
pub const READING_KIND: &str = "RFID";

/// One settled burst of detections, as published on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "type")]
    pub kind: String,
    pub device: String,
    pub data: Vec<TagDetection>,
    /// Unix time in milliseconds.
    pub ts: i64,
}

impl Reading {
    pub fn new(device: String, data: Vec<TagDetection>, ts: i64) -> Self {
        Self {
            kind: READING_KIND.to_string(),
            device,
            data,
            ts,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Current Unix time in milliseconds; 0 if the clock is before the epoch.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
