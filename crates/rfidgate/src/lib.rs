//! Gateway that turns RFID reader TCP streams into debounced bus readings.
//!
//! Readers push binary frames over TCP; the gateway reassembles them, merges
//! detections that arrive close together and publishes one JSON reading per
//! burst.
//!
//! # Crate Structure
//!
//! - [`frame`]: wire format, checksum, decoding and stream reassembly
//! - [`server`]: TCP listener, debounce store and publisher seam (behind `server` feature)

/// Re-export frame types.
pub mod frame {
    pub use rfidgate_frame::*;
}

/// Re-export server types (requires `server` feature).
#[cfg(feature = "server")]
pub mod server {
    pub use rfidgate_server::*;
}
