//! TCP ingestion and debounced aggregation of RFID reader streams.
//!
//! Every accepted connection gets its own [`Reassembler`](rfidgate_frame::Reassembler)
//! and [`AggregationStore`]. Detections arriving within the debounce window are
//! merged and published as one [`Reading`] through a [`Publisher`].

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod publish;
pub mod reading;
pub mod store;
pub mod timer;

pub use config::{ServerConfig, DEFAULT_DEBOUNCE, DEFAULT_LISTEN_ADDR, DEFAULT_TOPIC};
pub use connection::handle_connection;
pub use error::{PublishError, Result, ServerError};
pub use listener::RfidListener;
pub use publish::{ChannelPublisher, MemoryPublisher, Message, Publisher};
pub use reading::{unix_millis, Reading, READING_KIND};
pub use store::AggregationStore;
pub use timer::DebounceTimer;
