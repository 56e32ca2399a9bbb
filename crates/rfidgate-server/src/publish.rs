use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::PublishError;

/// The bus capability the gateway publishes readings through.
///
/// Implementations must not block: `publish` is called while a store lock is
/// held, from any number of connection tasks at once.
pub trait Publisher: Send + Sync + 'static {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError>;
}

/// A published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
}

/// Hands every message to an unbounded tokio channel.
///
/// The receiving half is the bridge to the real bus client (or to stdout in
/// the CLI).
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        self.tx
            .send(Message {
                topic: topic.to_string(),
                payload,
            })
            .map_err(|_| PublishError::Closed)
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<Message>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return everything published so far.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Message {
                topic: topic.to_string(),
                payload,
            });
        Ok(())
    }
}
