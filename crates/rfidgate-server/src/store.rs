use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use rfidgate_frame::TagDetection;

use crate::config::ServerConfig;
use crate::publish::Publisher;
use crate::reading::{unix_millis, Reading};
use crate::timer::DebounceTimer;

/// Per-connection burst aggregation.
///
/// Every [`add`](AggregationStore::add) restarts the debounce timer; once the
/// connection has been quiet for the debounce window the accumulated tags are
/// published as one [`Reading`]. The arrival path and the timer task share one
/// lock, so a state transition is never interleaved with another.
///
/// The published device id is the one carried by the most recent arrival,
/// even if earlier arrivals in the same burst named a different device.
#[derive(Clone)]
pub struct AggregationStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: Mutex<Burst>,
    publisher: Arc<dyn Publisher>,
    topic: String,
    debounce: Duration,
}

#[derive(Default)]
struct Burst {
    device: String,
    tags: Vec<TagDetection>,
    timer: DebounceTimer,
    // Bumped on every arm and on close; a timer task holding an older value
    // was superseded and must not publish.
    generation: u64,
}

impl AggregationStore {
    pub fn new(publisher: Arc<dyn Publisher>, config: &ServerConfig) -> Self {
        Self::with_debounce(publisher, config.topic.clone(), config.debounce)
    }

    pub fn with_debounce(
        publisher: Arc<dyn Publisher>,
        topic: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Burst::default()),
                publisher,
                topic: topic.into(),
                debounce,
            }),
        }
    }

    /// Record detections from `device` and restart the debounce window.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn add(&self, device: String, tags: Vec<TagDetection>) {
        let mut burst = self.inner.lock();
        burst.generation = burst.generation.wrapping_add(1);
        let generation = burst.generation;

        let inner = Arc::clone(&self.inner);
        burst
            .timer
            .arm(self.inner.debounce, move || inner.fire(generation));

        tracing::trace!(device = %device, tags = tags.len(), "detections buffered");
        burst.device = device;
        burst.tags.extend(tags);
    }

    /// Cancel the timer and publish whatever is pending right away.
    ///
    /// Called on connection teardown. Returns the published reading, if any.
    pub fn close(&self) -> Option<Reading> {
        let mut burst = self.inner.lock();
        burst.timer.cancel();
        burst.generation = burst.generation.wrapping_add(1);
        self.inner.publish_locked(&mut burst)
    }

    /// Number of detections waiting for the timer.
    pub fn pending(&self) -> usize {
        self.inner.lock().tags.len()
    }

    pub fn is_armed(&self) -> bool {
        self.inner.lock().timer.is_armed()
    }
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, Burst> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, generation: u64) {
        let mut burst = self.lock();
        if burst.generation != generation {
            tracing::trace!("superseded debounce timer fired");
            return;
        }
        burst.timer.disarm();
        self.publish_locked(&mut burst);
    }

    /// Publish and reset the burst. The burst is cleared even if publishing fails.
    fn publish_locked(&self, burst: &mut Burst) -> Option<Reading> {
        let device = std::mem::take(&mut burst.device);
        let tags = std::mem::take(&mut burst.tags);
        if tags.is_empty() {
            return None;
        }

        let reading = Reading::new(device, tags, unix_millis());
        let payload = match reading.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize reading");
                return None;
            }
        };

        match self.publisher.publish(&self.topic, Bytes::from(payload)) {
            Ok(()) => tracing::debug!(
                device = %reading.device,
                tags = reading.data.len(),
                topic = %self.topic,
                "reading published"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                device = %reading.device,
                tags = reading.data.len(),
                "publish failed, reading dropped"
            ),
        }
        Some(reading)
    }
}
