use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::sample::{RawSample, Sample};
use crate::error::{ChartError, ChartResult};

/// Default retained-sample capacity, matching the typical one-minute window
/// at sub-second tick rates with ample headroom.
pub const DEFAULT_CAPACITY: usize = 2_000;

const FREQUENCY_WINDOW_MS: i64 = 60_000;
const FREQUENCY_REFRESH_MS: i64 = 1_000;

/// Notification delivered synchronously to buffer subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferEvent {
    SampleAdded(Sample),
    Cleared,
}

/// Handle returned by [`SampleBuffer::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

/// Arrival-frequency statistics over the trailing minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyStats {
    pub total_received: u64,
    pub last_minute_count: usize,
    /// Samples per second averaged over the trailing minute.
    pub average_frequency: f64,
}

type SubscriberFn = Box<dyn FnMut(&BufferEvent)>;

/// Bounded, listener-driven store of price samples in arrival order.
///
/// The buffer never grows past its capacity: the oldest sample is evicted
/// FIFO when the bound is exceeded. All time-sensitive operations take an
/// explicit `now_ms` so the host frame driver (or a test clock) owns time.
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    total_received: u64,
    arrivals: VecDeque<i64>,
    last_frequency_refresh_ms: i64,
    subscribers: IndexMap<u64, SubscriberFn>,
    next_subscription: u64,
    next_id_suffix: u64,
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.samples.len())
            .field("capacity", &self.capacity)
            .field("total_received", &self.total_received)
            .field("subscriber_count", &self.subscribers.len())
            .finish()
    }
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> ChartResult<Self> {
        if capacity == 0 {
            return Err(ChartError::InvalidData(
                "sample buffer capacity must be > 0".to_owned(),
            ));
        }

        Ok(Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            total_received: 0,
            arrivals: VecDeque::new(),
            last_frequency_refresh_ms: i64::MIN,
            subscribers: IndexMap::new(),
            next_subscription: 0,
            next_id_suffix: 0,
        })
    }

    /// Validates and appends one sample, evicting the oldest on overflow,
    /// then notifies every subscriber.
    ///
    /// `arrival_ms` is the wall-clock arrival instant used for frequency
    /// tracking; it is independent of the sample's own timestamp.
    pub fn add_sample(&mut self, raw: RawSample, arrival_ms: i64) -> ChartResult<Sample> {
        raw.validate()?;

        // Keeps the arrival tracker bounded even when the host never asks
        // for stats; the 1s throttle makes this near-free per add.
        self.refresh_frequency(arrival_ms);

        let suffix = self.next_id_suffix;
        self.next_id_suffix += 1;
        let sample = Sample::from_raw(raw, suffix);

        self.samples.push_back(sample.clone());
        self.total_received += 1;
        self.arrivals.push_back(arrival_ms);

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        trace!(
            id = %sample.id,
            len = self.samples.len(),
            total = self.total_received,
            "sample added"
        );
        self.notify(&BufferEvent::SampleAdded(sample.clone()));
        Ok(sample)
    }

    /// Returns the last `n` samples in arrival order (fewer if shorter).
    #[must_use]
    pub fn latest(&self, n: usize) -> Vec<Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    /// Returns all samples with `start_ms <= timestamp <= end_ms` in order.
    /// Inverted bounds select nothing.
    #[must_use]
    pub fn in_range(&self, start_ms: i64, end_ms: i64) -> Vec<Sample> {
        self.samples
            .iter()
            .filter(|sample| sample.timestamp_ms >= start_ms && sample.timestamp_ms <= end_ms)
            .cloned()
            .collect()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// Current arrival-frequency statistics, pruned to the trailing minute.
    pub fn frequency_stats(&mut self, now_ms: i64) -> FrequencyStats {
        self.prune_arrivals(now_ms);
        let last_minute_count = self.arrivals.len();
        FrequencyStats {
            total_received: self.total_received,
            last_minute_count,
            average_frequency: last_minute_count as f64 / 60.0,
        }
    }

    /// Throttled frequency refresh, called once per frame by the engine.
    ///
    /// Replaces the original periodic timer: pruning runs at most once per
    /// second regardless of frame rate.
    pub fn refresh_frequency(&mut self, now_ms: i64) {
        if now_ms.saturating_sub(self.last_frequency_refresh_ms) < FREQUENCY_REFRESH_MS {
            return;
        }
        self.prune_arrivals(now_ms);
    }

    fn prune_arrivals(&mut self, now_ms: i64) {
        let cutoff = now_ms - FREQUENCY_WINDOW_MS;
        while self.arrivals.front().is_some_and(|&at| at <= cutoff) {
            self.arrivals.pop_front();
        }
        self.last_frequency_refresh_ms = now_ms;
    }

    /// Registers a subscriber notified synchronously on every buffer event.
    pub fn subscribe(&mut self, callback: impl FnMut(&BufferEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.insert(id, Box::new(callback));
        SubscriptionId(id)
    }

    /// Deregisters a subscriber. Returns `false` when the id is unknown.
    ///
    /// Removal takes effect for subsequent notifications; a notification
    /// already in progress completes with the registry it started with.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.shift_remove(&id.0).is_some()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Empties samples and frequency tracking and resets `total_received`.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.arrivals.clear();
        self.total_received = 0;
        debug!("sample buffer cleared");
        self.notify(&BufferEvent::Cleared);
    }

    /// Releases all subscribers and frequency state. Idempotent.
    pub fn dispose(&mut self) {
        if !self.subscribers.is_empty() {
            debug!(
                subscriber_count = self.subscribers.len(),
                "sample buffer disposed"
            );
        }
        self.subscribers.clear();
        self.arrivals.clear();
    }

    fn notify(&mut self, event: &BufferEvent) {
        for (id, callback) in &mut self.subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(event)));
            if outcome.is_err() {
                warn!(
                    subscriber_id = id,
                    "buffer subscriber panicked during notification; continuing delivery"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferEvent, SampleBuffer};
    use crate::core::sample::RawSample;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn raw(ts: i64, price: f64) -> RawSample {
        RawSample::new(ts, price, 100, ts as u64)
    }

    #[test]
    fn eviction_keeps_most_recent_in_arrival_order() {
        let mut buffer = SampleBuffer::new(3).expect("capacity");
        for i in 0..5 {
            buffer.add_sample(raw(1_000 + i, 100.0), 1_000 + i).expect("add");
        }

        assert_eq!(buffer.len(), 3);
        let kept: Vec<i64> = buffer.samples().map(|s| s.timestamp_ms).collect();
        assert_eq!(kept, vec![1_002, 1_003, 1_004]);
        assert_eq!(buffer.total_received(), 5);
    }

    #[test]
    fn sample_ids_are_unique_for_identical_timestamps() {
        let mut buffer = SampleBuffer::new(8).expect("capacity");
        let a = buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");
        let b = buffer.add_sample(raw(1_000, 101.0), 1_001).expect("add");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn rejected_sample_leaves_state_untouched() {
        let mut buffer = SampleBuffer::new(8).expect("capacity");
        buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");

        buffer
            .add_sample(RawSample::new(1_001, -5.0, 0, 2), 1_001)
            .expect_err("negative price");
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.total_received(), 1);
        assert_eq!(buffer.frequency_stats(1_001).last_minute_count, 1);
    }

    #[test]
    fn arrival_tracker_stays_bounded_under_adds_alone() {
        let mut buffer = SampleBuffer::new(8).expect("capacity");
        for i in 0..10_i64 {
            let at = i * 61_000;
            buffer.add_sample(raw(at, 100.0), at).expect("add");
        }

        // Each add is more than a minute after the last, so ingestion alone
        // must have pruned every earlier arrival instant.
        assert_eq!(buffer.arrivals.len(), 1);
        assert_eq!(buffer.total_received(), 10);
    }

    #[test]
    fn panicking_subscriber_does_not_block_delivery() {
        let mut buffer = SampleBuffer::new(8).expect("capacity");
        let seen = Rc::new(RefCell::new(0_u32));

        buffer.subscribe(|_event| panic!("subscriber failure"));
        let seen_clone = Rc::clone(&seen);
        buffer.subscribe(move |event| {
            if matches!(event, BufferEvent::SampleAdded(_)) {
                *seen_clone.borrow_mut() += 1;
            }
        });

        buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn unsubscribe_takes_effect_for_subsequent_notifications() {
        let mut buffer = SampleBuffer::new(8).expect("capacity");
        let seen = Rc::new(RefCell::new(0_u32));

        let seen_clone = Rc::clone(&seen);
        let id = buffer.subscribe(move |_event| {
            *seen_clone.borrow_mut() += 1;
        });

        buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");
        assert!(buffer.unsubscribe(id));
        assert!(!buffer.unsubscribe(id));
        buffer.add_sample(raw(1_001, 101.0), 1_001).expect("add");

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut buffer = SampleBuffer::new(8).expect("capacity");
        buffer.subscribe(|_event| {});
        buffer.dispose();
        buffer.dispose();
        assert_eq!(buffer.subscriber_count(), 0);
    }
}
