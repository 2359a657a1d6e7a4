use smallvec::SmallVec;
use tracing::trace;

use crate::core::types::DataPoint;
use crate::error::{ChartError, ChartResult};

/// Pending transitions beyond the active one are bounded to this depth;
/// newest excess requests are discarded so already-queued transitions still
/// play in arrival order.
pub const MAX_PENDING: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    from: DataPoint,
    to: DataPoint,
}

/// Single-slot interpolation engine for the newest line segment.
///
/// One transition runs at a time; competing requests queue FIFO and chain
/// back-to-back. Endpoints are data-space (time, price) pairs: callers map
/// the interpolated point through the live viewport transform every frame,
/// so pan/zoom mid-animation never leaves stale screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationScheduler {
    duration_ms: f64,
    is_animating: bool,
    start_time_ms: i64,
    active: Segment,
    progress: f64,
    pending: SmallVec<[Segment; MAX_PENDING]>,
}

impl AnimationScheduler {
    pub fn new(duration_ms: f64) -> ChartResult<Self> {
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return Err(ChartError::InvalidData(
                "animation duration must be finite and > 0".to_owned(),
            ));
        }

        Ok(Self {
            duration_ms,
            is_animating: false,
            start_time_ms: 0,
            active: Segment {
                from: DataPoint::new(0.0, 0.0),
                to: DataPoint::new(0.0, 0.0),
            },
            progress: 0.0,
            pending: SmallVec::new(),
        })
    }

    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.is_animating
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Requests a transition from `from` to `to`.
    ///
    /// Starts immediately when idle; otherwise queues FIFO, silently
    /// dropping the request once the queue is full. Non-finite endpoints
    /// are rejected silently: malformed geometry never reaches drawing.
    pub fn enqueue(&mut self, from: DataPoint, to: DataPoint, now_ms: i64) {
        if !from.is_finite() || !to.is_finite() {
            trace!("rejecting animation with non-finite endpoints");
            return;
        }

        let segment = Segment { from, to };
        if !self.is_animating {
            self.start(segment, now_ms);
        } else if self.pending.len() < MAX_PENDING {
            self.pending.push(segment);
        } else {
            trace!(pending = self.pending.len(), "animation queue full, dropping newest request");
        }
    }

    /// Advances the active transition to `now_ms`.
    ///
    /// On completion the next queued transition starts immediately with a
    /// fresh start time, chaining animations back-to-back with no gap.
    pub fn tick(&mut self, now_ms: i64) {
        if !self.is_animating {
            return;
        }

        let elapsed = (now_ms - self.start_time_ms) as f64;
        self.progress = (elapsed / self.duration_ms).clamp(0.0, 1.0);

        if self.progress >= 1.0 {
            self.is_animating = false;
            self.progress = 0.0;
            if !self.pending.is_empty() {
                let next = self.pending.remove(0);
                self.start(next, now_ms);
            }
        }
    }

    /// Current eased endpoint in data space, or `None` when idle.
    ///
    /// Cubic ease-out (`1 - (1-t)^3`): fast start, settle at rest, so the
    /// arrival of new data reads visually instead of constant-velocity
    /// motion.
    #[must_use]
    pub fn current_point(&self) -> Option<DataPoint> {
        if !self.is_animating {
            return None;
        }

        let eased = ease_out_cubic(self.progress);
        Some(DataPoint::new(
            self.active.from.x + (self.active.to.x - self.active.from.x) * eased,
            self.active.from.y + (self.active.to.y - self.active.from.y) * eased,
        ))
    }

    /// Stops the active transition and empties the queue.
    ///
    /// Used on view reset so no stale geometry survives the reset.
    pub fn clear(&mut self) {
        self.is_animating = false;
        self.progress = 0.0;
        self.pending.clear();
    }

    fn start(&mut self, segment: Segment, now_ms: i64) {
        self.active = segment;
        self.start_time_ms = now_ms;
        self.progress = 0.0;
        self.is_animating = true;
    }
}

#[must_use]
fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}
