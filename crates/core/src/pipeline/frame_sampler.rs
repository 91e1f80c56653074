use std::time::{Duration, Instant};

/// Per-frame admission policy: decides which raw frames proceed to
/// detection and dispatch.
///
/// Samplers are stateful but only ever driven from the session's single
/// control flow, so they need no internal locking.
pub trait FrameSampler: Send {
    /// Admission decision for a frame arriving at `now`. Frames are
    /// offered in capture order.
    fn admit(&mut self, now: Instant) -> bool;
}

/// Periodic skip: admits one frame in every `every`.
pub struct SkipFrameSampler {
    every: usize,
    counter: usize,
}

impl SkipFrameSampler {
    pub fn new(every: usize) -> Result<Self, &'static str> {
        if every < 1 {
            return Err("skip factor must be >= 1");
        }
        Ok(Self { every, counter: 0 })
    }
}

impl FrameSampler for SkipFrameSampler {
    fn admit(&mut self, _now: Instant) -> bool {
        self.counter += 1;
        self.counter % self.every == 0
    }
}

/// Time throttle: admits a frame only when at least `interval` has
/// elapsed since the previous admission. The reference time is updated
/// only on admission, so rejected frames never extend the gap.
pub struct ThrottleSampler {
    interval: Duration,
    last_admission: Option<Instant>,
}

impl ThrottleSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admission: None,
        }
    }
}

impl FrameSampler for ThrottleSampler {
    fn admit(&mut self, now: Instant) -> bool {
        let due = match self.last_admission {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due {
            self.last_admission = Some(now);
        }
        due
    }
}
