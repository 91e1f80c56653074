use std::time::Duration;

/// Per-session counters, reported once at session end.
///
/// Every per-frame and per-detection failure is contained at its own
/// granularity; these counters are how the containment stays visible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Raw frames offered by the capture source.
    pub frames_seen: usize,
    /// Frames the sampler admitted.
    pub frames_admitted: usize,
    /// Detections returned by the detector on admitted frames.
    pub detections: usize,
    /// Detections that passed the quality gate.
    pub accepted: usize,
    /// Payloads (frames or batches) handed to the dispatcher.
    pub dispatched: usize,
    /// Offers the dispatcher shed under backpressure.
    pub shed: usize,
    /// Detections dropped because their clamped crop was empty.
    pub skipped_crops: usize,
    /// Detector invocations that failed (contained, not fatal).
    pub detect_failures: usize,
    /// Frames the source failed to produce (contained, not fatal).
    pub read_failures: usize,
}

impl SessionStats {
    pub fn summary_string(&self, elapsed: Duration) -> String {
        format!(
            "Session summary ({:.1}s): {} frames seen, {} admitted, \
             {} detections ({} accepted, {} empty crops), \
             {} dispatched, {} shed, {} detect failures, {} read failures",
            elapsed.as_secs_f64(),
            self.frames_seen,
            self.frames_admitted,
            self.detections,
            self.accepted,
            self.skipped_crops,
            self.dispatched,
            self.shed,
            self.detect_failures,
            self.read_failures,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_includes_all_counters() {
        let stats = SessionStats {
            frames_seen: 10,
            frames_admitted: 5,
            detections: 4,
            accepted: 3,
            dispatched: 2,
            shed: 1,
            skipped_crops: 1,
            detect_failures: 0,
            read_failures: 0,
        };
        let summary = stats.summary_string(Duration::from_millis(2500));
        assert!(summary.contains("2.5s"));
        assert!(summary.contains("10 frames seen"));
        assert!(summary.contains("5 admitted"));
        assert!(summary.contains("2 dispatched"));
        assert!(summary.contains("1 shed"));
    }

    #[test]
    fn test_default_is_all_zero() {
        assert_eq!(SessionStats::default().frames_seen, 0);
        assert_eq!(SessionStats::default().dispatched, 0);
    }
}
