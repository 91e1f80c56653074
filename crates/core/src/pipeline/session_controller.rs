use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::quality_gate::QualityGate;
use crate::dispatch::domain::dispatcher::{DispatchMode, DispatchOutcome, Dispatcher};
use crate::pipeline::crop_extractor::{CropExtractor, CropOutcome};
use crate::pipeline::frame_sampler::FrameSampler;
use crate::pipeline::session_stats::SessionStats;
use crate::shared::clock::epoch_ms;
use crate::shared::constants::DEFAULT_SESSION_BUDGET;
use crate::shared::detection::BoundingBox;
use crate::shared::frame::RawFrame;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The capture source could not be acquired; the session never left
    /// Idle.
    #[error("capture source unavailable: {0}")]
    Capture(#[from] CaptureError),
    #[error("session already executed")]
    AlreadyExecuted,
}

/// Lifecycle of one capture session. Transitions Idle → Running →
/// Stopping → Idle exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Stopping,
}

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Wall-clock budget after which capture auto-stops.
    pub budget: Duration,
    pub mode: DispatchMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_SESSION_BUDGET,
            mode: DispatchMode::Batch,
        }
    }
}

/// Requests an early stop of a running session from another thread.
///
/// Each session owns its own flag; handles never outlive into a later
/// session.
#[derive(Clone)]
pub struct SessionHandle {
    stop: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Owns the session lifecycle and wires sampler → detector → quality
/// gate → crop extractor → dispatcher.
///
/// Single control flow: each frame is processed to completion before the
/// next is considered; only dispatch completes asynchronously, behind
/// the [`Dispatcher`]. This is a single-use struct: `run` consumes the
/// owned components, so calling it twice fails.
pub struct SessionController {
    config: SessionConfig,
    source: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn FaceDetector>>,
    sampler: Option<Box<dyn FrameSampler>>,
    gate: QualityGate,
    extractor: CropExtractor,
    dispatcher: Option<Dispatcher>,
    stop: Arc<AtomicBool>,
    status: SessionStatus,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        sampler: Box<dyn FrameSampler>,
        gate: QualityGate,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            config,
            source: Some(source),
            detector: Some(detector),
            sampler: Some(sampler),
            gate,
            extractor: CropExtractor::new(),
            dispatcher: Some(dispatcher),
            stop: Arc::new(AtomicBool::new(false)),
            status: SessionStatus::Idle,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            stop: self.stop.clone(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Runs the session to completion: until the capture stream ends,
    /// the budget expires, or the handle requests a stop.
    ///
    /// Per-frame and per-detection failures are contained and counted;
    /// only resource acquisition can fail the call.
    pub fn run(&mut self) -> Result<SessionStats, SessionError> {
        let mut source = self.source.take().ok_or(SessionError::AlreadyExecuted)?;
        let mut detector = self.detector.take().ok_or(SessionError::AlreadyExecuted)?;
        let mut sampler = self.sampler.take().ok_or(SessionError::AlreadyExecuted)?;
        let dispatcher = self.dispatcher.take().ok_or(SessionError::AlreadyExecuted)?;

        let format = match source.open() {
            Ok(format) => format,
            Err(e) => {
                // Nothing was acquired; the session never ran.
                source.close();
                return Err(SessionError::Capture(e));
            }
        };
        log::info!(
            "session started: {}x{}, budget {:?}, mode {:?}",
            format.width,
            format.height,
            self.config.budget,
            self.config.mode
        );

        self.status = SessionStatus::Running;
        let started = Instant::now();
        let mut stats = SessionStats::default();

        for frame_result in source.frames() {
            let now = Instant::now();
            if self.stop.load(Ordering::Acquire)
                || now.duration_since(started) >= self.config.budget
            {
                break;
            }

            let frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("frame read failed: {e}");
                    stats.read_failures += 1;
                    continue;
                }
            };
            stats.frames_seen += 1;

            if !sampler.admit(now) {
                continue;
            }
            stats.frames_admitted += 1;

            match self.config.mode {
                DispatchMode::SingleFrame => {
                    self.dispatch_whole_frame(&frame, &dispatcher, &mut stats);
                }
                DispatchMode::Batch => {
                    self.dispatch_face_batch(&frame, detector.as_mut(), &dispatcher, &mut stats);
                }
            }
        }

        self.status = SessionStatus::Stopping;
        // Every teardown cancels, whether the session ended by stop,
        // deadline, or stream exhaustion: queued work and the outcome of
        // an in-flight request are discarded, never waited on.
        dispatcher.cancel();
        source.close();
        dispatcher.shutdown();
        self.status = SessionStatus::Idle;

        log::info!("{}", stats.summary_string(started.elapsed()));
        Ok(stats)
    }

    /// Single-frame mode: the whole admitted frame is the payload, and
    /// detection runs server-side.
    fn dispatch_whole_frame(
        &self,
        frame: &RawFrame,
        dispatcher: &Dispatcher,
        stats: &mut SessionStats,
    ) {
        let full_frame = BoundingBox {
            x_center: 0.5,
            y_center: 0.5,
            width: 1.0,
            height: 1.0,
            rotation: None,
        };
        match self.extractor.extract(frame, &full_frame, epoch_ms()) {
            Ok(CropOutcome::Extracted(payload)) => match dispatcher.offer_frame(payload) {
                DispatchOutcome::Accepted => stats.dispatched += 1,
                DispatchOutcome::Shed => {
                    stats.shed += 1;
                    log::debug!("frame {} shed: request in flight", frame.index());
                }
            },
            Ok(CropOutcome::SkippedEmptyCrop) => {
                // Only possible for a zero-dimension frame.
                log::debug!("frame {} empty, nothing to send", frame.index());
            }
            Err(e) => log::warn!("frame {} encode failed: {e}", frame.index()),
        }
    }

    /// Batch mode: detect, gate, crop, and send the surviving faces of
    /// one admitted frame as a single fire-and-forget batch.
    fn dispatch_face_batch(
        &self,
        frame: &RawFrame,
        detector: &mut dyn FaceDetector,
        dispatcher: &Dispatcher,
        stats: &mut SessionStats,
    ) {
        let detections = match detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("detection failed on frame {}: {e}", frame.index());
                stats.detect_failures += 1;
                return;
            }
        };
        stats.detections += detections.len();

        let now_ms = epoch_ms();
        let mut batch = Vec::new();
        for detection in &detections {
            if let Some(reason) = self.gate.rejection(detection) {
                log::debug!("frame {}: detection rejected: {reason:?}", frame.index());
                continue;
            }
            stats.accepted += 1;

            match self.extractor.extract(frame, &detection.bounding_box, now_ms) {
                Ok(CropOutcome::Extracted(payload)) => batch.push(payload),
                Ok(CropOutcome::SkippedEmptyCrop) => {
                    stats.skipped_crops += 1;
                    log::debug!("frame {}: empty crop skipped", frame.index());
                }
                Err(e) => log::warn!("frame {}: crop encode failed: {e}", frame.index()),
            }
        }

        if batch.is_empty() {
            return;
        }
        match dispatcher.offer_batch(batch) {
            DispatchOutcome::Accepted => stats.dispatched += 1,
            DispatchOutcome::Shed => stats.shed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::CaptureFormat;
    use crate::dispatch::domain::recognition_client::{RecognitionClient, TransportError};
    use crate::pipeline::frame_sampler::SkipFrameSampler;
    use crate::shared::detection::{Detection, Landmark};
    use crate::shared::face_payload::FacePayload;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubSource {
        frames: Vec<RawFrame>,
        fail_open: bool,
        closed: Arc<Mutex<bool>>,
    }

    impl StubSource {
        fn new(frames: Vec<RawFrame>) -> Self {
            Self {
                frames,
                fail_open: false,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl FrameSource for StubSource {
        fn open(&mut self) -> Result<CaptureFormat, CaptureError> {
            if self.fail_open {
                return Err(CaptureError::Empty);
            }
            Ok(CaptureFormat {
                width: 100,
                height: 100,
            })
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = Result<RawFrame, CaptureError>> + '_> {
            Box::new(self.frames.drain(..).map(Ok))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct StubDetector {
        results: HashMap<usize, Vec<Detection>>,
        calls: Arc<Mutex<usize>>,
    }

    impl StubDetector {
        fn new(results: HashMap<usize, Vec<Detection>>) -> Self {
            Self {
                results,
                calls: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &RawFrame,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self
                .results
                .get(&frame.index())
                .cloned()
                .unwrap_or_default())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &RawFrame,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Err("model unavailable".into())
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        frames: Arc<Mutex<Vec<FacePayload>>>,
        batches: Arc<Mutex<Vec<usize>>>,
    }

    impl RecognitionClient for RecordingClient {
        fn send_frame(&self, payload: &FacePayload) -> Result<(), TransportError> {
            self.frames.lock().unwrap().push(payload.clone());
            Ok(())
        }

        fn send_batch(&self, payloads: &[FacePayload]) -> Result<(), TransportError> {
            self.batches.lock().unwrap().push(payloads.len());
            Ok(())
        }
    }

    // --- Helpers ---

    fn make_frame(index: usize) -> RawFrame {
        RawFrame::new(vec![128; 100 * 100 * 3], 100, 100, 3, index, 0)
    }

    fn make_frames(count: usize) -> Vec<RawFrame> {
        (0..count).map(make_frame).collect()
    }

    fn landmark(x: f64, y: f64) -> Landmark {
        Landmark {
            x,
            y,
            z: 0.0,
            confidence: None,
        }
    }

    fn good_detection() -> Detection {
        Detection {
            bounding_box: BoundingBox {
                x_center: 0.5,
                y_center: 0.5,
                width: 0.2,
                height: 0.2,
                rotation: Some(0.0),
            },
            landmarks: vec![
                landmark(0.45, 0.45),
                landmark(0.55, 0.45),
                landmark(0.50, 0.50),
                landmark(0.50, 0.55),
                landmark(0.42, 0.47),
                landmark(0.58, 0.47),
            ],
        }
    }

    fn tilted_detection() -> Detection {
        let mut det = good_detection();
        det.bounding_box.rotation = Some(45.0);
        det
    }

    fn out_of_frame_detection() -> Detection {
        let mut det = good_detection();
        det.bounding_box.x_center = 2.0;
        det
    }

    fn config(mode: DispatchMode) -> SessionConfig {
        SessionConfig {
            budget: Duration::from_secs(60),
            mode,
        }
    }

    fn controller(
        cfg: SessionConfig,
        source: StubSource,
        detector: Box<dyn FaceDetector>,
        client: RecordingClient,
    ) -> SessionController {
        SessionController::new(
            cfg,
            Box::new(source),
            detector,
            Box::new(SkipFrameSampler::new(1).unwrap()),
            QualityGate::default(),
            Dispatcher::new(Box::new(client)),
        )
    }

    // --- Tests ---

    #[test]
    fn test_batch_mode_sends_accepted_faces() {
        let client = RecordingClient::default();
        let batches = client.batches.clone();

        let mut results = HashMap::new();
        results.insert(0, vec![good_detection(), good_detection()]);
        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(3)),
            Box::new(StubDetector::new(results)),
            client,
        );

        let stats = session.run().unwrap();
        assert_eq!(stats.frames_seen, 3);
        assert_eq!(stats.frames_admitted, 3);
        assert_eq!(stats.detections, 2);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dispatched, 1);
        // Teardown cancellation may discard the queued batch; if it went
        // out, it carried both accepted faces.
        let sent = batches.lock().unwrap();
        assert!(sent.is_empty() || *sent == vec![2]);
    }

    #[test]
    fn test_gate_rejections_not_dispatched() {
        let client = RecordingClient::default();
        let batches = client.batches.clone();

        let mut results = HashMap::new();
        results.insert(0, vec![tilted_detection(), good_detection()]);
        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(1)),
            Box::new(StubDetector::new(results)),
            client,
        );

        let stats = session.run().unwrap();
        assert_eq!(stats.detections, 2);
        assert_eq!(stats.accepted, 1);
        // The rejected detection never reaches a batch.
        assert!(batches.lock().unwrap().iter().all(|&len| len == 1));
    }

    #[test]
    fn test_empty_crop_skipped_sibling_still_sent() {
        let client = RecordingClient::default();
        let batches = client.batches.clone();

        let mut results = HashMap::new();
        results.insert(0, vec![out_of_frame_detection(), good_detection()]);
        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(1)),
            Box::new(StubDetector::new(results)),
            client,
        );

        let stats = session.run().unwrap();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.skipped_crops, 1);
        assert_eq!(stats.dispatched, 1);
        // The empty crop never reaches a batch; its sibling does.
        assert!(batches.lock().unwrap().iter().all(|&len| len == 1));
    }

    #[test]
    fn test_no_accepted_faces_no_request() {
        let client = RecordingClient::default();
        let batches = client.batches.clone();

        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(2)),
            Box::new(StubDetector::new(HashMap::new())),
            client,
        );

        let stats = session.run().unwrap();
        assert_eq!(stats.dispatched, 0);
        assert!(batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_frame_mode_sends_whole_frames_without_detection() {
        let client = RecordingClient::default();
        let sent_frames = client.frames.clone();

        let detector = StubDetector::new(HashMap::new());
        let detect_calls = detector.calls.clone();

        let mut session = controller(
            config(DispatchMode::SingleFrame),
            StubSource::new(make_frames(2)),
            Box::new(detector),
            client,
        );

        let stats = session.run().unwrap();
        assert_eq!(*detect_calls.lock().unwrap(), 0);
        assert_eq!(stats.dispatched + stats.shed, 2);
        // Teardown cancellation may discard accepted offers still queued.
        assert!(sent_frames.lock().unwrap().len() <= stats.dispatched);
    }

    #[test]
    fn test_expired_budget_stops_before_any_admission() {
        let client = RecordingClient::default();
        let mut session = controller(
            SessionConfig {
                budget: Duration::ZERO,
                mode: DispatchMode::Batch,
            },
            StubSource::new(make_frames(50)),
            Box::new(StubDetector::new(HashMap::new())),
            client,
        );

        let stats = session.run().unwrap();
        // Frames kept arriving, but none were admitted past the deadline.
        assert_eq!(stats.frames_seen, 0);
        assert_eq!(stats.frames_admitted, 0);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_stop_handle_halts_admission() {
        let client = RecordingClient::default();
        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(10)),
            Box::new(StubDetector::new(HashMap::new())),
            client,
        );

        session.handle().stop();
        let stats = session.run().unwrap();
        assert_eq!(stats.frames_seen, 0);
    }

    #[test]
    fn test_acquire_failure_leaves_session_idle() {
        let client = RecordingClient::default();
        let mut source = StubSource::new(vec![]);
        source.fail_open = true;
        let closed = source.closed.clone();

        let mut session = controller(
            config(DispatchMode::Batch),
            source,
            Box::new(StubDetector::new(HashMap::new())),
            client,
        );

        let result = session.run();
        assert!(matches!(result, Err(SessionError::Capture(_))));
        assert_eq!(session.status(), SessionStatus::Idle);
        // Teardown is safe even though nothing was acquired.
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_detector_failure_contained() {
        let client = RecordingClient::default();
        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(3)),
            Box::new(FailingDetector),
            client,
        );

        let stats = session.run().unwrap();
        assert_eq!(stats.frames_seen, 3);
        assert_eq!(stats.detect_failures, 3);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_source_closed_after_run() {
        let client = RecordingClient::default();
        let source = StubSource::new(make_frames(1));
        let closed = source.closed.clone();

        let mut session = controller(
            config(DispatchMode::Batch),
            source,
            Box::new(StubDetector::new(HashMap::new())),
            client,
        );
        session.run().unwrap();
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_second_run_fails() {
        let client = RecordingClient::default();
        let mut session = controller(
            config(DispatchMode::Batch),
            StubSource::new(make_frames(1)),
            Box::new(StubDetector::new(HashMap::new())),
            client,
        );
        session.run().unwrap();
        assert!(matches!(session.run(), Err(SessionError::AlreadyExecuted)));
    }

    /// Records batch sizes on entry, then blocks until released, so a
    /// send can be held in flight across teardown.
    struct BlockingBatchClient {
        batches: Arc<Mutex<Vec<usize>>>,
        release: crossbeam_channel::Receiver<()>,
    }

    impl RecognitionClient for BlockingBatchClient {
        fn send_frame(&self, _payload: &FacePayload) -> Result<(), TransportError> {
            Ok(())
        }

        fn send_batch(&self, payloads: &[FacePayload]) -> Result<(), TransportError> {
            self.batches.lock().unwrap().push(payloads.len());
            let _ = self.release.recv();
            Ok(())
        }
    }

    /// Yields its first frame immediately and holds the rest back until
    /// the worker has entered a batch send, so later batches are
    /// guaranteed to queue behind an in-flight one.
    struct PacedSource {
        count: usize,
        sent_batches: Arc<Mutex<Vec<usize>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl FrameSource for PacedSource {
        fn open(&mut self) -> Result<CaptureFormat, CaptureError> {
            Ok(CaptureFormat {
                width: 100,
                height: 100,
            })
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = Result<RawFrame, CaptureError>> + '_> {
            let sent = self.sent_batches.clone();
            Box::new((0..self.count).map(move |index| {
                if index > 0 {
                    wait_until(|| !sent.lock().unwrap().is_empty());
                }
                Ok(make_frame(index))
            }))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct AlwaysDetector;

    impl FaceDetector for AlwaysDetector {
        fn detect(
            &mut self,
            _frame: &RawFrame,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(vec![good_detection()])
        }
    }

    fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition never met");
    }

    #[test]
    fn test_teardown_cancels_in_flight_and_queued_dispatch() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let client = BlockingBatchClient {
            batches: batches.clone(),
            release: release_rx,
        };
        let closed = Arc::new(Mutex::new(false));
        let source = PacedSource {
            count: 3,
            sent_batches: batches.clone(),
            closed: closed.clone(),
        };

        let mut session = SessionController::new(
            config(DispatchMode::Batch),
            Box::new(source),
            Box::new(AlwaysDetector),
            Box::new(SkipFrameSampler::new(1).unwrap()),
            QualityGate::default(),
            Dispatcher::new(Box::new(client)),
        );

        let runner = std::thread::spawn(move || session.run().unwrap());

        // Teardown order is cancel, then close, then join: once the
        // source reports closed, cancellation has been signalled while
        // the first batch is still blocked inside the client.
        wait_until(|| *closed.lock().unwrap());
        release_tx.send(()).unwrap();
        let stats = runner.join().unwrap();

        assert_eq!(stats.dispatched, 3);
        // Only the in-flight batch reached the client; the two still
        // queued were discarded by the cancellation.
        assert_eq!(*batches.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_sampler_skip_factor_applies() {
        let client = RecordingClient::default();
        let mut session = SessionController::new(
            config(DispatchMode::Batch),
            Box::new(StubSource::new(make_frames(6))),
            Box::new(StubDetector::new(HashMap::new())),
            Box::new(SkipFrameSampler::new(2).unwrap()),
            QualityGate::default(),
            Dispatcher::new(Box::new(client)),
        );

        let stats = session.run().unwrap();
        assert_eq!(stats.frames_seen, 6);
        assert_eq!(stats.frames_admitted, 3);
    }
}
