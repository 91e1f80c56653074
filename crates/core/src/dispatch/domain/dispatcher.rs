use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::dispatch::domain::recognition_client::RecognitionClient;
use crate::shared::face_payload::FacePayload;

/// How the session hands admitted frames to the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// One request per admitted frame, whole frame as a single image,
    /// shed while a request is outstanding.
    SingleFrame,
    /// One fire-and-forget batch of face crops per admitted frame.
    Batch,
}

/// Result of offering work to the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    /// Dropped, never queued: a request was already in flight (single
    /// flight), or the session was cancelled.
    Shed,
}

enum Job {
    Frame(FacePayload),
    Batch(Vec<FacePayload>),
}

/// Hands payloads to a background worker so the frame-admission loop
/// never blocks on the network.
///
/// `offer_frame` enforces single-flight: at most one outstanding request,
/// excess frames shed silently — the network is the bottleneck, so load
/// is dropped rather than buffered. `offer_batch` is fire-and-forget; the
/// one worker issues batches in order but nothing waits on them.
///
/// Cancellation discards queued work and the outcome of any request the
/// worker has already issued; it is never reported as an error.
pub struct Dispatcher {
    tx: Option<Sender<Job>>,
    in_flight: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(client: Box<dyn RecognitionClient>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let in_flight = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_in_flight = in_flight.clone();
        let worker_cancelled = cancelled.clone();
        let worker = std::thread::spawn(move || {
            run_worker(client, rx, worker_in_flight, worker_cancelled);
        });

        Self {
            tx: Some(tx),
            in_flight,
            cancelled,
            worker: Some(worker),
        }
    }

    /// Single-flight offer: sheds when a request is outstanding or the
    /// dispatcher is cancelled.
    pub fn offer_frame(&self, payload: FacePayload) -> DispatchOutcome {
        if self.cancelled.load(Ordering::Acquire) {
            return DispatchOutcome::Shed;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return DispatchOutcome::Shed;
        }
        match &self.tx {
            Some(tx) if tx.send(Job::Frame(payload)).is_ok() => DispatchOutcome::Accepted,
            _ => {
                self.in_flight.store(false, Ordering::Release);
                DispatchOutcome::Shed
            }
        }
    }

    /// Fire-and-forget batch offer. Empty batches are not sent.
    pub fn offer_batch(&self, payloads: Vec<FacePayload>) -> DispatchOutcome {
        if payloads.is_empty() || self.cancelled.load(Ordering::Acquire) {
            return DispatchOutcome::Shed;
        }
        match &self.tx {
            Some(tx) if tx.send(Job::Batch(payloads)).is_ok() => DispatchOutcome::Accepted,
            _ => DispatchOutcome::Shed,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stops issuing requests. Queued jobs are discarded; the outcome of
    /// a request the worker has already issued is discarded as well, not
    /// treated as an error.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Waits for the worker to drain and exit.
    pub fn shutdown(mut self) {
        self.join_worker();
    }

    fn join_worker(&mut self) {
        self.tx.take(); // disconnects the channel, ending the worker loop
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.join_worker();
    }
}

fn run_worker(
    client: Box<dyn RecognitionClient>,
    rx: crossbeam_channel::Receiver<Job>,
    in_flight: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
) {
    for job in rx.iter() {
        match job {
            Job::Frame(payload) => {
                if cancelled.load(Ordering::Acquire) {
                    in_flight.store(false, Ordering::Release);
                    continue;
                }
                let result = client.send_frame(&payload);
                match result {
                    Ok(()) => log::debug!("frame payload sent"),
                    Err(e) if cancelled.load(Ordering::Acquire) => {
                        log::debug!("in-flight request cancelled: {e}");
                    }
                    Err(e) => log::warn!("frame dispatch failed: {e}"),
                }
                in_flight.store(false, Ordering::Release);
            }
            Job::Batch(payloads) => {
                if cancelled.load(Ordering::Acquire) {
                    continue;
                }
                match client.send_batch(&payloads) {
                    Ok(()) => log::debug!("batch of {} face(s) sent", payloads.len()),
                    Err(e) if cancelled.load(Ordering::Acquire) => {
                        log::debug!("in-flight batch cancelled: {e}");
                    }
                    Err(e) => log::warn!("batch dispatch failed: {e}"),
                }
            }
        }
    }
}
