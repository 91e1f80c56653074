use thiserror::Error;

use crate::shared::face_payload::FacePayload;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Outbound boundary to the remote recognition service.
///
/// Calls block until the transport completes; the
/// [`Dispatcher`](crate::dispatch::domain::dispatcher::Dispatcher) keeps
/// them off the frame-admission control flow. Response bodies are ignored:
/// a `Result` only distinguishes transport success from failure.
pub trait RecognitionClient: Send {
    /// POST one whole-frame payload to the single-frame endpoint.
    fn send_frame(&self, payload: &FacePayload) -> Result<(), TransportError>;

    /// POST all face crops gathered from one admitted frame to the batch
    /// endpoint.
    fn send_batch(&self, payloads: &[FacePayload]) -> Result<(), TransportError>;
}
