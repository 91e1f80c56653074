use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::dispatch::domain::recognition_client::{RecognitionClient, TransportError};
use crate::shared::constants::{
    DETECT_AND_RECOGNIZE_PATH, PROCESS_VIDEO_PATH, RECOGNIZE_BATCH_PATH,
};
use crate::shared::face_payload::FacePayload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ImageEntry {
    image: String,
    timestamp: u64,
}

#[derive(Serialize)]
struct BatchBody {
    images: Vec<ImageEntry>,
}

#[derive(Serialize)]
struct FrameBody {
    image: String,
}

/// Blocking HTTP client for the recognition service.
///
/// Bodies follow the service contract: base64-encoded PNG image fields,
/// epoch-millisecond timestamps. Response bodies are never read beyond
/// the status line.
pub struct HttpRecognitionClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRecognitionClient {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Http {
                url: base_url.to_string(),
                source: Box::new(e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Uploads a recorded video file for server-side processing
    /// (multipart field `video`). Outside the live pipeline; the response
    /// is logged, not interpreted.
    pub fn upload_video(&self, path: &Path) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, PROCESS_VIDEO_PATH);
        let form = reqwest::blocking::multipart::Form::new()
            .file("video", path)
            .map_err(|e| TransportError::Http {
                url: url.clone(),
                source: Box::new(e),
            })?;

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| TransportError::Http {
                url: url.clone(),
                source: Box::new(e),
            })?;
        let status = check_status(&url, &response)?;
        log::info!("video upload accepted with status {status}");
        Ok(())
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let response =
            self.client
                .post(&url)
                .json(body)
                .send()
                .map_err(|e| TransportError::Http {
                    url: url.clone(),
                    source: Box::new(e),
                })?;
        check_status(&url, &response)?;
        Ok(())
    }
}

fn check_status(url: &str, response: &reqwest::blocking::Response) -> Result<u16, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(status.as_u16())
    } else {
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn frame_body(payload: &FacePayload) -> FrameBody {
    FrameBody {
        image: BASE64.encode(&payload.png),
    }
}

fn batch_body(payloads: &[FacePayload]) -> BatchBody {
    BatchBody {
        images: payloads
            .iter()
            .map(|p| ImageEntry {
                image: BASE64.encode(&p.png),
                timestamp: p.timestamp_ms,
            })
            .collect(),
    }
}

impl RecognitionClient for HttpRecognitionClient {
    fn send_frame(&self, payload: &FacePayload) -> Result<(), TransportError> {
        self.post_json(DETECT_AND_RECOGNIZE_PATH, &frame_body(payload))
    }

    fn send_batch(&self, payloads: &[FacePayload]) -> Result<(), TransportError> {
        self.post_json(RECOGNIZE_BATCH_PATH, &batch_body(payloads))
    }
}
