use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::backend::{InterviewBackend, UploadProgress};
use crate::capture::MediaCaptureManager;

/// Stops recording and ships the whole-session artifact
pub struct UploadFinalizer {
    backend: Arc<dyn InterviewBackend>,
    progress: UploadProgress,
}

/// Uploaded artifact statistics
#[derive(Debug, Clone, Copy)]
pub struct UploadReceipt {
    pub bytes: u64,
    pub chunks: usize,
}

impl UploadFinalizer {
    pub fn new(backend: Arc<dyn InterviewBackend>, progress: UploadProgress) -> Self {
        Self { backend, progress }
    }

    pub async fn run(
        &self,
        session_id: &str,
        capture: &MediaCaptureManager,
    ) -> Result<UploadReceipt> {
        let recording = capture.finish().await?;
        let receipt = UploadReceipt {
            bytes: recording.bytes.len() as u64,
            chunks: recording.chunk_count,
        };

        info!(
            "Session recording ready: {} chunks, {} bytes",
            receipt.chunks, receipt.bytes
        );

        self.backend
            .complete_interview(session_id, recording.bytes, self.progress.clone())
            .await
            .context("Failed to upload interview")?;

        Ok(receipt)
    }
}
