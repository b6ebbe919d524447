//! Interview backend
//!
//! The controller talks to the analysis, speech and storage services only
//! through [`InterviewBackend`]. [`HttpBackend`] is the HTTP implementation;
//! tests supply scripted ones.

mod client;
mod messages;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

use crate::analysis::AnalysisRequest;

pub use client::HttpBackend;
pub use messages::{
    AnalyzeReply, CompleteReply, StartSessionRequest, StartSessionResponse, SynthesizeRequest,
};

/// Upload progress reporter, 0..=100
#[derive(Debug, Clone)]
pub struct UploadProgress {
    tx: Arc<watch::Sender<u8>>,
}

impl UploadProgress {
    pub fn channel() -> (Self, watch::Receiver<u8>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn report(&self, sent: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            ((sent.min(total) as u64 * 100) / total as u64) as u8
        };
        self.tx.send_if_modified(|p| {
            let changed = *p != percent;
            *p = percent;
            changed
        });
    }

    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }
}

#[async_trait::async_trait]
pub trait InterviewBackend: Send + Sync {
    /// Register a candidate and obtain the session id
    async fn start_session(&self, name: &str, email: &str) -> Result<String>;

    /// Submit one answer for a follow-up decision
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeReply>;

    /// Turn text into playable audio
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Fetch a pre-recorded clip (`intro`, `outro`, or a question id)
    async fn fetch_audio(&self, key: &str) -> Result<Vec<u8>>;

    /// Upload the whole-session recording and mark the interview complete
    async fn complete_interview(
        &self,
        session_id: &str,
        recording: Vec<u8>,
        progress: UploadProgress,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_percentage() {
        let (progress, rx) = UploadProgress::channel();
        progress.report(0, 200);
        assert_eq!(*rx.borrow(), 0);
        progress.report(50, 200);
        assert_eq!(*rx.borrow(), 25);
        progress.report(400, 200);
        assert_eq!(*rx.borrow(), 100);
    }

    #[test]
    fn empty_upload_reports_complete() {
        let (progress, _rx) = UploadProgress::channel();
        progress.report(0, 0);
        assert_eq!(progress.current(), 100);
    }
}
