use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::recorder::{ChunkedRecorder, RecorderConfig, RecorderStats};
use crate::audio::LiveStream;

/// Capture timings and the empty-answer guard
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Chunk cadence of the whole-session recorder
    pub session_timeslice: Duration,
    /// Chunk cadence of the per-answer recorder
    pub answer_timeslice: Duration,
    /// How long a flush waits for the recorder to hand over buffered audio
    pub flush_grace: Duration,
    /// Answers smaller than this are treated as "no answer given"
    pub min_answer_bytes: usize,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            session_timeslice: Duration::from_millis(1000),
            answer_timeslice: Duration::from_millis(500),
            flush_grace: Duration::from_millis(100),
            min_answer_bytes: 500,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Result of flushing a capture window
#[derive(Debug, Clone)]
pub enum AnswerCapture {
    /// Below the size guard; nothing worth sending for analysis
    TooShort { bytes: usize },
    /// WAV artifact ready for the analysis gateway
    Ready(Vec<u8>),
}

impl AnswerCapture {
    pub fn byte_len(&self) -> usize {
        match self {
            AnswerCapture::TooShort { bytes } => *bytes,
            AnswerCapture::Ready(audio) => audio.len(),
        }
    }
}

/// The full-session artifact produced at completion
#[derive(Debug, Clone)]
pub struct SessionRecording {
    pub bytes: Vec<u8>,
    pub chunk_count: usize,
}

/// Owns the two recorders fed by the live stream
///
/// The session recorder runs from device acquisition to completion. The
/// answer recorder runs just as long, but its logical buffer is reset at the
/// start of every capture window.
pub struct MediaCaptureManager {
    config: CaptureConfig,
    stream: Arc<LiveStream>,
    session_recorder: ChunkedRecorder,
    answer_recorder: ChunkedRecorder,
    stopped: AtomicBool,
}

impl MediaCaptureManager {
    /// Start both recorders on the live stream
    pub fn start(config: CaptureConfig, stream: Arc<LiveStream>) -> Self {
        let recorder_config = |name: &str, timeslice: Duration| RecorderConfig {
            sample_rate: config.sample_rate,
            channels: config.channels,
            ..RecorderConfig::new(name, timeslice)
        };

        let session_recorder = ChunkedRecorder::start(
            recorder_config("session", config.session_timeslice),
            stream.subscribe(),
        );
        let answer_recorder = ChunkedRecorder::start(
            recorder_config("answer", config.answer_timeslice),
            stream.subscribe(),
        );

        Self {
            config,
            stream,
            session_recorder,
            answer_recorder,
            stopped: AtomicBool::new(false),
        }
    }

    /// Open a fresh capture window; prior answer audio is discarded
    pub async fn begin_window(&self) -> Result<()> {
        let watermark = self
            .stream
            .sync()
            .await
            .context("Failed to open capture window")?;
        self.answer_recorder.reset(watermark).await;
        Ok(())
    }

    /// Close the current window: flush, wait the grace period, assemble
    pub async fn flush(&self) -> Result<AnswerCapture> {
        self.stream
            .sync()
            .await
            .context("Failed to flush capture window")?;
        self.answer_recorder.request_data();
        tokio::time::sleep(self.config.flush_grace).await;

        let audio = self.answer_recorder.assemble().await?;
        info!("Audio capture assembled: {} bytes", audio.len());

        if audio.len() < self.config.min_answer_bytes {
            return Ok(AnswerCapture::TooShort { bytes: audio.len() });
        }
        Ok(AnswerCapture::Ready(audio))
    }

    pub async fn session_stats(&self) -> RecorderStats {
        self.session_recorder.stats().await
    }

    pub async fn answer_stats(&self) -> RecorderStats {
        self.answer_recorder.stats().await
    }

    /// Stop both recorders. Only the first call does any work.
    pub async fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.session_recorder.stop().await;
        self.answer_recorder.stop().await;
        true
    }

    /// Stop recording and assemble the whole-session artifact
    pub async fn finish(&self) -> Result<SessionRecording> {
        self.stop().await;

        let stats = self.session_recorder.stats().await;
        let bytes = self
            .session_recorder
            .assemble()
            .await
            .context("Failed to assemble session recording")?;

        Ok(SessionRecording {
            bytes,
            chunk_count: stats.chunks_emitted,
        })
    }
}
