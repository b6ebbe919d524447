use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{encode_wav, AudioFrame};

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Name used in log lines ("session", "answer")
    pub name: String,
    /// How often buffered audio is emitted as a chunk
    pub timeslice: Duration,
    /// Format assumed until the first frame arrives
    pub sample_rate: u32,
    pub channels: u16,
}

impl RecorderConfig {
    pub fn new(name: impl Into<String>, timeslice: Duration) -> Self {
        Self {
            name: name.into(),
            timeslice,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// One emitted slice of recorded audio
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk number (0-indexed, never reused)
    pub index: usize,
    /// Timestamp of the first frame in the chunk
    pub start_ms: u64,
    /// Timestamp of the last frame in the chunk
    pub end_ms: u64,
    /// Frames in capture order
    pub frames: Vec<AudioFrame>,
}

impl Chunk {
    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(AudioFrame::byte_len).sum()
    }
}

/// Running totals for a recorder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    /// Chunks emitted since the recorder started (resets do not lower this)
    pub chunks_emitted: usize,
    /// PCM bytes emitted since the recorder started
    pub bytes_emitted: u64,
    /// Whether the recorder is still consuming frames
    pub is_recording: bool,
}

#[derive(Default)]
struct RecorderBuffer {
    /// Chunks visible to `assemble`
    chunks: Vec<Chunk>,
    /// Frames received since the last emitted chunk
    pending: Vec<AudioFrame>,
    /// Frames stamped below this are dropped
    admit_from_ms: u64,
    next_index: usize,
    bytes_emitted: u64,
    format: Option<(u32, u16)>,
}

impl RecorderBuffer {
    fn push_frame(&mut self, frame: AudioFrame) {
        if frame.timestamp_ms < self.admit_from_ms {
            return;
        }
        self.format.get_or_insert((frame.sample_rate, frame.channels));
        self.pending.push(frame);
    }

    fn emit_pending(&mut self) -> Option<&Chunk> {
        if self.pending.is_empty() {
            return None;
        }

        let frames = std::mem::take(&mut self.pending);
        let chunk = Chunk {
            index: self.next_index,
            start_ms: frames.first().map(|f| f.timestamp_ms).unwrap_or_default(),
            end_ms: frames.last().map(|f| f.timestamp_ms).unwrap_or_default(),
            frames,
        };

        self.next_index += 1;
        self.bytes_emitted += chunk.byte_len() as u64;
        self.chunks.push(chunk);
        self.chunks.last()
    }

    fn reset(&mut self, admit_from_ms: u64) {
        self.admit_from_ms = admit_from_ms;
        self.pending.retain(|f| f.timestamp_ms >= admit_from_ms);
        for chunk in &mut self.chunks {
            chunk.frames.retain(|f| f.timestamp_ms >= admit_from_ms);
        }
        self.chunks.retain(|c| !c.frames.is_empty());
    }
}

/// Continuous recorder emitting fixed-timeslice chunks
///
/// Mirrors a media recorder started with a timeslice: frames accumulate in
/// a pending buffer and are emitted as a chunk on every tick, or early when
/// `request_data` is called. `reset` starts a new logical buffer without
/// stopping the recorder.
pub struct ChunkedRecorder {
    config: RecorderConfig,
    buffer: Arc<Mutex<RecorderBuffer>>,
    is_recording: Arc<AtomicBool>,
    flush_requested: Arc<Notify>,
    stop_requested: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChunkedRecorder {
    /// Start recording frames from the live stream
    pub fn start(config: RecorderConfig, mut frames: broadcast::Receiver<AudioFrame>) -> Self {
        info!(
            "{} recorder started (chunks every {}ms)",
            config.name,
            config.timeslice.as_millis()
        );

        let buffer = Arc::new(Mutex::new(RecorderBuffer::default()));
        let is_recording = Arc::new(AtomicBool::new(true));
        let flush_requested = Arc::new(Notify::new());
        let stop_requested = Arc::new(Notify::new());

        let task = {
            let buffer = Arc::clone(&buffer);
            let is_recording = Arc::clone(&is_recording);
            let flush_requested = Arc::clone(&flush_requested);
            let stop_requested = Arc::clone(&stop_requested);
            let name = config.name.clone();
            let timeslice = config.timeslice;

            tokio::spawn(async move {
                let mut ticker =
                    tokio::time::interval_at(tokio::time::Instant::now() + timeslice, timeslice);

                loop {
                    tokio::select! {
                        biased;

                        _ = stop_requested.notified() => break,

                        frame = frames.recv() => match frame {
                            Ok(frame) => {
                                if !is_recording.load(Ordering::SeqCst) {
                                    break;
                                }
                                buffer.lock().await.push_frame(frame);
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                warn!("{} recorder lagged, {} frames lost", name, skipped);
                            }
                            Err(RecvError::Closed) => break,
                        },

                        _ = flush_requested.notified() => {
                            if let Some(chunk) = buffer.lock().await.emit_pending() {
                                debug!("{} recorder flushed chunk {}", name, chunk.index);
                            }
                        }

                        _ = ticker.tick() => {
                            buffer.lock().await.emit_pending();
                        }
                    }
                }

                debug!("{} recorder task stopped", name);
            })
        };

        Self {
            config,
            buffer,
            is_recording,
            flush_requested,
            stop_requested,
            task: Mutex::new(Some(task)),
        }
    }

    /// Ask the recorder to emit whatever it has buffered right away
    pub fn request_data(&self) {
        self.flush_requested.notify_one();
    }

    /// Begin a new logical buffer: drop everything stamped before `admit_from_ms`
    pub async fn reset(&self, admit_from_ms: u64) {
        self.buffer.lock().await.reset(admit_from_ms);
        debug!(
            "{} recorder reset (admitting frames from {}ms)",
            self.config.name, admit_from_ms
        );
    }

    /// Chunks emitted since the last reset
    pub async fn chunks(&self) -> Vec<Chunk> {
        self.buffer.lock().await.chunks.clone()
    }

    /// Assemble the chunks since the last reset into one WAV artifact
    pub async fn assemble(&self) -> Result<Vec<u8>> {
        let buffer = self.buffer.lock().await;
        let (sample_rate, channels) = buffer
            .format
            .unwrap_or((self.config.sample_rate, self.config.channels));

        let samples = buffer
            .chunks
            .iter()
            .flat_map(|c| c.frames.iter())
            .flat_map(|f| f.samples.iter());

        encode_wav(samples, sample_rate, channels)
    }

    pub async fn stats(&self) -> RecorderStats {
        let buffer = self.buffer.lock().await;
        RecorderStats {
            chunks_emitted: buffer.next_index,
            bytes_emitted: buffer.bytes_emitted,
            is_recording: self.is_recording(),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Stop recording and emit the final chunk. Later calls are no-ops.
    pub async fn stop(&self) -> RecorderStats {
        if !self.is_recording.swap(false, Ordering::SeqCst) {
            return self.stats().await;
        }

        self.stop_requested.notify_one();

        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("{} recorder task panicked: {}", self.config.name, e);
            }
        }

        if let Some(chunk) = self.buffer.lock().await.emit_pending() {
            debug!("{} recorder final chunk {}", self.config.name, chunk.index);
        }

        let stats = self.stats().await;
        info!(
            "{} recorder stopped: {} chunks, {} bytes",
            self.config.name, stats.chunks_emitted, stats.bytes_emitted
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ts: u64, value: i16) -> AudioFrame {
        AudioFrame {
            samples: vec![value; 160],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: ts,
        }
    }

    #[test]
    fn reset_drops_frames_before_watermark() {
        let mut buffer = RecorderBuffer::default();
        buffer.push_frame(frame(0, 1));
        buffer.push_frame(frame(10, 1));
        buffer.emit_pending();
        buffer.push_frame(frame(20, 1));
        buffer.push_frame(frame(30, 2));

        buffer.reset(30);

        assert!(buffer.chunks.is_empty());
        assert_eq!(buffer.pending.len(), 1);
        assert_eq!(buffer.pending[0].timestamp_ms, 30);

        // Late delivery of an old frame is ignored
        buffer.push_frame(frame(25, 1));
        assert_eq!(buffer.pending.len(), 1);
    }

    #[test]
    fn chunk_indices_keep_counting_across_resets() {
        let mut buffer = RecorderBuffer::default();
        buffer.push_frame(frame(0, 1));
        buffer.emit_pending();
        buffer.reset(100);
        buffer.push_frame(frame(100, 1));
        let chunk = buffer.emit_pending().cloned().unwrap();

        assert_eq!(chunk.index, 1);
        assert_eq!(buffer.next_index, 2);
        assert_eq!(buffer.chunks.len(), 1);
    }

    #[test]
    fn empty_pending_emits_nothing() {
        let mut buffer = RecorderBuffer::default();
        assert!(buffer.emit_pending().is_none());
        assert_eq!(buffer.next_index, 0);
    }
}
