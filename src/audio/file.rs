use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{process_frame, AudioBackend, AudioBackendConfig, AudioFrame};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split the file into consecutive frames of `frame_ms` each
    pub fn frames(&self, frame_ms: u64) -> Vec<AudioFrame> {
        split_frames(&self.samples, self.sample_rate, self.channels, frame_ms)
    }

    /// The whole file converted to the backend's target format
    ///
    /// Converting once keeps the resampler's filter state continuous across
    /// frame boundaries.
    pub fn converted(&self, config: &AudioBackendConfig) -> Result<AudioFile> {
        let whole = AudioFrame {
            samples: self.samples.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms: 0,
        };
        let processed = process_frame(whole, config.target_sample_rate, config.target_channels)
            .with_context(|| format!("Failed to convert {} to the capture format", self.path))?;

        Ok(AudioFile {
            path: self.path.clone(),
            duration_seconds: self.duration_seconds,
            sample_rate: processed.sample_rate,
            channels: processed.channels,
            samples: processed.samples,
        })
    }
}

fn split_frames(samples: &[i16], sample_rate: u32, channels: u16, frame_ms: u64) -> Vec<AudioFrame> {
    let samples_per_frame =
        (sample_rate as u64 * channels as u64 * frame_ms / 1000).max(1) as usize;

    samples
        .chunks(samples_per_frame)
        .enumerate()
        .map(|(i, chunk)| AudioFrame {
            samples: chunk.to_vec(),
            sample_rate,
            channels,
            timestamp_ms: i as u64 * frame_ms,
        })
        .collect()
}

/// Replays a WAV file at real-time pace, then stays open and silent
pub struct FileBackend {
    file: AudioFile,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn open(path: PathBuf, config: AudioBackendConfig) -> Result<Self> {
        let file = AudioFile::open(&path)?;
        Ok(Self {
            file,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            anyhow::bail!("Already capturing");
        }

        let frame_ms = self.config.buffer_duration_ms.max(1);
        let frames = self.file.converted(&self.config)?.frames(frame_ms);

        info!(
            "Replaying {} as microphone ({} frames of {}ms)",
            self.file.path,
            frames.len(),
            frame_ms
        );

        let (tx, rx) = mpsc::channel(64);
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));
            for frame in frames {
                ticker.tick().await;
                if !capturing.load(Ordering::SeqCst) || tx.send(frame).await.is_err() {
                    return;
                }
            }

            info!("Audio file exhausted, microphone now silent");
            // Keep the stream open like a live device until stopped
            tx.closed().await;
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }

        info!("File capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
