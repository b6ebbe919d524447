use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::resample::resample_interleaved;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started (strictly increasing)
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration covered by this frame in milliseconds
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }

    /// Size of the frame as 16-bit PCM bytes
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will resample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for the analysis service
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

/// Audio capture backend trait
///
/// The interview treats the microphone as a capability: whatever acquires
/// the device hands the controller an `AudioBackend`, and a failed `start`
/// is fatal to the session.
/// - File: replay a WAV file in real time (demos, batch runs)
/// - Muted: an open stream that never delivers audio
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend based on configuration
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::File(path) => {
                let backend = super::file::FileBackend::open(path, config)?;
                Ok(Box::new(backend))
            }

            AudioSource::Muted => Ok(Box::new(MutedBackend::new())),
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Replay a WAV file as if it were the candidate's microphone
    File(PathBuf),
    /// Open stream that never delivers frames
    Muted,
}

/// Backend that keeps its stream open without ever producing audio
pub struct MutedBackend {
    sender: Option<mpsc::Sender<AudioFrame>>,
}

impl MutedBackend {
    pub fn new() -> Self {
        Self { sender: None }
    }
}

impl Default for MutedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioBackend for MutedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.sender.is_some() {
            anyhow::bail!("Already capturing");
        }
        let (tx, rx) = mpsc::channel(1);
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.sender = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "muted"
    }
}

/// Bring a frame to the target rate and channel layout
///
/// Stereo is folded to mono before resampling so the sinc filter runs once.
pub fn process_frame(
    frame: AudioFrame,
    target_sample_rate: u32,
    target_channels: u16,
) -> Result<AudioFrame> {
    let mut processed = frame;

    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    if processed.sample_rate != target_sample_rate && target_sample_rate > 0 {
        let samples = resample_interleaved(
            &processed.samples,
            processed.channels,
            processed.sample_rate,
            target_sample_rate,
        )?;
        processed = AudioFrame {
            samples,
            sample_rate: target_sample_rate,
            ..processed
        };
    }

    Ok(processed)
}

/// Convert stereo to mono by averaging channels
fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame; // Only support stereo -> mono
    }

    let mono_samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect();

    AudioFrame {
        samples: mono_samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}
