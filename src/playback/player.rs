use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Interrupted by a newer playback or by teardown
    #[error("playback aborted")]
    Aborted,

    #[error("failed to load audio: {0}")]
    Load(String),

    #[error("failed to play audio: {0}")]
    Play(String),
}

impl PlaybackError {
    /// Cancellation is silent; only genuine failures are reported
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PlaybackError::Aborted)
    }
}

/// A clip handed to the output element
#[derive(Debug, Clone)]
pub struct AudioHandle {
    pub playback_id: u64,
    pub label: String,
    pub bytes: Arc<Vec<u8>>,
}

/// The output element. `play` resolves when the clip has ended.
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, clip: &AudioHandle) -> Result<(), PlaybackError>;
}

/// Read how long an encoded clip lasts
pub fn probe_duration(bytes: &[u8]) -> Result<Duration, PlaybackError> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Load(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| PlaybackError::Load("no audio track".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
        return Ok(Duration::from_secs_f64(frames as f64 / rate as f64));
    }

    // Streams without a frame count: add up packet durations
    let time_base = params
        .time_base
        .ok_or_else(|| PlaybackError::Load("unknown clip length".to_string()))?;
    let mut total_ts = 0u64;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            total_ts += packet.dur;
        }
    }
    let time = time_base.calc_time(total_ts);
    Ok(Duration::from_secs_f64(time.seconds as f64 + time.frac))
}

/// Player without an output device: waits out each clip's duration
///
/// Used by the CLI, where the interviewer's voice is not rendered locally.
#[derive(Debug, Default)]
pub struct TimedPlayer;

#[async_trait::async_trait]
impl AudioPlayer for TimedPlayer {
    async fn play(&self, clip: &AudioHandle) -> Result<(), PlaybackError> {
        if clip.bytes.is_empty() {
            return Err(PlaybackError::Load(format!("'{}' is empty", clip.label)));
        }
        let duration = probe_duration(&clip.bytes)?;
        debug!("Playing '{}' for {:?}", clip.label, duration);
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_wav;

    #[test]
    fn wav_duration_is_probed() {
        let samples = vec![0i16; 16000 * 2];
        let bytes = encode_wav(&samples, 16000, 1).unwrap();
        let duration = probe_duration(&bytes).unwrap();
        assert!((duration.as_secs_f64() - 2.0).abs() < 0.01);
    }

    #[test]
    fn garbage_is_a_load_error() {
        let err = probe_duration(b"not audio at all").unwrap_err();
        assert!(matches!(err, PlaybackError::Load(_)));
        assert!(!err.is_cancellation());
    }
}
