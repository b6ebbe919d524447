//! Sample-rate conversion for captured audio.
//!
//! Wraps rubato's `SincFixedIn` so device audio at any common rate (44.1 kHz
//! laptop mics, 48 kHz interfaces, 8 kHz telephony) lands at the rate the
//! analysis service expects.

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames handed to the sinc resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Resample interleaved 16-bit PCM from `from_rate` to `to_rate`.
///
/// The output holds `round(frames * to_rate / from_rate)` frames per channel,
/// still interleaved.
pub fn resample_interleaved(
    samples: &[i16],
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<i16>> {
    let channels = channels.max(1) as usize;
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.len() < channels {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.925,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, channels)
        .with_context(|| format!("Failed to build resampler {}Hz -> {}Hz", from_rate, to_rate))?;

    let planar = deinterleave(samples, channels);
    let input_frames = planar[0].len();
    let expected = ((input_frames as f64) * ratio).round().max(1.0) as usize;

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + CHUNK_FRAMES); channels];
    let mut segment: Vec<Vec<f32>> = vec![vec![0.0; CHUNK_FRAMES]; channels];
    let mut idx = 0;
    while idx < input_frames {
        let end = (idx + CHUNK_FRAMES).min(input_frames);
        for (channel, seg) in planar.iter().zip(segment.iter_mut()) {
            // Hold the last sample across the padded tail of a short chunk
            seg.fill(channel[end - 1]);
            seg[..end - idx].copy_from_slice(&channel[idx..end]);
        }

        let produced = resampler
            .process(&segment[..], None)
            .context("Resampler failed to process chunk")?;
        for (out, chunk) in output.iter_mut().zip(produced) {
            out.extend_from_slice(&chunk);
        }
        idx = end;
    }

    for channel in output.iter_mut() {
        let last = channel.last().copied().unwrap_or(0.0);
        channel.resize(expected, last);
    }

    Ok(interleave(&output))
}

fn deinterleave(samples: &[i16], channels: usize) -> Vec<Vec<f32>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for group in samples.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(group) {
            channel.push(sample as f32 / 32768.0);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<i16> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut samples = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            let scaled = (channel[i] * 32768.0).round();
            samples.push(scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, frames: usize, freq: f32) -> Vec<i16> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / rate as f32;
                ((2.0 * std::f32::consts::PI * freq * t).sin() * 12000.0) as i16
            })
            .collect()
    }

    fn rms(samples: &[i16]) -> f64 {
        let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / samples.len().max(1) as f64).sqrt()
    }

    #[test]
    fn same_rate_is_passthrough() {
        let input = vec![1i16, 2, 3, 4];
        assert_eq!(resample_interleaved(&input, 1, 16000, 16000).unwrap(), input);
    }

    #[test]
    fn downsampling_hits_the_exact_frame_count() {
        let input = sine(44100, 44100, 440.0);
        let output = resample_interleaved(&input, 1, 44100, 16000).unwrap();
        assert_eq!(output.len(), 16000);
    }

    #[test]
    fn tone_below_nyquist_keeps_its_level() {
        let input = sine(48000, 48000, 440.0);
        let output = resample_interleaved(&input, 1, 48000, 16000).unwrap();

        // Skip the filter's warm-up at the start
        let ratio = rms(&output[1000..]) / rms(&input[3000..]);
        assert!((0.9..1.1).contains(&ratio), "level ratio {}", ratio);
    }

    #[test]
    fn tone_above_target_nyquist_is_filtered_out() {
        // 12 kHz would alias down to 4 kHz without an anti-alias filter
        let input = sine(48000, 48000, 12000.0);
        let output = resample_interleaved(&input, 1, 48000, 16000).unwrap();

        assert!(rms(&output[1000..]) < rms(&input) * 0.05);
    }

    #[test]
    fn stereo_stays_interleaved() {
        let left = sine(32000, 3200, 300.0);
        let input: Vec<i16> = left.iter().flat_map(|&s| [s, 0]).collect();

        let output = resample_interleaved(&input, 2, 32000, 16000).unwrap();
        assert_eq!(output.len(), 1600 * 2);
        assert!(output.iter().skip(1).step_by(2).all(|&s| s.abs() < 50));
    }
}
