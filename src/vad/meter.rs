use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Bottom of the level scale, mapped to 0
///
/// Levels are time-domain RMS in dBFS, not averaged spectrum magnitudes, so
/// the default threshold of 40 gates at about -60 dBFS of broadband signal.
pub const LEVEL_FLOOR_DB: f32 = -70.0;
/// Top of the level scale, mapped to 255
pub const LEVEL_CEILING_DB: f32 = -10.0;

pub(crate) fn rms_db(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return LEVEL_FLOOR_DB;
    }
    let energy: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum::<f64>()
        / samples.len() as f64;
    let rms = energy.sqrt().max(1e-9);
    (20.0 * rms.log10()) as f32
}

/// Map a dBFS value onto the 0..=255 byte scale used by the sensitivity threshold
pub fn byte_level(db: f32) -> f32 {
    let scaled = (db - LEVEL_FLOOR_DB) / (LEVEL_CEILING_DB - LEVEL_FLOOR_DB) * 255.0;
    scaled.clamp(0.0, 255.0)
}

/// Short sliding window over the most recent samples
///
/// Audio that stops arriving counts as silence once the window is older
/// than `stale_after`, the way an analyser on a live graph reads zeros.
#[derive(Debug)]
pub struct EnergyWindow {
    samples: VecDeque<i16>,
    capacity: usize,
    stale_after: Duration,
    last_push: Option<Instant>,
}

impl EnergyWindow {
    pub fn new(capacity: usize, stale_after: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            stale_after,
            last_push: None,
        }
    }

    pub fn push(&mut self, samples: &[i16], now: Instant) {
        let skip = samples.len().saturating_sub(self.capacity);
        for &s in &samples[skip..] {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(s);
        }
        self.last_push = Some(now);
    }

    /// Current level on the 0..=255 scale
    pub fn level(&self, now: Instant) -> f32 {
        match self.last_push {
            Some(at) if now.duration_since(at) <= self.stale_after => {
                let (a, b) = self.samples.as_slices();
                let window: Vec<i16> = a.iter().chain(b).copied().collect();
                byte_level(rms_db(&window))
            }
            _ => 0.0,
        }
    }
}
