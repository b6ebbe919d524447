use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::meter::EnergyWindow;
use crate::audio::AudioFrame;
use crate::session::{ControllerEvent, TurnKey, TurnSnapshot};

/// Voice activity monitor settings
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Poll cadence (about one display refresh)
    pub poll_interval: Duration,
    /// Samples in the analysis window
    pub window_samples: usize,
    /// Level (0..=255) above which the candidate counts as speaking
    pub sensitivity: f32,
    /// Sustained silence before the controller is told to evaluate
    pub silence_duration: Duration,
    /// Window age after which missing audio reads as silence
    pub stale_after: Duration,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(16),
            window_samples: 256,
            sensitivity: 40.0,
            silence_duration: Duration::from_millis(3000),
            stale_after: Duration::from_millis(250),
        }
    }
}

#[derive(Debug)]
struct ArmedTimer {
    deadline: Instant,
    context: TurnSnapshot,
}

/// Debounced silence timer driven by poll results
///
/// Arms on a silent poll while listening, with nothing in flight and not
/// already fired for this window. Any speech, or any change in the
/// controller snapshot, disarms it. After firing it stays quiet until speech
/// or a snapshot change.
#[derive(Debug)]
pub struct SilenceTracker {
    silence_duration: Duration,
    armed: Option<ArmedTimer>,
    fired_for: Option<TurnSnapshot>,
}

impl SilenceTracker {
    pub fn new(silence_duration: Duration) -> Self {
        Self {
            silence_duration,
            armed: None,
            fired_for: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Feed one poll; returns the turn to evaluate when the timer expires
    pub fn on_poll(
        &mut self,
        speaking: bool,
        snapshot: &TurnSnapshot,
        now: Instant,
    ) -> Option<TurnKey> {
        if self.armed.as_ref().is_some_and(|t| &t.context != snapshot) {
            self.armed = None;
        }
        if self.fired_for.as_ref().is_some_and(|s| s != snapshot) {
            self.fired_for = None;
        }

        if speaking {
            self.armed = None;
            self.fired_for = None;
            return None;
        }

        if let Some(timer) = &self.armed {
            if now >= timer.deadline {
                self.armed = None;
                self.fired_for = Some(snapshot.clone());
                return Some(snapshot.key);
            }
            return None;
        }

        if snapshot.is_listening() && !snapshot.analysis_in_flight && self.fired_for.is_none() {
            self.armed = Some(ArmedTimer {
                deadline: now + self.silence_duration,
                context: snapshot.clone(),
            });
        }

        None
    }
}

/// Polls the live stream and raises the sustained-silence signal
pub struct VoiceActivityMonitor {
    task: JoinHandle<()>,
    speaking: watch::Receiver<bool>,
}

impl VoiceActivityMonitor {
    /// Spawn the monitor; it runs until stopped or the controller goes away
    pub fn spawn(
        config: VadConfig,
        mut frames: broadcast::Receiver<AudioFrame>,
        snapshot: watch::Receiver<TurnSnapshot>,
        events: mpsc::Sender<ControllerEvent>,
    ) -> Self {
        let (speaking_tx, speaking) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut window = EnergyWindow::new(config.window_samples, config.stale_after);
            let mut tracker = SilenceTracker::new(config.silence_duration);

            loop {
                tokio::select! {
                    frame = frames.recv() => match frame {
                        Ok(frame) => window.push(&frame.samples, Instant::now()),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },

                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let is_speaking = window.level(now) > config.sensitivity;
                        speaking_tx.send_if_modified(|s| {
                            let changed = *s != is_speaking;
                            *s = is_speaking;
                            changed
                        });

                        let current = snapshot.borrow().clone();
                        if let Some(key) = tracker.on_poll(is_speaking, &current, now) {
                            info!(
                                "Silence detected on question {} attempt {}",
                                key.question_index + 1,
                                key.attempt
                            );
                            if events.send(ControllerEvent::SilenceElapsed(key)).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }

            debug!("Voice activity monitor stopped");
        });

        Self { task, speaking }
    }

    /// Live "candidate is speaking" flag
    pub fn speaking(&self) -> watch::Receiver<bool> {
        self.speaking.clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}
