//! Interviewer audio playback
//!
//! The sequencer resolves each item to audio (fetched or synthesized), hands
//! it to an [`AudioPlayer`] and reports completion to the controller.

mod player;
mod sequencer;

pub use player::{probe_duration, AudioHandle, AudioPlayer, PlaybackError, TimedPlayer};
pub use sequencer::{AvatarFeed, PlaybackItem, PlaybackOutcome, PlaybackSequencer};
