//! Media capture
//!
//! Two recorders read the same live stream:
//! - the session recorder keeps every chunk for the retention artifact
//! - the answer recorder is reset per capture window and feeds analysis

mod manager;
mod recorder;

pub use manager::{AnswerCapture, CaptureConfig, MediaCaptureManager, SessionRecording};
pub use recorder::{Chunk, ChunkedRecorder, RecorderConfig, RecorderStats};
