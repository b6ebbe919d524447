use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Microphone could not be acquired; the interview cannot run
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("interview has no questions")]
    NoQuestions,

    #[error("interview controller is no longer running")]
    ControllerGone,
}
