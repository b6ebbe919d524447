pub mod analysis;
pub mod audio;
pub mod backend;
pub mod capture;
pub mod config;
pub mod http;
pub mod playback;
pub mod session;
pub mod vad;

pub use analysis::{AnalysisGateway, Decision, Verdict};
pub use audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use backend::{HttpBackend, InterviewBackend};
pub use config::Config;
pub use http::{create_router, AppState};
pub use playback::{AudioPlayer, PlaybackSequencer, TimedPlayer};
pub use session::{
    InterviewHandle, InterviewSession, ManualAction, Phase, SessionConfig, SessionOutcome,
    SubState,
};
