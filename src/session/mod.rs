//! Interview session management
//!
//! This module owns the turn controller and everything it mutates:
//! - The phase and sub-state machine with its retry policy
//! - The event loop that is the only writer of that state
//! - Finalization of the whole-session recording
//! - The summary and outcome reported when the interview ends

mod config;
mod controller;
mod error;
mod events;
mod finalize;
mod state;
mod summary;

pub use config::{default_questions, PromptConfig, Question, SessionConfig};
pub use controller::{InterviewHandle, InterviewSession, SessionStatus};
pub use error::SessionError;
pub use events::{ControllerEvent, ManualAction};
pub use finalize::{UploadFinalizer, UploadReceipt};
pub use state::{
    DebugLog, LogEntry, NextStep, Phase, RetryPrompt, SessionState, SubState, TurnKey,
    TurnSnapshot,
};
pub use summary::{AnswerRecord, SessionOutcome, SessionSummary};
