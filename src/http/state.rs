use crate::session::InterviewHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The interview this process is running
    pub interview: InterviewHandle,
}

impl AppState {
    pub fn new(interview: InterviewHandle) -> Self {
        Self { interview }
    }
}
