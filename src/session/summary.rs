use serde::Serialize;

use super::state::Phase;
use crate::analysis::{Decision, DecisionSource};

/// One evaluated attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub attempt: u32,
    pub decision: Decision,
    pub source: DecisionSource,
    pub transcript: String,
}

/// Session statistics
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub phase_history: Vec<Phase>,
    /// Question indices in the order they were entered
    pub questions_visited: Vec<usize>,
    pub answers: Vec<AnswerRecord>,
    pub recording_chunks: usize,
    pub recording_bytes: u64,
    pub final_phase: Phase,
}

impl SessionSummary {
    pub fn print(&self) {
        println!("\n📊 Interview Summary");
        println!("   Session: {}", self.session_id);
        println!("   Outcome: {:?}", self.final_phase);
        println!("   Questions asked: {}", self.questions_visited.len());
        println!("   Answers evaluated: {}", self.answers.len());
        println!(
            "   Recording: {} chunks, {:.1} KB",
            self.recording_chunks,
            self.recording_bytes as f64 / 1024.0
        );

        for answer in &self.answers {
            println!(
                "   Q{} attempt {}: {:?} ({:?}) {}",
                answer.question_index + 1,
                answer.attempt,
                answer.decision,
                answer.source,
                answer.transcript
            );
        }
    }
}

/// How an interview ended
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Completed {
        session_id: String,
        /// Where the result can be viewed, if a viewer is configured
        result_url: Option<String>,
        summary: SessionSummary,
    },
    UploadFailed {
        session_id: String,
        error: String,
        summary: SessionSummary,
    },
    Abandoned {
        session_id: String,
        summary: SessionSummary,
    },
}

impl SessionOutcome {
    pub fn summary(&self) -> &SessionSummary {
        match self {
            SessionOutcome::Completed { summary, .. }
            | SessionOutcome::UploadFailed { summary, .. }
            | SessionOutcome::Abandoned { summary, .. } => summary,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            SessionOutcome::Completed { session_id, .. }
            | SessionOutcome::UploadFailed { session_id, .. }
            | SessionOutcome::Abandoned { session_id, .. } => session_id,
        }
    }
}
