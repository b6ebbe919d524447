use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use super::config::Question;
use crate::analysis::Decision;

/// Interview phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Init,
    Intro,
    Question,
    Analysing,
    Outro,
    Uploading,
    Done,
    UploadError,
    Abandoned,
}

impl Phase {
    fn rank(self) -> u8 {
        match self {
            Phase::Init => 0,
            Phase::Intro => 1,
            Phase::Question | Phase::Analysing => 2,
            Phase::Outro => 3,
            Phase::Uploading => 4,
            Phase::Done | Phase::UploadError | Phase::Abandoned => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::UploadError | Phase::Abandoned)
    }

    /// Phases only move forward; question <-> analysing is the retry loop.
    /// Abandonment is reachable from anywhere that is not already terminal.
    pub fn can_transition_to(self, next: Phase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Phase::Abandoned => true,
            Phase::Done | Phase::UploadError => self == Phase::Uploading,
            _ => next.rank() >= self.rank(),
        }
    }
}

/// Sub-state within a question turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubState {
    Speaking,
    Listening,
    Processing,
}

/// Identifies one attempt at one question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TurnKey {
    pub question_index: usize,
    pub attempt: u32,
}

/// What the voice monitor and UI need to see of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSnapshot {
    pub phase: Phase,
    pub sub_state: SubState,
    pub key: TurnKey,
    pub analysis_in_flight: bool,
}

impl TurnSnapshot {
    pub fn is_listening(&self) -> bool {
        self.phase == Phase::Question && self.sub_state == SubState::Listening
    }
}

impl Default for TurnSnapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Init,
            sub_state: SubState::Speaking,
            key: TurnKey {
                question_index: 0,
                attempt: 0,
            },
            analysis_in_flight: false,
        }
    }
}

/// Which dynamic prompt a retry plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPrompt {
    Nudge,
    Rephrase,
}

/// Side effect the controller must carry out after a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Play question `index` (counter already reset)
    Question(usize),
    /// Play a retry prompt for the current question (counter already bumped)
    Retry(RetryPrompt),
    /// Every question asked; play the outro
    Outro,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Rolling log of the last few controller messages
#[derive(Debug, Clone)]
pub struct DebugLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The single state container of an interview
///
/// Every mutation goes through a transition method; the controller reads
/// phase, sub-state and counters only from here.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    questions: Vec<Question>,
    question_index: usize,
    phase: Phase,
    sub_state: SubState,
    attempt: u32,
    retry_ceiling: u32,
    phase_history: Vec<Phase>,
    questions_visited: Vec<usize>,
    pub log: DebugLog,
}

impl SessionState {
    pub fn new(
        session_id: String,
        questions: Vec<Question>,
        retry_ceiling: u32,
        log_capacity: usize,
    ) -> Self {
        Self {
            session_id,
            questions,
            question_index: 0,
            phase: Phase::Init,
            sub_state: SubState::Speaking,
            attempt: 0,
            retry_ceiling,
            phase_history: vec![Phase::Init],
            questions_visited: Vec::new(),
            log: DebugLog::new(log_capacity),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sub_state(&self) -> SubState {
        self.sub_state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_index)
    }

    pub fn key(&self) -> TurnKey {
        TurnKey {
            question_index: self.question_index,
            attempt: self.attempt,
        }
    }

    pub fn snapshot(&self, analysis_in_flight: bool) -> TurnSnapshot {
        TurnSnapshot {
            phase: self.phase,
            sub_state: self.sub_state,
            key: self.key(),
            analysis_in_flight,
        }
    }

    pub fn phase_history(&self) -> &[Phase] {
        &self.phase_history
    }

    pub fn questions_visited(&self) -> &[usize] {
        &self.questions_visited
    }

    fn set_phase(&mut self, next: Phase) -> bool {
        if next == self.phase {
            return true;
        }
        if !self.phase.can_transition_to(next) {
            tracing::warn!("Refusing phase change {:?} -> {:?}", self.phase, next);
            return false;
        }
        self.phase = next;
        self.phase_history.push(next);
        true
    }

    /// init -> intro, once the device stream is live
    pub fn begin_intro(&mut self) -> bool {
        self.phase == Phase::Init && self.set_phase(Phase::Intro)
    }

    /// Enter question `index`: fresh attempt counter, speaking
    pub fn enter_question(&mut self, index: usize) -> bool {
        if index >= self.questions.len() || !self.set_phase(Phase::Question) {
            return false;
        }
        self.question_index = index;
        self.attempt = 0;
        self.sub_state = SubState::Speaking;
        self.questions_visited.push(index);
        true
    }

    /// Prompt finished playing; a capture window is open
    pub fn open_listening(&mut self) -> bool {
        if self.phase != Phase::Question {
            return false;
        }
        self.sub_state = SubState::Listening;
        true
    }

    /// listening -> processing (phase analysing). At most once per window.
    pub fn begin_processing(&mut self) -> bool {
        if self.phase != Phase::Question || self.sub_state != SubState::Listening {
            return false;
        }
        self.sub_state = SubState::Processing;
        self.set_phase(Phase::Analysing)
    }

    /// Whether a manual override may act right now
    pub fn accepts_override(&self) -> bool {
        match self.phase {
            Phase::Question => self.sub_state == SubState::Listening,
            Phase::Analysing => true,
            _ => false,
        }
    }

    /// Apply the retry policy to a decision
    pub fn apply_decision(&mut self, decision: Decision) -> NextStep {
        let prompt = match decision {
            Decision::Next => return self.advance(),
            Decision::Nudge => RetryPrompt::Nudge,
            Decision::Rephrase => RetryPrompt::Rephrase,
        };

        if self.attempt >= self.retry_ceiling {
            return self.advance();
        }

        self.attempt += 1;
        self.set_phase(Phase::Question);
        self.sub_state = SubState::Speaking;
        NextStep::Retry(prompt)
    }

    /// Move to the next question, or to the outro after the last one
    pub fn advance(&mut self) -> NextStep {
        let next = self.question_index + 1;
        if next < self.questions.len() && self.enter_question(next) {
            return NextStep::Question(next);
        }
        self.set_phase(Phase::Outro);
        self.sub_state = SubState::Speaking;
        NextStep::Outro
    }

    pub fn begin_upload(&mut self) -> bool {
        self.phase == Phase::Outro && self.set_phase(Phase::Uploading)
    }

    pub fn finish_upload(&mut self, succeeded: bool) -> bool {
        self.set_phase(if succeeded {
            Phase::Done
        } else {
            Phase::UploadError
        })
    }

    pub fn abandon(&mut self) -> bool {
        self.set_phase(Phase::Abandoned)
    }
}
