use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::vad::VadConfig;

/// A scripted interview question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier; also the key of its pre-recorded audio
    pub id: String,
    /// Literal prompt text
    pub text: String,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// The questions asked when none are configured
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            "1",
            "Walk me through your sales experience and the types of products you've sold.",
        ),
        Question::new(
            "2",
            "Describe a time you missed target — what did you change afterward?",
        ),
        Question::new("3", "Why National Foods, and why this sales role?"),
    ]
}

/// Texts synthesized for retry prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub nudge: String,
    /// Spoken before the question text when rephrasing
    pub rephrase_lead: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            nudge: "Could you elaborate a bit more on that? I'd love to hear more details."
                .to_string(),
            rephrase_lead: "Let me rephrase that question for you. ".to_string(),
        }
    }
}

impl PromptConfig {
    pub fn rephrase(&self, question_text: &str) -> String {
        format!("{}{}", self.rephrase_lead, question_text)
    }
}

/// Configuration for an interview session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ordered questions, fixed for the session
    pub questions: Vec<Question>,

    /// Extra attempts allowed per question before a forced advance
    /// Default: 1
    pub retry_ceiling: u32,

    /// Hard client-side deadline for one analysis call
    /// Default: 8 seconds
    pub analysis_timeout: Duration,

    /// Entries kept in the rolling debug log
    pub debug_log_capacity: usize,

    pub capture: CaptureConfig,
    pub vad: VadConfig,
    pub prompts: PromptConfig,

    /// Where the result-viewing surface shows a finished session
    /// (the session id is appended)
    pub result_url_base: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            retry_ceiling: 1,
            analysis_timeout: Duration::from_millis(8000),
            debug_log_capacity: 5,
            capture: CaptureConfig::default(),
            vad: VadConfig::default(),
            prompts: PromptConfig::default(),
            result_url_base: None,
        }
    }
}

impl SessionConfig {
    pub fn result_url(&self, session_id: &str) -> Option<String> {
        self.result_url_base
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), session_id))
    }
}
