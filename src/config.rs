use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::session::{default_questions, PromptConfig, Question, SessionConfig};
use crate::vad::VadConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub interview: InterviewConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Prefix of the page that shows a finished interview
    #[serde(default)]
    pub result_url_base: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Device frame size
    pub frame_ms: u64,
    /// WAV file replayed as the candidate's microphone
    pub source_file: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_ms: 100,
            source_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub questions: Vec<Question>,
    pub retry_ceiling: u32,
    pub analysis_timeout_ms: u64,
    pub silence_ms: u64,
    pub sensitivity: f32,
    pub poll_ms: u64,
    pub min_answer_bytes: usize,
    pub session_timeslice_ms: u64,
    pub answer_timeslice_ms: u64,
    pub flush_grace_ms: u64,
    pub debug_log_capacity: usize,
    pub prompts: PromptConfig,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            retry_ceiling: 1,
            analysis_timeout_ms: 8000,
            silence_ms: 3000,
            sensitivity: 40.0,
            poll_ms: 16,
            min_answer_bytes: 500,
            session_timeslice_ms: 1000,
            answer_timeslice_ms: 500,
            flush_grace_ms: 100,
            debug_log_capacity: 5,
            prompts: PromptConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    /// Session settings derived from the `[interview]` and `[audio]` tables
    pub fn session_config(&self) -> SessionConfig {
        let interview = &self.interview;
        SessionConfig {
            questions: interview.questions.clone(),
            retry_ceiling: interview.retry_ceiling,
            analysis_timeout: Duration::from_millis(interview.analysis_timeout_ms),
            debug_log_capacity: interview.debug_log_capacity,
            capture: CaptureConfig {
                session_timeslice: Duration::from_millis(interview.session_timeslice_ms),
                answer_timeslice: Duration::from_millis(interview.answer_timeslice_ms),
                flush_grace: Duration::from_millis(interview.flush_grace_ms),
                min_answer_bytes: interview.min_answer_bytes,
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
            },
            vad: VadConfig {
                poll_interval: Duration::from_millis(interview.poll_ms),
                silence_duration: Duration::from_millis(interview.silence_ms),
                sensitivity: interview.sensitivity,
                ..VadConfig::default()
            },
            prompts: interview.prompts.clone(),
            result_url_base: self.backend.result_url_base.clone(),
        }
    }
}
