// Shared fakes for interview integration tests
//
// A scripted backend, a player that just waits, and a microphone the test
// drives directly. Tests run with paused time so the 3s silence windows and
// 8s analysis deadline elapse instantly.

#![allow(dead_code)]

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use voice_interviewer::analysis::AnalysisRequest;
use voice_interviewer::audio::{AudioBackend, AudioFrame};
use voice_interviewer::backend::{AnalyzeReply, InterviewBackend, UploadProgress};
use voice_interviewer::playback::{AudioHandle, AudioPlayer, PlaybackError};
use voice_interviewer::session::{Question, SessionConfig, TurnKey, TurnSnapshot};

pub const FRAME_MS: u64 = 100;
pub const SAMPLES_PER_FRAME: usize = 1600;

/// One scripted analysis reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub action: Option<String>,
    pub delay: Duration,
    pub fail: bool,
}

impl Reply {
    pub fn action(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing() -> Self {
        Self {
            action: None,
            delay: Duration::ZERO,
            fail: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeCall {
    pub question_text: String,
    pub attempt: u32,
    pub audio_bytes: usize,
}

#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Reply>>,
    pub analyze_calls: Mutex<Vec<AnalyzeCall>>,
    pub synthesized: Mutex<Vec<String>>,
    pub fetched: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, usize)>>,
    pub fail_upload: AtomicBool,
    /// Fixed-audio keys that fail to fetch
    pub broken_audio: Mutex<Vec<String>>,
    active: AtomicUsize,
    pub max_concurrent_analyze: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
        let backend = Self::default();
        *backend.replies.lock().unwrap() = replies.into();
        Arc::new(backend)
    }

    pub fn analyze_count(&self) -> usize {
        self.analyze_calls.lock().unwrap().len()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

/// Decrements the active counter when a call ends or is dropped mid-flight
struct ActiveCall<'a>(&'a AtomicUsize);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl InterviewBackend for MockBackend {
    async fn start_session(&self, _name: &str, _email: &str) -> Result<String> {
        Ok("session-test".to_string())
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeReply> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveCall(&self.active);
        self.max_concurrent_analyze
            .fetch_max(now_active, Ordering::SeqCst);

        self.analyze_calls.lock().unwrap().push(AnalyzeCall {
            question_text: request.question_text.clone(),
            attempt: request.attempt,
            audio_bytes: request.audio.len(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::action("next"));

        tokio::time::sleep(reply.delay).await;

        if reply.fail {
            anyhow::bail!("analysis service unavailable");
        }
        Ok(AnalyzeReply {
            action: reply.action,
            transcript: Some(format!("answer to attempt {}", request.attempt)),
            reason: None,
        })
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.synthesized.lock().unwrap().push(text.to_string());
        Ok(vec![1; 64])
    }

    async fn fetch_audio(&self, key: &str) -> Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(key.to_string());
        if self.broken_audio.lock().unwrap().iter().any(|k| k == key) {
            anyhow::bail!("404 for {}", key);
        }
        Ok(vec![1; 64])
    }

    async fn complete_interview(
        &self,
        session_id: &str,
        recording: Vec<u8>,
        progress: UploadProgress,
    ) -> Result<()> {
        progress.report(recording.len() / 2, recording.len());
        if self.fail_upload.load(Ordering::SeqCst) {
            anyhow::bail!("upload rejected");
        }
        self.uploads
            .lock()
            .unwrap()
            .push((session_id.to_string(), recording.len()));
        progress.report(recording.len(), recording.len());
        Ok(())
    }
}

/// Player that takes a fixed time per clip
pub struct WaitingPlayer {
    pub clip_duration: Duration,
    pub played: Mutex<Vec<String>>,
}

impl WaitingPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clip_duration: Duration::from_millis(200),
            played: Mutex::new(Vec::new()),
        })
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AudioPlayer for WaitingPlayer {
    async fn play(&self, clip: &AudioHandle) -> Result<(), PlaybackError> {
        self.played.lock().unwrap().push(clip.label.clone());
        tokio::time::sleep(self.clip_duration).await;
        Ok(())
    }
}

/// Microphone fed by the test
pub struct ScriptedDevice {
    feed: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    deny: bool,
    capturing: bool,
}

impl ScriptedDevice {
    /// Returns the device and a slot that holds the frame sender once started
    pub fn new() -> (Self, Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>) {
        let feed = Arc::new(Mutex::new(None));
        (
            Self {
                feed: Arc::clone(&feed),
                deny: false,
                capturing: false,
            },
            feed,
        )
    }

    /// A device whose permission is denied
    pub fn denied() -> Self {
        Self {
            feed: Arc::new(Mutex::new(None)),
            deny: true,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for ScriptedDevice {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.deny {
            anyhow::bail!("Permission denied");
        }
        let (tx, rx) = mpsc::channel(64);
        *self.feed.lock().unwrap() = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        *self.feed.lock().unwrap() = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn frame(timestamp_ms: u64, value: i16) -> AudioFrame {
    AudioFrame {
        samples: vec![value; SAMPLES_PER_FRAME],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

/// Simulated candidate: answers each listening window by talking for
/// `speak_for`, then stays quiet. The mic delivers silent frames otherwise.
pub fn spawn_candidate(
    feed: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    snapshot: watch::Receiver<TurnSnapshot>,
    speak_for: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(FRAME_MS));
        let mut timestamp_ms = 0u64;
        let mut answered: Option<TurnKey> = None;
        let mut spoken = Duration::ZERO;

        loop {
            ticker.tick().await;

            let snap = snapshot.borrow().clone();
            let talking = snap.is_listening() && answered != Some(snap.key);
            if talking {
                spoken += Duration::from_millis(FRAME_MS);
                if spoken >= speak_for {
                    answered = Some(snap.key);
                    spoken = Duration::ZERO;
                }
            } else {
                spoken = Duration::ZERO;
            }

            let sender = feed.lock().unwrap().clone();
            let Some(sender) = sender else {
                if timestamp_ms > 0 {
                    return;
                }
                continue;
            };
            let value = if talking { 8000 } else { 0 };
            if sender.send(frame(timestamp_ms, value)).await.is_err() {
                return;
            }
            timestamp_ms += FRAME_MS;
        }
    })
}

pub fn three_questions() -> Vec<Question> {
    vec![
        Question::new("1", "Tell me about your background."),
        Question::new("2", "Describe a hard problem you solved."),
        Question::new("3", "Why this role?"),
    ]
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        questions: three_questions(),
        result_url_base: Some("https://interviews.example/results".to_string()),
        ..SessionConfig::default()
    }
}

/// Generous bound on a whole interview in virtual time
pub const INTERVIEW_DEADLINE: Duration = Duration::from_secs(600);
