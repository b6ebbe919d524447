use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::error::SessionError;
use super::events::{ControllerEvent, ManualAction};
use super::finalize::UploadFinalizer;
use super::state::{LogEntry, NextStep, Phase, RetryPrompt, SessionState, TurnSnapshot};
use super::summary::{AnswerRecord, SessionOutcome, SessionSummary};
use crate::analysis::{
    AnalysisGateway, AnalysisRequest, Decision, DecisionSource, Verdict,
};
use crate::audio::{AudioBackend, LiveStream};
use crate::backend::{InterviewBackend, UploadProgress};
use crate::capture::{AnswerCapture, MediaCaptureManager};
use crate::playback::{AudioPlayer, AvatarFeed, PlaybackItem, PlaybackOutcome, PlaybackSequencer};
use crate::vad::VoiceActivityMonitor;

const EVENT_QUEUE: usize = 64;

/// Published view of the interview for status surfaces
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    #[serde(flatten)]
    pub snapshot: TurnSnapshot,
    /// 1-based, for display
    pub question_number: usize,
    pub question_count: usize,
    pub question_text: Option<String>,
    pub log: Vec<LogEntry>,
    pub answers: Vec<AnswerRecord>,
}

/// Cloneable handle for observing and steering a running interview
#[derive(Clone)]
pub struct InterviewHandle {
    session_id: String,
    events: mpsc::Sender<ControllerEvent>,
    snapshot: watch::Receiver<TurnSnapshot>,
    status: watch::Receiver<SessionStatus>,
    avatar: watch::Receiver<AvatarFeed>,
    speaking: watch::Receiver<bool>,
    progress: watch::Receiver<u8>,
}

impl InterviewHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn send(&self, action: ManualAction) -> Result<(), SessionError> {
        self.events
            .send(ControllerEvent::Manual(action))
            .await
            .map_err(|_| SessionError::ControllerGone)
    }

    pub async fn abandon(&self) -> Result<(), SessionError> {
        self.events
            .send(ControllerEvent::Abandon)
            .await
            .map_err(|_| SessionError::ControllerGone)
    }

    pub fn snapshot(&self) -> watch::Receiver<TurnSnapshot> {
        self.snapshot.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn avatar(&self) -> watch::Receiver<AvatarFeed> {
        self.avatar.clone()
    }

    /// Whether the candidate is currently speaking
    pub fn candidate_speaking(&self) -> bool {
        *self.speaking.borrow()
    }

    /// Upload progress, 0..=100
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }
}

/// A configured interview, ready to run once a device is available
pub struct InterviewSession {
    config: SessionConfig,
    backend: Arc<dyn InterviewBackend>,
    player: Arc<dyn AudioPlayer>,
}

impl InterviewSession {
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn InterviewBackend>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        Self {
            config,
            backend,
            player,
        }
    }

    /// Acquire the device and start the interview
    ///
    /// A device that fails to start is fatal; no state is entered. The join
    /// handle resolves once the interview reaches a terminal phase.
    pub async fn start(
        self,
        session_id: String,
        mut device: Box<dyn AudioBackend>,
    ) -> Result<(InterviewHandle, JoinHandle<SessionOutcome>), SessionError> {
        if self.config.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        info!("Starting interview session: {}", session_id);

        let device_rx = device.start().await.map_err(|e| {
            error!("Could not access {} audio device: {:#}", device.name(), e);
            SessionError::DeviceUnavailable(format!("{:#}", e))
        })?;

        let stream = Arc::new(LiveStream::spawn(device_rx));
        let capture = Arc::new(MediaCaptureManager::start(
            self.config.capture.clone(),
            Arc::clone(&stream),
        ));

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let state = SessionState::new(
            session_id.clone(),
            self.config.questions.clone(),
            self.config.retry_ceiling,
            self.config.debug_log_capacity,
        );
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot(false));

        let vad = VoiceActivityMonitor::spawn(
            self.config.vad.clone(),
            stream.subscribe(),
            snapshot_rx.clone(),
            events_tx.clone(),
        );
        let sequencer = PlaybackSequencer::new(
            Arc::clone(&self.backend),
            self.player,
            events_tx.clone(),
        );
        let gateway = AnalysisGateway::new(Arc::clone(&self.backend), self.config.analysis_timeout);
        let (progress, progress_rx) = UploadProgress::channel();
        let finalizer = UploadFinalizer::new(Arc::clone(&self.backend), progress);

        let (status_tx, status_rx) = watch::channel(status_of(&state, false, &[]));

        let handle = InterviewHandle {
            session_id,
            events: events_tx.clone(),
            snapshot: snapshot_rx,
            status: status_rx,
            avatar: sequencer.avatar(),
            speaking: vad.speaking(),
            progress: progress_rx,
        };

        let controller = TurnController {
            config: self.config,
            state,
            device,
            stream,
            capture,
            vad,
            sequencer,
            gateway,
            finalizer,
            events_tx,
            snapshot_tx,
            status_tx,
            current_playback: None,
            answers: Vec::new(),
            upload_error: None,
        };

        let task = tokio::spawn(controller.run(events_rx));
        Ok((handle, task))
    }
}

/// What to do once the current playback ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterPlayback {
    FirstQuestion,
    OpenCapture,
    Finalize,
}

struct TurnController {
    config: SessionConfig,
    state: SessionState,
    device: Box<dyn AudioBackend>,
    stream: Arc<LiveStream>,
    capture: Arc<MediaCaptureManager>,
    vad: VoiceActivityMonitor,
    sequencer: PlaybackSequencer,
    gateway: AnalysisGateway,
    finalizer: UploadFinalizer,
    events_tx: mpsc::Sender<ControllerEvent>,
    snapshot_tx: watch::Sender<TurnSnapshot>,
    status_tx: watch::Sender<SessionStatus>,
    current_playback: Option<(u64, AfterPlayback)>,
    answers: Vec<AnswerRecord>,
    upload_error: Option<String>,
}

impl TurnController {
    async fn run(mut self, mut events: mpsc::Receiver<ControllerEvent>) -> SessionOutcome {
        self.state.begin_intro();
        self.note("Interview started");
        self.play(PlaybackItem::Intro, AfterPlayback::FirstQuestion);
        self.publish();

        while let Some(event) = events.recv().await {
            self.handle(event).await;
            self.publish();
            if self.state.phase().is_terminal() {
                break;
            }
        }

        self.teardown().await;
        self.publish();
        self.outcome().await
    }

    async fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::PlaybackFinished {
                playback_id,
                outcome,
            } => self.on_playback_finished(playback_id, outcome).await,

            ControllerEvent::SilenceElapsed(key) => {
                if key != self.state.key() {
                    debug!("Ignoring silence for superseded turn {:?}", key);
                    return;
                }
                self.note("Silence detected, evaluating answer");
                self.trigger_analysis();
            }

            ControllerEvent::AnalysisComplete { key, verdict } => {
                if key != self.state.key() || self.state.phase() != Phase::Analysing {
                    self.note(format!(
                        "Discarded stale analysis for question {} attempt {}",
                        key.question_index + 1,
                        key.attempt
                    ));
                    return;
                }
                self.note(format!("Decision: {:?} ({:?})", verdict.decision, verdict.source));
                self.record(verdict.clone());
                let step = self.state.apply_decision(verdict.decision);
                self.perform(step);
            }

            ControllerEvent::Manual(action) => self.on_manual(action),

            ControllerEvent::Abandon => {
                if self.state.abandon() {
                    info!("Interview abandoned");
                    self.note("Interview abandoned");
                }
            }
        }
    }

    async fn on_playback_finished(&mut self, playback_id: u64, outcome: PlaybackOutcome) {
        let after = match self.current_playback {
            Some((id, after)) if id == playback_id => after,
            _ => {
                debug!("Ignoring completion of superseded playback #{}", playback_id);
                return;
            }
        };
        self.current_playback = None;

        if let PlaybackOutcome::Failed(reason) = outcome {
            self.note(format!("Playback failed: {}", reason));
        }

        match after {
            AfterPlayback::FirstQuestion => {
                if self.state.enter_question(0) {
                    self.perform(NextStep::Question(0));
                }
            }
            AfterPlayback::OpenCapture => self.open_capture().await,
            AfterPlayback::Finalize => self.finalize().await,
        }
    }

    fn on_manual(&mut self, action: ManualAction) {
        if !self.state.accepts_override() {
            self.note(format!("Override '{}' ignored", action));
            return;
        }
        self.note(format!("Manual override: {}", action));

        let step = match action {
            ManualAction::Evaluate => {
                self.trigger_analysis();
                return;
            }
            ManualAction::Skip => self.state.advance(),
            ManualAction::Nudge => self.manual_decision(Decision::Nudge),
            ManualAction::Rephrase => self.manual_decision(Decision::Rephrase),
        };
        self.perform(step);
    }

    fn manual_decision(&mut self, decision: Decision) -> NextStep {
        self.record(Verdict {
            decision,
            transcript: String::new(),
            source: DecisionSource::Manual,
        });
        self.state.apply_decision(decision)
    }

    /// Start the next prompt. Every branch ends with exactly one playback.
    fn perform(&mut self, step: NextStep) {
        let (item, after) = match step {
            NextStep::Question(index) => {
                let Some(id) = self.config.questions.get(index).map(|q| q.id.clone()) else {
                    return;
                };
                self.note(format!("Asking question {}", index + 1));
                (PlaybackItem::Question { id }, AfterPlayback::OpenCapture)
            }
            NextStep::Retry(RetryPrompt::Nudge) => (
                PlaybackItem::Nudge {
                    text: self.config.prompts.nudge.clone(),
                },
                AfterPlayback::OpenCapture,
            ),
            NextStep::Retry(RetryPrompt::Rephrase) => {
                let text = self
                    .state
                    .current_question()
                    .map(|q| self.config.prompts.rephrase(&q.text))
                    .unwrap_or_default();
                (PlaybackItem::Rephrase { text }, AfterPlayback::OpenCapture)
            }
            NextStep::Outro => {
                self.note("All questions asked");
                (PlaybackItem::Outro, AfterPlayback::Finalize)
            }
        };
        self.play(item, after);
    }

    fn play(&mut self, item: PlaybackItem, after: AfterPlayback) {
        let id = self.sequencer.play(item);
        self.current_playback = Some((id, after));
    }

    /// Prompt finished: open a fresh capture window and start listening
    async fn open_capture(&mut self) {
        if let Err(e) = self.capture.begin_window().await {
            warn!("Capture window not reset: {:#}", e);
        }
        if self.state.open_listening() {
            let key = self.state.key();
            self.note(format!(
                "Listening for answer to question {} (attempt {})",
                key.question_index + 1,
                key.attempt
            ));
        }
    }

    /// Close the window and send the answer off, at most once per window
    fn trigger_analysis(&mut self) {
        if !self.state.snapshot(false).is_listening() {
            return;
        }
        let Some(guard) = self.gateway.try_acquire() else {
            self.note("Analysis already in flight");
            return;
        };

        let key = self.state.key();
        let question_text = self
            .state
            .current_question()
            .map(|q| q.text.clone())
            .unwrap_or_default();
        self.state.begin_processing();
        self.note("Processing answer");

        let capture = Arc::clone(&self.capture);
        let gateway = self.gateway.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let verdict = match capture.flush().await {
                Ok(AnswerCapture::TooShort { bytes }) => {
                    info!("Answer too short ({} bytes), nudging without analysis", bytes);
                    Verdict::size_guard()
                }
                Ok(AnswerCapture::Ready(audio)) => {
                    gateway
                        .evaluate(AnalysisRequest {
                            audio,
                            question_text,
                            attempt: key.attempt,
                        })
                        .await
                }
                Err(e) => {
                    warn!("Could not assemble answer: {:#}", e);
                    Verdict::fail_open()
                }
            };

            drop(guard);
            let _ = events
                .send(ControllerEvent::AnalysisComplete { key, verdict })
                .await;
        });
    }

    async fn finalize(&mut self) {
        if !self.state.begin_upload() {
            return;
        }
        self.note("Uploading interview");
        self.publish();

        let result = self
            .finalizer
            .run(&self.state.session_id, &self.capture)
            .await;
        self.release_device().await;

        match result {
            Ok(receipt) => {
                info!(
                    "Interview uploaded ({} chunks, {} bytes)",
                    receipt.chunks, receipt.bytes
                );
                self.state.finish_upload(true);
                self.note("Interview complete");
            }
            Err(e) => {
                error!("Upload failed: {:#}", e);
                self.note(format!("Upload failed: {:#}", e));
                self.upload_error = Some(format!("{:#}", e));
                self.state.finish_upload(false);
            }
        }
    }

    async fn release_device(&mut self) {
        self.vad.stop();
        self.capture.stop().await;
        self.stream.close();
        if let Err(e) = self.device.stop().await {
            warn!("Failed to stop audio device: {:#}", e);
        }
    }

    async fn teardown(&mut self) {
        self.sequencer.cancel();
        self.current_playback = None;
        self.release_device().await;
        info!("Interview session ended in {:?}", self.state.phase());
    }

    fn record(&mut self, verdict: Verdict) {
        let key = self.state.key();
        self.answers.push(AnswerRecord {
            question_index: key.question_index,
            attempt: key.attempt,
            decision: verdict.decision,
            source: verdict.source,
            transcript: verdict.transcript,
        });
    }

    fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.state.log.push(message);
    }

    fn publish(&self) {
        let in_flight = self.gateway.is_in_flight();
        let snapshot = self.state.snapshot(in_flight);
        self.snapshot_tx.send_if_modified(|current| {
            let changed = *current != snapshot;
            *current = snapshot;
            changed
        });
        self.status_tx
            .send_replace(status_of(&self.state, in_flight, &self.answers));
    }

    async fn outcome(&self) -> SessionOutcome {
        let stats = self.capture.session_stats().await;
        let summary = SessionSummary {
            session_id: self.state.session_id.clone(),
            phase_history: self.state.phase_history().to_vec(),
            questions_visited: self.state.questions_visited().to_vec(),
            answers: self.answers.clone(),
            recording_chunks: stats.chunks_emitted,
            recording_bytes: stats.bytes_emitted,
            final_phase: self.state.phase(),
        };
        let session_id = self.state.session_id.clone();

        match self.state.phase() {
            Phase::Done => SessionOutcome::Completed {
                result_url: self.config.result_url(&session_id),
                session_id,
                summary,
            },
            Phase::UploadError => SessionOutcome::UploadFailed {
                session_id,
                error: self.upload_error.clone().unwrap_or_default(),
                summary,
            },
            _ => SessionOutcome::Abandoned {
                session_id,
                summary,
            },
        }
    }
}

fn status_of(state: &SessionState, in_flight: bool, answers: &[AnswerRecord]) -> SessionStatus {
    SessionStatus {
        session_id: state.session_id.clone(),
        snapshot: state.snapshot(in_flight),
        question_number: state.question_index() + 1,
        question_count: state.question_count(),
        question_text: state.current_question().map(|q| q.text.clone()),
        log: state.log.entries(),
        answers: answers.to_vec(),
    }
}
