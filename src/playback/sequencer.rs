use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::player::{AudioHandle, AudioPlayer, PlaybackError};
use crate::backend::InterviewBackend;
use crate::session::ControllerEvent;

/// Something the interviewer says
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackItem {
    Intro,
    Question { id: String },
    Outro,
    Nudge { text: String },
    Rephrase { text: String },
}

enum ClipSource<'a> {
    /// Pre-recorded, fetched by key
    Fixed(&'a str),
    /// Synthesized on demand
    Spoken(&'a str),
}

impl PlaybackItem {
    pub fn label(&self) -> String {
        match self {
            PlaybackItem::Intro => "intro".to_string(),
            PlaybackItem::Outro => "outro".to_string(),
            PlaybackItem::Question { id } => format!("question-{}", id),
            PlaybackItem::Nudge { .. } => "nudge".to_string(),
            PlaybackItem::Rephrase { .. } => "rephrase".to_string(),
        }
    }

    fn source(&self) -> ClipSource<'_> {
        match self {
            PlaybackItem::Intro => ClipSource::Fixed("intro"),
            PlaybackItem::Outro => ClipSource::Fixed("outro"),
            PlaybackItem::Question { id } => ClipSource::Fixed(id),
            PlaybackItem::Nudge { text } | PlaybackItem::Rephrase { text } => {
                ClipSource::Spoken(text)
            }
        }
    }
}

/// How a playback ended, as reported to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Ended,
    /// Could not fetch or play; the controller proceeds as if it ended
    Failed(String),
}

/// What the avatar surface renders
#[derive(Debug, Clone, Default)]
pub struct AvatarFeed {
    pub speaking: bool,
    pub clip: Option<AudioHandle>,
}

/// Plays interviewer audio one item at a time
///
/// Starting an item cuts off whatever is playing. Each item completes exactly
/// once with its own id; a cut-off item completes with nothing.
pub struct PlaybackSequencer {
    backend: Arc<dyn InterviewBackend>,
    player: Arc<dyn AudioPlayer>,
    feed: Arc<watch::Sender<AvatarFeed>>,
    events: mpsc::Sender<ControllerEvent>,
    current: Option<JoinHandle<()>>,
    next_id: u64,
}

impl PlaybackSequencer {
    pub fn new(
        backend: Arc<dyn InterviewBackend>,
        player: Arc<dyn AudioPlayer>,
        events: mpsc::Sender<ControllerEvent>,
    ) -> Self {
        let (feed, _) = watch::channel(AvatarFeed::default());
        Self {
            backend,
            player,
            feed: Arc::new(feed),
            events,
            current: None,
            next_id: 0,
        }
    }

    pub fn avatar(&self) -> watch::Receiver<AvatarFeed> {
        self.feed.subscribe()
    }

    /// Start `item`, replacing any playback in progress. Returns its id.
    pub fn play(&mut self, item: PlaybackItem) -> u64 {
        self.cancel();

        self.next_id += 1;
        let playback_id = self.next_id;
        let backend = Arc::clone(&self.backend);
        let player = Arc::clone(&self.player);
        let feed = Arc::clone(&self.feed);
        let events = self.events.clone();

        info!("Playing {} (#{})", item.label(), playback_id);

        self.current = Some(tokio::spawn(async move {
            let outcome = match load(backend.as_ref(), &item).await {
                Ok(bytes) => {
                    let clip = AudioHandle {
                        playback_id,
                        label: item.label(),
                        bytes: Arc::new(bytes),
                    };
                    feed.send_replace(AvatarFeed {
                        speaking: true,
                        clip: Some(clip.clone()),
                    });
                    let result = player.play(&clip).await;
                    feed.send_modify(|f| f.speaking = false);
                    match result {
                        Ok(()) => PlaybackOutcome::Ended,
                        Err(e) if e.is_cancellation() => {
                            debug!("Playback #{} cancelled", playback_id);
                            return;
                        }
                        Err(e) => PlaybackOutcome::Failed(e.to_string()),
                    }
                }
                Err(e) => PlaybackOutcome::Failed(e.to_string()),
            };

            if let PlaybackOutcome::Failed(reason) = &outcome {
                warn!("Playback of {} failed: {}", item.label(), reason);
            }

            let _ = events
                .send(ControllerEvent::PlaybackFinished {
                    playback_id,
                    outcome,
                })
                .await;
        }));

        playback_id
    }

    /// Stop the current playback without reporting it
    pub fn cancel(&mut self) {
        if let Some(task) = self.current.take() {
            task.abort();
            self.feed.send_if_modified(|f| {
                let was_speaking = f.speaking;
                f.speaking = false;
                was_speaking
            });
        }
    }
}

impl Drop for PlaybackSequencer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn load(backend: &dyn InterviewBackend, item: &PlaybackItem) -> Result<Vec<u8>, PlaybackError> {
    let bytes = match item.source() {
        ClipSource::Fixed(key) => backend.fetch_audio(key).await,
        ClipSource::Spoken(text) => backend.synthesize(text).await,
    }
    .map_err(|e| PlaybackError::Load(format!("{:#}", e)))?;

    if bytes.is_empty() {
        return Err(PlaybackError::Load(format!("{} returned no audio", item.label())));
    }
    Ok(bytes)
}
