// Live stream fan-out
//
// The device hands us a single mpsc receiver. Both recorders and the voice
// activity monitor read the same audio, so one hub task forwards every frame
// onto a broadcast channel. The hub also answers `sync` requests: it drains
// whatever the device has already queued and reports the watermark, so a
// capture window can exclude everything captured before it opened.

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::AudioFrame;

const BROADCAST_CAPACITY: usize = 256;

enum StreamCommand {
    Sync(oneshot::Sender<u64>),
}

/// Shared read-only view of the candidate's live audio
pub struct LiveStream {
    frames_tx: broadcast::Sender<AudioFrame>,
    commands: mpsc::Sender<StreamCommand>,
    hub: JoinHandle<()>,
}

impl LiveStream {
    /// Spawn the hub over a started device stream
    pub fn spawn(device_rx: mpsc::Receiver<AudioFrame>) -> Self {
        let (frames_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (commands, commands_rx) = mpsc::channel(16);

        let hub = tokio::spawn(run_hub(device_rx, commands_rx, frames_tx.clone()));

        Self {
            frames_tx,
            commands,
            hub,
        }
    }

    /// Subscribe to frames delivered from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.frames_tx.subscribe()
    }

    /// Deliver everything the device has queued and return the watermark:
    /// frames with `timestamp_ms` below it were captured before this call.
    pub async fn sync(&self) -> Result<u64> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(StreamCommand::Sync(reply_tx))
            .await
            .context("Live stream hub has stopped")?;
        reply_rx.await.context("Live stream hub dropped sync request")
    }

    /// Stop forwarding frames
    pub fn close(&self) {
        self.hub.abort();
    }
}

async fn run_hub(
    mut device_rx: mpsc::Receiver<AudioFrame>,
    mut commands: mpsc::Receiver<StreamCommand>,
    frames_tx: broadcast::Sender<AudioFrame>,
) {
    let mut watermark = 0u64;
    let mut device_open = true;

    let deliver = |frame: AudioFrame, watermark: &mut u64| {
        *watermark = (*watermark).max(frame.timestamp_ms + 1);
        // No subscribers is fine: nobody is listening yet
        let _ = frames_tx.send(frame);
    };

    loop {
        tokio::select! {
            biased;

            cmd = commands.recv() => match cmd {
                Some(StreamCommand::Sync(reply)) => {
                    while let Ok(frame) = device_rx.try_recv() {
                        deliver(frame, &mut watermark);
                    }
                    let _ = reply.send(watermark);
                }
                None => break,
            },

            frame = device_rx.recv(), if device_open => match frame {
                Some(frame) => deliver(frame, &mut watermark),
                None => {
                    info!("Device stream ended");
                    device_open = false;
                }
            },
        }
    }

    debug!("Live stream hub stopped");
}
