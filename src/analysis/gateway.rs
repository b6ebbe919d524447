use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::decision::{Decision, DecisionSource, Verdict};
use crate::backend::InterviewBackend;

/// One answer submitted for analysis
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// WAV artifact of the capture window
    pub audio: Vec<u8>,
    pub question_text: String,
    pub attempt: u32,
}

/// Held while an analysis request is outstanding; releases on drop
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Sends answers to the analysis service with a deadline
///
/// At most one request is in flight at a time. The guard stays held until
/// the request settles, even if its result is later discarded as stale.
/// Timeouts and failures never block the interview: they become `Next`.
#[derive(Clone)]
pub struct AnalysisGateway {
    backend: Arc<dyn InterviewBackend>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl AnalysisGateway {
    pub fn new(backend: Arc<dyn InterviewBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the single in-flight slot
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard {
                flag: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn evaluate(&self, request: AnalysisRequest) -> Verdict {
        info!(
            "Sending answer for analysis ({} bytes, attempt {})",
            request.audio.len(),
            request.attempt
        );

        match tokio::time::timeout(self.timeout, self.backend.analyze(&request)).await {
            Ok(Ok(reply)) => {
                let decision = Decision::from_wire(reply.action.as_deref());
                if let Some(reason) = &reply.reason {
                    info!("Analysis decided {:?}: {}", decision, reason);
                } else {
                    info!("Analysis decided {:?}", decision);
                }
                Verdict {
                    decision,
                    transcript: reply.transcript.unwrap_or_default(),
                    source: DecisionSource::Service,
                }
            }
            Ok(Err(e)) => {
                warn!("Analysis failed, moving on: {:#}", e);
                Verdict::fail_open()
            }
            Err(_) => {
                warn!("Analysis timed out after {:?}, moving on", self.timeout);
                Verdict::fail_open()
            }
        }
    }
}
