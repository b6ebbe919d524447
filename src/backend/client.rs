use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use std::time::Duration;
use tracing::{debug, info};

use super::messages::{
    AnalyzeReply, CompleteReply, StartSessionRequest, StartSessionResponse, SynthesizeRequest,
};
use super::{InterviewBackend, UploadProgress};
use crate::analysis::AnalysisRequest;

/// Size of each piece of the streamed session upload
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} failed with {}: {}", what, status, body)
    }
}

#[async_trait::async_trait]
impl InterviewBackend for HttpBackend {
    async fn start_session(&self, name: &str, email: &str) -> Result<String> {
        info!("Starting interview session for {}", email);

        let response = self
            .client
            .post(self.url("/interview/start"))
            .json(&StartSessionRequest {
                name: name.to_string(),
                email: email.to_string(),
            })
            .send()
            .await
            .context("Failed to reach interview backend")?;

        let reply: StartSessionResponse = Self::check(response, "Start session")
            .await?
            .json()
            .await
            .context("Invalid start session response")?;

        info!("Session started: {}", reply.session_id);
        Ok(reply.session_id)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeReply> {
        let part = Part::bytes(request.audio.clone())
            .file_name("answer.wav")
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", part)
            .text("question_text", request.question_text.clone())
            .text("attempt", request.attempt.to_string());

        debug!(
            "Submitting answer for analysis ({} bytes, attempt {})",
            request.audio.len(),
            request.attempt
        );

        let response = self
            .client
            .post(self.url("/interview/analyze"))
            .multipart(form)
            .send()
            .await
            .context("Failed to send answer for analysis")?;

        Self::check(response, "Analyze")
            .await?
            .json()
            .await
            .context("Invalid analysis response")
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.url("/interview/synthesize"))
            .json(&SynthesizeRequest {
                text: text.to_string(),
            })
            .send()
            .await
            .context("Failed to request speech synthesis")?;

        let bytes = Self::check(response, "Synthesize").await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn fetch_audio(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url(&format!("/interview/audio/{}", key)))
            .send()
            .await
            .with_context(|| format!("Failed to fetch audio '{}'", key))?;

        let bytes = Self::check(response, "Fetch audio").await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn complete_interview(
        &self,
        session_id: &str,
        recording: Vec<u8>,
        progress: UploadProgress,
    ) -> Result<()> {
        let total = recording.len();
        info!("Uploading session recording ({} bytes)", total);

        let pieces: Vec<Vec<u8>> = recording
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(|c| c.to_vec())
            .collect();
        let mut sent = 0usize;
        let reporter = progress.clone();
        let body = stream::iter(pieces).map(move |piece| {
            sent += piece.len();
            reporter.report(sent, total);
            Ok::<_, std::io::Error>(piece)
        });

        let part = Part::stream_with_length(Body::wrap_stream(body), total as u64)
            .file_name("interview.wav")
            .mime_str("audio/wav")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/interview/{}/complete", session_id)))
            .multipart(form)
            .send()
            .await
            .context("Failed to upload session recording")?;

        let reply: CompleteReply = Self::check(response, "Complete interview")
            .await?
            .json()
            .await
            .unwrap_or_default();

        progress.report(total, total);
        info!(
            "Interview {} complete{}",
            session_id,
            reply.message.map(|m| format!(": {}", m)).unwrap_or_default()
        );
        Ok(())
    }
}
