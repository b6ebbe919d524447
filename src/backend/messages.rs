use serde::{Deserialize, Serialize};

/// Body of `POST /interview/start`
#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Reply of `POST /interview/analyze`
///
/// Every field is optional on the wire; a missing or unknown action is read
/// as "next" by the gateway.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AnalyzeReply {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /interview/synthesize`
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
}

/// Acknowledgement of `POST /interview/{id}/complete`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompleteReply {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}
