use serde::{Deserialize, Serialize};

/// Follow-up action for an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Next,
    Nudge,
    Rephrase,
}

impl Decision {
    /// Read the wire action; anything missing or unrecognised means next
    pub fn from_wire(action: Option<&str>) -> Self {
        match action.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
            Some("nudge") => Decision::Nudge,
            Some("rephrase") => Decision::Rephrase,
            _ => Decision::Next,
        }
    }
}

/// Where a decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    /// Answer below the minimum size, no service call made
    SizeGuard,
    Service,
    /// Timeout or failure of the service; defaulted to next
    FailOpen,
    /// Operator override
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub decision: Decision,
    pub transcript: String,
    pub source: DecisionSource,
}

impl Verdict {
    pub fn size_guard() -> Self {
        Self {
            decision: Decision::Nudge,
            transcript: String::new(),
            source: DecisionSource::SizeGuard,
        }
    }

    pub fn fail_open() -> Self {
        Self {
            decision: Decision::Next,
            transcript: String::new(),
            source: DecisionSource::FailOpen,
        }
    }
}
