use std::fmt;
use std::str::FromStr;

use super::state::TurnKey;
use crate::analysis::Verdict;
use crate::playback::PlaybackOutcome;

/// Operator override of the automatic flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualAction {
    Nudge,
    Rephrase,
    Skip,
    /// Evaluate the current answer now instead of waiting for silence
    Evaluate,
}

impl FromStr for ManualAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nudge" => Ok(ManualAction::Nudge),
            "rephrase" => Ok(ManualAction::Rephrase),
            "skip" | "next" => Ok(ManualAction::Skip),
            "evaluate" => Ok(ManualAction::Evaluate),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

impl fmt::Display for ManualAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManualAction::Nudge => "nudge",
            ManualAction::Rephrase => "rephrase",
            ManualAction::Skip => "skip",
            ManualAction::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Everything the turn controller reacts to
#[derive(Debug)]
pub enum ControllerEvent {
    PlaybackFinished {
        playback_id: u64,
        outcome: PlaybackOutcome,
    },
    /// Sustained silence in the listening window identified by the key
    SilenceElapsed(TurnKey),
    AnalysisComplete {
        key: TurnKey,
        verdict: Verdict,
    },
    Manual(ManualAction),
    Abandon,
}
