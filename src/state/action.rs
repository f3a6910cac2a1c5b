//! Player-submitted actions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::phase::PhaseId;
use super::player::Seat;

/// What a seat is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    // Night
    Fear,
    Dream,
    Inspect,
    Protect,
    Kill,
    Charm,
    Antidote,
    Poison,
    Check,
    /// Gravekeeper: read the last exile, no target
    Autopsy,
    /// Pass on tonight's ability
    Skip,
    // Day
    RunForSheriff,
    DeclineSheriff,
    WithdrawSheriff,
    /// Ballot in the active day vote; no target means an abstention
    Vote,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fear => "fear",
            Self::Dream => "dream",
            Self::Inspect => "inspect",
            Self::Protect => "protect",
            Self::Kill => "kill",
            Self::Charm => "charm",
            Self::Antidote => "antidote",
            Self::Poison => "poison",
            Self::Check => "check",
            Self::Autopsy => "autopsy",
            Self::Skip => "skip",
            Self::RunForSheriff => "run_for_sheriff",
            Self::DeclineSheriff => "decline_sheriff",
            Self::WithdrawSheriff => "withdraw_sheriff",
            Self::Vote => "vote",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable action request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub phase: PhaseId,
    pub player_id: Seat,
    pub action: ActionKind,
    pub target: Option<Seat>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl PlayerAction {
    pub fn new(phase: PhaseId, player_id: Seat, action: ActionKind, target: Option<Seat>) -> Self {
        Self {
            phase,
            player_id,
            action,
            target,
            submitted_at: chrono::Utc::now(),
        }
    }

    pub fn targeting(phase: PhaseId, player_id: Seat, action: ActionKind, target: Seat) -> Self {
        Self::new(phase, player_id, action, Some(target))
    }
}

/// Successful result of an action or day operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ActionOutcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Boundary shape: `{success: true, message, data?}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "success": true,
            "message": self.message
        });
        if let Some(data) = &self.data {
            obj["data"] = data.clone();
        }
        obj
    }
}
