//! Audit trail: the flat event log and per-round snapshots.
//!
//! Both logs are append-only. A round's snapshot is assembled in a
//! [`RoundDraft`] while the round runs and frozen when the round closes.

use serde::{Deserialize, Serialize};

use super::effect::NightSubmission;
use super::phase::PhaseId;
use super::player::{Camp, OutReason, Seat};
use super::vote::{ExileVote, SheriffElection};

/// Who an entry is meant for. The engine only tags; filtering happens at
/// the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "value", rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Moderator,
    Camp(Camp),
    Seat(Seat),
}

/// One line of the flat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: chrono::DateTime<chrono::Utc>,
    pub round: u32,
    pub phase: PhaseId,
    /// None for moderator and engine events
    pub actor: Option<Seat>,
    pub action: String,
    pub target: Option<Seat>,
    pub result: String,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub round: u32,
    pub phase: PhaseId,
    pub seat: Seat,
    pub reason: OutReason,
}

/// A move of the sheriff badge. `to` is None when the badge was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTransfer {
    pub round: u32,
    pub from: Seat,
    pub to: Option<Seat>,
    pub reason: OutReason,
}

/// Frozen record of a completed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundHistoryEntry {
    pub round: u32,
    pub night_actions: Vec<NightSubmission>,
    pub deaths: Vec<DeathRecord>,
    pub sheriff_election: Option<SheriffElection>,
    pub exile_vote: Option<ExileVote>,
    pub badge_transfers: Vec<BadgeTransfer>,
    pub summary: String,
    pub closed_at: chrono::DateTime<chrono::Utc>,
}

impl RoundHistoryEntry {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "round": self.round,
            "night_actions": self.night_actions.len(),
            "deaths": self.deaths,
            "sheriff_election": self.sheriff_election.as_ref().map(|e| e.to_json()),
            "exile_vote": self.exile_vote.as_ref().map(|v| v.to_json()),
            "badge_transfers": self.badge_transfers,
            "summary": self.summary,
            "closed_at": self.closed_at.to_rfc3339()
        })
    }
}

/// The round in progress.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoundDraft {
    pub deaths: Vec<DeathRecord>,
    pub sheriff_election: Option<SheriffElection>,
    pub exile_vote: Option<ExileVote>,
    pub badge_transfers: Vec<BadgeTransfer>,
    summary: Vec<String>,
}

impl RoundDraft {
    pub fn note(&mut self, line: impl Into<String>) {
        self.summary.push(line.into());
    }

    pub fn close(self, round: u32, night_actions: Vec<NightSubmission>) -> RoundHistoryEntry {
        RoundHistoryEntry {
            round,
            night_actions,
            deaths: self.deaths,
            sheriff_election: self.sheriff_election,
            exile_vote: self.exile_vote,
            badge_transfers: self.badge_transfers,
            summary: self.summary.join(" "),
            closed_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_joins_summary() {
        let mut draft = RoundDraft::default();
        draft.note("Last night seat 3 died.");
        draft.note("Seat 5 was exiled.");
        draft.deaths.push(DeathRecord {
            round: 1,
            phase: PhaseId::Settlement,
            seat: 3,
            reason: OutReason::WolfKill,
        });

        let entry = draft.close(1, Vec::new());
        assert_eq!(entry.summary, "Last night seat 3 died. Seat 5 was exiled.");
        assert_eq!(entry.deaths.len(), 1);
        assert_eq!(entry.to_json()["round"], 1);
    }

    #[test]
    fn test_visibility_serializes_scope() {
        let json = serde_json::to_value(Visibility::Camp(Camp::Wolf)).unwrap();
        assert_eq!(json["scope"], "camp");
        assert_eq!(json["value"], "wolf");
    }
}
