//! Phase identifiers and the scenario descriptor that orders them.
//!
//! A round is the night phases of the roles present in the roster, in a
//! fixed relative order, followed by settlement and the day phases:
//!
//! ```text
//! Fear → Dream → Gargoyle → Guard → Wolf → WolfBeauty → Witch → Seer → Gravekeeper
//!   → Settlement → [SheriffElection] → Discussion → ExileVote → DayEnd → (next round)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::role::RoleId;

/// Phase identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    /// Before the game starts
    Lobby,
    Fear,
    Dream,
    Gargoyle,
    Guard,
    Wolf,
    WolfBeauty,
    Witch,
    Seer,
    Gravekeeper,
    /// Night effects are applied when leaving this phase
    Settlement,
    SheriffElection,
    Discussion,
    ExileVote,
    DayEnd,
    /// After a winner is decided
    GameOver,
}

/// Night phases in their fixed relative order.
pub const NIGHT_ORDER: [PhaseId; 9] = [
    PhaseId::Fear,
    PhaseId::Dream,
    PhaseId::Gargoyle,
    PhaseId::Guard,
    PhaseId::Wolf,
    PhaseId::WolfBeauty,
    PhaseId::Witch,
    PhaseId::Seer,
    PhaseId::Gravekeeper,
];

/// Coarse partition of phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Night,
    Day,
    Transition,
}

impl PhaseId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Fear => "fear",
            Self::Dream => "dream",
            Self::Gargoyle => "gargoyle",
            Self::Guard => "guard",
            Self::Wolf => "wolf",
            Self::WolfBeauty => "wolf_beauty",
            Self::Witch => "witch",
            Self::Seer => "seer",
            Self::Gravekeeper => "gravekeeper",
            Self::Settlement => "settlement",
            Self::SheriffElection => "sheriff_election",
            Self::Discussion => "discussion",
            Self::ExileVote => "exile_vote",
            Self::DayEnd => "day_end",
            Self::GameOver => "game_over",
        }
    }

    pub fn phase_type(&self) -> PhaseType {
        match self {
            Self::Fear
            | Self::Dream
            | Self::Gargoyle
            | Self::Guard
            | Self::Wolf
            | Self::WolfBeauty
            | Self::Witch
            | Self::Seer
            | Self::Gravekeeper => PhaseType::Night,
            Self::SheriffElection | Self::Discussion | Self::ExileVote => PhaseType::Day,
            Self::Lobby | Self::Settlement | Self::DayEnd | Self::GameOver => {
                PhaseType::Transition
            }
        }
    }

    pub fn is_night(&self) -> bool {
        self.phase_type() == PhaseType::Night
    }

    /// Moderator script line shown when the phase opens.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Lobby => "Waiting for players to take their seats.",
            Self::Fear => "Nightmare, open your eyes and choose a player to fear.",
            Self::Dream => "Dreamer, open your eyes and choose a player to dream of.",
            Self::Gargoyle => "Gargoyle, open your eyes and choose a player to inspect.",
            Self::Guard => "Guard, open your eyes and choose a player to protect.",
            Self::Wolf => "Werewolves, open your eyes and choose a player to kill.",
            Self::WolfBeauty => "Wolf beauty, open your eyes and choose a player to charm.",
            Self::Witch => "Witch, open your eyes. Will you use the antidote or the poison?",
            Self::Seer => "Seer, open your eyes and choose a player to check.",
            Self::Gravekeeper => "Gravekeeper, open your eyes and learn who was exiled.",
            Self::Settlement => "Everyone close your eyes. The night is being settled.",
            Self::SheriffElection => "Daybreak. The sheriff election is open.",
            Self::Discussion => "Daybreak. Discuss in seat order.",
            Self::ExileVote => "Vote for the player to exile.",
            Self::DayEnd => "The day is over. Night falls.",
            Self::GameOver => "The game is over.",
        }
    }

    /// The roster role that gates this night phase.
    pub fn gating_role(&self) -> Option<RoleId> {
        match self {
            Self::Fear => Some(RoleId::Nightmare),
            Self::Dream => Some(RoleId::Dreamer),
            Self::Gargoyle => Some(RoleId::Gargoyle),
            Self::Guard => Some(RoleId::Guard),
            Self::WolfBeauty => Some(RoleId::WolfBeauty),
            Self::Witch => Some(RoleId::Witch),
            Self::Seer => Some(RoleId::Seer),
            Self::Gravekeeper => Some(RoleId::Gravekeeper),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scenario descriptor: the role roster and whether a sheriff is elected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// One role per seat; seat count is the roster length
    pub roster: Vec<RoleId>,
    pub sheriff: bool,
}

impl Scenario {
    pub fn new(name: impl Into<String>, roster: Vec<RoleId>, sheriff: bool) -> Self {
        Self {
            name: name.into(),
            roster,
            sheriff,
        }
    }

    /// 12 seats: four werewolves, seer, witch, hunter, guard, four villagers.
    pub fn classic_twelve() -> Self {
        use RoleId::*;
        Self::new(
            "classic-12",
            vec![
                Werewolf, Werewolf, Werewolf, Werewolf, Seer, Witch, Hunter, Guard, Villager,
                Villager, Villager, Villager,
            ],
            true,
        )
    }

    /// 12 seats with the special wolves: nightmare, wolf beauty, gargoyle,
    /// one werewolf against seer, witch, dreamer, gravekeeper, four villagers.
    pub fn nightmare_twelve() -> Self {
        use RoleId::*;
        Self::new(
            "nightmare-12",
            vec![
                Nightmare,
                WolfBeauty,
                Gargoyle,
                Werewolf,
                Seer,
                Witch,
                Dreamer,
                Gravekeeper,
                Villager,
                Villager,
                Villager,
                Villager,
            ],
            true,
        )
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roster.contains(&role)
    }

    /// Whether a night phase has an actor in this roster.
    fn includes_night_phase(&self, phase: PhaseId) -> bool {
        match phase {
            PhaseId::Wolf => self.roster.iter().any(|r| r.joins_wolf_kill()),
            other => other.gating_role().is_some_and(|r| self.has_role(r)),
        }
    }

    /// Full phase sequence for a round. The sheriff election only runs on
    /// the first day.
    pub fn phase_sequence(&self, round: u32) -> Vec<PhaseId> {
        let mut phases: Vec<PhaseId> = NIGHT_ORDER
            .iter()
            .copied()
            .filter(|p| self.includes_night_phase(*p))
            .collect();
        phases.push(PhaseId::Settlement);
        if self.sheriff && round == 1 {
            phases.push(PhaseId::SheriffElection);
        }
        phases.push(PhaseId::Discussion);
        phases.push(PhaseId::ExileVote);
        phases.push(PhaseId::DayEnd);
        phases
    }

    /// First phase of every round.
    pub fn first_phase(&self) -> PhaseId {
        NIGHT_ORDER
            .iter()
            .copied()
            .find(|p| self.includes_night_phase(*p))
            .unwrap_or(PhaseId::Settlement)
    }

    /// Phase after `current` within the same round, or None at round end.
    pub fn next_phase(&self, current: PhaseId, round: u32) -> Option<PhaseId> {
        let sequence = self.phase_sequence(round);
        let idx = sequence.iter().position(|p| *p == current)?;
        sequence.get(idx + 1).copied()
    }
}
