//! Seated players and their per-role ability state.
//!
//! A seat is alive until it dies exactly once; the out reason is written at
//! that moment and never changes afterwards.
//!
//! ```text
//! ┌────────────┐  assign_role   ┌────────────┐   die(reason)   ┌────────────┐
//! │ Unassigned │───────────────▶│   Alive    │────────────────▶│    Dead    │
//! └────────────┘                └────────────┘                 └────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::role::RoleId;

/// Seat number, stable for the lifetime of a game (1..=N).
pub type Seat = u8;

/// Macro-faction a role belongs to. Drives the win condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Camp {
    Good,
    Wolf,
}

impl Camp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Wolf => "wolf",
        }
    }
}

impl fmt::Display for Camp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a seat left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutReason {
    /// Killed by the wolf pack at night
    WolfKill,
    /// Poisoned by the witch
    Poisoned,
    /// Dreamt by the dreamer two nights in a row
    DreamKill,
    /// Died alongside the dreamer who was dreaming of them
    DreamLink,
    /// Died alongside the wolf beauty who charmed them
    Charmed,
    /// Exiled by the day vote
    Exiled,
    /// Shot by a dying hunter
    Shot,
}

impl OutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WolfKill => "wolf_kill",
            Self::Poisoned => "poisoned",
            Self::DreamKill => "dream_kill",
            Self::DreamLink => "dream_link",
            Self::Charmed => "charmed",
            Self::Exiled => "exiled",
            Self::Shot => "shot",
        }
    }

    /// Deaths resolved during night settlement.
    pub fn is_night(&self) -> bool {
        matches!(
            self,
            Self::WolfKill | Self::Poisoned | Self::DreamKill | Self::DreamLink
        )
    }
}

impl fmt::Display for OutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role ability state, one variant per role that needs any.
///
/// Owned by the seat's role handler: the engine only replaces the whole bag
/// with what the handler returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Abilities {
    #[default]
    None,
    Witch {
        antidote: bool,
        poison: bool,
    },
    Guard {
        /// (round, seat) of the most recent protection
        last_protected: Option<(u32, Seat)>,
    },
    Dreamer {
        /// (round, seat) of the most recent dream
        last_dream: Option<(u32, Seat)>,
    },
    WolfBeauty {
        charmed: Option<Seat>,
    },
    Nightmare {
        last_feared: Option<(u32, Seat)>,
    },
}

/// A player seated in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub seat: Seat,
    pub name: String,
    pub role: Option<RoleId>,
    pub camp: Option<Camp>,
    pub alive: bool,
    pub is_sheriff: bool,
    pub out_reason: Option<OutReason>,
    pub abilities: Abilities,
}

impl GamePlayer {
    pub fn new(seat: Seat, name: impl Into<String>) -> Self {
        Self {
            seat,
            name: name.into(),
            role: None,
            camp: None,
            alive: true,
            is_sheriff: false,
            out_reason: None,
            abilities: Abilities::None,
        }
    }

    /// Give the seat its role; camp and abilities follow from it.
    pub fn assign_role(&mut self, role: RoleId) {
        self.role = Some(role);
        self.camp = Some(role.camp());
        self.abilities = role.initial_abilities();
    }

    /// Mark the seat dead. Returns false if it was already dead.
    pub fn die(&mut self, reason: OutReason) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.out_reason = Some(reason);
        true
    }

    pub fn is_wolf(&self) -> bool {
        self.camp == Some(Camp::Wolf)
    }

    pub fn is_good(&self) -> bool {
        self.camp == Some(Camp::Good)
    }

    /// Moderator view, role and ability state included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "seat": self.seat,
            "name": self.name,
            "role": self.role.map(|r| r.as_str()),
            "camp": self.camp.map(|c| c.as_str()),
            "alive": self.alive,
            "is_sheriff": self.is_sheriff,
            "out_reason": self.out_reason.map(|r| r.as_str()),
            "abilities": serde_json::to_value(&self.abilities).unwrap_or_default(),
        })
    }

    /// Public view: role and camp stay hidden.
    pub fn to_public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "seat": self.seat,
            "name": self.name,
            "alive": self.alive,
            "is_sheriff": self.is_sheriff,
            "out_reason": self.out_reason.map(|r| r.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_role_seeds_camp_and_abilities() {
        let mut player = GamePlayer::new(3, "Carol");
        assert!(player.role.is_none());

        player.assign_role(RoleId::Witch);
        assert_eq!(player.camp, Some(Camp::Good));
        assert_eq!(
            player.abilities,
            Abilities::Witch {
                antidote: true,
                poison: true
            }
        );
    }

    #[test]
    fn test_die_sets_reason_once() {
        let mut player = GamePlayer::new(1, "Alice");
        player.assign_role(RoleId::Villager);

        assert!(player.die(OutReason::WolfKill));
        assert!(!player.alive);

        // Second death is ignored and the first reason sticks
        assert!(!player.die(OutReason::Exiled));
        assert_eq!(player.out_reason, Some(OutReason::WolfKill));
    }

    #[test]
    fn test_public_json_hides_role() {
        let mut player = GamePlayer::new(2, "Bob");
        player.assign_role(RoleId::Werewolf);
        let json = player.to_public_json();
        assert!(json.get("role").is_none());
        assert_eq!(json["alive"], true);
    }
}
