//! Deferred death consequences: retaliation triggers and the sheriff badge.
//!
//! Neither resolves on its own. While either is outstanding the flow refuses
//! to advance, and the resolution entry points below are the only way out.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::action::ActionOutcome;
use super::error::EngineError;
use super::game::{Game, GameStatus};
use super::history::{BadgeTransfer, Visibility};
use super::player::{OutReason, Seat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathTriggerKind {
    /// Dying hunter takes someone with them
    Shoot,
}

impl DeathTriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shoot => "shoot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeathTrigger {
    pub id: String,
    pub kind: DeathTriggerKind,
    pub actor: Seat,
    pub target: Option<Seat>,
    pub resolved: bool,
    pub round: u32,
}

impl PendingDeathTrigger {
    pub fn shoot(actor: Seat, round: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: DeathTriggerKind::Shoot,
            actor,
            target: None,
            resolved: false,
            round,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "kind": self.kind.as_str(),
            "actor": self.actor,
            "target": self.target,
            "resolved": self.resolved
        })
    }
}

/// The badge holder died; someone must pass the badge on or tear it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSheriffTransfer {
    pub from: Seat,
    pub reason: OutReason,
    /// Living seats the badge may go to
    pub options: Vec<Seat>,
}

impl PendingSheriffTransfer {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "from": self.from,
            "reason": self.reason.as_str(),
            "options": self.options
        })
    }
}

impl Game {
    /// Unresolved retaliation triggers.
    pub fn unresolved_triggers(&self) -> impl Iterator<Item = &PendingDeathTrigger> {
        self.pending_death_triggers.iter().filter(|t| !t.resolved)
    }

    /// Resolve a death trigger with a target, or skip it with None.
    pub fn resolve_death_trigger(
        &mut self,
        trigger_id: &str,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        if self.status != GameStatus::Running {
            return Err(EngineError::GameNotRunning);
        }
        let trigger = self
            .pending_death_triggers
            .iter()
            .find(|t| t.id == trigger_id)
            .ok_or_else(|| EngineError::TriggerNotFound(trigger_id.to_string()))?;
        if trigger.resolved {
            return Err(EngineError::TriggerResolved(trigger_id.to_string()));
        }
        let actor = trigger.actor;
        let kind = trigger.kind;
        if let Some(t) = target {
            let valid = t != actor && self.player(t).is_some_and(|p| p.alive);
            if !valid {
                return Err(EngineError::InvalidTarget { target: t });
            }
        }

        if let Some(trigger) = self
            .pending_death_triggers
            .iter_mut()
            .find(|t| t.id == trigger_id)
        {
            trigger.resolved = true;
            trigger.target = target;
        }

        let message = match target {
            Some(t) => {
                info!(game_id = %self.id, actor, target = t, "Death trigger fired");
                self.apply_death(t, OutReason::Shot);
                format!("Player {actor} shot player {t}")
            }
            None => format!("Player {actor} chose not to shoot"),
        };
        self.round_draft.note(format!("{message}."));
        self.log(
            Some(actor),
            kind.as_str(),
            target,
            message.clone(),
            Visibility::Public,
        );
        self.check_win();
        Ok(ActionOutcome::new(message))
    }

    pub fn transfer_sheriff_badge(&mut self, target: Seat) -> Result<ActionOutcome, EngineError> {
        let transfer = self
            .pending_sheriff_transfer
            .as_ref()
            .ok_or(EngineError::NoSheriffTransfer)?;
        let valid =
            transfer.options.contains(&target) && self.player(target).is_some_and(|p| p.alive);
        if !valid {
            return Err(EngineError::InvalidTarget { target });
        }
        let (from, reason) = (transfer.from, transfer.reason);

        if let Some(old) = self.player_mut(from) {
            old.is_sheriff = false;
        }
        if let Some(new) = self.player_mut(target) {
            new.is_sheriff = true;
        }
        self.sheriff = Some(target);
        self.pending_sheriff_transfer = None;
        self.round_draft.badge_transfers.push(BadgeTransfer {
            round: self.current_round,
            from,
            to: Some(target),
            reason,
        });

        let message = format!("Player {from} passed the sheriff badge to player {target}");
        info!(game_id = %self.id, from, to = target, "Sheriff badge transferred");
        self.round_draft.note(format!("{message}."));
        self.log(
            Some(from),
            "transfer_badge",
            Some(target),
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message))
    }

    pub fn destroy_sheriff_badge(&mut self) -> Result<ActionOutcome, EngineError> {
        let transfer = self
            .pending_sheriff_transfer
            .take()
            .ok_or(EngineError::NoSheriffTransfer)?;
        if let Some(old) = self.player_mut(transfer.from) {
            old.is_sheriff = false;
        }
        self.sheriff = None;
        self.round_draft.badge_transfers.push(BadgeTransfer {
            round: self.current_round,
            from: transfer.from,
            to: None,
            reason: transfer.reason,
        });

        let message = format!("Player {} tore up the sheriff badge", transfer.from);
        info!(game_id = %self.id, from = transfer.from, "Sheriff badge destroyed");
        self.round_draft.note(format!("{message}."));
        self.log(
            Some(transfer.from),
            "destroy_badge",
            None,
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::testing::started_game;
    use crate::state::phase::Scenario;

    #[test]
    fn test_hunter_death_creates_trigger() {
        let mut game = started_game(Scenario::classic_twelve());
        game.apply_death(7, OutReason::WolfKill);
        assert_eq!(game.unresolved_triggers().count(), 1);

        let id = game.pending_death_triggers[0].id.clone();
        game.resolve_death_trigger(&id, Some(1)).unwrap();
        assert!(!game.player(1).unwrap().alive);
        assert_eq!(game.player(1).unwrap().out_reason, Some(OutReason::Shot));
        assert_eq!(
            game.resolve_death_trigger(&id, None),
            Err(EngineError::TriggerResolved(id.clone()))
        );
    }

    #[test]
    fn test_poisoned_hunter_cannot_shoot() {
        let mut game = started_game(Scenario::classic_twelve());
        game.apply_death(7, OutReason::Poisoned);
        assert_eq!(game.unresolved_triggers().count(), 0);

        let mut game = started_game(Scenario::classic_twelve());
        game.config.hunter_shoots_when_poisoned = true;
        game.apply_death(7, OutReason::Poisoned);
        assert_eq!(game.unresolved_triggers().count(), 1);
    }

    #[test]
    fn test_trigger_rejects_dead_or_self_target() {
        let mut game = started_game(Scenario::classic_twelve());
        game.apply_death(9, OutReason::WolfKill);
        game.apply_death(7, OutReason::Exiled);
        let id = game.pending_death_triggers[0].id.clone();
        assert_eq!(
            game.resolve_death_trigger(&id, Some(9)),
            Err(EngineError::InvalidTarget { target: 9 })
        );
        assert_eq!(
            game.resolve_death_trigger("missing", None),
            Err(EngineError::TriggerNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_sheriff_death_then_transfer() {
        let mut game = started_game(Scenario::classic_twelve());
        game.install_sheriff(5);
        game.apply_death(5, OutReason::WolfKill);
        let transfer = game.pending_sheriff_transfer.clone().unwrap();
        assert!(!transfer.options.contains(&5));

        assert_eq!(
            game.transfer_sheriff_badge(5),
            Err(EngineError::InvalidTarget { target: 5 })
        );
        game.transfer_sheriff_badge(9).unwrap();
        assert_eq!(game.sheriff, Some(9));
        assert!(game.player(9).unwrap().is_sheriff);
        assert!(!game.player(5).unwrap().is_sheriff);
        assert!(game.pending_sheriff_transfer.is_none());
        assert_eq!(game.round_draft.badge_transfers.len(), 1);
    }

    #[test]
    fn test_destroy_badge() {
        let mut game = started_game(Scenario::classic_twelve());
        assert_eq!(game.destroy_sheriff_badge(), Err(EngineError::NoSheriffTransfer));
        game.install_sheriff(6);
        game.apply_death(6, OutReason::Exiled);
        game.destroy_sheriff_badge().unwrap();
        assert_eq!(game.sheriff, None);
        assert_eq!(game.round_draft.badge_transfers[0].to, None);
    }
}
