//! Role registry and night-action handlers.
//!
//! Roles are a closed set. Each role's capabilities come from
//! [`RoleId::spec`], and [`handle_night_action`] dispatches on the role with
//! a `match`. Handlers only read the game: they return a [`HandlerOutcome`]
//! carrying the effect to record and the replacement ability bag, and the
//! flow engine commits it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::action::{ActionKind, PlayerAction};
use super::effect::{EffectPayload, EffectType, SkillEffect, Ward};
use super::error::EngineError;
use super::game::Game;
use super::phase::PhaseId;
use super::player::{Abilities, Camp, GamePlayer, OutReason, Seat};

/// Role identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Villager,
    Werewolf,
    WolfBeauty,
    Nightmare,
    Gargoyle,
    Seer,
    Witch,
    Hunter,
    Guard,
    Dreamer,
    Gravekeeper,
}

/// Static capabilities of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleSpec {
    pub camp: Camp,
    /// Night phase the role wakes up in on its own
    pub night_phase: Option<PhaseId>,
    pub has_night_action: bool,
    pub has_day_action: bool,
    pub has_death_trigger: bool,
    pub can_skip: bool,
}

impl RoleId {
    pub const ALL: [RoleId; 11] = [
        Self::Villager,
        Self::Werewolf,
        Self::WolfBeauty,
        Self::Nightmare,
        Self::Gargoyle,
        Self::Seer,
        Self::Witch,
        Self::Hunter,
        Self::Guard,
        Self::Dreamer,
        Self::Gravekeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Villager => "villager",
            Self::Werewolf => "werewolf",
            Self::WolfBeauty => "wolf_beauty",
            Self::Nightmare => "nightmare",
            Self::Gargoyle => "gargoyle",
            Self::Seer => "seer",
            Self::Witch => "witch",
            Self::Hunter => "hunter",
            Self::Guard => "guard",
            Self::Dreamer => "dreamer",
            Self::Gravekeeper => "gravekeeper",
        }
    }

    pub fn camp(&self) -> Camp {
        match self {
            Self::Werewolf | Self::WolfBeauty | Self::Nightmare | Self::Gargoyle => Camp::Wolf,
            _ => Camp::Good,
        }
    }

    pub fn spec(&self) -> RoleSpec {
        let night_phase = match self {
            Self::Nightmare => Some(PhaseId::Fear),
            Self::Dreamer => Some(PhaseId::Dream),
            Self::Gargoyle => Some(PhaseId::Gargoyle),
            Self::Guard => Some(PhaseId::Guard),
            Self::Werewolf => Some(PhaseId::Wolf),
            Self::WolfBeauty => Some(PhaseId::WolfBeauty),
            Self::Witch => Some(PhaseId::Witch),
            Self::Seer => Some(PhaseId::Seer),
            Self::Gravekeeper => Some(PhaseId::Gravekeeper),
            Self::Villager | Self::Hunter => None,
        };
        RoleSpec {
            camp: self.camp(),
            night_phase,
            has_night_action: night_phase.is_some(),
            has_day_action: false,
            has_death_trigger: matches!(self, Self::Hunter),
            can_skip: night_phase.is_some(),
        }
    }

    /// Members of the wolf pack vote on the nightly kill.
    pub fn joins_wolf_kill(&self) -> bool {
        matches!(self, Self::Werewolf | Self::WolfBeauty | Self::Nightmare)
    }

    /// Whether the role wakes up during `phase`.
    pub fn acts_in(&self, phase: PhaseId) -> bool {
        if phase == PhaseId::Wolf && self.joins_wolf_kill() {
            return true;
        }
        self.spec().night_phase == Some(phase)
    }

    /// Ability bag seeded at role assignment.
    pub fn initial_abilities(&self) -> Abilities {
        match self {
            Self::Witch => Abilities::Witch {
                antidote: true,
                poison: true,
            },
            Self::Guard => Abilities::Guard {
                last_protected: None,
            },
            Self::Dreamer => Abilities::Dreamer { last_dream: None },
            Self::WolfBeauty => Abilities::WolfBeauty { charmed: None },
            Self::Nightmare => Abilities::Nightmare { last_feared: None },
            _ => Abilities::None,
        }
    }

    /// Actions accepted from this role during `phase`, skip excluded.
    fn night_actions(&self, phase: PhaseId) -> &'static [ActionKind] {
        match (self, phase) {
            (Self::Nightmare, PhaseId::Fear) => &[ActionKind::Fear],
            (Self::Dreamer, PhaseId::Dream) => &[ActionKind::Dream],
            (Self::Gargoyle, PhaseId::Gargoyle) => &[ActionKind::Inspect],
            (Self::Guard, PhaseId::Guard) => &[ActionKind::Protect],
            (_, PhaseId::Wolf) if self.joins_wolf_kill() => &[ActionKind::Kill],
            (Self::WolfBeauty, PhaseId::WolfBeauty) => &[ActionKind::Charm],
            (Self::Witch, PhaseId::Witch) => &[ActionKind::Antidote, ActionKind::Poison],
            (Self::Seer, PhaseId::Seer) => &[ActionKind::Check],
            (Self::Gravekeeper, PhaseId::Gravekeeper) => &[ActionKind::Autopsy],
            _ => &[],
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| EngineError::UnknownRole(s.to_string()))
    }
}

/// What a handler decided. Nothing is applied until the engine commits it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    pub message: String,
    pub effect: Option<SkillEffect>,
    pub data: Option<serde_json::Value>,
    /// Replacement ability bag for the actor
    pub abilities: Option<Abilities>,
}

impl HandlerOutcome {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            effect: None,
            data: None,
            abilities: None,
        }
    }

    fn with_effect(mut self, effect: SkillEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    fn with_abilities(mut self, abilities: Abilities) -> Self {
        self.abilities = Some(abilities);
        self
    }
}

/// Validate a night action and work out its consequences.
///
/// Checks run in a fixed order: the actor is alive and wakes up in this
/// phase, is not feared, the target is valid, and finally the role's own
/// constraints hold.
pub fn handle_night_action(
    game: &Game,
    action: &PlayerAction,
) -> Result<HandlerOutcome, EngineError> {
    let seat = action.player_id;
    let player = game
        .player(seat)
        .ok_or(EngineError::PlayerNotFound(seat))?;
    if !player.alive {
        return Err(EngineError::PlayerDead { seat });
    }
    let role = player.role.ok_or(EngineError::RoleNotAssigned { seat })?;
    if !role.acts_in(action.phase) {
        return Err(EngineError::NotYourPhase {
            seat,
            phase: action.phase,
        });
    }
    if game.night.is_feared(seat) {
        return Err(EngineError::Incapacitated {
            seat,
            status: "feared",
        });
    }

    if action.action == ActionKind::Skip {
        if !role.spec().can_skip {
            return Err(EngineError::RoleConstraint(format!(
                "The {role} cannot skip"
            )));
        }
        return Ok(HandlerOutcome::new(format!(
            "Player {seat} passes during the {} phase",
            action.phase
        )));
    }

    if !role.night_actions(action.phase).contains(&action.action) {
        return Err(EngineError::RoleConstraint(format!(
            "The {role} cannot {} during the {} phase",
            action.action, action.phase
        )));
    }

    let target = check_target(game, seat, action)?;
    let round = game.current_round;

    match (role, action.action, target) {
        (RoleId::Nightmare, ActionKind::Fear, Some(t)) => Ok(HandlerOutcome::new(format!(
            "Player {t} is feared tonight"
        ))
        .with_effect(SkillEffect::new(EffectType::Fear, Some(seat), t))
        .with_abilities(Abilities::Nightmare {
            last_feared: Some((round, t)),
        })),

        (RoleId::Dreamer, ActionKind::Dream, Some(t)) => dream(player, round, t),

        (RoleId::Gargoyle, ActionKind::Inspect, Some(t)) => {
            let role_name = game.player(t).and_then(|p| p.role).map(|r| r.as_str());
            let reveal = serde_json::json!({"target": t, "role": role_name});
            Ok(HandlerOutcome::new(format!(
                "Player {t} is a {}",
                role_name.unwrap_or("unknown role")
            ))
            .with_effect(
                SkillEffect::new(EffectType::Check, Some(seat), t)
                    .with_payload(EffectPayload::Reveal(reveal.clone())),
            )
            .with_data(reveal))
        }

        (RoleId::Guard, ActionKind::Protect, Some(t)) => {
            if let Abilities::Guard {
                last_protected: Some((last_round, last_seat)),
            } = player.abilities
            {
                if last_seat == t && last_round + 1 == round {
                    return Err(EngineError::RepeatedTarget {
                        action: "protect",
                        target: t,
                    });
                }
            }
            Ok(HandlerOutcome::new(format!("Player {t} is protected tonight"))
                .with_effect(SkillEffect::protect(seat, t, Ward::Guard))
                .with_abilities(Abilities::Guard {
                    last_protected: Some((round, t)),
                }))
        }

        (_, ActionKind::Kill, Some(t)) => Ok(HandlerOutcome::new(format!(
            "The pack chose player {t}"
        ))
        .with_effect(SkillEffect::kill(Some(seat), t, OutReason::WolfKill))),

        (RoleId::WolfBeauty, ActionKind::Charm, Some(t)) => Ok(HandlerOutcome::new(format!(
            "Player {t} is charmed"
        ))
        .with_effect(SkillEffect::new(EffectType::Charm, Some(seat), t))
        .with_abilities(Abilities::WolfBeauty { charmed: Some(t) })),

        (RoleId::Witch, kind @ (ActionKind::Antidote | ActionKind::Poison), Some(t)) => {
            witch(game, player, kind, t)
        }

        (RoleId::Seer, ActionKind::Check, Some(t)) => {
            let camp = game.player(t).and_then(|p| p.camp).map(|c| c.as_str());
            let reveal = serde_json::json!({"target": t, "camp": camp});
            Ok(HandlerOutcome::new(format!(
                "Player {t} is {}",
                camp.unwrap_or("unknown")
            ))
            .with_effect(
                SkillEffect::new(EffectType::Check, Some(seat), t)
                    .with_payload(EffectPayload::Reveal(reveal.clone())),
            )
            .with_data(reveal))
        }

        (RoleId::Gravekeeper, ActionKind::Autopsy, None) => Ok(autopsy(game)),

        _ => Err(EngineError::RoleConstraint(format!(
            "The {role} cannot {}",
            action.action
        ))),
    }
}

/// Target presence and membership in the valid-target set.
fn check_target(
    game: &Game,
    seat: Seat,
    action: &PlayerAction,
) -> Result<Option<Seat>, EngineError> {
    match (action.action, action.target) {
        (ActionKind::Autopsy, Some(_)) => Err(EngineError::UnexpectedTarget),
        (ActionKind::Autopsy, None) => Ok(None),
        (_, None) => Err(EngineError::TargetRequired),
        (kind, Some(t)) => {
            if valid_targets_for(game, seat, kind).contains(&t) {
                Ok(Some(t))
            } else {
                Err(EngineError::InvalidTarget { target: t })
            }
        }
    }
}

fn dream(player: &GamePlayer, round: u32, target: Seat) -> Result<HandlerOutcome, EngineError> {
    let repeated = matches!(
        player.abilities,
        Abilities::Dreamer { last_dream: Some((r, s)) } if s == target && r + 1 == round
    );
    let abilities = Abilities::Dreamer {
        last_dream: Some((round, target)),
    };
    let outcome = if repeated {
        HandlerOutcome::new(format!("Player {target} is dreamt of a second night"))
            .with_effect(SkillEffect::kill(Some(player.seat), target, OutReason::DreamKill))
    } else {
        HandlerOutcome::new(format!("Player {target} is dreamt of tonight"))
            .with_effect(SkillEffect::protect(player.seat, target, Ward::Dream))
    };
    Ok(outcome.with_abilities(abilities))
}

fn witch(
    game: &Game,
    player: &GamePlayer,
    kind: ActionKind,
    target: Seat,
) -> Result<HandlerOutcome, EngineError> {
    let Abilities::Witch { antidote, poison } = player.abilities else {
        return Err(EngineError::RoleConstraint(
            "The witch has no potions".to_string(),
        ));
    };
    match kind {
        ActionKind::Antidote => {
            if !antidote {
                return Err(EngineError::AbilityExhausted {
                    ability: "antidote",
                });
            }
            if target == player.seat && !game.config.witch_self_save {
                return Err(EngineError::RoleConstraint(
                    "The witch cannot save herself".to_string(),
                ));
            }
            Ok(HandlerOutcome::new(format!("Player {target} is saved"))
                .with_effect(SkillEffect::new(EffectType::Antidote, Some(player.seat), target))
                .with_abilities(Abilities::Witch {
                    antidote: false,
                    poison,
                }))
        }
        _ => {
            if !poison {
                return Err(EngineError::AbilityExhausted { ability: "poison" });
            }
            Ok(HandlerOutcome::new(format!("Player {target} is poisoned"))
                .with_effect(SkillEffect::new(EffectType::Poison, Some(player.seat), target))
                .with_abilities(Abilities::Witch {
                    antidote,
                    poison: false,
                }))
        }
    }
}

/// Camp of the seat exiled on the previous day.
fn autopsy(game: &Game) -> HandlerOutcome {
    let exiled = game
        .last_exile
        .filter(|(round, _)| round + 1 == game.current_round)
        .map(|(_, seat)| seat);
    match exiled.and_then(|s| game.player(s)) {
        Some(p) => {
            let camp = p.camp.map(|c| c.as_str());
            HandlerOutcome::new(format!(
                "Player {} was {}",
                p.seat,
                camp.unwrap_or("unknown")
            ))
            .with_data(serde_json::json!({"target": p.seat, "camp": camp}))
        }
        None => HandlerOutcome::new("Nobody was exiled yesterday")
            .with_data(serde_json::json!({"target": null})),
    }
}

/// Valid targets for the seat's main action in the current phase.
pub fn valid_targets(game: &Game, seat: Seat) -> Vec<Seat> {
    let Some(role) = game.player(seat).and_then(|p| p.role) else {
        return Vec::new();
    };
    match role.night_actions(game.current_phase).first() {
        Some(kind) => valid_targets_for(game, seat, *kind),
        None => Vec::new(),
    }
}

/// Valid targets for a specific action.
pub fn valid_targets_for(game: &Game, seat: Seat, kind: ActionKind) -> Vec<Seat> {
    let living = game.players().filter(|p| p.alive);
    match kind {
        ActionKind::Protect | ActionKind::Kill => living.map(|p| p.seat).collect(),
        ActionKind::Fear
        | ActionKind::Dream
        | ActionKind::Inspect
        | ActionKind::Charm
        | ActionKind::Poison
        | ActionKind::Check => living.filter(|p| p.seat != seat).map(|p| p.seat).collect(),
        ActionKind::Antidote => game
            .night
            .wolf_kill_target()
            .filter(|t| game.player(*t).is_some_and(|p| p.alive))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::effect::NightSubmission;
    use crate::state::game::testing::started_game;
    use crate::state::phase::Scenario;
    use pretty_assertions::assert_eq;

    fn act(
        game: &Game,
        seat: Seat,
        kind: ActionKind,
        target: Option<Seat>,
    ) -> Result<HandlerOutcome, EngineError> {
        let action = PlayerAction::new(game.current_phase, seat, kind, target);
        handle_night_action(game, &action)
    }

    fn record(
        game: &mut Game,
        seat: Seat,
        kind: ActionKind,
        outcome: HandlerOutcome,
        target: Option<Seat>,
    ) {
        game.night.record(NightSubmission {
            phase: game.current_phase,
            actor: seat,
            action: kind,
            target,
            effect: outcome.effect,
            message: outcome.message,
            data: outcome.data,
            submitted_at: chrono::Utc::now(),
        });
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("wolf_beauty".parse::<RoleId>().unwrap(), RoleId::WolfBeauty);
        assert_eq!(
            "vampire".parse::<RoleId>(),
            Err(EngineError::UnknownRole("vampire".to_string()))
        );
    }

    #[test]
    fn test_registry_flags() {
        assert!(RoleId::Hunter.spec().has_death_trigger);
        assert!(!RoleId::Hunter.spec().has_night_action);
        assert_eq!(RoleId::Gargoyle.camp(), Camp::Wolf);
        assert!(!RoleId::Gargoyle.joins_wolf_kill());
        assert!(RoleId::Nightmare.acts_in(PhaseId::Wolf));
        assert!(RoleId::Nightmare.acts_in(PhaseId::Fear));
    }

    #[test]
    fn test_wrong_role_for_phase() {
        let mut game = started_game(Scenario::classic_twelve());
        game.current_phase = PhaseId::Wolf;
        let err = act(&game, 5, ActionKind::Check, Some(1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::NotYourPhase {
                seat: 5,
                phase: PhaseId::Wolf
            }
        );
    }

    #[test]
    fn test_feared_player_is_incapacitated() {
        let mut game = started_game(Scenario::nightmare_twelve());
        assert_eq!(game.current_phase, PhaseId::Fear);
        let outcome = act(&game, 1, ActionKind::Fear, Some(5)).unwrap();
        record(&mut game, 1, ActionKind::Fear, outcome, Some(5));

        game.current_phase = PhaseId::Seer;
        let err = act(&game, 5, ActionKind::Check, Some(2)).unwrap_err();
        assert!(err.to_string().contains("feared"));
    }

    #[test]
    fn test_guard_cannot_repeat_on_consecutive_rounds() {
        let mut game = started_game(Scenario::classic_twelve());
        assert_eq!(game.current_phase, PhaseId::Guard);
        let outcome = act(&game, 8, ActionKind::Protect, Some(3)).unwrap();
        let abilities = outcome.abilities.clone().unwrap();
        game.player_mut(8).unwrap().abilities = abilities;

        // Seat 3 is dead by the next round; the rule still applies
        game.current_round = 2;
        game.player_mut(3).unwrap().die(OutReason::Exiled);
        let err = act(&game, 8, ActionKind::Protect, Some(3)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::RepeatedTarget { .. } | EngineError::InvalidTarget { .. }
        ));

        game.player_mut(3).unwrap().alive = true;
        let err = act(&game, 8, ActionKind::Protect, Some(3)).unwrap_err();
        assert_eq!(
            err,
            EngineError::RepeatedTarget {
                action: "protect",
                target: 3
            }
        );

        // Self protection and a gap round are both fine
        assert!(act(&game, 8, ActionKind::Protect, Some(8)).is_ok());
        game.current_round = 3;
        assert!(act(&game, 8, ActionKind::Protect, Some(3)).is_ok());
    }

    #[test]
    fn test_witch_antidote_needs_victim() {
        let mut game = started_game(Scenario::classic_twelve());
        game.current_phase = PhaseId::Witch;
        let err = act(&game, 6, ActionKind::Antidote, Some(9)).unwrap_err();
        assert_eq!(err, EngineError::InvalidTarget { target: 9 });

        game.current_phase = PhaseId::Wolf;
        let outcome = act(&game, 1, ActionKind::Kill, Some(9)).unwrap();
        record(&mut game, 1, ActionKind::Kill, outcome, Some(9));
        game.current_phase = PhaseId::Witch;
        let outcome = act(&game, 6, ActionKind::Antidote, Some(9)).unwrap();
        assert_eq!(
            outcome.abilities,
            Some(Abilities::Witch {
                antidote: false,
                poison: true
            })
        );
    }

    #[test]
    fn test_witch_cannot_self_save_by_default() {
        let mut game = started_game(Scenario::classic_twelve());
        game.current_phase = PhaseId::Wolf;
        let outcome = act(&game, 1, ActionKind::Kill, Some(6)).unwrap();
        record(&mut game, 1, ActionKind::Kill, outcome, Some(6));
        game.current_phase = PhaseId::Witch;
        assert!(matches!(
            act(&game, 6, ActionKind::Antidote, Some(6)),
            Err(EngineError::RoleConstraint(_))
        ));

        game.config.witch_self_save = true;
        assert!(act(&game, 6, ActionKind::Antidote, Some(6)).is_ok());
    }

    #[test]
    fn test_spent_poison_is_exhausted() {
        let mut game = started_game(Scenario::classic_twelve());
        game.current_phase = PhaseId::Witch;
        game.player_mut(6).unwrap().abilities = Abilities::Witch {
            antidote: true,
            poison: false,
        };
        let err = act(&game, 6, ActionKind::Poison, Some(2)).unwrap_err();
        assert_eq!(err, EngineError::AbilityExhausted { ability: "poison" });
    }

    #[test]
    fn test_dreamer_second_night_kills() {
        let mut game = started_game(Scenario::nightmare_twelve());
        game.current_phase = PhaseId::Dream;
        let first = act(&game, 7, ActionKind::Dream, Some(10)).unwrap();
        assert_eq!(first.effect.as_ref().map(|e| e.kind), Some(EffectType::Protect));
        game.player_mut(7).unwrap().abilities = first.abilities.unwrap();

        game.current_round = 2;
        let second = act(&game, 7, ActionKind::Dream, Some(10)).unwrap();
        let effect = second.effect.unwrap();
        assert_eq!(effect.kind, EffectType::Kill);
        assert_eq!(effect.cause(), Some(OutReason::DreamKill));
    }

    #[test]
    fn test_seer_learns_camp() {
        let mut game = started_game(Scenario::classic_twelve());
        game.current_phase = PhaseId::Seer;
        let outcome = act(&game, 5, ActionKind::Check, Some(2)).unwrap();
        assert_eq!(outcome.data.unwrap()["camp"], "wolf");
        assert!(matches!(
            act(&game, 5, ActionKind::Check, Some(5)),
            Err(EngineError::InvalidTarget { target: 5 })
        ));
        assert_eq!(act(&game, 5, ActionKind::Check, None), Err(EngineError::TargetRequired));
    }

    #[test]
    fn test_gravekeeper_reads_yesterdays_exile() {
        let mut game = started_game(Scenario::nightmare_twelve());
        game.current_phase = PhaseId::Gravekeeper;
        let outcome = act(&game, 8, ActionKind::Autopsy, None).unwrap();
        assert_eq!(outcome.data.unwrap()["target"], serde_json::Value::Null);

        game.current_round = 2;
        game.last_exile = Some((1, 4));
        let outcome = act(&game, 8, ActionKind::Autopsy, None).unwrap();
        assert!(outcome.effect.is_none());
        assert_eq!(outcome.data.unwrap()["camp"], "wolf");
        assert_eq!(
            act(&game, 8, ActionKind::Autopsy, Some(3)),
            Err(EngineError::UnexpectedTarget)
        );
    }

    #[test]
    fn test_valid_targets_excludes_dead_and_self() {
        let mut game = started_game(Scenario::classic_twelve());
        game.current_phase = PhaseId::Seer;
        game.player_mut(9).unwrap().die(OutReason::WolfKill);
        let targets = valid_targets(&game, 5);
        assert!(!targets.contains(&5));
        assert!(!targets.contains(&9));
        assert_eq!(targets.len(), 10);
    }
}
