//! Game flow engine.
//!
//! `advance_phase` is the only code that moves the phase cursor or the
//! round counter. Leaving a phase runs that phase's closing work first:
//!
//! ```text
//!   Settlement       apply night effects, deaths and their chains, win check
//!   SheriffElection  tally an open ballot, fold the election into the round
//!   ExileVote        tally / PK tally, execute the exile, win check
//!   DayEnd           freeze the round into the round history
//! ```
//!
//! The closing work is idempotent, so a held advance can simply be retried
//! once its blocker (a death trigger or a badge transfer) is resolved.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::action::{ActionKind, ActionOutcome, PlayerAction};
use super::effect::{resolve_effects, NightActions, NightSubmission};
use super::error::EngineError;
use super::game::{Game, GameStatus};
use super::history::Visibility;
use super::phase::{PhaseId, PhaseType};
use super::player::{Camp, Seat};
use super::role::handle_night_action;
use super::vote::{DayVote, ExileStage, SheriffStage};

/// Result of a phase advance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Moved to a new phase
    Advanced {
        phase: PhaseId,
        round: u32,
        prompt: &'static str,
    },
    /// Stayed put until a pending decision is made
    Held { phase: PhaseId, reason: String },
    Finished { winner: Camp },
}

impl AdvanceOutcome {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Advanced {
                phase,
                round,
                prompt,
            } => serde_json::json!({
                "success": true,
                "next_phase": phase.as_str(),
                "round": round,
                "prompt": prompt
            }),
            Self::Held { phase, reason } => serde_json::json!({
                "success": true,
                "next_phase": phase.as_str(),
                "held": true,
                "prompt": reason
            }),
            Self::Finished { winner } => serde_json::json!({
                "success": true,
                "next_phase": PhaseId::GameOver.as_str(),
                "finished": true,
                "winner": winner.as_str(),
                "prompt": PhaseId::GameOver.prompt()
            }),
        }
    }
}

/// Whether the current phase may close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    /// Seats whose submission is still missing
    pub waiting_on: Vec<Seat>,
    pub reason: Option<String>,
}

impl Readiness {
    fn ready() -> Self {
        Self {
            ready: true,
            waiting_on: Vec::new(),
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            waiting_on: Vec::new(),
            reason: Some(reason.into()),
        }
    }

    fn waiting(seats: Vec<Seat>) -> Self {
        if seats.is_empty() {
            return Self::ready();
        }
        Self {
            ready: false,
            reason: Some(format!("Waiting on {seats:?}")),
            waiting_on: seats,
        }
    }
}

/// Result of an auto-advance check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoAdvance {
    pub advanced: bool,
    pub next_phase: Option<PhaseId>,
    pub prompt: Option<String>,
    pub reason: Option<String>,
    pub finished: bool,
}

impl AutoAdvance {
    fn idle(reason: impl Into<String>) -> Self {
        Self {
            advanced: false,
            next_phase: None,
            prompt: None,
            reason: Some(reason.into()),
            finished: false,
        }
    }
}

impl Game {
    /// Route a player action to the role handler or the active day vote.
    pub fn submit_action(&mut self, action: PlayerAction) -> Result<ActionOutcome, EngineError> {
        if self.status != GameStatus::Running {
            return Err(EngineError::GameNotRunning);
        }
        if action.phase != self.current_phase {
            return Err(EngineError::WrongPhase {
                operation: "submit an action",
                phase: self.current_phase,
            });
        }
        self.living(action.player_id)?;

        match self.current_phase_type() {
            PhaseType::Night => self.submit_night_action(action),
            PhaseType::Day => self.submit_day_action(&action),
            PhaseType::Transition => Err(EngineError::WrongPhase {
                operation: "submit an action",
                phase: self.current_phase,
            }),
        }
    }

    fn submit_night_action(&mut self, action: PlayerAction) -> Result<ActionOutcome, EngineError> {
        let seat = action.player_id;
        if self.night.has_submitted(action.phase, seat) {
            return Err(EngineError::AlreadySubmitted {
                seat,
                phase: action.phase,
            });
        }
        let outcome = handle_night_action(self, &action)?;

        if let Some(abilities) = outcome.abilities {
            if let Some(player) = self.player_mut(seat) {
                player.abilities = abilities;
            }
        }
        let visibility = if action.phase == PhaseId::Wolf {
            Visibility::Camp(Camp::Wolf)
        } else {
            Visibility::Seat(seat)
        };
        debug!(
            game_id = %self.id,
            round = self.current_round,
            phase = %action.phase,
            seat,
            action = %action.action,
            target = ?action.target,
            "Night action accepted"
        );
        self.log(
            Some(seat),
            action.action.as_str(),
            action.target,
            outcome.message.clone(),
            visibility,
        );
        self.night.record(NightSubmission {
            phase: action.phase,
            actor: seat,
            action: action.action,
            target: action.target,
            effect: outcome.effect,
            message: outcome.message.clone(),
            data: outcome.data.clone(),
            submitted_at: action.submitted_at,
        });

        Ok(ActionOutcome {
            message: outcome.message,
            data: outcome.data,
        })
    }

    fn submit_day_action(&mut self, action: &PlayerAction) -> Result<ActionOutcome, EngineError> {
        let seat = action.player_id;
        match (self.current_phase, action.action) {
            (PhaseId::SheriffElection, ActionKind::RunForSheriff) => {
                self.sheriff_signup(seat, true)
            }
            (PhaseId::SheriffElection, ActionKind::DeclineSheriff) => {
                self.sheriff_signup(seat, false)
            }
            (PhaseId::SheriffElection, ActionKind::WithdrawSheriff) => self.sheriff_withdraw(seat),
            (PhaseId::SheriffElection, ActionKind::Vote) => {
                self.vote_for_sheriff(seat, action.target)
            }
            (PhaseId::ExileVote, ActionKind::Vote) => {
                let pk = matches!(
                    &self.day_vote,
                    DayVote::ExileVote(v) if v.stage == ExileStage::PkVoting
                );
                if pk {
                    self.vote_for_exile_pk(seat, action.target)
                } else {
                    self.vote_for_exile(seat, action.target)
                }
            }
            (phase, _) => Err(EngineError::NotYourPhase { seat, phase }),
        }
    }

    fn check_blockers(&self) -> Result<(), EngineError> {
        let count = self.unresolved_triggers().count();
        if count > 0 {
            warn!(
                game_id = %self.id,
                phase = %self.current_phase,
                count,
                "Advance blocked by death trigger"
            );
            return Err(EngineError::DeathTriggerPending { count });
        }
        if self.pending_sheriff_transfer.is_some() {
            warn!(
                game_id = %self.id,
                phase = %self.current_phase,
                "Advance blocked by sheriff badge"
            );
            return Err(EngineError::SheriffTransferPending);
        }
        Ok(())
    }

    fn blocker_reason(&self) -> Option<String> {
        let count = self.unresolved_triggers().count();
        if count > 0 {
            return Some(EngineError::DeathTriggerPending { count }.to_string());
        }
        self.pending_sheriff_transfer
            .as_ref()
            .map(|_| EngineError::SheriffTransferPending.to_string())
    }

    /// Close the current phase and open the next one.
    pub fn advance_phase(&mut self) -> Result<AdvanceOutcome, EngineError> {
        if self.status != GameStatus::Running {
            return Err(EngineError::GameNotRunning);
        }
        self.check_blockers()?;

        let leaving = self.current_phase;
        let held = match leaving {
            PhaseId::Settlement => {
                self.settle_night();
                None
            }
            PhaseId::SheriffElection => self.leave_sheriff_election()?,
            PhaseId::ExileVote => self.leave_exile_vote()?,
            PhaseId::DayEnd => {
                self.close_round();
                None
            }
            _ => None,
        };

        if let Some(winner) = self.winner {
            return Ok(AdvanceOutcome::Finished { winner });
        }
        if let Some(reason) = held.or_else(|| self.blocker_reason()) {
            info!(game_id = %self.id, phase = %leaving, reason = %reason, "Advance held");
            return Ok(AdvanceOutcome::Held {
                phase: leaving,
                reason,
            });
        }

        let next = match self.scenario.next_phase(leaving, self.current_round) {
            Some(phase) => phase,
            None => self.open_next_round(),
        };
        self.current_phase = next;

        info!(
            game_id = %self.id,
            round = self.current_round,
            from = %leaving,
            to = %next,
            "Phase advanced"
        );
        self.log(None, "advance", None, next.prompt(), Visibility::Public);
        Ok(AdvanceOutcome::Advanced {
            phase: next,
            round: self.current_round,
            prompt: next.prompt(),
        })
    }

    fn open_next_round(&mut self) -> PhaseId {
        self.current_round += 1;
        self.night = NightActions::new(self.current_round);
        self.scenario.first_phase()
    }

    /// Apply the night's settlement effects. Runs once per night.
    fn settle_night(&mut self) {
        if self.night.settled {
            return;
        }
        let effects = self.night.settlement_effects();
        let resolution = resolve_effects(&effects, |seat| self.is_alive(seat));
        self.night.settled = true;

        let mut died = Vec::new();
        for (seat, reason) in resolution.deaths {
            died.extend(self.apply_death(seat, reason).into_iter().map(|d| d.seat));
        }

        let summary = if died.is_empty() {
            "Last night was peaceful.".to_string()
        } else {
            let seats: Vec<String> = died.iter().map(|s| s.to_string()).collect();
            format!("Last night player(s) {} died.", seats.join(", "))
        };
        info!(
            game_id = %self.id,
            round = self.current_round,
            deaths = died.len(),
            saved = resolution.saved.len(),
            "Night settled"
        );
        self.round_draft.note(summary.clone());
        self.log(None, "settlement", None, summary, Visibility::Public);
        self.log(
            None,
            "settlement_saved",
            None,
            format!("Saved: {:?}", resolution.saved),
            Visibility::Moderator,
        );
        self.check_win();
    }

    /// Returns a hold reason when the election needs a moderator decision.
    fn leave_sheriff_election(&mut self) -> Result<Option<String>, EngineError> {
        let stage = match &self.day_vote {
            DayVote::SheriffElection(election) => Some(election.stage),
            _ => None,
        };
        match stage {
            None | Some(SheriffStage::Done) => {}
            Some(SheriffStage::Signup) | Some(SheriffStage::Campaign) => {
                return Err(EngineError::VoteUnresolved(
                    "The sheriff election has not reached a vote",
                ))
            }
            Some(SheriffStage::Voting) => {
                let tally = self.tally_sheriff_votes()?;
                if tally.is_tie {
                    return Ok(Some(format!(
                        "Sheriff vote tied between {:?}; assign the badge or leave it empty",
                        tally.tied_players
                    )));
                }
            }
            Some(SheriffStage::Tie) => {
                return Err(EngineError::VoteUnresolved(
                    "The sheriff vote is tied; assign the badge or leave it empty",
                ))
            }
        }
        self.fold_day_vote();
        Ok(None)
    }

    /// Returns a hold reason when the vote tied and a PK must run.
    fn leave_exile_vote(&mut self) -> Result<Option<String>, EngineError> {
        let stage = match &self.day_vote {
            DayVote::ExileVote(vote) => Some(vote.stage),
            _ => None,
        };
        match stage {
            None | Some(ExileStage::Done) => {}
            Some(ExileStage::Voting) => {
                let tally = self.tally_exile_votes()?;
                if tally.result.is_none() {
                    return Ok(Some(format!(
                        "Exile vote tied between {:?}; run the PK vote",
                        tally.pk_players
                    )));
                }
            }
            Some(ExileStage::Tied) => {
                return Err(EngineError::VoteUnresolved(
                    "The exile vote is tied; run the PK vote first",
                ))
            }
            Some(ExileStage::PkVoting) => {
                self.tally_exile_pk_votes()?;
            }
        }

        let pending = match &self.day_vote {
            DayVote::ExileVote(vote) if !vote.executed => vote.result.and_then(|r| r.exiled()),
            _ => None,
        };
        if let Some(seat) = pending {
            self.execute_exile(seat)?;
        }
        self.fold_day_vote();
        Ok(None)
    }

    /// Whether every required actor of the current phase is done.
    pub fn readiness(&self) -> Readiness {
        if self.status != GameStatus::Running {
            return Readiness::blocked("Game is not running");
        }
        if let Some(reason) = self.blocker_reason() {
            return Readiness::blocked(reason);
        }
        let phase = self.current_phase;
        match self.current_phase_type() {
            PhaseType::Transition => Readiness::ready(),
            PhaseType::Night => {
                let required: Vec<Seat> = self
                    .players()
                    .filter(|p| p.alive && p.role.is_some_and(|r| r.acts_in(phase)))
                    .filter(|p| !self.night.is_feared(p.seat))
                    .map(|p| p.seat)
                    .collect();
                if phase == PhaseId::Wolf {
                    if self.night.pack_submitted() {
                        Readiness::ready()
                    } else {
                        Readiness::waiting(required)
                    }
                } else {
                    Readiness::waiting(
                        required
                            .into_iter()
                            .filter(|s| !self.night.has_submitted(phase, *s))
                            .collect(),
                    )
                }
            }
            PhaseType::Day => match (&self.day_vote, phase) {
                (_, PhaseId::Discussion) => {
                    Readiness::blocked("Discussion is closed by the moderator")
                }
                (DayVote::SheriffElection(e), PhaseId::SheriffElection) if e.is_done() => {
                    Readiness::ready()
                }
                (DayVote::ExileVote(v), PhaseId::ExileVote) if v.is_done() => Readiness::ready(),
                _ => Readiness::blocked("The vote has not been decided"),
            },
        }
    }

    /// Advance if auto-advance is on and the phase is complete.
    pub fn check_and_auto_advance(&mut self) -> Result<AutoAdvance, EngineError> {
        if !self.config.auto_advance {
            return Ok(AutoAdvance::idle("Auto-advance is disabled"));
        }
        let readiness = self.readiness();
        if !readiness.ready {
            return Ok(AutoAdvance::idle(
                readiness.reason.unwrap_or_else(|| "Phase not complete".to_string()),
            ));
        }
        let result = match self.advance_phase()? {
            AdvanceOutcome::Advanced { phase, prompt, .. } => AutoAdvance {
                advanced: true,
                next_phase: Some(phase),
                prompt: Some(prompt.to_string()),
                reason: None,
                finished: false,
            },
            AdvanceOutcome::Held { reason, .. } => AutoAdvance::idle(reason),
            AdvanceOutcome::Finished { .. } => AutoAdvance {
                advanced: true,
                next_phase: Some(PhaseId::GameOver),
                prompt: Some(PhaseId::GameOver.prompt().to_string()),
                reason: None,
                finished: true,
            },
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::testing::started_game;
    use crate::state::phase::Scenario;
    use crate::state::player::{Abilities, OutReason};
    use pretty_assertions::assert_eq;

    fn submit(
        game: &mut Game,
        seat: Seat,
        kind: ActionKind,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        let action = PlayerAction::new(game.current_phase, seat, kind, target);
        game.submit_action(action)
    }

    fn advance_to(game: &mut Game, phase: PhaseId) {
        while game.current_phase != phase {
            let outcome = game.advance_phase().unwrap();
            assert!(
                matches!(outcome, AdvanceOutcome::Advanced { .. }),
                "unexpected {outcome:?}"
            );
        }
    }

    /// Run a night where `wolf` kills `victim`, then advance into settlement.
    fn wolf_night(game: &mut Game, wolf: Seat, victim: Seat) {
        advance_to(game, PhaseId::Wolf);
        submit(game, wolf, ActionKind::Kill, Some(victim)).unwrap();
        advance_to(game, PhaseId::Settlement);
    }

    /// Walk an uneventful day back to the next night.
    fn quiet_day(game: &mut Game) {
        let next_round = game.current_round + 1;
        while game.current_round != next_round {
            let outcome = game.advance_phase().unwrap();
            assert!(matches!(outcome, AdvanceOutcome::Advanced { .. }));
        }
    }

    #[test]
    fn test_good_wins_on_settlement_after_last_wolf_dies() {
        let mut game = started_game(Scenario::classic_twelve());

        // Night 1: the pack takes seat 1, the witch poisons seat 2
        submit(&mut game, 8, ActionKind::Skip, None).unwrap();
        advance_to(&mut game, PhaseId::Wolf);
        submit(&mut game, 2, ActionKind::Kill, Some(1)).unwrap();
        advance_to(&mut game, PhaseId::Witch);
        submit(&mut game, 6, ActionKind::Poison, Some(2)).unwrap();
        advance_to(&mut game, PhaseId::Settlement);
        assert!(matches!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Advanced { phase: PhaseId::SheriffElection, .. }
        ));
        assert_eq!(game.alive_count(Camp::Wolf), 2);
        quiet_day(&mut game);
        assert_eq!(game.round_history().len(), 1);

        // Night 2: seat 3 falls
        wolf_night(&mut game, 3, 3);
        game.advance_phase().unwrap();
        quiet_day(&mut game);

        // Night 3: the last wolf falls and settlement ends the game
        wolf_night(&mut game, 4, 4);
        assert_eq!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Finished { winner: Camp::Good }
        );
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(Camp::Good));
        assert_eq!(game.current_phase, PhaseId::GameOver);
        assert_eq!(game.current_round, 3);
        assert_eq!(game.round_history().len(), 3);
        assert_eq!(game.advance_phase(), Err(EngineError::GameNotRunning));
    }

    #[test]
    fn test_unresolved_trigger_blocks_next_night() {
        let mut game = started_game(Scenario::classic_twelve());
        wolf_night(&mut game, 1, 7);

        let held = game.advance_phase().unwrap();
        assert!(matches!(held, AdvanceOutcome::Held { phase: PhaseId::Settlement, .. }));
        assert_eq!(
            game.advance_phase(),
            Err(EngineError::DeathTriggerPending { count: 1 })
        );
        assert!(!game.readiness().ready);

        let id = game.pending_death_triggers[0].id.clone();
        game.resolve_death_trigger(&id, None).unwrap();
        assert_eq!(game.round_draft.deaths.len(), 1);

        // Settlement is not applied twice on the retry
        assert!(matches!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Advanced { phase: PhaseId::SheriffElection, .. }
        ));
        quiet_day(&mut game);
        assert_eq!(game.current_phase, PhaseId::Guard);
        assert_eq!(game.alive_seats().len(), 11);
    }

    #[test]
    fn test_guard_ward_saves_wolf_victim() {
        let mut game = started_game(Scenario::classic_twelve());
        submit(&mut game, 8, ActionKind::Protect, Some(9)).unwrap();
        wolf_night(&mut game, 1, 9);
        game.advance_phase().unwrap();
        assert!(game.is_alive(9));
        assert!(game.round_draft.deaths.is_empty());
    }

    #[test]
    fn test_witch_potions_last_one_use_per_game() {
        let mut game = started_game(Scenario::classic_twelve());

        // Night 1: the antidote saves seat 9
        advance_to(&mut game, PhaseId::Wolf);
        submit(&mut game, 1, ActionKind::Kill, Some(9)).unwrap();
        advance_to(&mut game, PhaseId::Witch);
        submit(&mut game, 6, ActionKind::Antidote, Some(9)).unwrap();
        advance_to(&mut game, PhaseId::Settlement);
        game.advance_phase().unwrap();
        assert!(game.is_alive(9));
        assert_eq!(
            game.player(6).unwrap().abilities,
            Abilities::Witch {
                antidote: false,
                poison: true
            }
        );
        quiet_day(&mut game);

        // Night 2: the antidote is gone, the poison still works
        advance_to(&mut game, PhaseId::Wolf);
        submit(&mut game, 1, ActionKind::Kill, Some(10)).unwrap();
        advance_to(&mut game, PhaseId::Witch);
        assert_eq!(
            submit(&mut game, 6, ActionKind::Antidote, Some(10)),
            Err(EngineError::AbilityExhausted {
                ability: "antidote"
            })
        );
        submit(&mut game, 6, ActionKind::Poison, Some(2)).unwrap();
        advance_to(&mut game, PhaseId::Settlement);
        game.advance_phase().unwrap();
        assert!(!game.is_alive(10));
        assert_eq!(game.player(2).unwrap().out_reason, Some(OutReason::Poisoned));
        quiet_day(&mut game);

        // Night 3: both potions are spent
        advance_to(&mut game, PhaseId::Witch);
        assert_eq!(
            submit(&mut game, 6, ActionKind::Poison, Some(3)),
            Err(EngineError::AbilityExhausted { ability: "poison" })
        );
        assert_eq!(game.current_round, 3);
    }

    #[test]
    fn test_dead_seat_never_submits() {
        let mut game = started_game(Scenario::classic_twelve());
        game.apply_death(8, OutReason::WolfKill);
        assert_eq!(
            submit(&mut game, 8, ActionKind::Protect, Some(9)),
            Err(EngineError::PlayerDead { seat: 8 })
        );
        game.apply_death(10, OutReason::WolfKill);
        game.current_phase = PhaseId::ExileVote;
        game.start_exile_vote().unwrap();
        assert_eq!(
            submit(&mut game, 10, ActionKind::Vote, Some(1)),
            Err(EngineError::PlayerDead { seat: 10 })
        );
    }

    #[test]
    fn test_second_submission_in_phase_rejected() {
        let mut game = started_game(Scenario::classic_twelve());
        submit(&mut game, 8, ActionKind::Protect, Some(9)).unwrap();
        assert_eq!(
            submit(&mut game, 8, ActionKind::Protect, Some(10)),
            Err(EngineError::AlreadySubmitted {
                seat: 8,
                phase: PhaseId::Guard
            })
        );
    }

    #[test]
    fn test_overwritten_wolf_cannot_vote_again() {
        let mut game = started_game(Scenario::classic_twelve());
        advance_to(&mut game, PhaseId::Wolf);
        submit(&mut game, 1, ActionKind::Kill, Some(9)).unwrap();
        submit(&mut game, 2, ActionKind::Kill, Some(10)).unwrap();
        assert_eq!(game.night.wolf_kill_target(), Some(10));

        assert_eq!(
            submit(&mut game, 1, ActionKind::Kill, Some(11)),
            Err(EngineError::AlreadySubmitted {
                seat: 1,
                phase: PhaseId::Wolf
            })
        );
        assert_eq!(game.night.wolf_kill_target(), Some(10));
        // A wolf that has not voted yet may still take the slot
        submit(&mut game, 3, ActionKind::Kill, Some(11)).unwrap();
        assert_eq!(game.night.wolf_kill_target(), Some(11));
    }

    #[test]
    fn test_rejected_action_is_not_recorded() {
        let mut game = started_game(Scenario::classic_twelve());
        assert!(submit(&mut game, 8, ActionKind::Protect, Some(40)).is_err());
        assert!(game.night.submissions().is_empty());
        submit(&mut game, 8, ActionKind::Protect, Some(9)).unwrap();
    }

    #[test]
    fn test_action_for_other_phase_rejected() {
        let mut game = started_game(Scenario::classic_twelve());
        let action = PlayerAction::targeting(PhaseId::Wolf, 1, ActionKind::Kill, 9);
        assert_eq!(
            game.submit_action(action),
            Err(EngineError::WrongPhase {
                operation: "submit an action",
                phase: PhaseId::Guard
            })
        );
    }

    #[test]
    fn test_auto_advance_after_last_actor() {
        let mut game = started_game(Scenario::classic_twelve());
        let idle = game.check_and_auto_advance().unwrap();
        assert!(!idle.advanced);
        assert_eq!(game.readiness().waiting_on, vec![8]);

        submit(&mut game, 8, ActionKind::Protect, Some(9)).unwrap();
        let result = game.check_and_auto_advance().unwrap();
        assert!(result.advanced);
        assert_eq!(result.next_phase, Some(PhaseId::Wolf));

        // Any pack member closes the wolf phase
        submit(&mut game, 3, ActionKind::Kill, Some(10)).unwrap();
        assert!(game.readiness().ready);

        game.config.auto_advance = false;
        let disabled = game.check_and_auto_advance().unwrap();
        assert!(!disabled.advanced);
        assert_eq!(game.current_phase, PhaseId::Wolf);
    }

    #[test]
    fn test_feared_seat_is_not_waited_on() {
        let mut game = started_game(Scenario::nightmare_twelve());
        submit(&mut game, 1, ActionKind::Fear, Some(8)).unwrap();
        advance_to(&mut game, PhaseId::Gravekeeper);
        assert!(game.readiness().ready);
        assert!(matches!(
            submit(&mut game, 8, ActionKind::Autopsy, None),
            Err(EngineError::Incapacitated { status: "feared", .. })
        ));
    }

    #[test]
    fn test_dreamer_death_takes_dreamt_seat() {
        let mut game = started_game(Scenario::nightmare_twelve());
        advance_to(&mut game, PhaseId::Dream);
        submit(&mut game, 7, ActionKind::Dream, Some(10)).unwrap();
        wolf_night(&mut game, 4, 7);
        game.advance_phase().unwrap();
        assert_eq!(game.player(7).unwrap().out_reason, Some(OutReason::WolfKill));
        assert_eq!(game.player(10).unwrap().out_reason, Some(OutReason::DreamLink));
    }

    #[test]
    fn test_exile_tie_holds_until_pk() {
        let mut game = started_game(Scenario::classic_twelve());
        advance_to(&mut game, PhaseId::Settlement);
        advance_to(&mut game, PhaseId::ExileVote);
        game.start_exile_vote().unwrap();
        for (voter, target) in [(1, 5), (3, 5), (2, 9), (6, 9)] {
            submit(&mut game, voter, ActionKind::Vote, Some(target)).unwrap();
        }
        assert!(matches!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Held { phase: PhaseId::ExileVote, .. }
        ));
        assert!(matches!(
            game.advance_phase(),
            Err(EngineError::VoteUnresolved(_))
        ));

        game.start_exile_pk_vote().unwrap();
        submit(&mut game, 1, ActionKind::Vote, Some(9)).unwrap();
        assert!(matches!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Advanced { phase: PhaseId::DayEnd, .. }
        ));
        assert!(!game.is_alive(9));
        assert_eq!(game.day_vote, DayVote::Inactive);
        assert!(game.round_draft.exile_vote.is_some());
    }

    #[test]
    fn test_sheriff_death_blocks_until_badge_decided() {
        let mut game = started_game(Scenario::classic_twelve());
        advance_to(&mut game, PhaseId::SheriffElection);
        game.start_sheriff_election().unwrap();
        submit(&mut game, 9, ActionKind::RunForSheriff, None).unwrap();
        game.start_sheriff_campaign().unwrap();
        game.start_sheriff_voting().unwrap();
        assert_eq!(game.sheriff, Some(9));
        advance_to(&mut game, PhaseId::ExileVote);

        game.start_exile_vote().unwrap();
        submit(&mut game, 1, ActionKind::Vote, Some(9)).unwrap();
        assert!(matches!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Held { .. }
        ));
        assert_eq!(game.advance_phase(), Err(EngineError::SheriffTransferPending));
        game.transfer_sheriff_badge(10).unwrap();
        assert!(matches!(
            game.advance_phase().unwrap(),
            AdvanceOutcome::Advanced { phase: PhaseId::DayEnd, .. }
        ));
        assert_eq!(game.last_exile, Some((1, 9)));
    }
}
