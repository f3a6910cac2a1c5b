//! Game aggregate.
//!
//! Holds the seated players, the phase cursor, the night accumulator, the
//! active day vote, outstanding death consequences and both audit logs.
//! Setup happens here; the running game is driven by the flow engine in
//! `flow`, the day entry points in `day` and the resolutions in `trigger`.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use super::effect::NightActions;
use super::error::EngineError;
use super::history::{DeathRecord, HistoryEntry, RoundDraft, RoundHistoryEntry, Visibility};
use super::phase::{PhaseId, PhaseType, Scenario};
use super::player::{Abilities, Camp, GamePlayer, OutReason, Seat};
use super::role::RoleId;
use super::trigger::{PendingDeathTrigger, PendingSheriffTransfer};
use super::vote::DayVote;
use crate::config::EngineConfig;

/// Game lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Seating and role assignment
    #[default]
    Waiting,
    Running,
    /// A camp has won
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }

    /// Check if game is active (can receive actions).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if game is terminal (cannot change).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Game session state.
#[derive(Debug, Clone)]
pub struct Game {
    /// Unique game ID
    pub id: String,

    /// Room the game was created for
    pub room_code: String,

    pub scenario: Scenario,

    pub config: EngineConfig,

    /// Players in seat order
    players: Vec<GamePlayer>,

    pub status: GameStatus,

    /// 0 before start
    pub current_round: u32,

    pub current_phase: PhaseId,

    /// Accumulator for the current night
    pub night: NightActions,

    pub sheriff: Option<Seat>,

    pub day_vote: DayVote,

    pub pending_death_triggers: Vec<PendingDeathTrigger>,

    pub pending_sheriff_transfer: Option<PendingSheriffTransfer>,

    /// (round, seat) of the most recent exile
    pub last_exile: Option<(u32, Seat)>,

    /// Current round, frozen into `round_history` when it closes
    pub round_draft: RoundDraft,

    round_history: Vec<RoundHistoryEntry>,

    history: Vec<HistoryEntry>,

    pub winner: Option<Camp>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub started_at: Option<chrono::DateTime<chrono::Utc>>,

    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Game {
    /// Create a new game waiting for its seats.
    pub fn new(id: String, room_code: String, scenario: Scenario, config: EngineConfig) -> Self {
        Self {
            id,
            room_code,
            scenario,
            config,
            players: Vec::new(),
            status: GameStatus::Waiting,
            current_round: 0,
            current_phase: PhaseId::Lobby,
            night: NightActions::default(),
            sheriff: None,
            day_vote: DayVote::Inactive,
            pending_death_triggers: Vec::new(),
            pending_sheriff_transfer: None,
            last_exile: None,
            round_draft: RoundDraft::default(),
            round_history: Vec::new(),
            history: Vec::new(),
            winner: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Seat a player. Seats run 1..=N for the scenario's roster.
    pub fn add_player(&mut self, seat: Seat, name: impl Into<String>) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::GameStarted);
        }
        if seat == 0 || usize::from(seat) > self.scenario.player_count() {
            return Err(EngineError::RosterMismatch(format!(
                "seat {seat} is outside 1..={}",
                self.scenario.player_count()
            )));
        }
        if self.player(seat).is_some() {
            return Err(EngineError::SeatTaken(seat));
        }

        let idx = self.players.partition_point(|p| p.seat < seat);
        self.players.insert(idx, GamePlayer::new(seat, name));
        Ok(())
    }

    pub fn assign_role(&mut self, seat: Seat, role: RoleId) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::GameStarted);
        }
        self.player_mut(seat)
            .ok_or(EngineError::PlayerNotFound(seat))?
            .assign_role(role);
        Ok(())
    }

    /// Shuffle the scenario roster onto the seats.
    pub fn deal_roles<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::GameStarted);
        }
        if self.players.len() != self.scenario.player_count() {
            return Err(EngineError::RosterMismatch(format!(
                "{} seats for a {}-player roster",
                self.players.len(),
                self.scenario.player_count()
            )));
        }
        let mut roster = self.scenario.roster.clone();
        roster.shuffle(rng);
        for (player, role) in self.players.iter_mut().zip(roster) {
            player.assign_role(role);
        }
        Ok(())
    }

    /// Start the game: every seat filled and the assigned roles match the roster.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::GameStarted);
        }
        if self.players.len() != self.scenario.player_count() {
            return Err(EngineError::RosterMismatch(format!(
                "{} of {} seats filled",
                self.players.len(),
                self.scenario.player_count()
            )));
        }
        if let Some(p) = self.players.iter().find(|p| p.role.is_none()) {
            return Err(EngineError::RoleNotAssigned { seat: p.seat });
        }
        for role in RoleId::ALL {
            let wanted = self.scenario.roster.iter().filter(|r| **r == role).count();
            let dealt = self.players.iter().filter(|p| p.role == Some(role)).count();
            if wanted != dealt {
                return Err(EngineError::RosterMismatch(format!(
                    "{dealt} {role} dealt, roster has {wanted}"
                )));
            }
        }

        self.status = GameStatus::Running;
        self.started_at = Some(chrono::Utc::now());
        self.current_round = 1;
        self.current_phase = self.scenario.first_phase();
        self.night = NightActions::new(1);

        info!(
            game_id = %self.id,
            scenario = %self.scenario.name,
            players = self.players.len(),
            phase = %self.current_phase,
            "Game started"
        );
        self.log(
            None,
            "start",
            None,
            format!("Game started with {} players", self.players.len()),
            Visibility::Public,
        );
        Ok(())
    }

    pub fn current_phase_type(&self) -> PhaseType {
        self.current_phase.phase_type()
    }

    /// Get a player.
    pub fn player(&self, seat: Seat) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.seat == seat)
    }

    /// Get a mutable player.
    pub fn player_mut(&mut self, seat: Seat) -> Option<&mut GamePlayer> {
        self.players.iter_mut().find(|p| p.seat == seat)
    }

    /// All players in seat order.
    pub fn players(&self) -> impl Iterator<Item = &GamePlayer> {
        self.players.iter()
    }

    pub fn alive_seats(&self) -> Vec<Seat> {
        self.players
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.seat)
            .collect()
    }

    pub fn alive_count(&self, camp: Camp) -> usize {
        self.players
            .iter()
            .filter(|p| p.alive && p.camp == Some(camp))
            .count()
    }

    pub fn is_alive(&self, seat: Seat) -> bool {
        self.player(seat).is_some_and(|p| p.alive)
    }

    /// Living player lookup for day operations.
    pub(crate) fn living(&self, seat: Seat) -> Result<&GamePlayer, EngineError> {
        let player = self.player(seat).ok_or(EngineError::PlayerNotFound(seat))?;
        if !player.alive {
            return Err(EngineError::PlayerDead { seat });
        }
        Ok(player)
    }

    pub fn round_history(&self) -> &[RoundHistoryEntry] {
        &self.round_history
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Append to the flat log.
    pub(crate) fn log(
        &mut self,
        actor: Option<Seat>,
        action: &str,
        target: Option<Seat>,
        result: impl Into<String>,
        visibility: Visibility,
    ) {
        self.history.push(HistoryEntry {
            at: chrono::Utc::now(),
            round: self.current_round,
            phase: self.current_phase,
            actor,
            action: action.to_string(),
            target,
            result: result.into(),
            visibility,
        });
    }

    /// Kill a seat and everything chained to it.
    ///
    /// A dreamer dying at night takes the seat they dreamt of tonight, a
    /// wolf beauty takes the seat she charmed, a hunter leaves a shoot
    /// trigger unless poisoned, and a dying sheriff leaves the badge pending.
    /// Seats already dead are skipped.
    pub(crate) fn apply_death(&mut self, seat: Seat, reason: OutReason) -> Vec<DeathRecord> {
        let mut queue = VecDeque::from([(seat, reason)]);
        let mut records = Vec::new();

        while let Some((seat, reason)) = queue.pop_front() {
            let Some(player) = self.player_mut(seat) else {
                continue;
            };
            if !player.die(reason) {
                continue;
            }
            let role = player.role;
            let was_sheriff = player.is_sheriff;
            let charmed = match player.abilities {
                Abilities::WolfBeauty { charmed } => charmed,
                _ => None,
            };

            let record = DeathRecord {
                round: self.current_round,
                phase: self.current_phase,
                seat,
                reason,
            };
            info!(
                game_id = %self.id,
                round = self.current_round,
                seat,
                reason = %reason,
                "Player died"
            );
            self.round_draft.deaths.push(record);
            records.push(record);
            self.log(
                None,
                "death",
                Some(seat),
                format!("Player {seat} died ({reason})"),
                Visibility::Public,
            );

            match role {
                Some(RoleId::Hunter)
                    if reason != OutReason::Poisoned || self.config.hunter_shoots_when_poisoned =>
                {
                    self.pending_death_triggers
                        .push(PendingDeathTrigger::shoot(seat, self.current_round));
                }
                Some(RoleId::Dreamer) if reason.is_night() => {
                    if let Some((dreamer, dreamt)) = self.night.dream() {
                        if dreamer == seat {
                            queue.push_back((dreamt, OutReason::DreamLink));
                        }
                    }
                }
                Some(RoleId::WolfBeauty) => {
                    if let Some(target) = charmed {
                        queue.push_back((target, OutReason::Charmed));
                    }
                }
                _ => {}
            }

            if was_sheriff && self.pending_sheriff_transfer.is_none() {
                self.pending_sheriff_transfer = Some(PendingSheriffTransfer {
                    from: seat,
                    reason,
                    options: Vec::new(),
                });
            }
        }

        let alive = self.alive_seats();
        if let Some(transfer) = self.pending_sheriff_transfer.as_mut() {
            transfer.options = alive;
        }
        records
    }

    /// Evaluate the win condition and finish the game if a camp has won.
    pub(crate) fn check_win(&mut self) -> Option<Camp> {
        if self.status != GameStatus::Running {
            return self.winner;
        }
        let wolves = self.alive_count(Camp::Wolf);
        let goods = self.alive_count(Camp::Good);
        let winner = if wolves == 0 {
            Camp::Good
        } else if goods == 0 || wolves >= goods {
            Camp::Wolf
        } else {
            return None;
        };
        self.finish(winner);
        Some(winner)
    }

    fn finish(&mut self, winner: Camp) {
        self.winner = Some(winner);
        self.round_draft.note(format!("The {winner} camp wins."));
        self.close_round();
        self.status = GameStatus::Finished;
        self.current_phase = PhaseId::GameOver;
        self.ended_at = Some(chrono::Utc::now());

        info!(game_id = %self.id, round = self.current_round, winner = %winner, "Game finished");
        self.log(
            None,
            "game_over",
            None,
            format!("The {winner} camp wins"),
            Visibility::Public,
        );
    }

    /// Move a settled day vote into the round draft.
    pub(crate) fn fold_day_vote(&mut self) {
        match std::mem::take(&mut self.day_vote) {
            DayVote::Inactive => {}
            DayVote::SheriffElection(election) => {
                self.round_draft.sheriff_election = Some(election)
            }
            DayVote::ExileVote(vote) => self.round_draft.exile_vote = Some(vote),
        }
    }

    /// Freeze the current round into the round history. Runs once per round.
    pub(crate) fn close_round(&mut self) {
        if self
            .round_history
            .last()
            .is_some_and(|r| r.round == self.current_round)
        {
            return;
        }
        self.fold_day_vote();
        let draft = std::mem::take(&mut self.round_draft);
        let entry = draft.close(self.current_round, self.night.submissions().to_vec());
        info!(
            game_id = %self.id,
            round = self.current_round,
            deaths = entry.deaths.len(),
            "Round closed"
        );
        self.round_history.push(entry);
        self.pending_death_triggers.retain(|t| !t.resolved);
    }

    /// Convert full game state to JSON snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self.players.iter().map(|p| p.to_json()).collect();
        let triggers: Vec<serde_json::Value> = self
            .pending_death_triggers
            .iter()
            .map(|t| t.to_json())
            .collect();
        let rounds: Vec<serde_json::Value> =
            self.round_history.iter().map(|r| r.to_json()).collect();

        serde_json::json!({
            "game_id": self.id,
            "room_code": self.room_code,
            "scenario": self.scenario.name,
            "status": self.status.as_str(),
            "round": self.current_round,
            "phase": self.current_phase.as_str(),
            "phase_type": self.current_phase_type(),
            "players": players,
            "sheriff": self.sheriff.unwrap_or(0),
            "day_vote": self.day_vote.to_json(),
            "pending_death_triggers": triggers,
            "pending_sheriff_transfer": self.pending_sheriff_transfer.as_ref().map(|t| t.to_json()),
            "round_history": rounds,
            "history_len": self.history.len(),
            "winner": self.winner.map(|w| w.as_str())
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A running game with the roster dealt to seats in order.
    pub(crate) fn started_game(scenario: Scenario) -> Game {
        let roster = scenario.roster.clone();
        let mut game = Game::new(
            "game-1".to_string(),
            "ROOM1".to_string(),
            scenario,
            EngineConfig::default(),
        );
        for (idx, role) in roster.into_iter().enumerate() {
            let seat = (idx + 1) as Seat;
            game.add_player(seat, format!("Player {seat}")).unwrap();
            game.assign_role(seat, role).unwrap();
        }
        game.start().unwrap();
        game
    }
}

#[cfg(test)]
mod tests {
    use super::testing::started_game;
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seated(scenario: Scenario) -> Game {
        let count = scenario.player_count();
        let mut game = Game::new("g".into(), "R".into(), scenario, EngineConfig::default());
        for seat in 1..=count as Seat {
            game.add_player(seat, format!("P{seat}")).unwrap();
        }
        game
    }

    #[test]
    fn test_seating_rules() {
        let mut game = Game::new(
            "g".into(),
            "R".into(),
            Scenario::classic_twelve(),
            EngineConfig::default(),
        );
        game.add_player(3, "Carol").unwrap();
        game.add_player(1, "Alice").unwrap();
        assert_eq!(game.add_player(3, "Dup"), Err(EngineError::SeatTaken(3)));
        assert!(matches!(
            game.add_player(13, "Extra"),
            Err(EngineError::RosterMismatch(_))
        ));
        let seats: Vec<Seat> = game.players().map(|p| p.seat).collect();
        assert_eq!(seats, vec![1, 3]);
    }

    #[test]
    fn test_start_requires_full_roster() {
        let mut game = seated(Scenario::classic_twelve());
        assert_eq!(game.start(), Err(EngineError::RoleNotAssigned { seat: 1 }));

        for seat in 1..=12 {
            game.assign_role(seat, RoleId::Villager).unwrap();
        }
        assert!(matches!(game.start(), Err(EngineError::RosterMismatch(_))));
    }

    #[test]
    fn test_seeded_deal_is_deterministic() {
        let mut a = seated(Scenario::classic_twelve());
        let mut b = seated(Scenario::classic_twelve());
        a.deal_roles(&mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        b.deal_roles(&mut ChaCha8Rng::seed_from_u64(7)).unwrap();

        let roles_a: Vec<Option<RoleId>> = a.players().map(|p| p.role).collect();
        let roles_b: Vec<Option<RoleId>> = b.players().map(|p| p.role).collect();
        assert_eq!(roles_a, roles_b);
        a.start().unwrap();
        assert_eq!(a.status, GameStatus::Running);
        assert_eq!(a.current_phase, PhaseId::Guard);
        assert_eq!(a.alive_count(Camp::Wolf), 4);
        assert_eq!(a.add_player(1, "Late"), Err(EngineError::GameStarted));
    }

    #[test]
    fn test_wolf_beauty_takes_charmed_seat() {
        let mut game = started_game(Scenario::nightmare_twelve());
        game.player_mut(2).unwrap().abilities = Abilities::WolfBeauty { charmed: Some(9) };
        let deaths = game.apply_death(2, OutReason::Exiled);
        assert_eq!(deaths.len(), 2);
        assert_eq!(game.player(9).unwrap().out_reason, Some(OutReason::Charmed));
    }

    #[test]
    fn test_win_when_wolves_reach_parity() {
        let mut game = started_game(Scenario::classic_twelve());
        for seat in 5..=8 {
            game.apply_death(seat, OutReason::WolfKill);
        }
        assert_eq!(game.check_win(), Some(Camp::Wolf));
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.current_phase, PhaseId::GameOver);
        assert_eq!(game.round_history().len(), 1);
    }

    #[test]
    fn test_no_winner_mid_game() {
        let mut game = started_game(Scenario::classic_twelve());
        game.apply_death(1, OutReason::Poisoned);
        assert_eq!(game.check_win(), None);
        assert!(game.status.is_active());
    }

    #[test]
    fn test_snapshot_reports_no_sheriff_as_zero() {
        let game = started_game(Scenario::classic_twelve());
        let json = game.to_json();
        assert_eq!(json["sheriff"], 0);
        assert_eq!(json["status"], "running");
        assert_eq!(json["players"].as_array().map(|p| p.len()), Some(12));
        assert_eq!(game.history().len(), 1);
    }
}
