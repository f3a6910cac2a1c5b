//! Game manager - owns every game and serialises access to each one.
//!
//! Each game lives in a slot with two locks. The game lock is taken by
//! every read and mutation, so an advance never sees a half-written action.
//! The advance lock is only ever `try_lock`ed: a second advance on the same
//! game while one is running is rejected, not queued.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{info, warn};

use super::action::{ActionOutcome, PlayerAction};
use super::error::EngineError;
use super::flow::{AdvanceOutcome, AutoAdvance};
use super::game::Game;
use super::phase::Scenario;
use super::player::Seat;
use super::role::RoleId;
use super::vote::{ExileResult, ExileTally, SheriffTally};
use crate::config::EngineConfig;

/// Receives the game after every successful mutation, under the game lock,
/// so writes for one game never overlap.
pub trait SnapshotSink: Send + Sync {
    fn persist(&self, game: &Game);
}

struct GameSlot {
    game: Mutex<Game>,
    advancing: Mutex<()>,
}

/// Registry of all games.
pub struct GameManager {
    games: DashMap<String, Arc<GameSlot>>,
    /// Room code to game ID
    rooms: DashMap<String, String>,
    config: EngineConfig,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl GameManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            games: DashMap::new(),
            rooms: DashMap::new(),
            config,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Create a waiting game for a room and return its ID.
    pub fn create_game(&self, room_code: impl Into<String>, scenario: Scenario) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let game = Game::new(id.clone(), room_code.into(), scenario, self.config);
        info!(
            game_id = %id,
            room_code = %game.room_code,
            scenario = %game.scenario.name,
            "Game created"
        );
        self.insert(game);
        id
    }

    /// Register an existing game, replacing any game with the same ID.
    pub fn insert(&self, game: Game) {
        let id = game.id.clone();
        self.rooms.insert(game.room_code.clone(), id.clone());
        if let Some(sink) = &self.sink {
            sink.persist(&game);
        }
        self.games.insert(
            id,
            Arc::new(GameSlot {
                game: Mutex::new(game),
                advancing: Mutex::new(()),
            }),
        );
    }

    fn slot(&self, game_id: &str) -> Result<Arc<GameSlot>, EngineError> {
        self.games
            .get(game_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| EngineError::GameNotFound(game_id.to_string()))
    }

    pub fn game_id_for_room(&self, room_code: &str) -> Option<String> {
        self.rooms.get(room_code).map(|r| r.value().clone())
    }

    /// Read a game under its lock.
    pub fn read<T>(&self, game_id: &str, f: impl FnOnce(&Game) -> T) -> Result<T, EngineError> {
        let slot = self.slot(game_id)?;
        let game = slot.game.lock();
        Ok(f(&*game))
    }

    pub fn snapshot(&self, game_id: &str) -> Result<serde_json::Value, EngineError> {
        self.read(game_id, Game::to_json)
    }

    fn persist(&self, game: &Game) {
        if let Some(sink) = &self.sink {
            sink.persist(game);
        }
    }

    /// Mutate a game under its lock; the snapshot sink sees every success.
    fn mutate<T>(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut Game) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let slot = self.slot(game_id)?;
        let mut game = slot.game.lock();
        let result = f(&mut *game)?;
        self.persist(&game);
        Ok(result)
    }

    /// Mutate while holding the advance lock.
    fn advancing<T>(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut Game) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let slot = self.slot(game_id)?;
        let Some(_advance) = slot.advancing.try_lock() else {
            warn!(game_id = %game_id, "Phase advance already in progress");
            return Err(EngineError::AdvanceInProgress);
        };
        let mut game = slot.game.lock();
        let result = f(&mut *game)?;
        self.persist(&game);
        Ok(result)
    }

    // Setup

    pub fn add_player(
        &self,
        game_id: &str,
        seat: Seat,
        name: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.mutate(game_id, |g| g.add_player(seat, name))
    }

    pub fn assign_role(&self, game_id: &str, seat: Seat, role: RoleId) -> Result<(), EngineError> {
        self.mutate(game_id, |g| g.assign_role(seat, role))
    }

    pub fn deal_roles<R: Rng + ?Sized>(
        &self,
        game_id: &str,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        self.mutate(game_id, |g| g.deal_roles(rng))
    }

    pub fn start(&self, game_id: &str) -> Result<(), EngineError> {
        self.mutate(game_id, Game::start)
    }

    // Flow

    pub fn submit_action(
        &self,
        game_id: &str,
        action: PlayerAction,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.submit_action(action))
    }

    pub fn advance_phase(&self, game_id: &str) -> Result<AdvanceOutcome, EngineError> {
        self.advancing(game_id, Game::advance_phase)
    }

    pub fn check_and_auto_advance(&self, game_id: &str) -> Result<AutoAdvance, EngineError> {
        self.advancing(game_id, Game::check_and_auto_advance)
    }

    pub fn resolve_death_trigger(
        &self,
        game_id: &str,
        trigger_id: &str,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.resolve_death_trigger(trigger_id, target))
    }

    // Sheriff

    pub fn start_sheriff_election(&self, game_id: &str) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, Game::start_sheriff_election)
    }

    pub fn sheriff_signup(
        &self,
        game_id: &str,
        seat: Seat,
        run: bool,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.sheriff_signup(seat, run))
    }

    pub fn start_sheriff_campaign(&self, game_id: &str) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, Game::start_sheriff_campaign)
    }

    pub fn sheriff_withdraw(
        &self,
        game_id: &str,
        seat: Seat,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.sheriff_withdraw(seat))
    }

    pub fn start_sheriff_voting(&self, game_id: &str) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, Game::start_sheriff_voting)
    }

    pub fn vote_for_sheriff(
        &self,
        game_id: &str,
        voter: Seat,
        candidate: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.vote_for_sheriff(voter, candidate))
    }

    pub fn tally_sheriff_votes(&self, game_id: &str) -> Result<SheriffTally, EngineError> {
        self.mutate(game_id, Game::tally_sheriff_votes)
    }

    pub fn god_assign_sheriff(
        &self,
        game_id: &str,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.god_assign_sheriff(target))
    }

    pub fn transfer_sheriff_badge(
        &self,
        game_id: &str,
        target: Seat,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.transfer_sheriff_badge(target))
    }

    pub fn destroy_sheriff_badge(&self, game_id: &str) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, Game::destroy_sheriff_badge)
    }

    // Exile

    pub fn start_exile_vote(&self, game_id: &str) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, Game::start_exile_vote)
    }

    pub fn vote_for_exile(
        &self,
        game_id: &str,
        voter: Seat,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.vote_for_exile(voter, target))
    }

    pub fn tally_exile_votes(&self, game_id: &str) -> Result<ExileTally, EngineError> {
        self.mutate(game_id, Game::tally_exile_votes)
    }

    pub fn start_exile_pk_vote(&self, game_id: &str) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, Game::start_exile_pk_vote)
    }

    pub fn vote_for_exile_pk(
        &self,
        game_id: &str,
        voter: Seat,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.vote_for_exile_pk(voter, target))
    }

    pub fn tally_exile_pk_votes(&self, game_id: &str) -> Result<ExileResult, EngineError> {
        self.mutate(game_id, Game::tally_exile_pk_votes)
    }

    pub fn execute_exile(&self, game_id: &str, seat: Seat) -> Result<ActionOutcome, EngineError> {
        self.mutate(game_id, |g| g.execute_exile(seat))
    }

    // Housekeeping

    /// Remove a game.
    pub fn remove(&self, game_id: &str) -> Option<Game> {
        let (_, slot) = self.games.remove(game_id)?;
        let game = slot.game.lock().clone();
        self.rooms.remove_if(&game.room_code, |_, id| id == game_id);
        Some(game)
    }

    /// Clean up finished games.
    pub fn cleanup_finished(&self) -> Vec<String> {
        let finished: Vec<String> = self
            .games
            .iter()
            .filter(|entry| entry.value().game.lock().status.is_terminal())
            .map(|entry| entry.key().clone())
            .collect();

        for id in &finished {
            self.remove(id);
        }
        if !finished.is_empty() {
            info!(count = finished.len(), "Removed finished games");
        }
        finished
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Games currently running.
    pub fn active_count(&self) -> usize {
        self.games
            .iter()
            .filter(|entry| entry.value().game.lock().status.is_active())
            .count()
    }
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
