//! State management module for Werewolf sessions.
//!
//! This module provides the game-flow engine and its supporting types:
//!
//! - `player` - Seats, camps, out reasons and per-role ability state
//! - `role` - Role registry and night-action handlers
//! - `phase` - Phase identifiers and the scenario that orders them
//! - `action` - Player action requests and results
//! - `effect` - Skill effects and the night settlement resolver
//! - `vote` - Sheriff election and exile vote state machines
//! - `history` - Flat event log and round snapshots
//! - `game` - The game aggregate: setup, deaths, win condition
//! - `flow` - Phase advance, readiness and auto-advance
//! - `day` - Sheriff and exile entry points
//! - `trigger` - Death triggers and the sheriff badge transfer
//! - `manager` - Per-game locking and lookup by game id
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            GameManager                                  │
//! │                                                                         │
//! │  game_id → GameSlot { Mutex<Game>, advance Mutex<()> }                  │
//! │  room_code → game_id                                                    │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │                              Game                                 │  │
//! │  │                                                                   │  │
//! │  │  submit_action ──▶ night: role handler ──▶ NightActions           │  │
//! │  │                └─▶ day:   DayVote (SheriffElection | ExileVote)   │  │
//! │  │                                                                   │  │
//! │  │  advance_phase ──▶ Settlement: resolve_effects ──▶ deaths         │  │
//! │  │                        │                            │             │  │
//! │  │                        ▼                            ▼             │  │
//! │  │                   win check          death triggers / badge       │  │
//! │  │                                                                   │  │
//! │  │  history (flat log)          round_history (one entry per round)  │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use werewolf_state::state::{
//!     ActionKind, AdvanceOutcome, GameManager, PhaseId, PlayerAction, RoleId, Scenario,
//! };
//!
//! let manager = GameManager::default();
//! let scenario = Scenario::classic_twelve();
//! let roster = scenario.roster.clone();
//! let id = manager.create_game("ROOM-1", scenario);
//! for (idx, role) in roster.into_iter().enumerate() {
//!     let seat = (idx + 1) as u8;
//!     manager.add_player(&id, seat, format!("Player {seat}")).unwrap();
//!     manager.assign_role(&id, seat, role).unwrap();
//! }
//! manager.start(&id).unwrap();
//!
//! // Seat 8 is the guard in the classic roster
//! let protect = PlayerAction::targeting(PhaseId::Guard, 8, ActionKind::Protect, 9);
//! manager.submit_action(&id, protect).unwrap();
//!
//! let outcome = manager.advance_phase(&id).unwrap();
//! assert!(matches!(outcome, AdvanceOutcome::Advanced { phase: PhaseId::Wolf, .. }));
//! # let _ = RoleId::Guard;
//! ```

pub mod action;
pub mod day;
pub mod effect;
pub mod error;
pub mod flow;
pub mod game;
pub mod history;
pub mod manager;
pub mod phase;
pub mod player;
pub mod role;
pub mod trigger;
pub mod vote;

// Re-export commonly used types
pub use action::{ActionKind, ActionOutcome, PlayerAction};
pub use effect::{
    resolve_effects, EffectPayload, EffectTiming, EffectType, NightActions, NightSubmission,
    Resolution, SkillEffect, Ward,
};
pub use error::EngineError;
pub use flow::{AdvanceOutcome, AutoAdvance, Readiness};
pub use game::{Game, GameStatus};
pub use history::{
    BadgeTransfer, DeathRecord, HistoryEntry, RoundDraft, RoundHistoryEntry, Visibility,
};
pub use manager::{GameManager, SnapshotSink};
pub use phase::{PhaseId, PhaseType, Scenario, NIGHT_ORDER};
pub use player::{Abilities, Camp, GamePlayer, OutReason, Seat};
pub use role::{
    handle_night_action, valid_targets, valid_targets_for, HandlerOutcome, RoleId, RoleSpec,
};
pub use trigger::{DeathTriggerKind, PendingDeathTrigger, PendingSheriffTransfer};
pub use vote::{
    Ballot, DayVote, ExileResult, ExileStage, ExileTally, ExileVote, SheriffElection, SheriffStage,
    SheriffTally, Tally, VoteLedger, SHERIFF_VOTE_WEIGHT, VOTE_WEIGHT,
};
