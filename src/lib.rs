//! Werewolf State Library
//!
//! This crate provides the game-flow engine for server-authoritative
//! Werewolf sessions.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Phase State Machine** - Night phases for the roles in the roster, in a
//!   fixed order, then settlement and the day phases, round after round.
//!
//! - **Role Handlers** - A closed set of roles, each validating its own night
//!   action and producing a skill effect.
//!
//! - **Skill Effect Pipeline** - Night effects applied in priority order so
//!   protection and cures land before kills and poison.
//!
//! - **Voting** - Sheriff election with a 1.5-weight sheriff ballot, and the
//!   exile vote with a single PK round on ties.
//!
//! - **Death Triggers** - Retaliation and badge transfers that hold the flow
//!   until someone decides.
//!
//! # Design Principles
//!
//! 1. **State machines validate transitions** - Illegal actions and votes are
//!    rejected with a specific error and leave the game untouched.
//!
//! 2. **One writer per game** - Every mutation runs under the game's lock, and
//!    phase advances additionally take a non-blocking advance lock.
//!
//! 3. **No networking** - This crate is pure state, no transport or storage.
//!
//! 4. **Serialization-ready** - Games, votes and logs convert to JSON for clients.
//!
//! # Example
//!
//! ```rust
//! use werewolf_state::{EngineConfig, Game, PhaseId, Scenario};
//!
//! let scenario = Scenario::classic_twelve();
//! let roster = scenario.roster.clone();
//! let mut game = Game::new("game-1".into(), "ROOM".into(), scenario, EngineConfig::default());
//! for (idx, role) in roster.into_iter().enumerate() {
//!     let seat = (idx + 1) as u8;
//!     game.add_player(seat, format!("Player {seat}")).unwrap();
//!     game.assign_role(seat, role).unwrap();
//! }
//! game.start().unwrap();
//! assert_eq!(game.current_phase, PhaseId::Guard);
//! ```

pub mod config;
pub mod state;

pub use config::{ConfigError, EngineConfig};
// Re-export everything from state module at crate root
pub use state::*;
