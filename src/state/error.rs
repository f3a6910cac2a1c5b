//! Engine error taxonomy.
//!
//! Every rejection is recoverable: the caller may resubmit with different
//! input or wait. None of these leave the game in a half-applied state.

use super::phase::PhaseId;
use super::player::Seat;

/// Errors returned by every engine entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    // Illegal actor
    #[error("Player {seat} is dead")]
    PlayerDead { seat: Seat },

    #[error("Player {seat} cannot act during the {phase} phase")]
    NotYourPhase { seat: Seat, phase: PhaseId },

    #[error("Player {seat} is {status} and cannot act tonight")]
    Incapacitated { seat: Seat, status: &'static str },

    #[error("Player {seat} has no role assigned")]
    RoleNotAssigned { seat: Seat },

    #[error("Player {seat} already acted during the {phase} phase")]
    AlreadySubmitted { seat: Seat, phase: PhaseId },

    #[error("Player {seat} may not {operation}: {reason}")]
    NotEligible {
        seat: Seat,
        operation: &'static str,
        reason: &'static str,
    },

    // Illegal target
    #[error("Seat {target} is not a valid target")]
    InvalidTarget { target: Seat },

    #[error("This action requires a target")]
    TargetRequired,

    #[error("This action does not take a target")]
    UnexpectedTarget,

    // Resource exhausted / role constraints
    #[error("The {ability} has already been used")]
    AbilityExhausted { ability: &'static str },

    #[error("Cannot {action} seat {target} two nights in a row")]
    RepeatedTarget { action: &'static str, target: Seat },

    #[error("{0}")]
    RoleConstraint(String),

    // Wrong phase for operation
    #[error("Cannot {operation} during the {phase} phase")]
    WrongPhase {
        operation: &'static str,
        phase: PhaseId,
    },

    #[error("Cannot {operation} while the {vote} is in the {stage} stage")]
    VoteStage {
        operation: &'static str,
        vote: &'static str,
        stage: &'static str,
    },

    #[error("No {0} is in progress")]
    NoActiveVote(&'static str),

    #[error("{0}")]
    VoteUnresolved(&'static str),

    // Flow blockers
    #[error("{count} death trigger(s) must be resolved first")]
    DeathTriggerPending { count: usize },

    #[error("The sheriff badge must be transferred or destroyed first")]
    SheriffTransferPending,

    #[error("No sheriff badge transfer is pending")]
    NoSheriffTransfer,

    // Concurrency conflict
    #[error("Phase advance already in progress")]
    AdvanceInProgress,

    // Not found
    #[error("Game {0} not found")]
    GameNotFound(String),

    #[error("Seat {0} not found")]
    PlayerNotFound(Seat),

    #[error("Death trigger {0} not found")]
    TriggerNotFound(String),

    #[error("Death trigger {0} was already resolved")]
    TriggerResolved(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    // Lifecycle
    #[error("Game is not running")]
    GameNotRunning,

    #[error("Game has already started")]
    GameStarted,

    #[error("Seat {0} is already taken")]
    SeatTaken(Seat),

    #[error("Roster mismatch: {0}")]
    RosterMismatch(String),
}

impl EngineError {
    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlayerDead { .. } => "player_dead",
            Self::NotYourPhase { .. } => "not_your_phase",
            Self::Incapacitated { .. } => "incapacitated",
            Self::RoleNotAssigned { .. } => "role_not_assigned",
            Self::AlreadySubmitted { .. } => "already_submitted",
            Self::NotEligible { .. } => "not_eligible",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::TargetRequired => "target_required",
            Self::UnexpectedTarget => "unexpected_target",
            Self::AbilityExhausted { .. } => "ability_exhausted",
            Self::RepeatedTarget { .. } => "repeated_target",
            Self::RoleConstraint(_) => "role_constraint",
            Self::WrongPhase { .. } => "wrong_phase",
            Self::VoteStage { .. } => "vote_stage",
            Self::NoActiveVote(_) => "no_active_vote",
            Self::VoteUnresolved(_) => "vote_unresolved",
            Self::DeathTriggerPending { .. } => "death_trigger_pending",
            Self::SheriffTransferPending => "sheriff_transfer_pending",
            Self::NoSheriffTransfer => "no_sheriff_transfer",
            Self::AdvanceInProgress => "advance_in_progress",
            Self::GameNotFound(_) => "game_not_found",
            Self::PlayerNotFound(_) => "player_not_found",
            Self::TriggerNotFound(_) => "trigger_not_found",
            Self::TriggerResolved(_) => "trigger_resolved",
            Self::UnknownRole(_) => "unknown_role",
            Self::GameNotRunning => "game_not_running",
            Self::GameStarted => "game_started",
            Self::SeatTaken(_) => "seat_taken",
            Self::RosterMismatch(_) => "roster_mismatch",
        }
    }

    /// Boundary shape: `{success: false, code, message}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "code": self.code(),
            "message": self.to_string()
        })
    }
}
