//! Day entry points: the sheriff election and the exile vote.
//!
//! Each operation checks that the game is in the matching day phase and
//! that the right vote is active before delegating to the vote state
//! machine in `vote`.

use tracing::{debug, info};

use super::action::ActionOutcome;
use super::effect::{resolve_effects, SkillEffect};
use super::error::EngineError;
use super::game::{Game, GameStatus};
use super::history::Visibility;
use super::phase::PhaseId;
use super::player::{OutReason, Seat};
use super::vote::{
    Ballot, DayVote, ExileResult, ExileStage, ExileTally, ExileVote, SheriffElection, SheriffTally,
    SHERIFF_VOTE_WEIGHT, VOTE_WEIGHT,
};

impl Game {
    fn require_day_phase(
        &self,
        operation: &'static str,
        phase: PhaseId,
    ) -> Result<(), EngineError> {
        if self.status != GameStatus::Running {
            return Err(EngineError::GameNotRunning);
        }
        if self.current_phase != phase {
            return Err(EngineError::WrongPhase {
                operation,
                phase: self.current_phase,
            });
        }
        Ok(())
    }

    fn election_mut(&mut self) -> Result<&mut SheriffElection, EngineError> {
        match &mut self.day_vote {
            DayVote::SheriffElection(election) => Ok(election),
            _ => Err(EngineError::NoActiveVote("sheriff election")),
        }
    }

    fn exile_mut(&mut self) -> Result<&mut ExileVote, EngineError> {
        match &mut self.day_vote {
            DayVote::ExileVote(vote) => Ok(vote),
            _ => Err(EngineError::NoActiveVote("exile vote")),
        }
    }

    /// Ballot weight in half votes.
    pub(crate) fn ballot_weight(&self, voter: Seat) -> u32 {
        if self.sheriff == Some(voter) {
            SHERIFF_VOTE_WEIGHT
        } else {
            VOTE_WEIGHT
        }
    }

    /// Pin the badge on a seat.
    pub(crate) fn install_sheriff(&mut self, seat: Seat) {
        if let Some(previous) = self.sheriff {
            if let Some(old) = self.player_mut(previous) {
                old.is_sheriff = false;
            }
        }
        if let Some(player) = self.player_mut(seat) {
            player.is_sheriff = true;
        }
        self.sheriff = Some(seat);
        info!(game_id = %self.id, seat, "Sheriff elected");
        self.round_draft.note(format!("Player {seat} was elected sheriff."));
        self.log(
            None,
            "sheriff_elected",
            Some(seat),
            format!("Player {seat} is the sheriff"),
            Visibility::Public,
        );
    }

    fn no_sheriff_elected(&mut self) {
        info!(game_id = %self.id, "Sheriff election ended without a sheriff");
        self.round_draft.note("No sheriff was elected.");
        self.log(
            None,
            "sheriff_elected",
            None,
            "No sheriff was elected",
            Visibility::Public,
        );
    }

    // Sheriff election

    pub fn start_sheriff_election(&mut self) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("start the sheriff election", PhaseId::SheriffElection)?;
        if let DayVote::SheriffElection(election) = &self.day_vote {
            return Err(EngineError::VoteStage {
                operation: "start the sheriff election",
                vote: "sheriff election",
                stage: election.stage.as_str(),
            });
        }
        if self.round_draft.sheriff_election.is_some() {
            return Err(EngineError::VoteStage {
                operation: "start the sheriff election",
                vote: "sheriff election",
                stage: "done",
            });
        }
        self.day_vote = DayVote::SheriffElection(SheriffElection::new());
        info!(game_id = %self.id, round = self.current_round, "Sheriff election opened");
        self.log(
            None,
            "start_sheriff_election",
            None,
            "Sheriff signup is open",
            Visibility::Public,
        );
        Ok(ActionOutcome::new("Sheriff signup is open"))
    }

    pub fn sheriff_signup(&mut self, seat: Seat, run: bool) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("sign up for sheriff", PhaseId::SheriffElection)?;
        self.living(seat)?;
        self.election_mut()?.signup(seat, run)?;
        let message = if run {
            format!("Player {seat} runs for sheriff")
        } else {
            format!("Player {seat} does not run for sheriff")
        };
        let action = if run { "run_for_sheriff" } else { "decline_sheriff" };
        self.log(
            Some(seat),
            action,
            None,
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message))
    }

    pub fn start_sheriff_campaign(&mut self) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("start the sheriff campaign", PhaseId::SheriffElection)?;
        let candidates = self.election_mut()?.start_campaign()?.to_vec();
        if candidates.is_empty() {
            self.no_sheriff_elected();
            return Ok(ActionOutcome::new("Nobody runs for sheriff")
                .with_data(serde_json::json!({"candidates": []})));
        }
        let message = format!("Candidates: {candidates:?}");
        self.log(
            None,
            "start_sheriff_campaign",
            None,
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message).with_data(serde_json::json!({"candidates": candidates})))
    }

    pub fn sheriff_withdraw(&mut self, seat: Seat) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("withdraw from the sheriff race", PhaseId::SheriffElection)?;
        self.living(seat)?;
        self.election_mut()?.withdraw(seat)?;
        let message = format!("Player {seat} withdrew from the sheriff race");
        self.log(
            Some(seat),
            "withdraw_sheriff",
            None,
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message))
    }

    /// Open the ballot; a sole remaining candidate becomes sheriff at once.
    pub fn start_sheriff_voting(&mut self) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("start the sheriff vote", PhaseId::SheriffElection)?;
        let election = self.election_mut()?;
        let elected = election.start_voting()?;
        let done = election.is_done();
        match elected {
            Some(seat) => {
                self.install_sheriff(seat);
                Ok(ActionOutcome::new(format!(
                    "Player {seat} is the only candidate and becomes sheriff"
                ))
                .with_data(serde_json::json!({"winner": seat})))
            }
            None if done => {
                self.no_sheriff_elected();
                Ok(ActionOutcome::new("Every candidate withdrew"))
            }
            None => {
                self.log(
                    None,
                    "start_sheriff_voting",
                    None,
                    "Sheriff voting is open",
                    Visibility::Public,
                );
                Ok(ActionOutcome::new("Sheriff voting is open"))
            }
        }
    }

    /// Vote for a candidate, or skip with None.
    pub fn vote_for_sheriff(
        &mut self,
        voter: Seat,
        candidate: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("vote for sheriff", PhaseId::SheriffElection)?;
        self.living(voter)?;
        self.election_mut()?.vote(voter, Ballot::from_target(candidate))?;
        debug!(game_id = %self.id, voter, candidate = ?candidate, "Sheriff ballot cast");
        let message = match candidate {
            Some(c) => format!("Player {voter} voted for player {c}"),
            None => format!("Player {voter} abstained"),
        };
        self.log(
            Some(voter),
            "vote_sheriff",
            candidate,
            message.clone(),
            Visibility::Moderator,
        );
        Ok(ActionOutcome::new(message))
    }

    pub fn tally_sheriff_votes(&mut self) -> Result<SheriffTally, EngineError> {
        self.require_day_phase("tally the sheriff vote", PhaseId::SheriffElection)?;
        let sheriff = self.sheriff;
        let result = self.election_mut()?.tally(sheriff)?;
        match result.winner {
            Some(seat) => self.install_sheriff(seat),
            None => {
                info!(game_id = %self.id, tied = ?result.tied_players, "Sheriff vote tied");
                self.log(
                    None,
                    "tally_sheriff",
                    None,
                    format!("Sheriff vote tied between {:?}", result.tied_players),
                    Visibility::Public,
                );
            }
        }
        Ok(result)
    }

    /// Moderator tie-break: a tied seat, or nobody.
    pub fn god_assign_sheriff(
        &mut self,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("assign the sheriff badge", PhaseId::SheriffElection)?;
        if let Some(t) = target {
            self.living(t)?;
        }
        self.election_mut()?.god_assign(target)?;
        match target {
            Some(seat) => {
                self.install_sheriff(seat);
                Ok(ActionOutcome::new(format!("Player {seat} is the sheriff")))
            }
            None => {
                self.no_sheriff_elected();
                Ok(ActionOutcome::new("No sheriff this game"))
            }
        }
    }

    // Exile vote

    pub fn start_exile_vote(&mut self) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("start the exile vote", PhaseId::ExileVote)?;
        match &self.day_vote {
            DayVote::Inactive if self.round_draft.exile_vote.is_none() => {}
            DayVote::ExileVote(vote) => {
                return Err(EngineError::VoteStage {
                    operation: "start the exile vote",
                    vote: "exile vote",
                    stage: vote.stage.as_str(),
                })
            }
            _ => {
                return Err(EngineError::VoteStage {
                    operation: "start the exile vote",
                    vote: "exile vote",
                    stage: "done",
                })
            }
        }
        self.day_vote = DayVote::ExileVote(ExileVote::new());
        info!(game_id = %self.id, round = self.current_round, "Exile vote opened");
        self.log(
            None,
            "start_exile_vote",
            None,
            "Exile voting is open",
            Visibility::Public,
        );
        Ok(ActionOutcome::new("Exile voting is open"))
    }

    /// Vote to exile a living seat, or skip with None.
    pub fn vote_for_exile(
        &mut self,
        voter: Seat,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("vote to exile", PhaseId::ExileVote)?;
        self.living(voter)?;
        if let Some(t) = target {
            if !self.is_alive(t) {
                return Err(EngineError::InvalidTarget { target: t });
            }
        }
        self.exile_mut()?.vote(voter, Ballot::from_target(target))?;
        debug!(game_id = %self.id, voter, target = ?target, "Exile ballot cast");
        let message = match target {
            Some(t) => format!("Player {voter} voted to exile player {t}"),
            None => format!("Player {voter} abstained"),
        };
        self.log(
            Some(voter),
            "vote_exile",
            target,
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message))
    }

    pub fn tally_exile_votes(&mut self) -> Result<ExileTally, EngineError> {
        self.require_day_phase("tally the exile vote", PhaseId::ExileVote)?;
        let weights = self.weights();
        let result = self.exile_mut()?.tally(|voter| weight_of(&weights, voter))?;
        let message = match result.result {
            Some(ExileResult::Exiled(seat)) => format!("Player {seat} is voted out"),
            Some(ExileResult::NoExile) => "Nobody is voted out".to_string(),
            None => format!("Exile vote tied between {:?}", result.pk_players),
        };
        info!(game_id = %self.id, result = %message, "Exile vote tallied");
        self.log(
            None,
            "tally_exile",
            result.result.and_then(|r| r.exiled()),
            message,
            Visibility::Public,
        );
        Ok(result)
    }

    pub fn start_exile_pk_vote(&mut self) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("start the PK vote", PhaseId::ExileVote)?;
        let candidates = self.exile_mut()?.start_pk()?.to_vec();
        let message = format!("PK vote between {candidates:?}");
        self.log(None, "start_pk", None, message.clone(), Visibility::Public);
        Ok(ActionOutcome::new(message).with_data(serde_json::json!({"pk_players": candidates})))
    }

    pub fn vote_for_exile_pk(
        &mut self,
        voter: Seat,
        target: Option<Seat>,
    ) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("vote in the PK", PhaseId::ExileVote)?;
        self.living(voter)?;
        self.exile_mut()?.vote_pk(voter, Ballot::from_target(target))?;
        debug!(game_id = %self.id, voter, target = ?target, "PK ballot cast");
        let message = match target {
            Some(t) => format!("Player {voter} voted to exile player {t}"),
            None => format!("Player {voter} abstained"),
        };
        self.log(
            Some(voter),
            "vote_pk",
            target,
            message.clone(),
            Visibility::Public,
        );
        Ok(ActionOutcome::new(message))
    }

    pub fn tally_exile_pk_votes(&mut self) -> Result<ExileResult, EngineError> {
        self.require_day_phase("tally the PK vote", PhaseId::ExileVote)?;
        let weights = self.weights();
        let result = self.exile_mut()?.tally_pk(|voter| weight_of(&weights, voter))?;
        let message = match result {
            ExileResult::Exiled(seat) => format!("Player {seat} loses the PK"),
            ExileResult::NoExile => "The PK tied; nobody is exiled".to_string(),
        };
        info!(game_id = %self.id, result = %message, "PK vote tallied");
        self.log(
            None,
            "tally_pk",
            result.exiled(),
            message,
            Visibility::Public,
        );
        Ok(result)
    }

    /// Remove the seat the vote decided on. The seat must match the result.
    pub fn execute_exile(&mut self, seat: Seat) -> Result<ActionOutcome, EngineError> {
        self.require_day_phase("execute the exile", PhaseId::ExileVote)?;
        let vote = self.exile_mut()?;
        if vote.stage != ExileStage::Done {
            return Err(EngineError::VoteUnresolved("The exile vote has no result yet"));
        }
        if vote.executed {
            return Err(EngineError::VoteStage {
                operation: "execute the exile",
                vote: "exile vote",
                stage: "executed",
            });
        }
        if vote.result.and_then(|r| r.exiled()) != Some(seat) {
            return Err(EngineError::InvalidTarget { target: seat });
        }
        vote.mark_executed();

        let resolution = resolve_effects(&[SkillEffect::exile(seat)], |s| self.is_alive(s));
        for (dead, reason) in resolution.deaths {
            self.apply_death(dead, reason);
        }
        self.last_exile = Some((self.current_round, seat));
        self.round_draft.note(format!("Player {seat} was exiled."));
        info!(game_id = %self.id, round = self.current_round, seat, "Player exiled");
        self.check_win();
        Ok(ActionOutcome::new(format!("Player {seat} was exiled")))
    }

    /// Weights of the living seats, looked up before the vote is borrowed.
    fn weights(&self) -> Vec<(Seat, u32)> {
        self.players()
            .map(|p| (p.seat, self.ballot_weight(p.seat)))
            .collect()
    }
}

fn weight_of(weights: &[(Seat, u32)], voter: Seat) -> u32 {
    weights
        .iter()
        .find(|(seat, _)| *seat == voter)
        .map_or(VOTE_WEIGHT, |(_, w)| *w)
}
