//! Day votes: the sheriff election and the exile vote.
//!
//! Both share one ledger-and-tally pattern. Weights are kept in half votes
//! so the sheriff's 1.5 stays integral.
//!
//! ```text
//! Sheriff election:
//!   Signup ──▶ Campaign ──▶ Voting ──▶ Done
//!                 │            │
//!                 └─▶ Done     └─▶ Tie ──(moderator assigns)──▶ Done
//!
//! Exile vote:
//!   Voting ──▶ Done
//!     │
//!     └─▶ Tied ──▶ PkVoting ──▶ Done   (a tied PK means no exile)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::EngineError;
use super::player::Seat;

/// Weight of an ordinary ballot, in half votes.
pub const VOTE_WEIGHT: u32 = 2;

/// Weight of the sheriff's ballot, in half votes.
pub const SHERIFF_VOTE_WEIGHT: u32 = 3;

/// A single ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ballot {
    For(Seat),
    Skip,
}

impl Ballot {
    pub fn from_target(target: Option<Seat>) -> Self {
        target.map_or(Self::Skip, Self::For)
    }
}

/// One ballot per voter; a recast replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: BTreeMap<Seat, Ballot>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast(&mut self, voter: Seat, ballot: Ballot) {
        self.votes.insert(voter, ballot);
    }

    pub fn get(&self, voter: Seat) -> Option<Ballot> {
        self.votes.get(&voter).copied()
    }

    /// Drop every ballot cast for `target`.
    pub fn discard_for(&mut self, target: Seat) {
        self.votes.retain(|_, b| *b != Ballot::For(target));
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn tally<F>(&self, weight: F) -> Tally
    where
        F: Fn(Seat) -> u32,
    {
        let mut tally = Tally::default();
        for (voter, ballot) in &self.votes {
            match ballot {
                Ballot::For(target) => {
                    *tally.raw.entry(*target).or_default() += 1;
                    *tally.half_votes.entry(*target).or_default() += weight(*voter);
                }
                Ballot::Skip => tally.skips += 1,
            }
        }
        tally
    }
}

/// Counted ballots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    /// Ballots per target
    pub raw: BTreeMap<Seat, u32>,
    /// Weighted ballots per target, in half votes
    pub half_votes: BTreeMap<Seat, u32>,
    pub skips: u32,
}

impl Tally {
    pub fn raw_count(&self, seat: Seat) -> u32 {
        self.raw.get(&seat).copied().unwrap_or(0)
    }

    pub fn weighted(&self, seat: Seat) -> f64 {
        f64::from(self.half_votes.get(&seat).copied().unwrap_or(0)) / 2.0
    }

    /// Highest weighted count among `candidates` and every candidate holding it.
    pub fn leaders(&self, candidates: &[Seat]) -> (u32, Vec<Seat>) {
        let score = |s: &Seat| self.half_votes.get(s).copied().unwrap_or(0);
        let max = candidates.iter().map(score).max().unwrap_or(0);
        let leaders = candidates
            .iter()
            .copied()
            .filter(|s| score(s) == max)
            .collect();
        (max, leaders)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let counts: Vec<serde_json::Value> = self
            .raw
            .keys()
            .map(|seat| {
                serde_json::json!({
                    "seat": seat,
                    "votes": self.raw_count(*seat),
                    "weighted": self.weighted(*seat)
                })
            })
            .collect();
        serde_json::json!({"counts": counts, "skips": self.skips})
    }
}

/// Sheriff election stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheriffStage {
    #[default]
    Signup,
    Campaign,
    Voting,
    Tie,
    Done,
}

impl SheriffStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Campaign => "campaign",
            Self::Voting => "voting",
            Self::Tie => "tie",
            Self::Done => "done",
        }
    }
}

/// Result of a sheriff tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheriffTally {
    pub winner: Option<Seat>,
    pub is_tie: bool,
    pub tied_players: Vec<Seat>,
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SheriffElection {
    pub stage: SheriffStage,
    /// seat → runs for sheriff
    signups: BTreeMap<Seat, bool>,
    pub candidates: Vec<Seat>,
    pub withdrawn: Vec<Seat>,
    ledger: VoteLedger,
    pub last_tally: Option<SheriffTally>,
    pub winner: Option<Seat>,
}

impl SheriffElection {
    pub fn new() -> Self {
        Self::default()
    }

    fn require(&self, operation: &'static str, stages: &[SheriffStage]) -> Result<(), EngineError> {
        if stages.contains(&self.stage) {
            Ok(())
        } else {
            Err(EngineError::VoteStage {
                operation,
                vote: "sheriff election",
                stage: self.stage.as_str(),
            })
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == SheriffStage::Done
    }

    pub fn signup(&mut self, seat: Seat, run: bool) -> Result<(), EngineError> {
        self.require("sign up", &[SheriffStage::Signup])?;
        self.signups.insert(seat, run);
        Ok(())
    }

    /// Close signup. With no candidates the election ends without a sheriff.
    pub fn start_campaign(&mut self) -> Result<&[Seat], EngineError> {
        self.require("start the campaign", &[SheriffStage::Signup])?;
        self.candidates = self
            .signups
            .iter()
            .filter(|(_, run)| **run)
            .map(|(seat, _)| *seat)
            .collect();
        self.stage = if self.candidates.is_empty() {
            SheriffStage::Done
        } else {
            SheriffStage::Campaign
        };
        Ok(self.candidates.as_slice())
    }

    /// Withdraw a candidate. Ballots already cast for them are discarded.
    pub fn withdraw(&mut self, seat: Seat) -> Result<(), EngineError> {
        self.require("withdraw", &[SheriffStage::Campaign, SheriffStage::Voting])?;
        if !self.candidates.contains(&seat) {
            return Err(EngineError::NotEligible {
                seat,
                operation: "withdraw",
                reason: "not a candidate",
            });
        }
        self.candidates.retain(|c| *c != seat);
        self.withdrawn.push(seat);
        self.ledger.discard_for(seat);
        Ok(())
    }

    /// Open the ballot. A sole remaining candidate is elected outright and
    /// returned; no remaining candidate ends the election empty.
    pub fn start_voting(&mut self) -> Result<Option<Seat>, EngineError> {
        self.require("start voting", &[SheriffStage::Campaign])?;
        match self.candidates.as_slice() {
            [] => {
                self.stage = SheriffStage::Done;
                Ok(None)
            }
            [only] => {
                self.winner = Some(*only);
                self.stage = SheriffStage::Done;
                Ok(Some(*only))
            }
            _ => {
                self.stage = SheriffStage::Voting;
                Ok(None)
            }
        }
    }

    /// Candidates and withdrawn candidates do not vote.
    pub fn can_vote(&self, seat: Seat) -> bool {
        !self.candidates.contains(&seat) && !self.withdrawn.contains(&seat)
    }

    pub fn vote(&mut self, voter: Seat, ballot: Ballot) -> Result<(), EngineError> {
        self.require("vote", &[SheriffStage::Voting])?;
        if !self.can_vote(voter) {
            return Err(EngineError::NotEligible {
                seat: voter,
                operation: "vote for sheriff",
                reason: "candidates do not vote",
            });
        }
        if let Ballot::For(target) = ballot {
            if !self.candidates.contains(&target) {
                return Err(EngineError::InvalidTarget { target });
            }
        }
        self.ledger.cast(voter, ballot);
        Ok(())
    }

    pub fn ballots(&self) -> &VoteLedger {
        &self.ledger
    }

    /// Count the ballots. `sheriff` is the seat whose ballot weighs 1.5.
    pub fn tally(&mut self, sheriff: Option<Seat>) -> Result<SheriffTally, EngineError> {
        self.require("tally", &[SheriffStage::Voting])?;
        let tally = self.ledger.tally(|voter| {
            if Some(voter) == sheriff {
                SHERIFF_VOTE_WEIGHT
            } else {
                VOTE_WEIGHT
            }
        });
        let (_, leaders) = tally.leaders(&self.candidates);
        let result = if let [winner] = leaders.as_slice() {
            self.winner = Some(*winner);
            self.stage = SheriffStage::Done;
            SheriffTally {
                winner: Some(*winner),
                is_tie: false,
                tied_players: Vec::new(),
                tally,
            }
        } else {
            self.stage = SheriffStage::Tie;
            SheriffTally {
                winner: None,
                is_tie: true,
                tied_players: leaders,
                tally,
            }
        };
        self.last_tally = Some(result.clone());
        Ok(result)
    }

    /// Moderator decision after a tie: one of the tied seats, or nobody.
    pub fn god_assign(&mut self, target: Option<Seat>) -> Result<(), EngineError> {
        self.require("assign the badge", &[SheriffStage::Tie])?;
        if let Some(t) = target {
            let tied = self
                .last_tally
                .as_ref()
                .is_some_and(|tally| tally.tied_players.contains(&t));
            if !tied {
                return Err(EngineError::InvalidTarget { target: t });
            }
        }
        self.winner = target;
        self.stage = SheriffStage::Done;
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "stage": self.stage.as_str(),
            "candidates": self.candidates,
            "withdrawn": self.withdrawn,
            "votes_cast": self.ledger.len(),
            "winner": self.winner,
            "tally": self.last_tally.as_ref().map(|t| t.tally.to_json())
        })
    }
}

/// Exile vote stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExileStage {
    #[default]
    Voting,
    Tied,
    PkVoting,
    Done,
}

impl ExileStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Tied => "tied",
            Self::PkVoting => "pk_voting",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExileResult {
    Exiled(Seat),
    NoExile,
}

impl ExileResult {
    pub fn exiled(&self) -> Option<Seat> {
        match self {
            Self::Exiled(seat) => Some(*seat),
            Self::NoExile => None,
        }
    }
}

/// Result of the first exile tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExileTally {
    /// None when the tally tied and a PK is needed
    pub result: Option<ExileResult>,
    pub pk_players: Vec<Seat>,
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExileVote {
    pub stage: ExileStage,
    ledger: VoteLedger,
    pub pk_candidates: Vec<Seat>,
    pk_ledger: VoteLedger,
    pub first_tally: Option<Tally>,
    pub pk_tally: Option<Tally>,
    pub result: Option<ExileResult>,
    /// Set once the exiled seat has been removed
    pub executed: bool,
}

impl ExileVote {
    pub fn new() -> Self {
        Self::default()
    }

    fn require(&self, operation: &'static str, stage: ExileStage) -> Result<(), EngineError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(EngineError::VoteStage {
                operation,
                vote: "exile vote",
                stage: self.stage.as_str(),
            })
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == ExileStage::Done
    }

    pub fn vote(&mut self, voter: Seat, ballot: Ballot) -> Result<(), EngineError> {
        self.require("vote", ExileStage::Voting)?;
        self.ledger.cast(voter, ballot);
        Ok(())
    }

    /// Strict weighted plurality exiles; no weighted votes at all means no
    /// exile; a shared top opens a PK between the leaders.
    pub fn tally<F>(&mut self, weight: F) -> Result<ExileTally, EngineError>
    where
        F: Fn(Seat) -> u32,
    {
        self.require("tally", ExileStage::Voting)?;
        let tally = self.ledger.tally(weight);
        let targets: Vec<Seat> = tally.raw.keys().copied().collect();
        let (max, leaders) = tally.leaders(&targets);
        let mut pk_players = Vec::new();
        let result = match leaders.as_slice() {
            _ if max == 0 => Some(ExileResult::NoExile),
            [seat] => Some(ExileResult::Exiled(*seat)),
            _ => {
                pk_players = leaders.clone();
                None
            }
        };
        match result {
            Some(r) => {
                self.result = Some(r);
                self.stage = ExileStage::Done;
            }
            None => {
                self.pk_candidates = leaders;
                self.stage = ExileStage::Tied;
            }
        }
        self.first_tally = Some(tally.clone());
        Ok(ExileTally {
            result,
            pk_players,
            tally,
        })
    }

    pub fn start_pk(&mut self) -> Result<&[Seat], EngineError> {
        self.require("start the PK vote", ExileStage::Tied)?;
        self.stage = ExileStage::PkVoting;
        Ok(self.pk_candidates.as_slice())
    }

    /// PK candidates cannot vote and are the only valid targets.
    pub fn vote_pk(&mut self, voter: Seat, ballot: Ballot) -> Result<(), EngineError> {
        self.require("vote in the PK", ExileStage::PkVoting)?;
        if self.pk_candidates.contains(&voter) {
            return Err(EngineError::NotEligible {
                seat: voter,
                operation: "vote in the PK",
                reason: "PK candidates do not vote",
            });
        }
        if let Ballot::For(target) = ballot {
            if !self.pk_candidates.contains(&target) {
                return Err(EngineError::InvalidTarget { target });
            }
        }
        self.pk_ledger.cast(voter, ballot);
        Ok(())
    }

    /// A tied PK ends with no exile; there is never a second PK.
    pub fn tally_pk<F>(&mut self, weight: F) -> Result<ExileResult, EngineError>
    where
        F: Fn(Seat) -> u32,
    {
        self.require("tally the PK vote", ExileStage::PkVoting)?;
        let tally = self.pk_ledger.tally(weight);
        let (max, leaders) = tally.leaders(&self.pk_candidates);
        let result = match leaders.as_slice() {
            [seat] if max > 0 => ExileResult::Exiled(*seat),
            _ => ExileResult::NoExile,
        };
        self.pk_tally = Some(tally);
        self.result = Some(result);
        self.stage = ExileStage::Done;
        Ok(result)
    }

    pub fn mark_executed(&mut self) {
        self.executed = true;
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "stage": self.stage.as_str(),
            "votes_cast": self.ledger.len(),
            "pk_candidates": self.pk_candidates,
            "pk_votes_cast": self.pk_ledger.len(),
            "result": self.result,
            "executed": self.executed,
            "tally": self.first_tally.as_ref().map(Tally::to_json),
            "pk_tally": self.pk_tally.as_ref().map(Tally::to_json)
        })
    }
}

/// The day vote in progress. At most one runs at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayVote {
    #[default]
    Inactive,
    SheriffElection(SheriffElection),
    ExileVote(ExileVote),
}

impl DayVote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::SheriffElection(_) => "sheriff_election",
            Self::ExileVote(_) => "exile_vote",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Inactive => serde_json::json!({"kind": "inactive"}),
            Self::SheriffElection(e) => {
                serde_json::json!({"kind": "sheriff_election", "state": e.to_json()})
            }
            Self::ExileVote(v) => serde_json::json!({"kind": "exile_vote", "state": v.to_json()}),
        }
    }
}
