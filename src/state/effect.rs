//! Skill effects and the night settlement pipeline.
//!
//! Accepted night actions leave their effect in [`NightActions`]. Immediate
//! effects (fear, checks, charm) already hold at submission; settlement
//! effects are resolved together by [`resolve_effects`] in ascending
//! priority, so wards and cures are in place before lethal effects land.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::action::ActionKind;
use super::phase::PhaseId;
use super::player::{OutReason, Seat};

/// Effect types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Fear,
    Check,
    Charm,
    Protect,
    Antidote,
    Kill,
    Poison,
    Exile,
}

/// When an effect is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTiming {
    /// At submission, during the action phase
    Immediate,
    /// When the engine leaves the settlement phase
    Settlement,
}

impl EffectType {
    /// Lower resolves first. Wards and cures sit below every lethal effect.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Fear => 10,
            Self::Check => 15,
            Self::Charm => 20,
            Self::Protect => 30,
            Self::Antidote => 40,
            Self::Kill => 60,
            Self::Poison => 70,
            Self::Exile => 90,
        }
    }

    pub fn timing(&self) -> EffectTiming {
        match self {
            Self::Fear | Self::Check | Self::Charm => EffectTiming::Immediate,
            _ => EffectTiming::Settlement,
        }
    }
}

/// Source of a protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ward {
    /// Blocks the wolf kill
    Guard,
    /// Blocks every night death, poison included
    Dream,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EffectPayload {
    #[default]
    None,
    Ward(Ward),
    Cause(OutReason),
    Reveal(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEffect {
    pub kind: EffectType,
    pub priority: u8,
    pub timing: EffectTiming,
    /// None for engine-issued effects such as the exile
    pub source: Option<Seat>,
    pub target: Seat,
    pub payload: EffectPayload,
}

impl SkillEffect {
    pub fn new(kind: EffectType, source: Option<Seat>, target: Seat) -> Self {
        Self {
            kind,
            priority: kind.priority(),
            timing: kind.timing(),
            source,
            target,
            payload: EffectPayload::None,
        }
    }

    pub fn with_payload(mut self, payload: EffectPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn protect(source: Seat, target: Seat, ward: Ward) -> Self {
        Self::new(EffectType::Protect, Some(source), target).with_payload(EffectPayload::Ward(ward))
    }

    pub fn kill(source: Option<Seat>, target: Seat, cause: OutReason) -> Self {
        Self::new(EffectType::Kill, source, target).with_payload(EffectPayload::Cause(cause))
    }

    pub fn exile(target: Seat) -> Self {
        Self::new(EffectType::Exile, None, target)
    }

    /// Cause of death a lethal effect carries.
    pub fn cause(&self) -> Option<OutReason> {
        match (self.kind, &self.payload) {
            (EffectType::Kill, EffectPayload::Cause(cause)) => Some(*cause),
            (EffectType::Kill, _) => Some(OutReason::WolfKill),
            (EffectType::Poison, _) => Some(OutReason::Poisoned),
            (EffectType::Exile, _) => Some(OutReason::Exiled),
            _ => None,
        }
    }
}

/// An accepted night submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightSubmission {
    pub phase: PhaseId,
    pub actor: Seat,
    pub action: ActionKind,
    pub target: Option<Seat>,
    pub effect: Option<SkillEffect>,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Accumulator for the night in progress.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NightActions {
    pub round: u32,
    submissions: Vec<NightSubmission>,
    /// Wolves that have voted for the pack slot tonight
    #[serde(default)]
    pack_voters: Vec<Seat>,
    /// Set once settlement effects have been applied
    pub settled: bool,
}

impl NightActions {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            submissions: Vec::new(),
            pack_voters: Vec::new(),
            settled: false,
        }
    }

    /// Record a submission. The wolf phase has one shared pack slot, so a
    /// later pack submission replaces the earlier one. Every wolf that voted
    /// stays counted as submitted.
    pub fn record(&mut self, submission: NightSubmission) {
        if submission.phase == PhaseId::Wolf {
            self.submissions.retain(|s| s.phase != PhaseId::Wolf);
            if !self.pack_voters.contains(&submission.actor) {
                self.pack_voters.push(submission.actor);
            }
        }
        self.submissions.push(submission);
    }

    pub fn submissions(&self) -> &[NightSubmission] {
        &self.submissions
    }

    pub fn has_submitted(&self, phase: PhaseId, actor: Seat) -> bool {
        if phase == PhaseId::Wolf && self.pack_voters.contains(&actor) {
            return true;
        }
        self.submissions
            .iter()
            .any(|s| s.phase == phase && s.actor == actor)
    }

    pub fn pack_submitted(&self) -> bool {
        self.submissions.iter().any(|s| s.phase == PhaseId::Wolf)
    }

    fn effects(&self) -> impl Iterator<Item = &SkillEffect> {
        self.submissions.iter().filter_map(|s| s.effect.as_ref())
    }

    /// Whether the seat was feared tonight.
    pub fn is_feared(&self, seat: Seat) -> bool {
        self.effects()
            .any(|e| e.kind == EffectType::Fear && e.target == seat)
    }

    /// Tonight's wolf-kill victim, if the pack chose one.
    pub fn wolf_kill_target(&self) -> Option<Seat> {
        self.submissions
            .iter()
            .filter(|s| s.phase == PhaseId::Wolf)
            .filter_map(|s| s.effect.as_ref())
            .find(|e| e.kind == EffectType::Kill)
            .map(|e| e.target)
    }

    /// (dreamer, dreamt seat) for tonight.
    pub fn dream(&self) -> Option<(Seat, Seat)> {
        self.submissions
            .iter()
            .find(|s| s.phase == PhaseId::Dream && s.action == ActionKind::Dream)
            .and_then(|s| s.target.map(|t| (s.actor, t)))
    }

    /// Effects waiting for settlement, in submission order.
    pub fn settlement_effects(&self) -> Vec<SkillEffect> {
        self.effects()
            .filter(|e| e.timing == EffectTiming::Settlement)
            .cloned()
            .collect()
    }
}

/// Outcome of applying a batch of effects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Resolution {
    /// Deaths in the order they resolved
    pub deaths: Vec<(Seat, OutReason)>,
    /// Seats a lethal effect reached but a ward or cure blocked
    pub saved: Vec<Seat>,
}

impl Resolution {
    pub fn died(&self, seat: Seat) -> bool {
        self.deaths.iter().any(|(s, _)| *s == seat)
    }
}

/// Apply settlement-timed effects in ascending priority.
///
/// Ties keep submission order. Immediate effects in the batch are ignored
/// because they already took hold. A lethal effect on a seat that is
/// already dead is a no-op.
pub fn resolve_effects<F>(effects: &[SkillEffect], is_alive: F) -> Resolution
where
    F: Fn(Seat) -> bool,
{
    let mut ordered: Vec<&SkillEffect> = effects
        .iter()
        .filter(|e| e.timing == EffectTiming::Settlement)
        .collect();
    ordered.sort_by_key(|e| e.priority);

    let mut wards: HashMap<Seat, HashSet<Ward>> = HashMap::new();
    let mut cured: HashSet<Seat> = HashSet::new();
    let mut dead: HashSet<Seat> = HashSet::new();
    let mut resolution = Resolution::default();

    for effect in ordered {
        let target = effect.target;
        match effect.kind {
            EffectType::Protect => {
                if let EffectPayload::Ward(ward) = effect.payload {
                    wards.entry(target).or_default().insert(ward);
                }
            }
            EffectType::Antidote => {
                cured.insert(target);
            }
            EffectType::Kill | EffectType::Poison | EffectType::Exile => {
                if !is_alive(target) || dead.contains(&target) {
                    continue;
                }
                let Some(cause) = effect.cause() else {
                    continue;
                };
                let warded = wards.get(&target);
                let blocked = match cause {
                    OutReason::WolfKill => warded.is_some() || cured.contains(&target),
                    OutReason::Poisoned => warded.is_some_and(|w| w.contains(&Ward::Dream)),
                    _ => false,
                };
                if blocked {
                    if !resolution.saved.contains(&target) {
                        resolution.saved.push(target);
                    }
                } else {
                    dead.insert(target);
                    resolution.deaths.push((target, cause));
                }
            }
            EffectType::Fear | EffectType::Check | EffectType::Charm => {}
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn everyone_alive(_: Seat) -> bool {
        true
    }

    fn submission(
        phase: PhaseId,
        actor: Seat,
        action: ActionKind,
        effect: SkillEffect,
    ) -> NightSubmission {
        NightSubmission {
            phase,
            actor,
            action,
            target: Some(effect.target),
            effect: Some(effect),
            message: String::new(),
            data: None,
            submitted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_priorities_put_wards_before_kills() {
        assert!(EffectType::Protect.priority() < EffectType::Kill.priority());
        assert!(EffectType::Antidote.priority() < EffectType::Kill.priority());
        assert!(EffectType::Protect.priority() < EffectType::Poison.priority());
        assert_eq!(EffectType::Check.timing(), EffectTiming::Immediate);
    }

    #[test]
    fn test_guard_blocks_wolf_kill_regardless_of_submission_order() {
        // Kill submitted before the protect still loses to it
        let effects = vec![
            SkillEffect::kill(Some(1), 5, OutReason::WolfKill),
            SkillEffect::protect(8, 5, Ward::Guard),
        ];
        let resolution = resolve_effects(&effects, everyone_alive);
        assert!(resolution.deaths.is_empty());
        assert_eq!(resolution.saved, vec![5]);
    }

    #[test]
    fn test_antidote_cancels_kill() {
        let effects = vec![
            SkillEffect::kill(Some(1), 7, OutReason::WolfKill),
            SkillEffect::new(EffectType::Antidote, Some(6), 7),
        ];
        let resolution = resolve_effects(&effects, everyone_alive);
        assert!(!resolution.died(7));
    }

    #[test]
    fn test_guard_does_not_block_poison() {
        let effects = vec![
            SkillEffect::protect(8, 3, Ward::Guard),
            SkillEffect::new(EffectType::Poison, Some(6), 3),
        ];
        let resolution = resolve_effects(&effects, everyone_alive);
        assert_eq!(resolution.deaths, vec![(3, OutReason::Poisoned)]);
    }

    #[test]
    fn test_dream_ward_blocks_poison_but_not_dream_kill() {
        let effects = vec![
            SkillEffect::protect(7, 3, Ward::Dream),
            SkillEffect::new(EffectType::Poison, Some(6), 3),
            SkillEffect::kill(Some(7), 9, OutReason::DreamKill),
            SkillEffect::protect(8, 9, Ward::Guard),
        ];
        let resolution = resolve_effects(&effects, everyone_alive);
        assert_eq!(resolution.deaths, vec![(9, OutReason::DreamKill)]);
        assert_eq!(resolution.saved, vec![3]);
    }

    #[test]
    fn test_dead_target_is_noop() {
        let effects = vec![
            SkillEffect::kill(Some(1), 4, OutReason::WolfKill),
            SkillEffect::new(EffectType::Poison, Some(6), 4),
            SkillEffect::new(EffectType::Poison, Some(6), 2),
        ];
        // Seat 2 died earlier in the game
        let resolution = resolve_effects(&effects, |s| s != 2);
        assert_eq!(resolution.deaths, vec![(4, OutReason::WolfKill)]);
    }

    #[test]
    fn test_immediate_effects_are_not_resolved_again() {
        let effects = vec![SkillEffect::new(EffectType::Fear, Some(1), 4)];
        assert_eq!(resolve_effects(&effects, everyone_alive), Resolution::default());
    }

    #[test]
    fn test_pack_slot_is_overwritten() {
        let mut night = NightActions::new(1);
        night.record(submission(
            PhaseId::Wolf,
            1,
            ActionKind::Kill,
            SkillEffect::kill(Some(1), 5, OutReason::WolfKill),
        ));
        night.record(submission(
            PhaseId::Wolf,
            2,
            ActionKind::Kill,
            SkillEffect::kill(Some(2), 9, OutReason::WolfKill),
        ));

        assert_eq!(night.submissions().len(), 1);
        assert_eq!(night.wolf_kill_target(), Some(9));
        assert_eq!(night.settlement_effects().len(), 1);
        // Both voters stay on record after the overwrite
        assert!(night.has_submitted(PhaseId::Wolf, 1));
        assert!(night.has_submitted(PhaseId::Wolf, 2));
        assert!(!night.has_submitted(PhaseId::Wolf, 3));
    }

    #[test]
    fn test_exile_ignores_wards() {
        let effects = vec![
            SkillEffect::protect(8, 4, Ward::Guard),
            SkillEffect::protect(7, 4, Ward::Dream),
            SkillEffect::exile(4),
        ];
        let resolution = resolve_effects(&effects, everyone_alive);
        assert_eq!(resolution.deaths, vec![(4, OutReason::Exiled)]);
        assert!(resolution.saved.is_empty());
    }

    #[test]
    fn test_fear_lookup() {
        let mut night = NightActions::new(2);
        night.record(submission(
            PhaseId::Fear,
            1,
            ActionKind::Fear,
            SkillEffect::new(EffectType::Fear, Some(1), 6),
        ));
        assert!(night.is_feared(6));
        assert!(!night.is_feared(5));
        // Immediate effects never reach settlement
        assert!(night.settlement_effects().is_empty());
    }
}
