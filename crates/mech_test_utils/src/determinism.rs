//! Determinism testing utilities.
//!
//! Battles must replay identically from the same seed: the scheduler's
//! jitter and every die come from seeded ChaCha generators, initiative is
//! fixed-point, and the roster iterates in ID order. This module provides a
//! harness that runs the same battle several times and compares hashes of
//! the emitted event streams.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use mech_core::actor::{ActorId, ActorRoster, UnitRegistry};
use mech_core::battle::{Battle, BattleEvent};
use mech_core::config::CombatConfig;
use serde::Serialize;

use crate::fixtures::{medium_laser, roster, FakeBattlefield};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps run per attempt.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a battle multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a serializable value through its RON encoding.
///
/// Event types carry fixed-point scores and nested enums that do not all
/// implement `Hash`, so streams are compared by their serialized form.
pub fn stream_hash<T: Serialize + ?Sized>(value: &T) -> u64 {
    let encoded = ron::to_string(value).unwrap_or_default();
    compute_hash(&encoded)
}

/// A two-team skirmish driven by a trivial controller.
///
/// Every actor fires a medium laser at the lowest-numbered live enemy until
/// it runs out of action points; fragile 20-point targets keep battles
/// short.
pub struct Skirmish {
    /// The battle under test.
    pub battle: Battle,
    /// Collaborator fake.
    pub field: FakeBattlefield,
    /// Every event emitted so far.
    pub events: Vec<BattleEvent>,
}

impl Skirmish {
    /// Set up a 2v2 skirmish with the given dice and jitter seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let roster: ActorRoster = roster(&[(1, 0, 5, 40), (2, 0, 4, 60), (3, 1, 5, 50), (4, 1, 3, 70)]);
        let mut config = CombatConfig::default();
        config.scheduler.seed = seed;
        config.dice.seed = seed;

        let mut field = FakeBattlefield::new().with_default_distance(Some(4));
        for actor in roster.live_actors() {
            field = field.with_structure(actor, 20);
        }

        Self {
            battle: Battle::from_config(roster, &config),
            field,
            events: Vec::new(),
        }
    }

    /// Play one round (or start one, if none is running).
    pub fn play_round(&mut self) {
        if self.battle.is_over() {
            return;
        }
        if self.battle.current_actor().is_none() {
            match self.battle.start_round() {
                Ok(events) => self.events.extend(events),
                Err(err) => {
                    tracing::warn!(error = %err, "Could not start round");
                    return;
                }
            }
        }

        while let Some(attacker) = self.battle.current_actor() {
            let step = match self.enemy_of(attacker) {
                Some(target) => self
                    .battle
                    .attack(target, medium_laser(), 0, &mut self.field)
                    .map(|(_, events)| events),
                None => self.battle.end_turn(),
            };
            match step {
                Ok(events) => self.events.extend(events),
                Err(err) => {
                    tracing::warn!(error = %err, "Turn failed");
                    return;
                }
            }
        }
    }

    /// Hash of the event stream so far.
    #[must_use]
    pub fn hash(&self) -> u64 {
        stream_hash(&self.events)
    }

    fn enemy_of(&self, attacker: ActorId) -> Option<ActorId> {
        let roster = self.battle.roster();
        let team = roster.actor(attacker)?.team;
        roster
            .iter()
            .find(|a| a.team != team && !a.destroyed)
            .map(|a| a.id)
    }
}

/// Run the standard skirmish `runs` times and compare event streams.
#[must_use]
pub fn verify_skirmish_determinism(seed: u64, runs: usize, rounds: u64) -> DeterminismResult {
    verify_determinism(
        runs,
        rounds,
        || Skirmish::new(seed),
        Skirmish::play_round,
        Skirmish::hash,
    )
}

/// Proptest strategies for combat inputs.
pub mod strategies {
    use mech_core::dice::{RollSpec, RollType};
    use proptest::prelude::*;

    /// Any roll type.
    pub fn arb_roll_type() -> impl Strategy<Value = RollType> {
        prop_oneof![
            Just(RollType::Standard),
            Just(RollType::DropLowest),
            Just(RollType::DropHighest),
            Just(RollType::SuccessCount),
            Just(RollType::TargetNumber),
            Just(RollType::Exploding),
        ]
    }

    /// A valid roll spec: 1-8 dice of 2-20 sides, modifier -5..=5.
    pub fn arb_roll_spec() -> impl Strategy<Value = RollSpec> {
        (1u32..=8, 2u32..=20, -5i32..=5, arb_roll_type()).prop_map(
            |(count, sides, modifier, roll_type)| {
                RollSpec::new(count, sides)
                    .with_modifier(modifier)
                    .with_type(roll_type)
            },
        )
    }

    /// `(initiative_base, speed)` pairs for a roster of 1-12 actors.
    pub fn arb_initiative_stats() -> impl Strategy<Value = Vec<(i32, i32)>> {
        proptest::collection::vec((0i32..20, 0i32..200), 1..12)
    }

    /// Action point costs for a sequence of actions.
    pub fn arb_ap_costs(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(0u32..4, 0..max_len)
    }
}
