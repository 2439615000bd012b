//! Dice engine.
//!
//! Turns a [`RollSpec`] into raw die values, a processed total and critical
//! flags. The engine itself keeps no state that affects outcomes; the only
//! thing it remembers is a bounded history of recent rolls for inspection.
//!
//! Randomness comes from a [`DieSource`]. Production code uses
//! [`SeededDice`], which is reproducible from a seed; tests plug in scripted
//! sources so exact face values can be asserted.
//!
//! # Example
//!
//! ```
//! use mech_core::dice::{DiceEngine, RollSpec, RollTotal, SeededDice};
//!
//! let mut engine = DiceEngine::new(SeededDice::new(7));
//! let result = engine.roll(&RollSpec::parse("2d6+1").unwrap()).unwrap();
//!
//! assert_eq!(result.raw_results.len(), 2);
//! assert!(matches!(result.total, RollTotal::Value(3..=13)));
//! ```

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::DiceError;

/// Default number of rolls kept in [`RollHistory`].
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Upper bound on extra dice added by explosions within one roll call.
pub const MAX_EXPLOSIONS: usize = 100;

/// Source of individual die faces.
pub trait DieSource {
    /// Roll one die, returning a face in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Seeded die source backed by ChaCha8.
///
/// Two sources created from the same seed produce the same faces in the same
/// order on every platform.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    /// Create a source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DieSource for SeededDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// How raw dice are turned into a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RollType {
    /// Sum of all dice plus the modifier.
    #[default]
    Standard,
    /// Discard the lowest die, sum the rest plus the modifier.
    DropLowest,
    /// Discard the highest die, sum the rest plus the modifier.
    DropHighest,
    /// Count the dice at or above the success threshold.
    SuccessCount,
    /// Pass/fail: first die plus modifier against the target number.
    TargetNumber,
    /// Standard totals with exploding dice always on.
    Exploding,
}

/// Per-roll tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RollOptions {
    /// Minimum face that counts as a success for [`RollType::SuccessCount`].
    pub success_threshold: u32,
    /// Target for [`RollType::TargetNumber`].
    pub target_number: i32,
    /// Roll an extra die whenever a die shows its maximum face.
    pub explode: bool,
    /// 2d6 score at or above which the roll is a critical success.
    pub critical_threshold: i32,
    /// 2d6 score at or below which the roll is a critical failure.
    pub fumble_threshold: i32,
}

impl Default for RollOptions {
    fn default() -> Self {
        Self {
            success_threshold: 5,
            target_number: 10,
            explode: false,
            critical_threshold: 12,
            fumble_threshold: 2,
        }
    }
}

/// Immutable description of a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollSpec {
    /// Number of dice (at least 1).
    pub count: u32,
    /// Faces per die (at least 2).
    pub sides: u32,
    /// Flat modifier added to summed totals.
    pub modifier: i32,
    /// Resolution mode.
    pub roll_type: RollType,
    /// Mode-specific options.
    pub options: RollOptions,
}

impl RollSpec {
    /// A standard roll of `count` dice with `sides` faces.
    #[must_use]
    pub fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            modifier: 0,
            roll_type: RollType::Standard,
            options: RollOptions::default(),
        }
    }

    /// The signature 2d6 roll.
    #[must_use]
    pub fn two_d6() -> Self {
        Self::new(2, 6)
    }

    /// Builder method to set the modifier.
    #[must_use]
    pub const fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = modifier;
        self
    }

    /// Builder method to set the roll type.
    #[must_use]
    pub const fn with_type(mut self, roll_type: RollType) -> Self {
        self.roll_type = roll_type;
        self
    }

    /// Builder method to set the options.
    #[must_use]
    pub const fn with_options(mut self, options: RollOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the preconditions of the roll.
    pub fn validate(&self) -> Result<(), DiceError> {
        if self.sides < 2 {
            return Err(DiceError::InvalidSides { sides: self.sides });
        }
        if self.count < 1 {
            return Err(DiceError::InvalidCount { count: self.count });
        }
        Ok(())
    }

    /// Parse `NdS`, `NdS+M` or `NdS-M` notation into a standard roll.
    ///
    /// A missing count (`d20`) means one die.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let invalid = || DiceError::InvalidNotation(notation.to_string());
        let trimmed = notation.trim();

        let (count_part, rest) = trimmed
            .split_once(|c: char| c == 'd' || c == 'D')
            .ok_or_else(invalid)?;

        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().map_err(|_| invalid())?
        };

        let (sides_part, modifier) = match rest.find(|c: char| c == '+' || c == '-') {
            Some(idx) => {
                let (sides, modifier) = rest.split_at(idx);
                let modifier = modifier.parse::<i32>().map_err(|_| invalid())?;
                (sides, modifier)
            }
            None => (rest, 0),
        };
        let sides = sides_part.parse::<u32>().map_err(|_| invalid())?;

        let spec = Self::new(count, sides).with_modifier(modifier);
        spec.validate()?;
        Ok(spec)
    }

    fn explodes(&self) -> bool {
        self.options.explode || self.roll_type == RollType::Exploding
    }
}

/// Processed total of a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollTotal {
    /// Numeric total (sums and success counts).
    Value(i32),
    /// Pass/fail outcome of a target-number roll.
    Pass(bool),
}

impl RollTotal {
    /// The numeric total, if this is not a pass/fail roll.
    #[must_use]
    pub const fn value(self) -> Option<i32> {
        match self {
            Self::Value(v) => Some(v),
            Self::Pass(_) => None,
        }
    }

    /// The pass/fail outcome, if this is a target-number roll.
    #[must_use]
    pub const fn passed(self) -> Option<bool> {
        match self {
            Self::Value(_) => None,
            Self::Pass(p) => Some(p),
        }
    }
}

/// Outcome of a single roll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollResult {
    /// Every die rolled, in roll order, explosions included.
    pub raw_results: Vec<u32>,
    /// Processed total.
    pub total: RollTotal,
    /// Dice discarded by drop rules.
    pub dropped: Vec<u32>,
    /// Exceptional success.
    pub is_critical_success: bool,
    /// Exceptional failure.
    pub is_critical_failure: bool,
}

impl RollResult {
    /// Numeric total, treating pass/fail totals as 1/0.
    #[must_use]
    pub fn score(&self) -> i32 {
        match self.total {
            RollTotal::Value(v) => v,
            RollTotal::Pass(p) => i32::from(p),
        }
    }
}

/// A roll kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRecord {
    /// Sequence number of the roll within the engine's lifetime.
    pub sequence: u64,
    /// What was requested.
    pub spec: RollSpec,
    /// What came out.
    pub result: RollResult,
}

/// Bounded FIFO of recent rolls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollHistory {
    capacity: usize,
    records: VecDeque<RollRecord>,
}

impl RollHistory {
    /// Create an empty history holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn push(&mut self, record: RollRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Maximum number of records kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no rolls are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent record.
    #[must_use]
    pub fn latest(&self) -> Option<&RollRecord> {
        self.records.back()
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &RollRecord> {
        self.records.iter()
    }

    /// Forget every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for RollHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Probabilistic resolver for [`RollSpec`]s.
#[derive(Debug, Clone)]
pub struct DiceEngine<S = SeededDice> {
    source: S,
    history: RollHistory,
    rolls: u64,
}

impl<S: DieSource> DiceEngine<S> {
    /// Create an engine with the default history capacity.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_history_capacity(source, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an engine keeping `capacity` rolls of history.
    #[must_use]
    pub fn with_history_capacity(source: S, capacity: usize) -> Self {
        Self {
            source,
            history: RollHistory::new(capacity),
            rolls: 0,
        }
    }

    /// Roll dice according to `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`DiceError`] when the spec has fewer than two sides or no
    /// dice; nothing is rolled or recorded in that case.
    pub fn roll(&mut self, spec: &RollSpec) -> Result<RollResult, DiceError> {
        spec.validate()?;
        Ok(self.roll_validated(spec))
    }

    /// Roll a standard 2d6 with a modifier.
    pub fn roll_2d6(&mut self, modifier: i32) -> RollResult {
        self.roll_validated(&RollSpec::two_d6().with_modifier(modifier))
    }

    fn roll_validated(&mut self, spec: &RollSpec) -> RollResult {
        let raw_results = self.roll_raw(spec);
        let (total, dropped) = compute_total(spec, &raw_results);
        let (is_critical_success, is_critical_failure) = detect_critical(spec, &raw_results, total);

        let result = RollResult {
            raw_results,
            total,
            dropped,
            is_critical_success,
            is_critical_failure,
        };

        tracing::debug!(
            count = spec.count,
            sides = spec.sides,
            modifier = spec.modifier,
            roll_type = ?spec.roll_type,
            raw = ?result.raw_results,
            total = ?result.total,
            critical = result.is_critical_success,
            fumble = result.is_critical_failure,
            "Dice rolled"
        );

        self.rolls += 1;
        self.history.push(RollRecord {
            sequence: self.rolls,
            spec: *spec,
            result: result.clone(),
        });

        result
    }

    /// Recent rolls.
    #[must_use]
    pub fn history(&self) -> &RollHistory {
        &self.history
    }

    /// Total number of successful roll calls.
    #[must_use]
    pub const fn roll_count(&self) -> u64 {
        self.rolls
    }

    /// Access the die source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn roll_raw(&mut self, spec: &RollSpec) -> Vec<u32> {
        let mut raw: Vec<u32> = (0..spec.count)
            .map(|_| self.source.roll_die(spec.sides))
            .collect();

        if spec.explodes() {
            let mut explosions = 0;
            let mut idx = 0;
            while idx < raw.len() && explosions < MAX_EXPLOSIONS {
                if raw[idx] == spec.sides {
                    raw.push(self.source.roll_die(spec.sides));
                    explosions += 1;
                }
                idx += 1;
            }
            if explosions == MAX_EXPLOSIONS {
                tracing::warn!(sides = spec.sides, "Explosion cap reached");
            }
        }

        raw
    }
}

fn sum(dice: &[u32]) -> i32 {
    dice.iter()
        .fold(0i32, |acc, &d| acc.saturating_add(d as i32))
}

fn compute_total(spec: &RollSpec, raw: &[u32]) -> (RollTotal, Vec<u32>) {
    match spec.roll_type {
        RollType::Standard | RollType::Exploding => (
            RollTotal::Value(sum(raw).saturating_add(spec.modifier)),
            Vec::new(),
        ),
        RollType::DropLowest | RollType::DropHighest => {
            let mut sorted = raw.to_vec();
            sorted.sort_unstable();
            let dropped = if spec.roll_type == RollType::DropLowest {
                sorted.remove(0)
            } else {
                sorted.pop().unwrap_or_default()
            };
            (
                RollTotal::Value(sum(&sorted).saturating_add(spec.modifier)),
                vec![dropped],
            )
        }
        RollType::SuccessCount => {
            let successes = raw
                .iter()
                .filter(|&&d| d >= spec.options.success_threshold)
                .count();
            (RollTotal::Value(successes as i32), Vec::new())
        }
        RollType::TargetNumber => {
            let first = raw.first().copied().unwrap_or_default() as i32;
            (
                RollTotal::Pass(first.saturating_add(spec.modifier) >= spec.options.target_number),
                Vec::new(),
            )
        }
    }
}

/// Critical success / failure flags.
///
/// Pass/fail totals have no numeric value, so the natural (unmodified) dice
/// sum stands in for them.
fn detect_critical(spec: &RollSpec, raw: &[u32], total: RollTotal) -> (bool, bool) {
    let score = match total {
        RollTotal::Value(v) => v,
        RollTotal::Pass(_) => sum(raw),
    };

    if spec.count == 2 && spec.sides == 6 {
        return (
            score >= spec.options.critical_threshold,
            score <= spec.options.fumble_threshold,
        );
    }

    if spec.count == 1 {
        let first = raw.first().copied().unwrap_or_default();
        return (first == spec.sides, first == 1);
    }

    // Top and bottom 10% of the theoretical maximum.
    let max = i64::from(spec.count) * i64::from(spec.sides);
    let score = i64::from(score);
    (score * 10 >= max * 9, score * 10 <= max)
}
