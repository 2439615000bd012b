//! Initiative-ordered turn scheduler.
//!
//! Each round every live actor gets the configured action-point allotment and
//! an initiative score of `base + jitter + speed / 100`. Actors are offered
//! turns highest-initiative first. An actor that still has action points after
//! acting is pushed back into the queue with a freshly jittered score, so it
//! can act again later in the same round.
//!
//! The round state machine is `Idle -> Active -> Ending -> Idle`:
//!
//! ```text
//! start_new_round ──► Active ──(queue empty)──► Ending ──► Idle
//!                       ▲  │
//!                       │  ▼ TurnStarted
//!         on_action_completed / cancel_current_turn
//! ```
//!
//! Every public operation returns the events it produced, in emission order,
//! before it returns.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId, UnitRegistry};
use crate::error::SchedulerError;
use crate::math::{decimal_serde, ratio, Fixed};

/// Resolution of the initiative jitter; jitter is drawn in steps of
/// `initiative_jitter / JITTER_STEPS`.
const JITTER_STEPS: i32 = 1000;

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Action points every actor receives at round start.
    pub action_points_per_round: u32,
    /// Half-width of the uniform initiative jitter.
    #[serde(with = "decimal_serde")]
    pub initiative_jitter: Fixed,
    /// Seed for the jitter generator.
    pub seed: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            action_points_per_round: 2,
            initiative_jitter: ratio(1, 10),
            seed: 0,
        }
    }
}

/// A queued claim on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Priority; higher acts first.
    pub initiative: Fixed,
    /// Actor holding the claim.
    pub actor: ActorId,
    /// Insertion order, used as the final tiebreaker.
    pub sequence: u64,
}

impl ScheduleEntry {
    /// Whether this entry must be popped before `other`.
    ///
    /// Equal initiative falls back to insertion order, so two entries never
    /// compare equal.
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        self.initiative > other.initiative
            || (self.initiative == other.initiative && self.sequence < other.sequence)
    }
}

/// Array-backed binary max-heap of [`ScheduleEntry`]s.
#[derive(Debug, Clone, Default)]
pub struct InitiativeQueue {
    entries: Vec<ScheduleEntry>,
}

impl InitiativeQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, sifting it up past lower-ranked parents.
    pub fn push(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
        self.sift_up(self.entries.len() - 1);
    }

    /// Remove and return the highest-ranked entry.
    pub fn pop(&mut self) -> Option<ScheduleEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let top = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    /// The highest-ranked entry without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&ScheduleEntry> {
        self.entries.first()
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in heap (array) order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter()
    }

    /// Entries in the order they would be popped.
    #[must_use]
    pub fn sorted(&self) -> Vec<ScheduleEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            b.initiative
                .cmp(&a.initiative)
                .then(a.sequence.cmp(&b.sequence))
        });
        sorted
    }

    /// Check that no entry outranks its parent.
    #[must_use]
    pub fn is_valid_heap(&self) -> bool {
        (1..self.entries.len()).all(|i| !self.entries[i].outranks(&self.entries[(i - 1) / 2]))
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.entries[idx].outranks(&self.entries[parent]) {
                break;
            }
            self.entries.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut best = idx;

            if left < len && self.entries[left].outranks(&self.entries[best]) {
                best = left;
            }
            if right < len && self.entries[right].outranks(&self.entries[best]) {
                best = right;
            }
            if best == idx {
                break;
            }
            self.entries.swap(idx, best);
            idx = best;
        }
    }
}

/// Round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoundPhase {
    /// Between rounds.
    #[default]
    Idle,
    /// Turns are being offered.
    Active,
    /// The queue ran dry and the round is being closed.
    Ending,
}

/// Why a popped actor was not offered a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The reference no longer resolves to an actor.
    Missing,
    /// The actor is flagged destroyed.
    Destroyed,
    /// The actor was removed earlier this round.
    RemovedThisRound,
    /// The actor has no action points left.
    NoActionPoints,
}

/// One row of a turn-order snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrderEntry {
    /// Queued actor.
    pub actor: ActorId,
    /// Its initiative score.
    #[serde(with = "decimal_serde")]
    pub initiative: Fixed,
}

/// Notifications produced by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    /// A new round began.
    RoundStarted {
        /// Round number.
        round: u64,
    },
    /// Queue contents at round start, in pop order.
    TurnOrder {
        /// Round number.
        round: u64,
        /// Actors and their scores.
        order: Vec<TurnOrderEntry>,
    },
    /// An actor was offered the turn.
    TurnStarted {
        /// Round number.
        round: u64,
        /// Actor holding the turn.
        actor: ActorId,
        /// Its action points.
        action_points: u32,
    },
    /// A popped actor was discarded without a turn.
    ActorSkipped {
        /// Discarded actor.
        actor: ActorId,
        /// Why it was discarded.
        reason: SkipReason,
    },
    /// An actor with action points left went back into the queue.
    ActorRequeued {
        /// Requeued actor.
        actor: ActorId,
        /// Fresh initiative score.
        #[serde(with = "decimal_serde")]
        initiative: Fixed,
        /// Remaining action points.
        action_points: u32,
    },
    /// The current turn was cancelled.
    TurnCancelled {
        /// Actor whose turn ended.
        actor: ActorId,
    },
    /// The queue ran dry.
    RoundEnded {
        /// Round number.
        round: u64,
    },
}

/// Priority-ordered turn scheduler.
#[derive(Debug, Clone)]
pub struct TurnScheduler {
    config: SchedulerConfig,
    phase: RoundPhase,
    round: u64,
    destroyed: BTreeSet<ActorId>,
    queue: InitiativeQueue,
    current: Option<ActorId>,
    rng: ChaCha8Rng,
    next_sequence: u64,
}

impl TurnScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            phase: RoundPhase::Idle,
            round: 0,
            destroyed: BTreeSet::new(),
            queue: InitiativeQueue::new(),
            current: None,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_sequence: 0,
        }
    }

    /// Current round number (0 before the first round).
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Actor currently holding the turn.
    #[must_use]
    pub const fn current_actor(&self) -> Option<ActorId> {
        self.current
    }

    /// Scheduler configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The pending queue.
    #[must_use]
    pub const fn queue(&self) -> &InitiativeQueue {
        &self.queue
    }

    /// Whether the actor was removed during the current round.
    #[must_use]
    pub fn is_removed_this_round(&self, actor: ActorId) -> bool {
        self.destroyed.contains(&actor)
    }

    /// Snapshot of the pending queue in pop order.
    #[must_use]
    pub fn turn_order(&self) -> Vec<TurnOrderEntry> {
        self.queue
            .sorted()
            .into_iter()
            .map(|e| TurnOrderEntry {
                actor: e.actor,
                initiative: e.initiative,
            })
            .collect()
    }

    /// Begin a round and offer the first turn.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::RoundInProgress`] if the previous round has
    /// not ended.
    pub fn start_new_round<R>(&mut self, registry: &mut R) -> Result<Vec<SchedulerEvent>, SchedulerError>
    where
        R: UnitRegistry + ?Sized,
    {
        if self.phase != RoundPhase::Idle {
            return Err(SchedulerError::RoundInProgress { round: self.round });
        }

        self.round += 1;
        self.destroyed.clear();
        self.queue.clear();
        self.current = None;
        self.phase = RoundPhase::Active;

        let mut events = vec![SchedulerEvent::RoundStarted { round: self.round }];

        for id in registry.live_actors() {
            let Some(actor) = registry.actor_mut(id) else {
                continue;
            };
            if actor.destroyed {
                continue;
            }
            actor.action_points = self.config.action_points_per_round;
            actor.queued = true;
            let entry = self.make_entry(actor);
            self.queue.push(entry);
        }
        self.validate_queue();

        tracing::info!(
            round = self.round,
            queued = self.queue.len(),
            "Round started"
        );

        events.push(SchedulerEvent::TurnOrder {
            round: self.round,
            order: self.turn_order(),
        });

        self.advance(registry, &mut events);
        Ok(events)
    }

    /// Report that the current actor finished an action costing `ap_used`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotCurrentActor`] if `actor` does not hold
    /// the turn.
    pub fn on_action_completed<R>(
        &mut self,
        registry: &mut R,
        actor: ActorId,
        ap_used: u32,
    ) -> Result<Vec<SchedulerEvent>, SchedulerError>
    where
        R: UnitRegistry + ?Sized,
    {
        if self.current != Some(actor) {
            return Err(SchedulerError::NotCurrentActor {
                actor,
                current: self.current,
            });
        }
        self.current = None;

        let mut events = Vec::new();
        let removed = self.destroyed.contains(&actor);

        if let Some(state) = registry.actor_mut(actor) {
            let remaining = state.spend_action_points(ap_used);
            if remaining > 0 && !state.destroyed && !removed {
                state.queued = true;
                let entry = self.make_entry(state);
                self.queue.push(entry);
                self.validate_queue();

                tracing::debug!(
                    actor = %actor,
                    initiative = %entry.initiative,
                    remaining,
                    "Actor requeued"
                );
                events.push(SchedulerEvent::ActorRequeued {
                    actor,
                    initiative: entry.initiative,
                    action_points: remaining,
                });
            }
        }

        self.advance(registry, &mut events);
        Ok(events)
    }

    /// The current actor passes, forfeiting its remaining action points.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NoActiveTurn`] if nobody holds the turn.
    pub fn end_turn<R>(&mut self, registry: &mut R) -> Result<Vec<SchedulerEvent>, SchedulerError>
    where
        R: UnitRegistry + ?Sized,
    {
        let actor = self.current.ok_or(SchedulerError::NoActiveTurn)?;
        let remaining = registry.actor(actor).map_or(0, |a| a.action_points);
        self.on_action_completed(registry, actor, remaining)
    }

    /// Abandon the current turn because its actor became invalid.
    ///
    /// The actor keeps its action points but is barred from the rest of the
    /// round.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NoActiveTurn`] if nobody holds the turn.
    pub fn cancel_current_turn<R>(&mut self, registry: &mut R) -> Result<Vec<SchedulerEvent>, SchedulerError>
    where
        R: UnitRegistry + ?Sized,
    {
        let actor = self.current.take().ok_or(SchedulerError::NoActiveTurn)?;
        self.destroyed.insert(actor);

        tracing::debug!(actor = %actor, "Turn cancelled");
        let mut events = vec![SchedulerEvent::TurnCancelled { actor }];
        self.advance(registry, &mut events);
        Ok(events)
    }

    /// Registry notification that an actor was destroyed.
    ///
    /// Any queued entry for it is skipped when popped; if it holds the turn,
    /// the turn is cancelled.
    pub fn on_actor_destroyed<R>(&mut self, registry: &mut R, actor: ActorId) -> Vec<SchedulerEvent>
    where
        R: UnitRegistry + ?Sized,
    {
        self.destroyed.insert(actor);
        if let Some(state) = registry.actor_mut(actor) {
            state.queued = false;
        }

        if self.current == Some(actor) {
            self.current = None;
            let mut events = vec![SchedulerEvent::TurnCancelled { actor }];
            self.advance(registry, &mut events);
            events
        } else {
            Vec::new()
        }
    }

    /// Pop until an eligible actor is found or the queue runs dry.
    fn advance<R>(&mut self, registry: &mut R, events: &mut Vec<SchedulerEvent>)
    where
        R: UnitRegistry + ?Sized,
    {
        if self.phase != RoundPhase::Active {
            return;
        }

        while let Some(entry) = self.queue.pop() {
            self.validate_queue();

            let removed = self.destroyed.contains(&entry.actor);
            let verdict = match registry.actor_mut(entry.actor) {
                None => Err(SkipReason::Missing),
                Some(actor) => {
                    actor.queued = false;
                    if actor.destroyed {
                        Err(SkipReason::Destroyed)
                    } else if removed {
                        Err(SkipReason::RemovedThisRound)
                    } else if actor.action_points == 0 {
                        Err(SkipReason::NoActionPoints)
                    } else {
                        Ok(actor.action_points)
                    }
                }
            };

            match verdict {
                Ok(action_points) => {
                    self.current = Some(entry.actor);
                    tracing::debug!(
                        round = self.round,
                        actor = %entry.actor,
                        initiative = %entry.initiative,
                        action_points,
                        "Turn started"
                    );
                    events.push(SchedulerEvent::TurnStarted {
                        round: self.round,
                        actor: entry.actor,
                        action_points,
                    });
                    return;
                }
                Err(reason) => {
                    tracing::debug!(actor = %entry.actor, ?reason, "Skipping ineligible actor");
                    events.push(SchedulerEvent::ActorSkipped {
                        actor: entry.actor,
                        reason,
                    });
                }
            }
        }

        self.end_round(registry, events);
    }

    fn end_round<R>(&mut self, registry: &mut R, events: &mut Vec<SchedulerEvent>)
    where
        R: UnitRegistry + ?Sized,
    {
        self.phase = RoundPhase::Ending;
        self.current = None;

        for id in registry.live_actors() {
            if let Some(actor) = registry.actor_mut(id) {
                actor.queued = false;
            }
        }

        tracing::info!(round = self.round, "Round ended");
        events.push(SchedulerEvent::RoundEnded { round: self.round });
        self.phase = RoundPhase::Idle;
    }

    fn make_entry(&mut self, actor: &Actor) -> ScheduleEntry {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        ScheduleEntry {
            initiative: self.roll_initiative(actor),
            actor: actor.id,
            sequence,
        }
    }

    /// `base + jitter(-j, j) + speed / 100`, saturating at the `Fixed` bounds.
    fn roll_initiative(&mut self, actor: &Actor) -> Fixed {
        let step = self.rng.gen_range(-JITTER_STEPS..=JITTER_STEPS);
        let jitter = self
            .config
            .initiative_jitter
            .saturating_mul(ratio(step, JITTER_STEPS));
        actor
            .initiative_base
            .saturating_add(jitter)
            .saturating_add(actor.speed / Fixed::from_num(100))
    }

    #[cfg(feature = "debug-validation")]
    fn validate_queue(&self) {
        assert!(self.queue.is_valid_heap(), "initiative heap invariant violated");
    }

    #[cfg(not(feature = "debug-validation"))]
    fn validate_queue(&self) {}
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorRoster, TeamId};

    fn actor(id: u32, base: i32, speed: i32) -> Actor {
        Actor::new(
            ActorId(id),
            TeamId(0),
            Fixed::from_num(base),
            Fixed::from_num(speed),
        )
    }

    fn entry(initiative: i32, actor: u32, sequence: u64) -> ScheduleEntry {
        ScheduleEntry {
            initiative: Fixed::from_num(initiative),
            actor: ActorId(actor),
            sequence,
        }
    }

    fn started(events: &[SchedulerEvent]) -> Vec<ActorId> {
        events
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::TurnStarted { actor, .. } => Some(*actor),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_queue_pops_highest_first() {
        let mut queue = InitiativeQueue::new();
        for (i, init) in [3, 9, 1, 7, 5, 8].into_iter().enumerate() {
            queue.push(entry(init, i as u32, i as u64));
            assert!(queue.is_valid_heap());
        }
        assert_eq!(queue.peek().unwrap().initiative, Fixed::from_num(9));

        let mut popped = Vec::new();
        while let Some(e) = queue.pop() {
            assert!(queue.is_valid_heap());
            popped.push(e.initiative.to_num::<i32>());
        }
        assert_eq!(popped, vec![9, 8, 7, 5, 3, 1]);
    }

    #[test]
    fn test_queue_ties_use_insertion_order() {
        let mut queue = InitiativeQueue::new();
        queue.push(entry(5, 1, 0));
        queue.push(entry(5, 2, 1));
        queue.push(entry(5, 3, 2));

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop()).map(|e| e.actor.0).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_sorted_matches_pop_order() {
        let mut queue = InitiativeQueue::new();
        for (i, init) in [4, 4, 10, -2, 6].into_iter().enumerate() {
            queue.push(entry(init, i as u32, i as u64));
        }
        let sorted: Vec<ActorId> = queue.sorted().iter().map(|e| e.actor).collect();
        let popped: Vec<ActorId> = std::iter::from_fn(|| queue.pop()).map(|e| e.actor).collect();
        assert_eq!(sorted, popped);
    }

    #[test]
    fn test_start_round_orders_by_initiative() {
        let mut roster: ActorRoster = [actor(1, 3, 0), actor(2, 9, 0), actor(3, 6, 0)]
            .into_iter()
            .collect();
        let mut scheduler = TurnScheduler::default();

        let events = scheduler.start_new_round(&mut roster).unwrap();
        assert_eq!(events[0], SchedulerEvent::RoundStarted { round: 1 });

        let SchedulerEvent::TurnOrder { order, .. } = &events[1] else {
            panic!("expected turn order snapshot, got {:?}", events[1]);
        };
        let ids: Vec<ActorId> = order.iter().map(|e| e.actor).collect();
        assert_eq!(ids, vec![ActorId(2), ActorId(3), ActorId(1)]);

        assert_eq!(started(&events), vec![ActorId(2)]);
        assert_eq!(scheduler.current_actor(), Some(ActorId(2)));
        assert_eq!(scheduler.phase(), RoundPhase::Active);
        assert_eq!(roster.actor(ActorId(1)).unwrap().action_points, 2);
    }

    #[test]
    fn test_initiative_formula_bounds() {
        let mut roster: ActorRoster = [actor(1, 5, 50)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        let events = scheduler.start_new_round(&mut roster).unwrap();

        let SchedulerEvent::TurnOrder { order, .. } = &events[1] else {
            panic!("expected turn order snapshot");
        };
        // 5 + 50/100 = 5.5, jitter within +/- 0.1
        let init = order[0].initiative;
        assert!(init >= ratio(54, 10) && init <= ratio(56, 10), "{init}");
    }

    #[test]
    fn test_extreme_initiative_saturates() {
        let mut roster: ActorRoster = [
            Actor::new(ActorId(1), TeamId(0), Fixed::MAX, Fixed::from_num(100)),
            Actor::new(ActorId(2), TeamId(1), Fixed::MIN, Fixed::from_num(-100)),
            actor(3, 5, 0),
        ]
        .into_iter()
        .collect();
        let mut scheduler = TurnScheduler::default();
        let events = scheduler.start_new_round(&mut roster).unwrap();

        let SchedulerEvent::TurnOrder { order, .. } = &events[1] else {
            panic!("expected turn order snapshot");
        };
        let ids: Vec<ActorId> = order.iter().map(|e| e.actor).collect();
        assert_eq!(ids, vec![ActorId(1), ActorId(3), ActorId(2)]);
        assert_eq!(order[0].initiative, Fixed::MAX);
        assert_eq!(order[2].initiative, Fixed::MIN);
        assert_eq!(scheduler.current_actor(), Some(ActorId(1)));
    }

    #[test]
    fn test_round_in_progress_error() {
        let mut roster: ActorRoster = [actor(1, 5, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        assert_eq!(
            scheduler.start_new_round(&mut roster),
            Err(SchedulerError::RoundInProgress { round: 1 })
        );
    }

    #[test]
    fn test_requeue_until_action_points_spent() {
        let mut roster: ActorRoster = [actor(1, 5, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();
        assert_eq!(scheduler.current_actor(), Some(ActorId(1)));

        let events = scheduler
            .on_action_completed(&mut roster, ActorId(1), 1)
            .unwrap();
        assert!(matches!(
            events[0],
            SchedulerEvent::ActorRequeued {
                actor: ActorId(1),
                action_points: 1,
                ..
            }
        ));
        assert_eq!(started(&events), vec![ActorId(1)]);

        let events = scheduler
            .on_action_completed(&mut roster, ActorId(1), 1)
            .unwrap();
        assert!(started(&events).is_empty());
        assert_eq!(events.last(), Some(&SchedulerEvent::RoundEnded { round: 1 }));
        assert_eq!(scheduler.phase(), RoundPhase::Idle);
        assert_eq!(scheduler.current_actor(), None);
    }

    #[test]
    fn test_completion_from_wrong_actor_rejected() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 1, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        assert_eq!(
            scheduler.on_action_completed(&mut roster, ActorId(2), 1),
            Err(SchedulerError::NotCurrentActor {
                actor: ActorId(2),
                current: Some(ActorId(1)),
            })
        );
    }

    #[test]
    fn test_end_turn_forfeits_remaining_points() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 1, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        let events = scheduler.end_turn(&mut roster).unwrap();
        assert_eq!(started(&events), vec![ActorId(2)]);
        assert_eq!(roster.actor(ActorId(1)).unwrap().action_points, 0);
    }

    #[test]
    fn test_cancel_current_turn_bars_actor() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 1, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        let events = scheduler.cancel_current_turn(&mut roster).unwrap();
        assert_eq!(events[0], SchedulerEvent::TurnCancelled { actor: ActorId(1) });
        assert_eq!(started(&events), vec![ActorId(2)]);
        assert!(scheduler.is_removed_this_round(ActorId(1)));
        // Points are kept, not deducted
        assert_eq!(roster.actor(ActorId(1)).unwrap().action_points, 2);

        // Actor 2 spends everything; actor 1 must not come back
        let events = scheduler.end_turn(&mut roster).unwrap();
        assert!(started(&events).is_empty());
        assert_eq!(events.last(), Some(&SchedulerEvent::RoundEnded { round: 1 }));
    }

    #[test]
    fn test_cancel_without_turn_errors() {
        let mut roster = ActorRoster::new();
        let mut scheduler = TurnScheduler::default();
        assert_eq!(
            scheduler.cancel_current_turn(&mut roster),
            Err(SchedulerError::NoActiveTurn)
        );
    }

    #[test]
    fn test_destroyed_actor_skipped_when_popped() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 5, 0), actor(3, 1, 0)]
            .into_iter()
            .collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        roster.mark_destroyed(ActorId(2));
        assert!(scheduler
            .on_actor_destroyed(&mut roster, ActorId(2))
            .is_empty());

        let events = scheduler.end_turn(&mut roster).unwrap();
        assert!(events.contains(&SchedulerEvent::ActorSkipped {
            actor: ActorId(2),
            reason: SkipReason::Destroyed,
        }));
        assert_eq!(started(&events), vec![ActorId(3)]);
    }

    #[test]
    fn test_destroying_current_actor_advances() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 1, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        roster.mark_destroyed(ActorId(1));
        let events = scheduler.on_actor_destroyed(&mut roster, ActorId(1));
        assert_eq!(events[0], SchedulerEvent::TurnCancelled { actor: ActorId(1) });
        assert_eq!(scheduler.current_actor(), Some(ActorId(2)));
    }

    #[test]
    fn test_missing_actor_skipped() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 1, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();

        roster.remove(ActorId(2));
        let events = scheduler.end_turn(&mut roster).unwrap();
        assert!(events.contains(&SchedulerEvent::ActorSkipped {
            actor: ActorId(2),
            reason: SkipReason::Missing,
        }));
        assert_eq!(events.last(), Some(&SchedulerEvent::RoundEnded { round: 1 }));
    }

    #[test]
    fn test_zero_allotment_ends_round_immediately() {
        let mut roster: ActorRoster = [actor(1, 9, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::new(SchedulerConfig {
            action_points_per_round: 0,
            ..SchedulerConfig::default()
        });

        let events = scheduler.start_new_round(&mut roster).unwrap();
        assert!(started(&events).is_empty());
        assert_eq!(events.last(), Some(&SchedulerEvent::RoundEnded { round: 1 }));
        assert_eq!(scheduler.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_destroyed_set_cleared_next_round() {
        let mut roster: ActorRoster = [actor(1, 9, 0), actor(2, 1, 0)].into_iter().collect();
        let mut scheduler = TurnScheduler::default();
        scheduler.start_new_round(&mut roster).unwrap();
        scheduler.cancel_current_turn(&mut roster).unwrap();
        scheduler.end_turn(&mut roster).unwrap();
        assert_eq!(scheduler.phase(), RoundPhase::Idle);

        let events = scheduler.start_new_round(&mut roster).unwrap();
        assert!(!scheduler.is_removed_this_round(ActorId(1)));
        assert_eq!(started(&events), vec![ActorId(1)]);
        assert_eq!(scheduler.round(), 2);
    }

    #[test]
    fn test_same_seed_same_order() {
        let build = || -> ActorRoster {
            (1..=6).map(|id| actor(id, 5, 0)).collect()
        };
        let config = SchedulerConfig {
            seed: 77,
            ..SchedulerConfig::default()
        };

        let mut a = TurnScheduler::new(config);
        let mut b = TurnScheduler::new(config);
        let mut roster_a = build();
        let mut roster_b = build();
        assert_eq!(
            a.start_new_round(&mut roster_a).unwrap(),
            b.start_new_round(&mut roster_b).unwrap()
        );
    }
}
