//! Property-based tests for the dice engine and the turn scheduler.

use std::collections::BTreeSet;

use mech_core::prelude::*;
use mech_core::scheduler::{InitiativeQueue, ScheduleEntry};
use mech_test_utils::determinism::strategies::{
    arb_ap_costs, arb_initiative_stats, arb_roll_spec,
};
use mech_test_utils::fixtures::{actor, roster};
use proptest::prelude::*;

fn turn_started(events: &[SchedulerEvent]) -> Option<ActorId> {
    events.iter().find_map(|e| match e {
        SchedulerEvent::TurnStarted { actor, .. } => Some(*actor),
        _ => None,
    })
}

proptest! {
    /// Every push and pop leaves a valid max-heap, and pops come out in
    /// non-increasing initiative order.
    #[test]
    fn prop_queue_keeps_heap_invariant(
        scores in proptest::collection::vec(-1000i32..1000, 0..64),
        pops in 0usize..64,
    ) {
        let mut queue = InitiativeQueue::new();
        for (i, score) in scores.iter().enumerate() {
            queue.push(ScheduleEntry {
                initiative: Fixed::from_num(*score),
                actor: ActorId(i as u32),
                sequence: i as u64,
            });
            prop_assert!(queue.is_valid_heap());
        }

        let mut last: Option<Fixed> = None;
        for _ in 0..pops {
            let Some(entry) = queue.pop() else { break };
            prop_assert!(queue.is_valid_heap());
            if let Some(prev) = last {
                prop_assert!(entry.initiative <= prev);
            }
            last = Some(entry.initiative);
        }
    }

    /// Valid specs always produce in-range faces and a consistent total.
    #[test]
    fn prop_roll_results_are_well_formed(spec in arb_roll_spec(), seed in any::<u64>()) {
        let mut engine = DiceEngine::new(SeededDice::new(seed));
        let result = engine.roll(&spec).unwrap();

        prop_assert!(result.raw_results.len() >= spec.count as usize);
        prop_assert!(result.raw_results.iter().all(|&d| (1..=spec.sides).contains(&d)));

        match spec.roll_type {
            RollType::Exploding => {
                prop_assert!(result.raw_results.len() <= spec.count as usize + mech_core::dice::MAX_EXPLOSIONS);
            }
            RollType::Standard
            | RollType::DropLowest
            | RollType::DropHighest
            | RollType::SuccessCount
            | RollType::TargetNumber => {
                prop_assert_eq!(result.raw_results.len(), spec.count as usize);
            }
        }
    }

    /// Drop rules remove exactly one extreme die.
    #[test]
    fn prop_drop_rules(count in 1u32..10, sides in 2u32..20, modifier in -5i32..5, seed in any::<u64>()) {
        let mut engine = DiceEngine::new(SeededDice::new(seed));

        let spec = RollSpec::new(count, sides).with_modifier(modifier).with_type(RollType::DropLowest);
        let result = engine.roll(&spec).unwrap();
        let min = *result.raw_results.iter().min().unwrap();
        let sum: i32 = result.raw_results.iter().map(|&d| d as i32).sum();
        prop_assert_eq!(&result.dropped, &vec![min]);
        prop_assert_eq!(result.total, RollTotal::Value(sum - min as i32 + modifier));

        let spec = spec.with_type(RollType::DropHighest);
        let result = engine.roll(&spec).unwrap();
        let max = *result.raw_results.iter().max().unwrap();
        let sum: i32 = result.raw_results.iter().map(|&d| d as i32).sum();
        prop_assert_eq!(&result.dropped, &vec![max]);
        prop_assert_eq!(result.total, RollTotal::Value(sum - max as i32 + modifier));
    }

    /// Exploding rolls terminate and only extend past the base count when a
    /// maximum face came up.
    #[test]
    fn prop_exploding_terminates(count in 1u32..6, sides in 2u32..4, seed in any::<u64>()) {
        let mut engine = DiceEngine::new(SeededDice::new(seed));
        let spec = RollSpec::new(count, sides).with_type(RollType::Exploding);
        let result = engine.roll(&spec).unwrap();

        let base = count as usize;
        let maxed = result.raw_results.iter().filter(|&&d| d == sides).count();
        prop_assert!(result.raw_results.len() <= base + maxed);
        prop_assert!(result.raw_results.len() <= base + mech_core::dice::MAX_EXPLOSIONS);
    }

    /// No actor is offered a turn at zero action points or twice without
    /// spending, and every round terminates.
    #[test]
    fn prop_no_double_offer(
        stats in arb_initiative_stats(),
        costs in arb_ap_costs(64),
        seed in any::<u64>(),
    ) {
        let mut registry: ActorRoster = stats
            .iter()
            .enumerate()
            .map(|(i, &(base, speed))| actor(i as u32, 0, base, speed))
            .collect();
        let mut scheduler = TurnScheduler::new(SchedulerConfig { seed, ..SchedulerConfig::default() });

        let events = scheduler.start_new_round(&mut registry).unwrap();
        let mut offered = turn_started(&events);
        let mut costs = costs.into_iter();
        let mut turns = 0;

        while let Some(current) = offered {
            let ap = registry.actor(current).unwrap().action_points;
            prop_assert!(ap > 0);
            prop_assert!(!registry.actor(current).unwrap().queued);

            // Zero-cost actions would requeue forever
            let cost = costs.next().unwrap_or(1).max(1);
            let events = scheduler.on_action_completed(&mut registry, current, cost).unwrap();
            offered = turn_started(&events);
            turns += 1;
            prop_assert!(turns <= stats.len() * 2);
        }

        prop_assert_eq!(scheduler.phase(), RoundPhase::Idle);
        prop_assert!(scheduler.queue().is_empty());
        prop_assert!(registry.iter().all(|a| !a.queued));
    }

    /// Actors destroyed mid-round are never offered again that round.
    #[test]
    fn prop_destroyed_never_offered(stats in arb_initiative_stats(), victim in 0u32..12) {
        let mut registry: ActorRoster = stats
            .iter()
            .enumerate()
            .map(|(i, &(base, speed))| actor(i as u32, 0, base, speed))
            .collect();
        let mut scheduler = TurnScheduler::default();

        let mut events = scheduler.start_new_round(&mut registry).unwrap();
        registry.mark_destroyed(ActorId(victim));
        events.extend(scheduler.on_actor_destroyed(&mut registry, ActorId(victim)));

        let mut seen = BTreeSet::new();
        let mut offered = events.iter().rev().find_map(|e| match e {
            SchedulerEvent::TurnStarted { actor, .. } => Some(*actor),
            _ => None,
        }).filter(|_| scheduler.current_actor().is_some());

        while let Some(current) = offered {
            prop_assert_ne!(current, ActorId(victim));
            seen.insert(current);
            let events = scheduler.end_turn(&mut registry).unwrap();
            offered = turn_started(&events);
        }
        prop_assert!(!seen.contains(&ActorId(victim)));
    }
}

#[test]
fn test_requeue_scenario() {
    let mut registry = roster(&[(1, 0, 5, 0)]);
    let mut scheduler = TurnScheduler::new(SchedulerConfig {
        action_points_per_round: 2,
        ..SchedulerConfig::default()
    });

    let events = scheduler.start_new_round(&mut registry).unwrap();
    assert_eq!(turn_started(&events), Some(ActorId(1)));

    let events = scheduler
        .on_action_completed(&mut registry, ActorId(1), 1)
        .unwrap();
    assert!(matches!(
        events[0],
        SchedulerEvent::ActorRequeued {
            actor: ActorId(1),
            action_points: 1,
            ..
        }
    ));
    assert_eq!(turn_started(&events), Some(ActorId(1)));

    let events = scheduler
        .on_action_completed(&mut registry, ActorId(1), 1)
        .unwrap();
    assert_eq!(turn_started(&events), None);
    assert!(matches!(
        events.last(),
        Some(SchedulerEvent::RoundEnded { round: 1 })
    ));
    assert_eq!(registry.actor(ActorId(1)).unwrap().action_points, 0);
}

#[test]
fn test_two_d6_scenario() {
    let mut engine = DiceEngine::new(mech_test_utils::fixtures::ScriptedDice::new(&[3, 5]));
    let result = engine.roll(&RollSpec::two_d6()).unwrap();
    assert_eq!(result.raw_results, vec![3, 5]);
    assert_eq!(result.total, RollTotal::Value(8));
    assert!(!result.is_critical_success);
    assert!(!result.is_critical_failure);
}
