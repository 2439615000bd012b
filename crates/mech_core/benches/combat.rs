//! Combat benchmarks for mech_core.
//!
//! Run with: `cargo bench -p mech_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mech_core::prelude::*;
use mech_test_utils::determinism::Skirmish;
use mech_test_utils::fixtures::{lrm10, FakeBattlefield};

/// Dice engine throughput across roll modes.
pub fn dice_benchmark(c: &mut Criterion) {
    let mut engine = DiceEngine::new(SeededDice::new(1));
    c.bench_function("roll_2d6", |b| b.iter(|| black_box(engine.roll_2d6(0))));

    let spec = RollSpec::new(6, 10).with_type(RollType::Exploding);
    c.bench_function("roll_6d10_exploding", |b| {
        b.iter(|| black_box(engine.roll(black_box(&spec))))
    });
}

/// Full cluster-weapon resolution including per-missile lookups.
pub fn resolution_benchmark(c: &mut Criterion) {
    let mut resolver = CombatResolver::new(DiceEngine::new(SeededDice::new(2)));
    let mut field = FakeBattlefield::new();
    let weapon = lrm10(1, 21);

    c.bench_function("resolve_lrm10", |b| {
        b.iter(|| {
            let context = AttackContext::new(ActorId(1), ActorId(2), weapon.clone());
            black_box(resolver.resolve_attack(context, &mut field))
        })
    });
}

/// Whole rounds of a 2v2 skirmish.
pub fn round_benchmark(c: &mut Criterion) {
    c.bench_function("skirmish_round", |b| {
        b.iter(|| {
            let mut skirmish = Skirmish::new(black_box(3));
            skirmish.play_round();
            black_box(skirmish.events.len())
        })
    });
}

criterion_group!(benches, dice_benchmark, resolution_benchmark, round_benchmark);
criterion_main!(benches);
