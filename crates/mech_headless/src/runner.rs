//! Headless battle runner.
//!
//! Drives a [`Battle`] over a [`HexField`] with a simple controller: every
//! unit fires the first usable weapon at the nearest visible enemy and passes
//! when it has nothing to shoot.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use mech_core::actor::{ActorId, UnitRegistry};
use mech_core::battle::{Battle, BattleEvent};
use mech_core::combat::{AmmoSystem, AttackResult, GridService, HeatSystem};
use mech_core::error::Result;
use mech_core::weapons::WeaponSpec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::field::HexField;
use crate::scenario::Scenario;

/// Per-unit statistics from one battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Unit id.
    pub id: u32,
    /// Team membership.
    pub team: u8,
    /// Attacks that fired.
    pub shots: u32,
    /// Attacks with at least one hit.
    pub hits: u32,
    /// Damage dealt to enemies.
    pub damage_dealt: u32,
    /// Damage received.
    pub damage_taken: u32,
    /// Whether the unit was destroyed.
    pub destroyed: bool,
}

/// Outcome of one headless battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed the battle ran with.
    pub seed: u64,
    /// Rounds played.
    pub rounds: u32,
    /// Winning team, or `None` for a draw.
    pub winner: Option<u8>,
    /// Units still standing.
    pub survivors: Vec<u32>,
    /// Per-unit statistics ordered by id.
    pub units: Vec<UnitReport>,
    /// Number of events emitted.
    pub event_count: u64,
    /// Hash over the full event stream.
    pub event_hash: u64,
}

/// Runs a single scenario to completion.
pub struct BattleRunner {
    scenario_name: String,
    seed: u64,
    max_rounds: u32,
    rounds: u32,
    battle: Battle,
    field: HexField,
    loadouts: BTreeMap<ActorId, Vec<WeaponSpec>>,
    stats: BTreeMap<ActorId, UnitReport>,
    hasher: DefaultHasher,
    event_count: u64,
}

impl BattleRunner {
    /// Set up a battle for `scenario`, overriding every seed from `seed`.
    #[must_use]
    pub fn new(scenario: &Scenario, seed: u64) -> Self {
        let mut config = scenario.combat.clone();
        config.scheduler.seed = seed;
        config.dice.seed = seed.wrapping_add(1);

        let battle = Battle::from_config(scenario.roster(), &config);
        let field = scenario.field(seed.wrapping_add(2));

        let loadouts = scenario
            .units
            .iter()
            .map(|unit| (ActorId(unit.id), scenario.loadout(unit)))
            .collect();
        let stats = scenario
            .units
            .iter()
            .map(|unit| {
                let report = UnitReport {
                    id: unit.id,
                    team: unit.team,
                    ..UnitReport::default()
                };
                (ActorId(unit.id), report)
            })
            .collect();

        Self {
            scenario_name: scenario.name.clone(),
            seed,
            max_rounds: scenario.max_rounds,
            rounds: 0,
            battle,
            field,
            loadouts,
            stats,
            hasher: DefaultHasher::new(),
            event_count: 0,
        }
    }

    /// Builder method to override the round limit.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// The battle being driven.
    #[must_use]
    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    /// The battlefield.
    #[must_use]
    pub fn field(&self) -> &HexField {
        &self.field
    }

    /// Rounds played so far.
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Play until one team remains or the round limit is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the battle is driven out of order, which indicates
    /// a bug in the controller.
    pub fn run(mut self) -> Result<BattleReport> {
        info!(
            scenario = %self.scenario_name,
            seed = self.seed,
            max_rounds = self.max_rounds,
            "Starting battle"
        );

        while !self.battle.is_over() && self.rounds < self.max_rounds {
            self.play_round()?;
        }

        let report = self.report();
        info!(
            rounds = report.rounds,
            winner = ?report.winner,
            survivors = report.survivors.len(),
            "Battle finished"
        );
        Ok(report)
    }

    /// Play one full round.
    ///
    /// # Errors
    ///
    /// Returns an error if the battle is driven out of order.
    pub fn play_round(&mut self) -> Result<()> {
        self.field.start_round();
        let events = self.battle.start_round()?;
        self.record(&events);
        self.rounds += 1;
        debug!(round = self.rounds, "Round started");

        while let Some(actor) = self.battle.current_actor() {
            let events = match self.choose_attack(actor) {
                Some((target, weapon)) => {
                    let (result, mut events) =
                        self.battle.attack(target, weapon, 0, &mut self.field)?;
                    self.tally(&result);
                    if !result.fired() {
                        debug!(actor = %actor, rejection = ?result.rejection, "Attack rejected");
                        events.extend(self.battle.end_turn()?);
                    } else if result.action_points_used == 0
                        && self.battle.current_actor() == Some(actor)
                    {
                        // A free action would requeue the actor forever
                        events.extend(self.battle.end_turn()?);
                    }
                    events
                }
                None => self.battle.end_turn()?,
            };
            self.record(&events);
            self.sync_destroyed()?;
        }
        Ok(())
    }

    /// Nearest visible enemy and the first weapon that can reach it.
    fn choose_attack(&self, actor: ActorId) -> Option<(ActorId, WeaponSpec)> {
        if !self.field.can_fire(actor) {
            return None;
        }
        let team = self.battle.roster().actor(actor)?.team;

        let mut enemies: Vec<(u32, ActorId)> = self
            .battle
            .roster()
            .iter()
            .filter(|a| a.team != team && !a.destroyed)
            .filter(|a| self.field.has_clear_path(actor, a.id))
            .filter_map(|a| Some((self.field.distance(actor, a.id)?, a.id)))
            .collect();
        enemies.sort_unstable();

        let loadout = self.loadouts.get(&actor)?;
        enemies.into_iter().find_map(|(distance, target)| {
            loadout
                .iter()
                .find(|w| {
                    w.in_range(distance)
                        && (!w.category.uses_ammo() || self.field.has_ammo(actor, w))
                })
                .map(|w| (target, w.clone()))
        })
    }

    fn tally(&mut self, result: &AttackResult) {
        if !result.fired() {
            return;
        }
        if let Some(stats) = self.stats.get_mut(&result.attacker) {
            stats.shots += 1;
            stats.hits += u32::from(result.hit);
            stats.damage_dealt += result.damage;
        }
        if let Some(stats) = self.stats.get_mut(&result.target) {
            stats.damage_taken += result.damage;
        }
    }

    /// Units lost to ammunition explosions are only known to the field.
    fn sync_destroyed(&mut self) -> Result<()> {
        let lost: Vec<ActorId> = self
            .battle
            .roster()
            .iter()
            .filter(|a| !a.destroyed && self.field.is_destroyed(a.id))
            .map(|a| a.id)
            .collect();
        for actor in lost {
            let events = self.battle.destroy_actor(actor)?;
            self.record(&events);
        }
        Ok(())
    }

    fn record(&mut self, events: &[BattleEvent]) {
        for event in events {
            format!("{event:?}").hash(&mut self.hasher);
        }
        self.event_count += events.len() as u64;
    }

    fn report(&self) -> BattleReport {
        let roster = self.battle.roster();
        let units: Vec<UnitReport> = self
            .stats
            .iter()
            .map(|(id, stats)| UnitReport {
                destroyed: roster.actor(*id).map_or(true, |a| a.destroyed),
                ..stats.clone()
            })
            .collect();

        BattleReport {
            scenario: self.scenario_name.clone(),
            seed: self.seed,
            rounds: self.rounds,
            winner: self.battle.winner().map(|team| team.0),
            survivors: units.iter().filter(|u| !u.destroyed).map(|u| u.id).collect(),
            units,
            event_count: self.event_count,
            event_hash: self.hasher.finish(),
        }
    }
}

/// Run `scenario` once with `seed`.
///
/// # Errors
///
/// Returns an error if the battle is driven out of order.
pub fn run_battle(scenario: &Scenario, seed: u64) -> Result<BattleReport> {
    BattleRunner::new(scenario, seed).run()
}
