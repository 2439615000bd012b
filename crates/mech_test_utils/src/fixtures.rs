//! Test fixtures and helpers.
//!
//! Scripted dice, a recording battlefield that implements every combat
//! collaborator, and ready-made actors and weapons.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fixed::types::I32F32;
use mech_core::actor::{Actor, ActorId, ActorRoster, TeamId};
use mech_core::combat::{
    AmmoSystem, ArmorSystem, DamageReport, GridService, HeatSystem, HitLocationResolver,
    LocationRef, ShutdownCheck,
};
use mech_core::dice::{DiceEngine, DieSource};
use mech_core::error::CollaboratorError;
use mech_core::weapons::{WeaponCategory, WeaponId, WeaponSpec};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// A live actor with the given initiative base and speed.
#[must_use]
pub fn actor(id: u32, team: u8, initiative_base: i32, speed: i32) -> Actor {
    Actor::new(
        ActorId(id),
        TeamId(team),
        fixed(initiative_base),
        fixed(speed),
    )
}

/// A roster of `(id, team, initiative_base, speed)` actors.
#[must_use]
pub fn roster(actors: &[(u32, u8, i32, i32)]) -> ActorRoster {
    actors
        .iter()
        .map(|&(id, team, base, speed)| actor(id, team, base, speed))
        .collect()
}

/// Medium laser: energy, range 0-9, 5 damage, to-hit 8.
#[must_use]
pub fn medium_laser() -> WeaponSpec {
    WeaponSpec::new(WeaponId(1), "Medium Laser", WeaponCategory::Energy)
        .with_range(0, 9)
        .with_damage(5)
        .with_heat(3)
        .with_to_hit(8)
}

/// AC/10: ballistic, range 0-15, 10 damage, to-hit 8.
#[must_use]
pub fn autocannon() -> WeaponSpec {
    WeaponSpec::new(WeaponId(2), "AC/10", WeaponCategory::Ballistic)
        .with_range(0, 15)
        .with_damage(10)
        .with_heat(3)
        .with_to_hit(8)
}

/// LRM-10 with the given per-missile damage and range band.
#[must_use]
pub fn lrm10(damage_per_missile: u32, max_range: u32) -> WeaponSpec {
    WeaponSpec::missile_rack(WeaponId(10), "LRM-10", 10, damage_per_missile)
        .with_range(0, max_range)
        .with_heat(4)
}

/// Kick: physical, adjacent only.
#[must_use]
pub fn kick() -> WeaponSpec {
    WeaponSpec::new(WeaponId(20), "Kick", WeaponCategory::Physical)
        .with_range(1, 1)
        .with_damage(8)
        .with_to_hit(7)
}

/// Die source that replays a fixed list of faces.
///
/// Once the script runs out it keeps returning the fallback face.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
    fallback: u32,
    rolled: usize,
}

impl ScriptedDice {
    /// Replay `faces`, then fall back to 1.
    #[must_use]
    pub fn new(faces: &[u32]) -> Self {
        Self {
            faces: faces.iter().copied().collect(),
            fallback: 1,
            rolled: 0,
        }
    }

    /// Builder method to set the face returned after the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, face: u32) -> Self {
        self.fallback = face;
        self
    }

    /// Number of dice rolled so far.
    #[must_use]
    pub fn rolled(&self) -> usize {
        self.rolled
    }
}

impl DieSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rolled += 1;
        self.faces.pop_front().unwrap_or(self.fallback).clamp(1, sides.max(1))
    }
}

/// Dice engine replaying `faces`.
#[must_use]
pub fn scripted_engine(faces: &[u32]) -> DiceEngine<ScriptedDice> {
    DiceEngine::new(ScriptedDice::new(faces))
}

/// How many times each collaborator method was called.
#[derive(Debug, Default)]
pub struct CallCounts {
    /// `GridService::distance`.
    pub distance: Cell<u32>,
    /// `GridService::has_clear_path`.
    pub has_clear_path: Cell<u32>,
    /// `HeatSystem::can_fire`.
    pub can_fire: Cell<u32>,
    /// `AmmoSystem::has_ammo`.
    pub has_ammo: Cell<u32>,
    /// `AmmoSystem::consume_ammo`.
    pub consume_ammo: u32,
    /// `AmmoSystem::trigger_explosion`.
    pub trigger_explosion: u32,
    /// `HeatSystem::add_heat`.
    pub add_heat: u32,
    /// `HeatSystem::check_shutdown`.
    pub check_shutdown: u32,
    /// `HitLocationResolver::get_hit_location`.
    pub get_hit_location: u32,
    /// `ArmorSystem::apply_damage`.
    pub apply_damage: u32,
}

fn bump(counter: &Cell<u32>) {
    counter.set(counter.get() + 1);
}

/// Recording fake implementing every combat collaborator.
///
/// By default every actor is 1 hex from every other, paths are clear,
/// nobody overheats, ammunition is unlimited and every hit lands on the
/// center torso of an indestructible target. Builder methods tighten any of
/// those.
#[derive(Debug)]
pub struct FakeBattlefield {
    default_distance: Option<u32>,
    distances: BTreeMap<(ActorId, ActorId), u32>,
    blocked: BTreeSet<(ActorId, ActorId)>,
    overheated: BTreeSet<ActorId>,
    ammo: BTreeMap<ActorId, u32>,
    locations: VecDeque<Option<LocationRef>>,
    structure: BTreeMap<ActorId, u32>,
    explosive: BTreeSet<(ActorId, LocationRef)>,
    shutdown_at: Option<u32>,
    failing_shutdown: bool,
    /// Accumulated heat per actor.
    pub heat: BTreeMap<ActorId, u32>,
    /// Every damage application, in order.
    pub damage_log: Vec<(ActorId, LocationRef, u32)>,
    /// Every explosion triggered, in order.
    pub explosions: Vec<(ActorId, LocationRef)>,
    /// Collaborator call counters.
    pub calls: CallCounts,
}

impl Default for FakeBattlefield {
    fn default() -> Self {
        Self {
            default_distance: Some(1),
            distances: BTreeMap::new(),
            blocked: BTreeSet::new(),
            overheated: BTreeSet::new(),
            ammo: BTreeMap::new(),
            locations: VecDeque::new(),
            structure: BTreeMap::new(),
            explosive: BTreeSet::new(),
            shutdown_at: None,
            failing_shutdown: false,
            heat: BTreeMap::new(),
            damage_log: Vec::new(),
            explosions: Vec::new(),
            calls: CallCounts::default(),
        }
    }
}

impl FakeBattlefield {
    /// A permissive battlefield.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the distance used for unlisted pairs.
    #[must_use]
    pub fn with_default_distance(mut self, distance: Option<u32>) -> Self {
        self.default_distance = distance;
        self
    }

    /// Builder method to set the distance between two actors (both ways).
    #[must_use]
    pub fn with_distance(mut self, a: ActorId, b: ActorId, distance: u32) -> Self {
        self.distances.insert((a, b), distance);
        self.distances.insert((b, a), distance);
        self
    }

    /// Builder method to block line of sight between two actors.
    #[must_use]
    pub fn with_blocked(mut self, a: ActorId, b: ActorId) -> Self {
        self.blocked.insert((a, b));
        self.blocked.insert((b, a));
        self
    }

    /// Builder method to mark an actor as too hot to fire.
    #[must_use]
    pub fn with_overheated(mut self, actor: ActorId) -> Self {
        self.overheated.insert(actor);
        self
    }

    /// Builder method to give an actor a limited ammunition bin.
    #[must_use]
    pub fn with_ammo(mut self, actor: ActorId, shots: u32) -> Self {
        self.ammo.insert(actor, shots);
        self
    }

    /// Builder method to script hit locations; `None` simulates a lookup
    /// failure.
    #[must_use]
    pub fn with_locations(mut self, locations: &[Option<LocationRef>]) -> Self {
        self.locations = locations.iter().copied().collect();
        self
    }

    /// Builder method to make an actor destructible with `points` of
    /// structure.
    #[must_use]
    pub fn with_structure(mut self, actor: ActorId, points: u32) -> Self {
        self.structure.insert(actor, points);
        self
    }

    /// Builder method to store explosive ammunition at a location.
    #[must_use]
    pub fn with_explosive(mut self, actor: ActorId, location: LocationRef) -> Self {
        self.explosive.insert((actor, location));
        self
    }

    /// Builder method to shut actors down once their heat reaches `limit`.
    #[must_use]
    pub fn with_shutdown_at(mut self, limit: u32) -> Self {
        self.shutdown_at = Some(limit);
        self
    }

    /// Builder method to make every shutdown check fail.
    #[must_use]
    pub fn with_failing_shutdown(mut self) -> Self {
        self.failing_shutdown = true;
        self
    }

    /// Shots left in an actor's bin, if it has a limited one.
    #[must_use]
    pub fn ammo_left(&self, actor: ActorId) -> Option<u32> {
        self.ammo.get(&actor).copied()
    }

    /// Structure left on a destructible actor.
    #[must_use]
    pub fn structure_left(&self, actor: ActorId) -> Option<u32> {
        self.structure.get(&actor).copied()
    }

    /// Total damage applied to an actor.
    #[must_use]
    pub fn damage_taken(&self, actor: ActorId) -> u32 {
        self.damage_log
            .iter()
            .filter(|(target, _, _)| *target == actor)
            .map(|(_, _, amount)| amount)
            .sum()
    }
}

impl GridService for FakeBattlefield {
    fn distance(&self, from: ActorId, to: ActorId) -> Option<u32> {
        bump(&self.calls.distance);
        self.distances
            .get(&(from, to))
            .copied()
            .or(self.default_distance)
    }

    fn has_clear_path(&self, from: ActorId, to: ActorId) -> bool {
        bump(&self.calls.has_clear_path);
        !self.blocked.contains(&(from, to))
    }
}

impl HeatSystem for FakeBattlefield {
    fn can_fire(&self, actor: ActorId) -> bool {
        bump(&self.calls.can_fire);
        !self.overheated.contains(&actor)
    }

    fn add_heat(&mut self, actor: ActorId, amount: u32) {
        self.calls.add_heat += 1;
        *self.heat.entry(actor).or_default() += amount;
    }

    fn check_shutdown(&mut self, actor: ActorId) -> Result<ShutdownCheck, CollaboratorError> {
        self.calls.check_shutdown += 1;
        if self.failing_shutdown {
            return Err(CollaboratorError::ServiceFailed {
                service: "heat",
                message: "sensor offline".to_string(),
            });
        }
        let heat = self.heat.get(&actor).copied().unwrap_or_default();
        match self.shutdown_at {
            Some(limit) if heat >= limit => {
                self.overheated.insert(actor);
                Ok(ShutdownCheck::ShutDown)
            }
            _ => Ok(ShutdownCheck::Running),
        }
    }
}

impl AmmoSystem for FakeBattlefield {
    fn has_ammo(&self, actor: ActorId, _weapon: &WeaponSpec) -> bool {
        bump(&self.calls.has_ammo);
        self.ammo.get(&actor).map_or(true, |&shots| shots > 0)
    }

    fn consume_ammo(&mut self, actor: ActorId, _weapon: &WeaponSpec) -> u32 {
        self.calls.consume_ammo += 1;
        match self.ammo.get_mut(&actor) {
            Some(shots) if *shots > 0 => {
                *shots -= 1;
                1
            }
            Some(_) => 0,
            None => 1,
        }
    }

    fn trigger_explosion(
        &mut self,
        actor: ActorId,
        location: LocationRef,
    ) -> Result<(), CollaboratorError> {
        self.calls.trigger_explosion += 1;
        self.explosive.remove(&(actor, location));
        self.explosions.push((actor, location));
        Ok(())
    }
}

impl HitLocationResolver for FakeBattlefield {
    fn get_hit_location(&mut self, _target: ActorId) -> Option<LocationRef> {
        self.calls.get_hit_location += 1;
        self.locations
            .pop_front()
            .unwrap_or(Some(LocationRef::CenterTorso))
    }
}

impl ArmorSystem for FakeBattlefield {
    fn apply_damage(&mut self, target: ActorId, location: LocationRef, amount: u32) -> DamageReport {
        self.calls.apply_damage += 1;
        self.damage_log.push((target, location, amount));
        tracing::trace!(target = %target, ?location, amount, "Fake damage applied");

        let unit_destroyed = match self.structure.get_mut(&target) {
            Some(points) if *points > 0 => {
                *points = points.saturating_sub(amount);
                *points == 0
            }
            _ => false,
        };

        DamageReport {
            section_destroyed: unit_destroyed,
            unit_destroyed,
            ammo_exploded: self.explosive.contains(&(target, location)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_dice_replay_then_fallback() {
        let mut dice = ScriptedDice::new(&[3, 5]).with_fallback(6);
        assert_eq!(dice.roll_die(6), 3);
        assert_eq!(dice.roll_die(6), 5);
        assert_eq!(dice.roll_die(6), 6);
        assert_eq!(dice.rolled(), 3);
    }

    #[test]
    fn test_fake_ammo_bin() {
        let weapon = lrm10(1, 21);
        let mut field = FakeBattlefield::new().with_ammo(ActorId(1), 1);
        assert!(field.has_ammo(ActorId(1), &weapon));
        assert_eq!(field.consume_ammo(ActorId(1), &weapon), 1);
        assert!(!field.has_ammo(ActorId(1), &weapon));
        assert_eq!(field.consume_ammo(ActorId(1), &weapon), 0);
        // Untracked actors never run dry
        assert_eq!(field.consume_ammo(ActorId(2), &weapon), 1);
        assert_eq!(field.calls.consume_ammo, 3);
    }

    #[test]
    fn test_fake_structure_destroys_unit() {
        let mut field = FakeBattlefield::new().with_structure(ActorId(2), 6);
        let report = field.apply_damage(ActorId(2), LocationRef::Head, 5);
        assert!(!report.unit_destroyed);
        let report = field.apply_damage(ActorId(2), LocationRef::Head, 5);
        assert!(report.unit_destroyed);
        assert_eq!(field.structure_left(ActorId(2)), Some(0));
        assert_eq!(field.damage_taken(ActorId(2)), 10);
    }

    #[test]
    fn test_fake_distance_lookup() {
        let field = FakeBattlefield::new()
            .with_default_distance(None)
            .with_distance(ActorId(1), ActorId(2), 7);
        assert_eq!(field.distance(ActorId(2), ActorId(1)), Some(7));
        assert_eq!(field.distance(ActorId(1), ActorId(3)), None);
        assert_eq!(field.calls.distance.get(), 2);
    }
}
