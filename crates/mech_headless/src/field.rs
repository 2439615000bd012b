//! A simple hex battlefield implementing every combat collaborator.
//!
//! Positions use axial hex coordinates. Line of sight is traced hex by hex
//! with fixed-point interpolation, hit locations come from the classic 2d6
//! front table, and damage runs through armor then internal structure,
//! transferring inward when a section is lost.

use std::collections::{BTreeMap, BTreeSet};

use mech_core::actor::ActorId;
use mech_core::combat::{
    AmmoSystem, ArmorSystem, DamageReport, GridService, HeatSystem, HitLocationResolver,
    LocationRef, ShutdownCheck,
};
use mech_core::dice::{DiceEngine, SeededDice};
use mech_core::error::CollaboratorError;
use mech_core::math::{ratio, Fixed};
use mech_core::weapons::{WeaponId, WeaponSpec};
use serde::{Deserialize, Serialize};

/// Axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hex {
    /// Column.
    pub q: i32,
    /// Row.
    pub r: i32,
}

impl Hex {
    /// Create a hex coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Hex distance.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.q + self.r - other.q - other.r).unsigned_abs();
        (dq + dr + ds) / 2
    }

    /// Hexes strictly between `self` and `other` along the straight line.
    #[must_use]
    pub fn line_between(self, other: Self) -> Vec<Self> {
        let n = self.distance(other) as i32;
        // Nudge off exact hex edges so ties round consistently
        let nudge = ratio(1, 1_000_000);
        (1..n)
            .map(|i| {
                let t = ratio(i, n);
                let q = Fixed::from_num(self.q) + Fixed::from_num(other.q - self.q) * t + nudge;
                let r = Fixed::from_num(self.r) + Fixed::from_num(other.r - self.r) * t + nudge;
                cube_round(q, r)
            })
            .collect()
    }
}

fn cube_round(q: Fixed, r: Fixed) -> Hex {
    let s = -q - r;
    let (rq, rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());

    let (q, r) = if dq > dr && dq > ds {
        (-rr - rs, rr)
    } else if dr > ds {
        (rq, -rq - rs)
    } else {
        (rq, rr)
    };
    Hex::new(q.to_num(), r.to_num())
}

/// Armor and structure of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Outer armor.
    pub armor: u32,
    /// Internal structure.
    pub structure: u32,
}

impl Section {
    /// Whether the section is gone.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.structure == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeatState {
    current: u32,
    capacity: u32,
    dissipation: u32,
    shut_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AmmoBin {
    shots: u32,
    location: LocationRef,
}

/// Where damage goes once a section is destroyed.
const fn transfer_target(location: LocationRef) -> Option<LocationRef> {
    match location {
        LocationRef::LeftArm | LocationRef::LeftLeg => Some(LocationRef::LeftTorso),
        LocationRef::RightArm | LocationRef::RightLeg => Some(LocationRef::RightTorso),
        LocationRef::LeftTorso | LocationRef::RightTorso => Some(LocationRef::CenterTorso),
        LocationRef::Head | LocationRef::CenterTorso => None,
    }
}

/// Front hit-location table for 2d6 rolls 2..=12.
const HIT_TABLE: [LocationRef; 11] = [
    LocationRef::CenterTorso,
    LocationRef::RightArm,
    LocationRef::RightArm,
    LocationRef::RightLeg,
    LocationRef::RightTorso,
    LocationRef::CenterTorso,
    LocationRef::LeftTorso,
    LocationRef::LeftLeg,
    LocationRef::LeftArm,
    LocationRef::LeftArm,
    LocationRef::Head,
];

/// Hex battlefield with per-unit heat, ammunition and armor.
#[derive(Debug, Clone)]
pub struct HexField {
    positions: BTreeMap<ActorId, Hex>,
    obstacles: BTreeSet<Hex>,
    heat: BTreeMap<ActorId, HeatState>,
    ammo: BTreeMap<(ActorId, WeaponId), AmmoBin>,
    sections: BTreeMap<(ActorId, LocationRef), Section>,
    destroyed: BTreeSet<ActorId>,
    location_dice: DiceEngine<SeededDice>,
}

impl HexField {
    /// Create an empty field whose hit-location rolls use `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            positions: BTreeMap::new(),
            obstacles: BTreeSet::new(),
            heat: BTreeMap::new(),
            ammo: BTreeMap::new(),
            sections: BTreeMap::new(),
            destroyed: BTreeSet::new(),
            location_dice: DiceEngine::with_history_capacity(SeededDice::new(seed), 0),
        }
    }

    /// Place a unit.
    pub fn place(&mut self, actor: ActorId, hex: Hex) {
        self.positions.insert(actor, hex);
    }

    /// Block a hex for line of sight.
    pub fn add_obstacle(&mut self, hex: Hex) {
        self.obstacles.insert(hex);
    }

    /// Give a unit a heat sink profile.
    pub fn set_heat_profile(&mut self, actor: ActorId, capacity: u32, dissipation: u32) {
        self.heat.insert(
            actor,
            HeatState {
                current: 0,
                capacity,
                dissipation,
                shut_down: false,
            },
        );
    }

    /// Stock an ammunition bin for a weapon.
    pub fn add_ammo(&mut self, actor: ActorId, weapon: WeaponId, shots: u32, location: LocationRef) {
        self.ammo.insert((actor, weapon), AmmoBin { shots, location });
    }

    /// Set one section's armor and structure.
    pub fn set_section(&mut self, actor: ActorId, location: LocationRef, section: Section) {
        self.sections.insert((actor, location), section);
    }

    /// Where a unit stands.
    #[must_use]
    pub fn position(&self, actor: ActorId) -> Option<Hex> {
        self.positions.get(&actor).copied()
    }

    /// A unit's section state.
    #[must_use]
    pub fn section(&self, actor: ActorId, location: LocationRef) -> Option<Section> {
        self.sections.get(&(actor, location)).copied()
    }

    /// Current heat of a unit.
    #[must_use]
    pub fn heat(&self, actor: ActorId) -> u32 {
        self.heat.get(&actor).map_or(0, |h| h.current)
    }

    /// Shots left for a weapon.
    #[must_use]
    pub fn ammo(&self, actor: ActorId, weapon: WeaponId) -> u32 {
        self.ammo.get(&(actor, weapon)).map_or(0, |b| b.shots)
    }

    /// Whether the field considers the unit destroyed.
    #[must_use]
    pub fn is_destroyed(&self, actor: ActorId) -> bool {
        self.destroyed.contains(&actor)
    }

    /// Round-start housekeeping: dissipate heat and restart cooled units.
    pub fn start_round(&mut self) {
        for (actor, state) in &mut self.heat {
            state.current = state.current.saturating_sub(state.dissipation);
            if state.shut_down && state.current < state.capacity / 2 {
                state.shut_down = false;
                tracing::debug!(actor = %actor, heat = state.current, "Unit restarted");
            }
        }
    }

    /// Pick the section a hit lands on, following transfers past destroyed
    /// sections.
    fn live_location(&self, actor: ActorId, mut location: LocationRef) -> Option<LocationRef> {
        loop {
            match self.sections.get(&(actor, location)) {
                Some(section) if !section.is_destroyed() => return Some(location),
                Some(_) => location = transfer_target(location)?,
                None => return None,
            }
        }
    }

    fn mark_destroyed(&mut self, actor: ActorId) -> bool {
        if self.destroyed.insert(actor) {
            tracing::info!(actor = %actor, "Unit destroyed");
            true
        } else {
            false
        }
    }

    /// Apply damage to a section, spilling into structure and then inward.
    fn damage_section(&mut self, actor: ActorId, location: LocationRef, amount: u32) -> DamageReport {
        let mut report = DamageReport::default();
        let mut remaining = amount;
        let mut current = Some(location);

        while let (Some(loc), true) = (current, remaining > 0) {
            let Some(section) = self.sections.get_mut(&(actor, loc)) else {
                break;
            };
            if section.is_destroyed() {
                current = transfer_target(loc);
                continue;
            }

            let absorbed = remaining.min(section.armor);
            section.armor -= absorbed;
            remaining -= absorbed;

            let internal = remaining.min(section.structure);
            section.structure -= internal;
            remaining -= internal;

            if internal > 0 && loc == location {
                report.ammo_exploded = self
                    .ammo
                    .iter()
                    .any(|(&(owner, _), bin)| owner == actor && bin.location == loc && bin.shots > 0);
            }

            if section.is_destroyed() {
                if loc == location {
                    report.section_destroyed = true;
                }
                tracing::debug!(actor = %actor, location = ?loc, "Section destroyed");
                if matches!(loc, LocationRef::Head | LocationRef::CenterTorso) {
                    report.unit_destroyed = self.mark_destroyed(actor);
                    break;
                }
            }
            current = transfer_target(loc);
        }

        report
    }
}

impl GridService for HexField {
    fn distance(&self, from: ActorId, to: ActorId) -> Option<u32> {
        Some(self.position(from)?.distance(self.position(to)?))
    }

    fn has_clear_path(&self, from: ActorId, to: ActorId) -> bool {
        match (self.position(from), self.position(to)) {
            (Some(a), Some(b)) => a
                .line_between(b)
                .iter()
                .all(|hex| !self.obstacles.contains(hex)),
            _ => false,
        }
    }
}

impl HeatSystem for HexField {
    fn can_fire(&self, actor: ActorId) -> bool {
        self.heat
            .get(&actor)
            .map_or(true, |h| !h.shut_down && h.current < h.capacity)
    }

    fn add_heat(&mut self, actor: ActorId, amount: u32) {
        if let Some(state) = self.heat.get_mut(&actor) {
            state.current = state.current.saturating_add(amount);
        }
    }

    fn check_shutdown(&mut self, actor: ActorId) -> Result<ShutdownCheck, CollaboratorError> {
        let state = self
            .heat
            .get_mut(&actor)
            .ok_or(CollaboratorError::UnknownActor(actor))?;
        if state.current >= state.capacity {
            state.shut_down = true;
            Ok(ShutdownCheck::ShutDown)
        } else {
            Ok(ShutdownCheck::Running)
        }
    }
}

impl AmmoSystem for HexField {
    fn has_ammo(&self, actor: ActorId, weapon: &WeaponSpec) -> bool {
        self.ammo(actor, weapon.id) > 0
    }

    fn consume_ammo(&mut self, actor: ActorId, weapon: &WeaponSpec) -> u32 {
        match self.ammo.get_mut(&(actor, weapon.id)) {
            Some(bin) if bin.shots > 0 => {
                bin.shots -= 1;
                1
            }
            _ => 0,
        }
    }

    fn trigger_explosion(
        &mut self,
        actor: ActorId,
        location: LocationRef,
    ) -> Result<(), CollaboratorError> {
        let shots: u32 = self
            .ammo
            .iter_mut()
            .filter(|((owner, _), bin)| *owner == actor && bin.location == location)
            .map(|(_, bin)| std::mem::take(&mut bin.shots))
            .sum();
        if shots == 0 {
            return Err(CollaboratorError::ServiceFailed {
                service: "ammo",
                message: format!("no ammunition stored in {location:?}"),
            });
        }

        // Internal explosions bypass armor
        if let Some(section) = self.sections.get_mut(&(actor, location)) {
            section.armor = 0;
        }
        let report = self.damage_section(actor, location, shots * 2);
        tracing::info!(
            actor = %actor,
            ?location,
            shots,
            unit_destroyed = report.unit_destroyed,
            "Ammunition exploded"
        );
        Ok(())
    }
}

impl HitLocationResolver for HexField {
    fn get_hit_location(&mut self, target: ActorId) -> Option<LocationRef> {
        if self.is_destroyed(target) {
            return None;
        }
        let roll = self.location_dice.roll_2d6(0).score();
        let row = (roll.clamp(2, 12) - 2) as usize;
        self.live_location(target, HIT_TABLE[row])
    }
}

impl ArmorSystem for HexField {
    fn apply_damage(&mut self, target: ActorId, location: LocationRef, amount: u32) -> DamageReport {
        self.damage_section(target, location, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mech_core::weapons::WeaponCategory;

    fn mech(field: &mut HexField, id: u32, hex: Hex) -> ActorId {
        let actor = ActorId(id);
        field.place(actor, hex);
        for location in LocationRef::ALL {
            field.set_section(actor, location, Section { armor: 4, structure: 3 });
        }
        actor
    }

    #[test]
    fn test_hex_distance() {
        assert_eq!(Hex::new(0, 0).distance(Hex::new(3, 0)), 3);
        assert_eq!(Hex::new(0, 0).distance(Hex::new(2, -4)), 4);
        assert_eq!(Hex::new(-1, 2).distance(Hex::new(-1, 2)), 0);
    }

    #[test]
    fn test_line_between_straight_row() {
        let line = Hex::new(0, 0).line_between(Hex::new(3, 0));
        assert_eq!(line, vec![Hex::new(1, 0), Hex::new(2, 0)]);
        assert!(Hex::new(0, 0).line_between(Hex::new(1, 0)).is_empty());
    }

    #[test]
    fn test_obstacle_blocks_sight() {
        let mut field = HexField::new(0);
        let a = mech(&mut field, 1, Hex::new(0, 0));
        let b = mech(&mut field, 2, Hex::new(4, 0));
        assert!(field.has_clear_path(a, b));
        field.add_obstacle(Hex::new(2, 0));
        assert!(!field.has_clear_path(a, b));
        assert!(!field.has_clear_path(a, ActorId(9)));
        assert_eq!(field.distance(a, b), Some(4));
        assert_eq!(field.distance(a, ActorId(9)), None);
    }

    #[test]
    fn test_damage_armor_then_structure_then_transfer() {
        let mut field = HexField::new(0);
        let a = mech(&mut field, 1, Hex::new(0, 0));

        let report = field.apply_damage(a, LocationRef::LeftArm, 5);
        assert_eq!(field.section(a, LocationRef::LeftArm), Some(Section { armor: 0, structure: 2 }));
        assert!(!report.section_destroyed);

        // 2 finishes the arm, 3 spills into the left torso armor
        let report = field.apply_damage(a, LocationRef::LeftArm, 5);
        assert!(report.section_destroyed);
        assert_eq!(field.section(a, LocationRef::LeftTorso), Some(Section { armor: 1, structure: 3 }));
    }

    #[test]
    fn test_center_torso_loss_destroys_unit() {
        let mut field = HexField::new(0);
        let a = mech(&mut field, 1, Hex::new(0, 0));
        let report = field.apply_damage(a, LocationRef::CenterTorso, 7);
        assert!(report.unit_destroyed);
        assert!(field.is_destroyed(a));
        assert_eq!(field.get_hit_location(a), None);
        // Already destroyed units are not reported twice
        let report = field.apply_damage(a, LocationRef::Head, 7);
        assert!(!report.unit_destroyed);
    }

    #[test]
    fn test_hit_location_skips_destroyed_sections() {
        let mut field = HexField::new(3);
        let a = mech(&mut field, 1, Hex::new(0, 0));
        for location in [
            LocationRef::LeftArm,
            LocationRef::RightArm,
            LocationRef::LeftLeg,
            LocationRef::RightLeg,
            LocationRef::LeftTorso,
            LocationRef::RightTorso,
        ] {
            field.set_section(a, location, Section { armor: 0, structure: 0 });
        }
        for _ in 0..50 {
            let location = field.get_hit_location(a).unwrap();
            assert!(matches!(location, LocationRef::CenterTorso | LocationRef::Head));
        }
    }

    #[test]
    fn test_heat_shutdown_and_restart() {
        let mut field = HexField::new(0);
        let a = mech(&mut field, 1, Hex::new(0, 0));
        field.set_heat_profile(a, 10, 6);

        field.add_heat(a, 10);
        assert_eq!(field.check_shutdown(a), Ok(ShutdownCheck::ShutDown));
        assert!(!field.can_fire(a));

        field.start_round();
        assert_eq!(field.heat(a), 4);
        assert!(field.can_fire(a));
        assert_eq!(
            field.check_shutdown(ActorId(9)),
            Err(CollaboratorError::UnknownActor(ActorId(9)))
        );
    }

    #[test]
    fn test_ammo_and_explosion() {
        let mut field = HexField::new(0);
        let a = mech(&mut field, 1, Hex::new(0, 0));
        let ac = WeaponSpec::new(WeaponId(2), "AC/5", WeaponCategory::Ballistic);
        field.add_ammo(a, ac.id, 2, LocationRef::RightTorso);

        assert!(field.has_ammo(a, &ac));
        assert_eq!(field.consume_ammo(a, &ac), 1);

        // Structure damage in a section holding live ammo flags an explosion
        let report = field.apply_damage(a, LocationRef::RightTorso, 5);
        assert!(report.ammo_exploded);

        field.trigger_explosion(a, LocationRef::RightTorso).unwrap();
        assert_eq!(field.ammo(a, ac.id), 0);
        assert!(!field.has_ammo(a, &ac));
        assert!(field.trigger_explosion(a, LocationRef::RightTorso).is_err());
    }
}
