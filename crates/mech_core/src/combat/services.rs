//! Collaborator interfaces consumed by attack resolution.
//!
//! Grid math, heat tracking, ammunition bins, hit-location tables and armor
//! bookkeeping all live outside the core. The resolver only talks to them
//! through these traits, and [`CombatServices`] bundles them so a single
//! battlefield type can provide everything.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::error::CollaboratorError;
use crate::weapons::WeaponSpec;

/// Body section of a mech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocationRef {
    /// Head.
    Head,
    /// Center torso.
    CenterTorso,
    /// Left torso.
    LeftTorso,
    /// Right torso.
    RightTorso,
    /// Left arm.
    LeftArm,
    /// Right arm.
    RightArm,
    /// Left leg.
    LeftLeg,
    /// Right leg.
    RightLeg,
}

impl LocationRef {
    /// Every section, head first.
    pub const ALL: [Self; 8] = [
        Self::Head,
        Self::CenterTorso,
        Self::LeftTorso,
        Self::RightTorso,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftLeg,
        Self::RightLeg,
    ];
}

/// What happened when damage landed on a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageReport {
    /// The section lost all its structure.
    pub section_destroyed: bool,
    /// The whole unit is out of the fight.
    pub unit_destroyed: bool,
    /// Ammunition stored in the section cooked off.
    pub ammo_exploded: bool,
}

/// Result of a shutdown check after heat was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShutdownCheck {
    /// The unit keeps running.
    Running,
    /// The unit shut down from heat.
    ShutDown,
}

/// Hex grid queries.
pub trait GridService {
    /// Hex distance between two actors, if both are on the map.
    fn distance(&self, from: ActorId, to: ActorId) -> Option<u32>;

    /// Whether nothing blocks the line of sight from `from` to `to`.
    fn has_clear_path(&self, from: ActorId, to: ActorId) -> bool;
}

/// Per-actor heat tracking.
pub trait HeatSystem {
    /// Whether the actor is cool enough to fire.
    fn can_fire(&self, actor: ActorId) -> bool;

    /// Add heat generated by firing.
    fn add_heat(&mut self, actor: ActorId, amount: u32);

    /// Check whether accumulated heat shuts the actor down.
    fn check_shutdown(&mut self, actor: ActorId) -> Result<ShutdownCheck, CollaboratorError>;
}

/// Per-actor ammunition bins.
pub trait AmmoSystem {
    /// Whether the actor has ammunition for the weapon.
    fn has_ammo(&self, actor: ActorId, weapon: &WeaponSpec) -> bool;

    /// Spend one salvo, returning the amount actually consumed.
    fn consume_ammo(&mut self, actor: ActorId, weapon: &WeaponSpec) -> u32;

    /// Detonate the ammunition stored at a location.
    fn trigger_explosion(
        &mut self,
        actor: ActorId,
        location: LocationRef,
    ) -> Result<(), CollaboratorError>;
}

/// Hit-location table.
pub trait HitLocationResolver {
    /// Pick the section a single hit lands on.
    fn get_hit_location(&mut self, target: ActorId) -> Option<LocationRef>;
}

/// Armor and internal structure bookkeeping.
pub trait ArmorSystem {
    /// Apply damage to one section.
    fn apply_damage(&mut self, target: ActorId, location: LocationRef, amount: u32) -> DamageReport;
}

/// Everything attack resolution needs from the outside world.
pub trait CombatServices:
    GridService + HeatSystem + AmmoSystem + HitLocationResolver + ArmorSystem
{
}

impl<T> CombatServices for T where
    T: GridService + HeatSystem + AmmoSystem + HitLocationResolver + ArmorSystem + ?Sized
{
}
