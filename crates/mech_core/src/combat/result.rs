//! Attack inputs, results and combat events.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::dice::RollResult;
use crate::weapons::{WeaponId, WeaponSpec};

use super::services::LocationRef;

/// Everything needed to resolve one attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackContext {
    /// Firing actor.
    pub attacker: ActorId,
    /// Targeted actor.
    pub target: ActorId,
    /// Weapon being fired.
    pub weapon: WeaponSpec,
    /// Situational to-hit modifier added to the 2d6 roll.
    pub modifier: i32,
}

impl AttackContext {
    /// Create a context with no situational modifier.
    #[must_use]
    pub fn new(attacker: ActorId, target: ActorId, weapon: WeaponSpec) -> Self {
        Self {
            attacker,
            target,
            weapon,
            modifier: 0,
        }
    }

    /// Builder method to set the to-hit modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = modifier;
        self
    }
}

/// Why an attack was not carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackRejection {
    /// The attacker is running too hot to fire.
    Overheated,
    /// No ammunition for the weapon.
    OutOfAmmo,
    /// Line of sight is blocked.
    NoLineOfSight,
    /// One of the actors is not on the map.
    TargetUnavailable,
    /// Target outside the weapon's range band.
    OutOfRange {
        /// Measured distance.
        distance: u32,
        /// Minimum range.
        min_range: u32,
        /// Maximum range.
        max_range: u32,
    },
}

/// Outcome of one attack.
///
/// A rejected attack is still a result: every effect field is zero and
/// `rejection` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    /// Firing actor.
    pub attacker: ActorId,
    /// Targeted actor.
    pub target: ActorId,
    /// Weapon fired.
    pub weapon: WeaponId,
    /// At least one hit connected.
    pub hit: bool,
    /// Damage actually applied to the target.
    pub damage: u32,
    /// Ammunition consumed.
    pub ammo_used: u32,
    /// Heat generated by firing.
    pub heat_generated: u32,
    /// Some hit set off stored ammunition.
    pub ammo_explosion: bool,
    /// Section hit by each connecting shot, in application order.
    pub hit_locations: Vec<LocationRef>,
    /// Set when the attack never fired.
    pub rejection: Option<AttackRejection>,
    /// The outcome roll was a critical success.
    pub critical_hit: bool,
    /// The target was destroyed by this attack.
    pub target_destroyed: bool,
    /// Section whose ammunition exploded.
    pub explosion_location: Option<LocationRef>,
    /// Action points the attack costs the attacker.
    pub action_points_used: u32,
    /// The outcome roll, if one was made.
    pub roll: Option<RollResult>,
}

impl AttackResult {
    /// Zero-effect result for an attack that did not fire.
    #[must_use]
    pub fn rejected(context: &AttackContext, reason: AttackRejection) -> Self {
        Self {
            rejection: Some(reason),
            ..Self::empty(context)
        }
    }

    /// Blank result for an attack about to fire.
    #[must_use]
    pub fn empty(context: &AttackContext) -> Self {
        Self {
            attacker: context.attacker,
            target: context.target,
            weapon: context.weapon.id,
            hit: false,
            damage: 0,
            ammo_used: 0,
            heat_generated: 0,
            ammo_explosion: false,
            hit_locations: Vec::new(),
            rejection: None,
            critical_hit: false,
            target_destroyed: false,
            explosion_location: None,
            action_points_used: 0,
            roll: None,
        }
    }

    /// Whether the weapon actually fired.
    #[must_use]
    pub fn fired(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Events generated while resolving attacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// The attack failed validation or ran dry.
    AttackRejected {
        /// Firing actor.
        attacker: ActorId,
        /// Targeted actor.
        target: ActorId,
        /// Why.
        reason: AttackRejection,
    },
    /// The outcome roll was made.
    OutcomeRolled {
        /// Firing actor.
        attacker: ActorId,
        /// Weapon fired.
        weapon: WeaponId,
        /// Raw dice.
        dice: Vec<u32>,
        /// Roll total.
        total: i32,
        /// Hits scored (missiles for cluster weapons, 0 or more shots otherwise).
        hits: u32,
    },
    /// Damage landed on a section.
    DamageApplied {
        /// Damaged actor.
        target: ActorId,
        /// Section hit.
        location: LocationRef,
        /// Damage dealt.
        amount: u32,
    },
    /// The hit-location table gave no answer; the hit was lost.
    HitLocationUnavailable {
        /// Targeted actor.
        target: ActorId,
        /// Damage that was not applied.
        amount: u32,
    },
    /// A section was destroyed.
    SectionDestroyed {
        /// Damaged actor.
        target: ActorId,
        /// Lost section.
        location: LocationRef,
    },
    /// The target was destroyed.
    TargetDestroyed {
        /// Actor responsible.
        attacker: ActorId,
        /// Destroyed actor.
        target: ActorId,
    },
    /// Stored ammunition exploded.
    AmmoExplosion {
        /// Actor whose ammunition exploded.
        actor: ActorId,
        /// Section holding the ammunition.
        location: LocationRef,
    },
    /// The attacker shut down from heat.
    HeatShutdown {
        /// Overheated actor.
        actor: ActorId,
    },
    /// Resolution finished; always the last event of an attack.
    ResolutionComplete {
        /// Firing actor.
        attacker: ActorId,
        /// Targeted actor.
        target: ActorId,
        /// Whether anything connected.
        hit: bool,
        /// Damage applied.
        damage: u32,
    },
}
