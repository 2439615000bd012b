//! Attack validation and resolution.
//!
//! An attack is checked for legality (heat, ammunition, line of sight,
//! range) and then dispatched on the weapon's category. Missile racks roll
//! on a cluster table and resolve every connecting missile as its own hit;
//! direct-fire weapons roll to hit against a target number. All effects on
//! the world go through the collaborator traits in [`services`].

pub mod resolution;
pub mod resolver;
pub mod result;
pub mod services;

pub use resolution::{AttackResolution, ResolutionPhase, ResolutionStep};
pub use resolver::CombatResolver;
pub use result::{AttackContext, AttackRejection, AttackResult, CombatEvent};
pub use services::{
    AmmoSystem, ArmorSystem, CombatServices, DamageReport, GridService, HeatSystem,
    HitLocationResolver, LocationRef, ShutdownCheck,
};
