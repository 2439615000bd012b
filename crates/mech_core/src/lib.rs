//! # Mech Core
//!
//! Deterministic tactical combat core for squad-level mech battles.
//!
//! This crate decides:
//! - **who** acts next (turn scheduling)
//! - **whether** an attack is legal (attack validation)
//! - **what** an attack does (dice and resolution)
//!
//! Everything else about the world (grid math, heat, ammunition, armor,
//! hit-location tables) is reached through collaborator traits, so the core
//! has no rendering, no IO beyond config loading and no system randomness.
//! Initiative uses fixed-point math and all dice are seeded, which keeps
//! battles reproducible for replays and determinism tests.
//!
//! ## Crate Structure
//!
//! - [`dice`] - Dice engine and roll modes
//! - [`scheduler`] - Initiative queue and turn scheduler
//! - [`combat`] - Attack validation and resolution
//! - [`battle`] - Roster, scheduler and resolver wired together
//! - [`config`] - RON configuration
//! - [`math`] - Fixed-point helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actor;
pub mod battle;
pub mod combat;
pub mod config;
pub mod dice;
pub mod error;
pub mod math;
pub mod scheduler;
pub mod weapons;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actor::{Actor, ActorId, ActorRoster, TeamId, UnitRegistry};
    pub use crate::battle::{Battle, BattleEvent};
    pub use crate::combat::{
        AmmoSystem, ArmorSystem, AttackContext, AttackRejection, AttackResolution, AttackResult,
        CombatEvent, CombatResolver, CombatServices, DamageReport, GridService, HeatSystem,
        HitLocationResolver, LocationRef, ResolutionPhase, ResolutionStep, ShutdownCheck,
    };
    pub use crate::config::{CombatConfig, DiceConfig};
    pub use crate::dice::{
        DiceEngine, DieSource, RollOptions, RollResult, RollSpec, RollTotal, RollType, SeededDice,
    };
    pub use crate::error::{CollaboratorError, CoreError, DiceError, Result, SchedulerError};
    pub use crate::math::Fixed;
    pub use crate::scheduler::{RoundPhase, SchedulerConfig, SchedulerEvent, TurnScheduler};
    pub use crate::weapons::{ClusterTable, ClusterTables, WeaponCategory, WeaponId, WeaponSpec};
}
