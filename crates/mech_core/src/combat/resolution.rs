//! Step-wise attack resolution.
//!
//! An [`AttackResolution`] walks one attack through
//! `Validating → RollingOutcome → ApplyingDamage → PostEffects → Done`.
//! Each call to [`AttackResolution::step`] performs one unit of work and
//! yields, so a driver can interleave other work (animation, network
//! flushes) between sub-hits. Damage is applied one sub-hit per step.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::dice::{DiceEngine, DieSource, RollResult};
use crate::weapons::{ClusterTables, WeaponCategory};

use super::result::{AttackContext, AttackRejection, AttackResult, CombatEvent};
use super::services::{CombatServices, ShutdownCheck};

/// Where a resolution currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ResolutionPhase {
    /// Legality checks have not run yet.
    #[default]
    Validating,
    /// The attack is legal; resources and the outcome roll are next.
    RollingOutcome,
    /// Sub-hits are waiting to be applied.
    ApplyingDamage,
    /// Heat and explosion side effects are next.
    PostEffects,
    /// Finished.
    Done,
}

/// Outcome of a single [`AttackResolution::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStep {
    /// More steps are needed.
    Pending,
    /// The attack is fully resolved.
    Complete(AttackResult),
}

/// One attack in flight.
#[derive(Debug, Clone)]
pub struct AttackResolution {
    context: AttackContext,
    phase: ResolutionPhase,
    result: AttackResult,
    pending_hits: VecDeque<u32>,
    events: Vec<CombatEvent>,
}

impl AttackResolution {
    /// Start resolving an attack.
    #[must_use]
    pub fn new(context: AttackContext) -> Self {
        let result = AttackResult::empty(&context);
        Self {
            context,
            phase: ResolutionPhase::Validating,
            result,
            pending_hits: VecDeque::new(),
            events: Vec::new(),
        }
    }

    /// The attack being resolved.
    #[must_use]
    pub const fn context(&self) -> &AttackContext {
        &self.context
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ResolutionPhase {
        self.phase
    }

    /// Whether resolution has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == ResolutionPhase::Done
    }

    /// Sub-hits not yet applied.
    #[must_use]
    pub fn pending_hits(&self) -> usize {
        self.pending_hits.len()
    }

    /// The result as computed so far.
    #[must_use]
    pub const fn partial_result(&self) -> &AttackResult {
        &self.result
    }

    /// Take the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance by one step.
    pub fn step<D, S>(
        &mut self,
        dice: &mut DiceEngine<D>,
        tables: &ClusterTables,
        services: &mut S,
    ) -> ResolutionStep
    where
        D: DieSource,
        S: CombatServices + ?Sized,
    {
        match self.phase {
            ResolutionPhase::Validating => match validate(&self.context, &*services) {
                Ok(()) => self.phase = ResolutionPhase::RollingOutcome,
                Err(reason) => self.reject(reason),
            },
            ResolutionPhase::RollingOutcome => self.roll_outcome(dice, tables, services),
            ResolutionPhase::ApplyingDamage => self.apply_next_hit(services),
            ResolutionPhase::PostEffects => self.post_effects(services),
            ResolutionPhase::Done => {}
        }

        if self.phase == ResolutionPhase::Done {
            ResolutionStep::Complete(self.result.clone())
        } else {
            ResolutionStep::Pending
        }
    }

    fn reject(&mut self, reason: AttackRejection) {
        tracing::debug!(
            attacker = %self.context.attacker,
            target = %self.context.target,
            ?reason,
            "Attack rejected"
        );
        self.result = AttackResult::rejected(&self.context, reason);
        self.events.push(CombatEvent::AttackRejected {
            attacker: self.context.attacker,
            target: self.context.target,
            reason,
        });
        self.finish();
    }

    fn finish(&mut self) {
        self.pending_hits.clear();
        self.phase = ResolutionPhase::Done;
        self.events.push(CombatEvent::ResolutionComplete {
            attacker: self.result.attacker,
            target: self.result.target,
            hit: self.result.hit,
            damage: self.result.damage,
        });
    }

    fn roll_outcome<D, S>(&mut self, dice: &mut DiceEngine<D>, tables: &ClusterTables, services: &mut S)
    where
        D: DieSource,
        S: CombatServices + ?Sized,
    {
        let category = self.context.weapon.category;

        if category.uses_ammo() {
            let consumed = services.consume_ammo(self.context.attacker, &self.context.weapon);
            if consumed == 0 {
                self.reject(AttackRejection::OutOfAmmo);
                return;
            }
            self.result.ammo_used = consumed;
        }

        if category.generates_heat() {
            self.result.heat_generated = self.context.weapon.heat;
        }
        self.result.action_points_used = self.context.weapon.ap_cost;

        let roll = dice.roll_2d6(self.context.modifier);
        let hits = match category {
            WeaponCategory::Missile => self.queue_cluster_hits(&roll, tables),
            WeaponCategory::Energy | WeaponCategory::Ballistic | WeaponCategory::Physical => {
                self.queue_direct_hits(&roll)
            }
        };

        self.result.hit = hits > 0;
        self.events.push(CombatEvent::OutcomeRolled {
            attacker: self.context.attacker,
            weapon: self.context.weapon.id,
            dice: roll.raw_results.clone(),
            total: roll.score(),
            hits,
        });
        tracing::debug!(
            attacker = %self.context.attacker,
            target = %self.context.target,
            weapon = %self.context.weapon.name,
            total = roll.score(),
            hits,
            "Attack outcome rolled"
        );
        self.result.roll = Some(roll);

        self.phase = ResolutionPhase::ApplyingDamage;
    }

    /// Cluster weapons: the 2d6 total selects how many missiles connect, and
    /// each connecting missile is a separate sub-hit.
    fn queue_cluster_hits(&mut self, roll: &RollResult, tables: &ClusterTables) -> u32 {
        let weapon = &self.context.weapon;
        let hits = tables.hits(weapon, roll.score());
        self.result.critical_hit = roll.is_critical_success;
        self.pending_hits
            .extend(std::iter::repeat(weapon.damage_per_missile).take(hits as usize));
        hits
    }

    /// Direct-fire weapons: one sub-hit on `2d6 + modifier >= to_hit`, plus a
    /// second independently located one on a critical roll.
    fn queue_direct_hits(&mut self, roll: &RollResult) -> u32 {
        let weapon = &self.context.weapon;
        let connects = !roll.is_critical_failure
            && (roll.is_critical_success || roll.score() >= weapon.to_hit);
        if !connects {
            return 0;
        }

        self.pending_hits.push_back(weapon.damage);
        if roll.is_critical_success {
            self.result.critical_hit = true;
            self.pending_hits.push_back(weapon.damage);
        }
        self.pending_hits.len() as u32
    }

    fn apply_next_hit<S>(&mut self, services: &mut S)
    where
        S: CombatServices + ?Sized,
    {
        let Some(amount) = self.pending_hits.pop_front() else {
            self.phase = ResolutionPhase::PostEffects;
            return;
        };
        let target = self.context.target;

        let Some(location) = services.get_hit_location(target) else {
            tracing::warn!(target = %target, amount, "No hit location; damage lost");
            self.events
                .push(CombatEvent::HitLocationUnavailable { target, amount });
            return;
        };

        let report = services.apply_damage(target, location, amount);
        self.result.damage += amount;
        self.result.hit_locations.push(location);
        self.events.push(CombatEvent::DamageApplied {
            target,
            location,
            amount,
        });

        if report.section_destroyed {
            self.events
                .push(CombatEvent::SectionDestroyed { target, location });
        }
        if report.ammo_exploded && self.result.explosion_location.is_none() {
            self.result.ammo_explosion = true;
            self.result.explosion_location = Some(location);
        }
        if report.unit_destroyed && !self.result.target_destroyed {
            self.result.target_destroyed = true;
            tracing::info!(attacker = %self.context.attacker, target = %target, "Target destroyed");
            self.events.push(CombatEvent::TargetDestroyed {
                attacker: self.context.attacker,
                target,
            });
        }
    }

    /// Best-effort side effects; failures are logged and never change the
    /// result.
    fn post_effects<S>(&mut self, services: &mut S)
    where
        S: CombatServices + ?Sized,
    {
        let attacker = self.context.attacker;

        if self.result.heat_generated > 0 {
            services.add_heat(attacker, self.result.heat_generated);
            match services.check_shutdown(attacker) {
                Ok(ShutdownCheck::ShutDown) => {
                    tracing::info!(actor = %attacker, "Heat shutdown");
                    self.events.push(CombatEvent::HeatShutdown { actor: attacker });
                }
                Ok(ShutdownCheck::Running) => {}
                Err(err) => {
                    tracing::warn!(actor = %attacker, error = %err, "Shutdown check failed");
                }
            }
        }

        if let Some(location) = self.result.explosion_location {
            let target = self.context.target;
            match services.trigger_explosion(target, location) {
                Ok(()) => self.events.push(CombatEvent::AmmoExplosion {
                    actor: target,
                    location,
                }),
                Err(err) => {
                    tracing::warn!(actor = %target, ?location, error = %err, "Ammo explosion failed");
                }
            }
        }

        self.finish();
    }
}

fn validate<S>(context: &AttackContext, services: &S) -> Result<(), AttackRejection>
where
    S: CombatServices + ?Sized,
{
    let AttackContext {
        attacker,
        target,
        weapon,
        ..
    } = context;

    if !services.can_fire(*attacker) {
        return Err(AttackRejection::Overheated);
    }
    if weapon.category.uses_ammo() && !services.has_ammo(*attacker, weapon) {
        return Err(AttackRejection::OutOfAmmo);
    }
    if !services.has_clear_path(*attacker, *target) {
        return Err(AttackRejection::NoLineOfSight);
    }
    let distance = services
        .distance(*attacker, *target)
        .ok_or(AttackRejection::TargetUnavailable)?;
    if !weapon.in_range(distance) {
        return Err(AttackRejection::OutOfRange {
            distance,
            min_range: weapon.min_range,
            max_range: weapon.max_range,
        });
    }
    Ok(())
}
