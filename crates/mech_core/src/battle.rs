//! Battle orchestration.
//!
//! A [`Battle`] owns the roster, the turn scheduler and the combat resolver
//! and keeps them consistent: fired attacks cost the attacker action points,
//! destroyed targets are dropped from the schedule, and everything that
//! happens is reported as one ordered stream of [`BattleEvent`]s.

use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, ActorRoster, TeamId, UnitRegistry};
use crate::combat::{AttackContext, AttackResult, CombatEvent, CombatResolver, CombatServices};
use crate::config::CombatConfig;
use crate::dice::{DieSource, SeededDice};
use crate::error::{CoreError, Result, SchedulerError};
use crate::scheduler::{SchedulerEvent, TurnScheduler};
use crate::weapons::WeaponSpec;

/// Anything that happened during a battle, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// Turn bookkeeping.
    Scheduler(SchedulerEvent),
    /// Attack resolution.
    Combat(CombatEvent),
}

impl From<SchedulerEvent> for BattleEvent {
    fn from(event: SchedulerEvent) -> Self {
        Self::Scheduler(event)
    }
}

impl From<CombatEvent> for BattleEvent {
    fn from(event: CombatEvent) -> Self {
        Self::Combat(event)
    }
}

/// A running battle.
#[derive(Debug, Clone)]
pub struct Battle<S = SeededDice> {
    roster: ActorRoster,
    scheduler: TurnScheduler,
    resolver: CombatResolver<S>,
}

impl Battle<SeededDice> {
    /// Create a battle with seeded dice from a configuration.
    #[must_use]
    pub fn from_config(roster: ActorRoster, config: &CombatConfig) -> Self {
        let resolver = CombatResolver::new(config.dice.engine())
            .with_cluster_tables(config.cluster_tables.clone());
        Self::new(roster, TurnScheduler::new(config.scheduler), resolver)
    }
}

impl<S: DieSource> Battle<S> {
    /// Assemble a battle from its parts.
    #[must_use]
    pub fn new(roster: ActorRoster, scheduler: TurnScheduler, resolver: CombatResolver<S>) -> Self {
        Self {
            roster,
            scheduler,
            resolver,
        }
    }

    /// The unit registry.
    #[must_use]
    pub const fn roster(&self) -> &ActorRoster {
        &self.roster
    }

    /// The turn scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// The combat resolver.
    #[must_use]
    pub const fn resolver(&self) -> &CombatResolver<S> {
        &self.resolver
    }

    /// Current round number.
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.scheduler.round()
    }

    /// Actor holding the turn.
    #[must_use]
    pub const fn current_actor(&self) -> Option<ActorId> {
        self.scheduler.current_actor()
    }

    /// Whether at most one team is left standing.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.roster.teams_alive().len() <= 1
    }

    /// The last team standing, once the battle is over.
    #[must_use]
    pub fn winner(&self) -> Option<TeamId> {
        match self.roster.teams_alive().as_slice() {
            [team] => Some(*team),
            _ => None,
        }
    }

    /// Start the next round.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Scheduler`] if a round is already running.
    pub fn start_round(&mut self) -> Result<Vec<BattleEvent>> {
        let events = self.scheduler.start_new_round(&mut self.roster)?;
        Ok(events.into_iter().map(BattleEvent::from).collect())
    }

    /// The current actor attacks `target` with `weapon`.
    ///
    /// A rejected attack leaves the turn with the attacker. A fired attack
    /// spends the weapon's action point cost and may hand the turn on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Scheduler`] if nobody holds the turn.
    pub fn attack<C>(
        &mut self,
        target: ActorId,
        weapon: WeaponSpec,
        modifier: i32,
        services: &mut C,
    ) -> Result<(AttackResult, Vec<BattleEvent>)>
    where
        C: CombatServices + ?Sized,
    {
        let attacker = self
            .scheduler
            .current_actor()
            .ok_or(SchedulerError::NoActiveTurn)?;

        let context = AttackContext::new(attacker, target, weapon).with_modifier(modifier);
        let (result, combat_events) = self.resolver.resolve_attack(context, services);
        let mut events: Vec<BattleEvent> = combat_events.into_iter().map(BattleEvent::from).collect();

        if result.target_destroyed && self.roster.mark_destroyed(target) {
            events.extend(
                self.scheduler
                    .on_actor_destroyed(&mut self.roster, target)
                    .into_iter()
                    .map(BattleEvent::from),
            );
        }

        if result.fired() && self.scheduler.current_actor() == Some(attacker) {
            let scheduler_events =
                self.scheduler
                    .on_action_completed(&mut self.roster, attacker, result.action_points_used)?;
            events.extend(scheduler_events.into_iter().map(BattleEvent::from));
        }

        Ok((result, events))
    }

    /// The current actor passes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Scheduler`] if nobody holds the turn.
    pub fn end_turn(&mut self) -> Result<Vec<BattleEvent>> {
        let events = self.scheduler.end_turn(&mut self.roster)?;
        Ok(events.into_iter().map(BattleEvent::from).collect())
    }

    /// Abandon the current turn.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Scheduler`] if nobody holds the turn.
    pub fn cancel_current_turn(&mut self) -> Result<Vec<BattleEvent>> {
        let events = self.scheduler.cancel_current_turn(&mut self.roster)?;
        Ok(events.into_iter().map(BattleEvent::from).collect())
    }

    /// Remove an actor from play outside of an attack.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownActor`] if the roster has no such actor.
    pub fn destroy_actor(&mut self, actor: ActorId) -> Result<Vec<BattleEvent>> {
        if self.roster.actor(actor).is_none() {
            return Err(CoreError::UnknownActor(actor));
        }
        self.roster.mark_destroyed(actor);
        let events = self.scheduler.on_actor_destroyed(&mut self.roster, actor);
        Ok(events.into_iter().map(BattleEvent::from).collect())
    }
}
