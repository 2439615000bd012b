//! Actors and the unit registry.
//!
//! Actors are owned by the registry, not by the scheduler or the resolver.
//! The core only ever touches an actor's action points and its
//! destroyed/queued bookkeeping; everything else about a unit (armor, heat,
//! ammunition, position) lives behind the collaborator traits in
//! [`crate::combat::services`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Unique identifier for actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl ActorId {
    /// Create a new actor ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Team an actor fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u8);

/// A unit that can be offered turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier.
    pub id: ActorId,
    /// Team membership.
    pub team: TeamId,
    /// Remaining action points this round.
    pub action_points: u32,
    /// Whether the unit has been destroyed.
    pub destroyed: bool,
    /// Whether the unit currently has an entry in the turn queue.
    pub queued: bool,
    /// Base initiative score.
    #[serde(with = "fixed_serde")]
    pub initiative_base: Fixed,
    /// Speed stat; contributes `speed / 100` to initiative.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

impl Actor {
    /// Create a live actor with no action points.
    #[must_use]
    pub fn new(id: ActorId, team: TeamId, initiative_base: Fixed, speed: Fixed) -> Self {
        Self {
            id,
            team,
            action_points: 0,
            destroyed: false,
            queued: false,
            initiative_base,
            speed,
        }
    }

    /// Whether the actor may be offered a turn.
    #[must_use]
    pub fn can_act(&self) -> bool {
        !self.destroyed && self.action_points > 0
    }

    /// Spend action points, never going below zero.
    ///
    /// Returns the balance left afterwards.
    pub fn spend_action_points(&mut self, amount: u32) -> u32 {
        self.action_points = self.action_points.saturating_sub(amount);
        self.action_points
    }
}

/// Lookup and enumeration of actors for round setup.
///
/// The scheduler resolves every [`ActorId`] it pops through this trait, so a
/// reference that no longer resolves is simply treated as ineligible.
pub trait UnitRegistry {
    /// IDs of all live actors, in a stable order.
    fn live_actors(&self) -> Vec<ActorId>;

    /// Look up an actor.
    fn actor(&self, id: ActorId) -> Option<&Actor>;

    /// Look up an actor for bookkeeping updates.
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor>;
}

/// In-memory unit registry.
///
/// Stored in a `BTreeMap` so iteration is ordered by ID, which keeps round
/// setup deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRoster {
    actors: BTreeMap<ActorId, Actor>,
}

impl ActorRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an actor.
    pub fn insert(&mut self, actor: Actor) {
        self.actors.insert(actor.id, actor);
    }

    /// Remove an actor entirely.
    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    /// Flag an actor as destroyed.
    ///
    /// Returns `true` if the actor existed and was alive.
    pub fn mark_destroyed(&mut self, id: ActorId) -> bool {
        match self.actors.get_mut(&id) {
            Some(actor) if !actor.destroyed => {
                actor.destroyed = true;
                actor.action_points = 0;
                true
            }
            _ => false,
        }
    }

    /// Number of actors, destroyed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Iterate over all actors in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Teams that still have at least one live actor.
    #[must_use]
    pub fn teams_alive(&self) -> Vec<TeamId> {
        let mut teams: Vec<TeamId> = self
            .actors
            .values()
            .filter(|a| !a.destroyed)
            .map(|a| a.team)
            .collect();
        teams.sort_unstable();
        teams.dedup();
        teams
    }
}

impl UnitRegistry for ActorRoster {
    fn live_actors(&self) -> Vec<ActorId> {
        self.actors
            .values()
            .filter(|a| !a.destroyed)
            .map(|a| a.id)
            .collect()
    }

    fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }
}

impl FromIterator<Actor> for ActorRoster {
    fn from_iter<I: IntoIterator<Item = Actor>>(iter: I) -> Self {
        let mut roster = Self::new();
        for actor in iter {
            roster.insert(actor);
        }
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: u32, team: u8) -> Actor {
        Actor::new(
            ActorId(id),
            TeamId(team),
            Fixed::from_num(5),
            Fixed::from_num(4),
        )
    }

    #[test]
    fn test_spend_action_points_saturates() {
        let mut a = actor(1, 0);
        a.action_points = 2;
        assert_eq!(a.spend_action_points(1), 1);
        assert!(a.can_act());
        assert_eq!(a.spend_action_points(5), 0);
        assert!(!a.can_act());
    }

    #[test]
    fn test_roster_live_actors_sorted() {
        let roster: ActorRoster = [actor(3, 0), actor(1, 1), actor(2, 0)].into_iter().collect();
        assert_eq!(
            roster.live_actors(),
            vec![ActorId(1), ActorId(2), ActorId(3)]
        );
    }

    #[test]
    fn test_mark_destroyed() {
        let mut roster: ActorRoster = [actor(1, 0), actor(2, 1)].into_iter().collect();
        roster.actor_mut(ActorId(1)).unwrap().action_points = 2;

        assert!(roster.mark_destroyed(ActorId(1)));
        assert!(!roster.mark_destroyed(ActorId(1)));
        assert!(!roster.mark_destroyed(ActorId(9)));

        let destroyed = roster.actor(ActorId(1)).unwrap();
        assert!(destroyed.destroyed);
        assert_eq!(destroyed.action_points, 0);
        assert_eq!(roster.live_actors(), vec![ActorId(2)]);
    }

    #[test]
    fn test_teams_alive() {
        let mut roster: ActorRoster = [actor(1, 0), actor(2, 1), actor(3, 1)].into_iter().collect();
        assert_eq!(roster.teams_alive(), vec![TeamId(0), TeamId(1)]);

        roster.mark_destroyed(ActorId(1));
        assert_eq!(roster.teams_alive(), vec![TeamId(1)]);
    }
}
