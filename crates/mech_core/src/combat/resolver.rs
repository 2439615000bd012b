//! The combat resolver: dice and cluster tables bundled with the step
//! machine.

use crate::dice::{DiceEngine, DieSource, SeededDice};
use crate::weapons::ClusterTables;

use super::resolution::{AttackResolution, ResolutionStep};
use super::result::{AttackContext, AttackResult, CombatEvent};
use super::services::CombatServices;

/// Resolves attacks against a set of collaborators.
#[derive(Debug, Clone)]
pub struct CombatResolver<S = SeededDice> {
    dice: DiceEngine<S>,
    cluster_tables: ClusterTables,
}

impl<S: DieSource> CombatResolver<S> {
    /// Create a resolver with the standard cluster tables.
    #[must_use]
    pub fn new(dice: DiceEngine<S>) -> Self {
        Self {
            dice,
            cluster_tables: ClusterTables::new(),
        }
    }

    /// Builder method to replace the cluster tables.
    #[must_use]
    pub fn with_cluster_tables(mut self, tables: ClusterTables) -> Self {
        self.cluster_tables = tables;
        self
    }

    /// The dice engine.
    #[must_use]
    pub const fn dice(&self) -> &DiceEngine<S> {
        &self.dice
    }

    /// Mutable access to the dice engine.
    pub fn dice_mut(&mut self) -> &mut DiceEngine<S> {
        &mut self.dice
    }

    /// Cluster tables in use.
    #[must_use]
    pub const fn cluster_tables(&self) -> &ClusterTables {
        &self.cluster_tables
    }

    /// Start an attack without running any of it.
    #[must_use]
    pub fn begin(&self, context: AttackContext) -> AttackResolution {
        AttackResolution::new(context)
    }

    /// Advance an in-flight attack by one step.
    pub fn step<C>(&mut self, resolution: &mut AttackResolution, services: &mut C) -> ResolutionStep
    where
        C: CombatServices + ?Sized,
    {
        resolution.step(&mut self.dice, &self.cluster_tables, services)
    }

    /// Resolve an attack to completion.
    ///
    /// Always produces a result; the last event is
    /// [`CombatEvent::ResolutionComplete`].
    pub fn resolve_attack<C>(
        &mut self,
        context: AttackContext,
        services: &mut C,
    ) -> (AttackResult, Vec<CombatEvent>)
    where
        C: CombatServices + ?Sized,
    {
        let mut resolution = self.begin(context);
        loop {
            if let ResolutionStep::Complete(result) = self.step(&mut resolution, services) {
                return (result, resolution.take_events());
            }
        }
    }
}

impl Default for CombatResolver<SeededDice> {
    fn default() -> Self {
        Self::new(DiceEngine::new(SeededDice::new(0)))
    }
}
