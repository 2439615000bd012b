//! Scenario loading and configuration.
//!
//! Scenarios define the starting battlefield for headless battles: the
//! weapon armory, each unit's position, stats, loadout and armor, and the
//! combat tuning passed through to the core.

use std::collections::BTreeSet;
use std::path::Path;

use mech_core::actor::{Actor, ActorId, ActorRoster, TeamId};
use mech_core::combat::LocationRef;
use mech_core::config::CombatConfig;
use mech_core::math::{decimal_serde, Fixed};
use mech_core::weapons::{WeaponCategory, WeaponId, WeaponSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{Hex, HexField, Section};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed but inconsistent.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Rounds played before the battle is called a draw.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Core combat tuning. Seeds are overridden per run.
    #[serde(default)]
    pub combat: CombatConfig,
    /// Hexes that block line of sight.
    #[serde(default)]
    pub obstacles: Vec<Hex>,
    /// Weapons available to units, referenced by id.
    pub armory: Vec<WeaponSpec>,
    /// Participating units.
    pub units: Vec<UnitSetup>,
}

const fn default_max_rounds() -> u32 {
    30
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish_2v2()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate a scenario from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Two lances of two facing each other across a ridge.
    #[must_use]
    pub fn skirmish_2v2() -> Self {
        Self {
            name: "Ridge Skirmish".to_string(),
            description: "Two mediums per side trade fire across a broken ridge".to_string(),
            max_rounds: default_max_rounds(),
            combat: CombatConfig::default(),
            obstacles: vec![Hex::new(4, 1), Hex::new(4, -1)],
            armory: standard_armory(),
            units: vec![
                UnitSetup::medium(1, "Hunchback", 0, Hex::new(0, 0))
                    .with_weapons(&[WeaponId(3), WeaponId(1), WeaponId(20)])
                    .with_ammo(WeaponId(3), 10, LocationRef::RightTorso),
                UnitSetup::medium(2, "Trebuchet", 0, Hex::new(0, 2))
                    .with_weapons(&[WeaponId(10), WeaponId(1), WeaponId(20)])
                    .with_ammo(WeaponId(10), 12, LocationRef::LeftTorso),
                UnitSetup::medium(3, "Centurion", 1, Hex::new(8, 0))
                    .with_weapons(&[WeaponId(3), WeaponId(11), WeaponId(20)])
                    .with_ammo(WeaponId(3), 10, LocationRef::RightTorso)
                    .with_ammo(WeaponId(11), 15, LocationRef::LeftTorso),
                UnitSetup::medium(4, "Wolverine", 1, Hex::new(8, -2))
                    .with_weapons(&[WeaponId(2), WeaponId(1), WeaponId(20)]),
            ],
        }
    }

    /// Check that ids are unique, every reference resolves and every weapon
    /// costs at least one action point.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let armory: BTreeSet<WeaponId> = self.armory.iter().map(|w| w.id).collect();
        if armory.len() != self.armory.len() {
            return Err(ScenarioError::Invalid("duplicate weapon id in armory".into()));
        }
        if let Some(weapon) = self.armory.iter().find(|w| w.ap_cost == 0) {
            return Err(ScenarioError::Invalid(format!(
                "weapon {} costs no action points",
                weapon.id.0
            )));
        }

        let mut ids = BTreeSet::new();
        let mut teams = BTreeSet::new();
        for unit in &self.units {
            if !ids.insert(unit.id) {
                return Err(ScenarioError::Invalid(format!("duplicate unit id {}", unit.id)));
            }
            teams.insert(unit.team);

            let missing = unit
                .weapons
                .iter()
                .chain(unit.ammo.iter().map(|bin| &bin.weapon))
                .find(|id| !armory.contains(id));
            if let Some(id) = missing {
                return Err(ScenarioError::Invalid(format!(
                    "unit {} references unknown weapon {}",
                    unit.id, id.0
                )));
            }
        }

        if teams.len() < 2 {
            return Err(ScenarioError::Invalid("need at least two teams".into()));
        }
        Ok(())
    }

    /// Look up a weapon in the armory.
    #[must_use]
    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponSpec> {
        self.armory.iter().find(|w| w.id == id)
    }

    /// A unit's loadout in declaration order.
    #[must_use]
    pub fn loadout(&self, unit: &UnitSetup) -> Vec<WeaponSpec> {
        unit.weapons
            .iter()
            .filter_map(|id| self.weapon(*id))
            .cloned()
            .collect()
    }

    /// Build the actor roster.
    #[must_use]
    pub fn roster(&self) -> ActorRoster {
        self.units.iter().map(UnitSetup::actor).collect()
    }

    /// Build the battlefield, seeding hit-location rolls with `seed`.
    #[must_use]
    pub fn field(&self, seed: u64) -> HexField {
        let mut field = HexField::new(seed);
        for hex in &self.obstacles {
            field.add_obstacle(*hex);
        }
        for unit in &self.units {
            let id = ActorId(unit.id);
            field.place(id, unit.position);
            field.set_heat_profile(id, unit.heat_capacity, unit.heat_dissipation);
            for location in LocationRef::ALL {
                field.set_section(id, location, unit.armor.section(location));
            }
            for bin in &unit.ammo {
                field.add_ammo(id, bin.weapon, bin.shots, bin.location);
            }
        }
        field
    }
}

/// Weapons used by the built-in scenario.
#[must_use]
pub fn standard_armory() -> Vec<WeaponSpec> {
    vec![
        WeaponSpec::new(WeaponId(1), "Medium Laser", WeaponCategory::Energy)
            .with_range(0, 9)
            .with_damage(5)
            .with_heat(3),
        WeaponSpec::new(WeaponId(2), "Large Laser", WeaponCategory::Energy)
            .with_range(0, 15)
            .with_damage(8)
            .with_heat(8)
            .with_to_hit(9),
        WeaponSpec::new(WeaponId(3), "AC/10", WeaponCategory::Ballistic)
            .with_range(0, 15)
            .with_damage(10)
            .with_heat(3),
        WeaponSpec::missile_rack(WeaponId(10), "LRM-10", 10, 1)
            .with_range(6, 21)
            .with_heat(4),
        WeaponSpec::missile_rack(WeaponId(11), "SRM-6", 6, 2)
            .with_range(0, 9)
            .with_heat(4),
        WeaponSpec::new(WeaponId(20), "Kick", WeaponCategory::Physical)
            .with_range(1, 1)
            .with_damage(10)
            .with_to_hit(7),
    ]
}

/// One unit's starting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSetup {
    /// Unique unit id.
    pub id: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Team membership.
    pub team: u8,
    /// Starting hex.
    pub position: Hex,
    /// Base initiative score.
    #[serde(with = "decimal_serde")]
    pub initiative: Fixed,
    /// Speed stat used to break initiative ties.
    #[serde(with = "decimal_serde", default = "Fixed::default")]
    pub speed: Fixed,
    /// Heat at which the unit shuts down.
    #[serde(default = "default_heat_capacity")]
    pub heat_capacity: u32,
    /// Heat shed at the start of each round.
    #[serde(default = "default_heat_dissipation")]
    pub heat_dissipation: u32,
    /// Armor and structure per section.
    #[serde(default)]
    pub armor: ArmorSetup,
    /// Weapon ids from the armory.
    pub weapons: Vec<WeaponId>,
    /// Ammunition bins.
    #[serde(default)]
    pub ammo: Vec<AmmoSetup>,
}

const fn default_heat_capacity() -> u32 {
    30
}

const fn default_heat_dissipation() -> u32 {
    10
}

impl UnitSetup {
    /// A medium mech with default heat sinks and armor.
    #[must_use]
    pub fn medium(id: u32, name: &str, team: u8, position: Hex) -> Self {
        Self {
            id,
            name: name.to_string(),
            team,
            position,
            initiative: Fixed::from_num(5),
            speed: Fixed::from_num(id),
            heat_capacity: default_heat_capacity(),
            heat_dissipation: default_heat_dissipation(),
            armor: ArmorSetup::default(),
            weapons: Vec::new(),
            ammo: Vec::new(),
        }
    }

    /// Builder method to set the weapon loadout.
    #[must_use]
    pub fn with_weapons(mut self, weapons: &[WeaponId]) -> Self {
        self.weapons = weapons.to_vec();
        self
    }

    /// Builder method to add an ammunition bin.
    #[must_use]
    pub fn with_ammo(mut self, weapon: WeaponId, shots: u32, location: LocationRef) -> Self {
        self.ammo.push(AmmoSetup {
            weapon,
            shots,
            location,
        });
        self
    }

    /// The roster entry for this unit.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(
            ActorId(self.id),
            TeamId(self.team),
            self.initiative,
            self.speed,
        )
    }
}

/// Ammunition stored for one weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoSetup {
    /// Weapon fed by this bin.
    pub weapon: WeaponId,
    /// Salvos available.
    pub shots: u32,
    /// Section the bin sits in.
    pub location: LocationRef,
}

/// Armor layout: uniform values with per-section overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmorSetup {
    /// Armor on every section without an override.
    pub armor: u32,
    /// Structure on every section without an override.
    pub structure: u32,
    /// Sections with their own values.
    pub overrides: Vec<SectionSetup>,
}

impl Default for ArmorSetup {
    fn default() -> Self {
        Self {
            armor: 12,
            structure: 8,
            overrides: vec![SectionSetup {
                location: LocationRef::Head,
                armor: 9,
                structure: 3,
            }],
        }
    }
}

impl ArmorSetup {
    /// Starting state of one section.
    #[must_use]
    pub fn section(&self, location: LocationRef) -> Section {
        self.overrides
            .iter()
            .rev()
            .find(|o| o.location == location)
            .map_or(
                Section {
                    armor: self.armor,
                    structure: self.structure,
                },
                |o| Section {
                    armor: o.armor,
                    structure: o.structure,
                },
            )
    }
}

/// Explicit armor for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSetup {
    /// Section.
    pub location: LocationRef,
    /// Armor points.
    pub armor: u32,
    /// Structure points.
    pub structure: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUEL: &str = r#"(
        name: "Duel",
        max_rounds: 12,
        combat: (dice: (history_capacity: 16)),
        armory: [
            (
                id: (1),
                name: "Medium Laser",
                category: Energy,
                min_range: 0,
                max_range: 9,
                damage: 5,
                heat: 3,
                to_hit: 8,
                missiles: 0,
                damage_per_missile: 0,
                ap_cost: 1,
            ),
        ],
        units: [
            (
                id: 1,
                team: 0,
                position: (q: 0, r: 0),
                initiative: 6.5,
                weapons: [(1)],
                armor: (armor: 4, structure: 2, overrides: [(location: CenterTorso, armor: 10, structure: 6)]),
            ),
            (
                id: 2,
                team: 1,
                position: (q: 5, r: 0),
                initiative: 4.0,
                speed: 3.0,
                weapons: [(1)],
            ),
        ],
    )"#;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert!(scenario.validate().is_ok());
        assert_eq!(scenario.units.len(), 4);
        assert_eq!(scenario.roster().teams_alive().len(), 2);
    }

    #[test]
    fn test_parse_from_ron() {
        let scenario = Scenario::from_ron_str(DUEL).unwrap();
        assert_eq!(scenario.name, "Duel");
        assert_eq!(scenario.max_rounds, 12);
        assert_eq!(scenario.combat.dice.history_capacity, 16);
        assert_eq!(scenario.units[0].initiative, Fixed::from_num(6.5));
        assert_eq!(scenario.units[1].heat_capacity, default_heat_capacity());
        assert_eq!(scenario.loadout(&scenario.units[0])[0].name, "Medium Laser");
    }

    #[test]
    fn test_armor_overrides() {
        let scenario = Scenario::from_ron_str(DUEL).unwrap();
        let field = scenario.field(0);
        assert_eq!(
            field.section(ActorId(1), LocationRef::CenterTorso),
            Some(Section { armor: 10, structure: 6 })
        );
        assert_eq!(
            field.section(ActorId(1), LocationRef::LeftArm),
            Some(Section { armor: 4, structure: 2 })
        );
        assert_eq!(field.position(ActorId(2)), Some(Hex::new(5, 0)));
    }

    #[test]
    fn test_unknown_weapon_rejected() {
        let bad = DUEL.replacen("weapons: [(1)]", "weapons: [(7)]", 1);
        assert!(matches!(
            Scenario::from_ron_str(&bad),
            Err(ScenarioError::Invalid(_))
        ));
    }

    #[test]
    fn test_free_weapon_rejected() {
        let bad = DUEL.replacen("ap_cost: 1", "ap_cost: 0", 1);
        assert!(matches!(
            Scenario::from_ron_str(&bad),
            Err(ScenarioError::Invalid(_))
        ));

        let mut scenario = Scenario::skirmish_2v2();
        scenario.armory[0].ap_cost = 0;
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_single_team_rejected() {
        let mut scenario = Scenario::skirmish_2v2();
        for unit in &mut scenario.units {
            unit.team = 0;
        }
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("does/not/exist.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_bundled_scenario_parses() {
        let scenario =
            Scenario::from_ron_str(include_str!("../scenarios/ridge_skirmish.ron")).unwrap();
        assert_eq!(scenario.units.len(), 4);
        assert_eq!(scenario.obstacles.len(), 2);
    }
}
