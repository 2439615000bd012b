//! Weapon definitions and cluster tables.
//!
//! Weapons are data: a category that selects the resolution routine, range
//! band, damage, heat and ammunition figures. Cluster weapons additionally
//! carry a missile count, and the number of missiles that connect is read
//! from a 2d6 cluster table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for weapon types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeaponId(pub u32);

impl WeaponId {
    /// Create a new weapon ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Resolution family of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeaponCategory {
    /// Lasers and PPCs - no ammunition, high heat.
    #[default]
    Energy,
    /// Autocannons and gauss rifles - ammunition fed.
    Ballistic,
    /// Missile racks - ammunition fed, damage resolved per missile.
    Missile,
    /// Punches, kicks and melee weapons.
    Physical,
}

impl WeaponCategory {
    /// Whether the category draws from an ammunition bin.
    #[must_use]
    pub const fn uses_ammo(self) -> bool {
        matches!(self, Self::Ballistic | Self::Missile)
    }

    /// Whether firing builds up heat.
    #[must_use]
    pub const fn generates_heat(self) -> bool {
        !matches!(self, Self::Physical)
    }
}

/// Static weapon data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Weapon type.
    pub id: WeaponId,
    /// Display name.
    pub name: String,
    /// Resolution family.
    pub category: WeaponCategory,
    /// Minimum range in hexes (inclusive).
    pub min_range: u32,
    /// Maximum range in hexes (inclusive).
    pub max_range: u32,
    /// Damage per hit (direct-fire weapons).
    pub damage: u32,
    /// Heat generated per firing.
    pub heat: u32,
    /// 2d6 target needed to hit (direct-fire weapons).
    pub to_hit: i32,
    /// Missiles per salvo (cluster weapons).
    pub missiles: u32,
    /// Damage per connecting missile (cluster weapons).
    pub damage_per_missile: u32,
    /// Action points spent by firing.
    pub ap_cost: u32,
}

impl WeaponSpec {
    /// Create a direct-fire weapon.
    #[must_use]
    pub fn new(id: WeaponId, name: impl Into<String>, category: WeaponCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            min_range: 0,
            max_range: 6,
            damage: 5,
            heat: if category.generates_heat() { 3 } else { 0 },
            to_hit: 8,
            missiles: 0,
            damage_per_missile: 0,
            ap_cost: 1,
        }
    }

    /// Create a missile rack.
    #[must_use]
    pub fn missile_rack(
        id: WeaponId,
        name: impl Into<String>,
        missiles: u32,
        damage_per_missile: u32,
    ) -> Self {
        Self {
            missiles,
            damage_per_missile,
            damage: 0,
            ..Self::new(id, name, WeaponCategory::Missile)
        }
    }

    /// Builder method to set the range band.
    #[must_use]
    pub fn with_range(mut self, min_range: u32, max_range: u32) -> Self {
        self.min_range = min_range;
        self.max_range = max_range;
        self
    }

    /// Builder method to set damage per hit.
    #[must_use]
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    /// Builder method to set heat per firing.
    #[must_use]
    pub fn with_heat(mut self, heat: u32) -> Self {
        self.heat = heat;
        self
    }

    /// Builder method to set the to-hit target.
    #[must_use]
    pub fn with_to_hit(mut self, to_hit: i32) -> Self {
        self.to_hit = to_hit;
        self
    }

    /// Builder method to set the action point cost.
    #[must_use]
    pub fn with_ap_cost(mut self, ap_cost: u32) -> Self {
        self.ap_cost = ap_cost;
        self
    }

    /// Whether `distance` lies inside the range band.
    #[must_use]
    pub fn in_range(&self, distance: u32) -> bool {
        distance >= self.min_range && distance <= self.max_range
    }
}

/// Maps each 2d6 result (2..=12) to a number of connecting missiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterTable {
    hits: [u32; 11],
}

/// Standard cluster columns: rack size followed by hits for rolls 2..=12.
const STANDARD_COLUMNS: [(u32, [u32; 11]); 7] = [
    (2, [1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2]),
    (4, [1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4]),
    (5, [1, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5]),
    (6, [2, 2, 3, 3, 4, 4, 4, 5, 5, 6, 6]),
    (10, [3, 3, 4, 6, 6, 6, 6, 8, 8, 10, 10]),
    (15, [5, 5, 6, 9, 9, 9, 9, 12, 12, 15, 15]),
    (20, [6, 6, 9, 12, 12, 12, 12, 16, 16, 20, 20]),
];

impl ClusterTable {
    /// Build a table from hit counts for rolls 2..=12.
    #[must_use]
    pub const fn new(hits: [u32; 11]) -> Self {
        Self { hits }
    }

    /// The standard column for a rack size, if there is one.
    #[must_use]
    pub fn standard(missiles: u32) -> Option<Self> {
        STANDARD_COLUMNS
            .iter()
            .find(|(size, _)| *size == missiles)
            .map(|(_, hits)| Self::new(*hits))
    }

    /// A table for racks without a standard column.
    ///
    /// Scales the 20-missile column to the rack size, rounding to nearest.
    #[must_use]
    pub fn scaled(missiles: u32) -> Self {
        let reference = STANDARD_COLUMNS[STANDARD_COLUMNS.len() - 1].1;
        let mut hits = [0; 11];
        for (slot, base) in hits.iter_mut().zip(reference) {
            *slot = (base * missiles + 10) / 20;
        }
        Self::new(hits)
    }

    /// Missiles connecting for a roll, clamped to `[0, missiles]`.
    ///
    /// Rolls outside 2..=12 (possible with modifiers) clamp to the nearest
    /// row.
    #[must_use]
    pub fn hits_for(&self, roll: i32, missiles: u32) -> u32 {
        let row = (roll.clamp(2, 12) - 2) as usize;
        self.hits[row].min(missiles)
    }
}

/// Cluster tables keyed by weapon identity.
///
/// Weapons without an override use the standard column for their rack size,
/// or a scaled column when the rack size is non-standard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterTables {
    overrides: HashMap<WeaponId, ClusterTable>,
}

impl ClusterTables {
    /// Create a registry with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a weapon-specific table.
    pub fn insert(&mut self, weapon: WeaponId, table: ClusterTable) {
        self.overrides.insert(weapon, table);
    }

    /// Table used for a weapon.
    #[must_use]
    pub fn table_for(&self, weapon: &WeaponSpec) -> ClusterTable {
        self.overrides
            .get(&weapon.id)
            .copied()
            .or_else(|| ClusterTable::standard(weapon.missiles))
            .unwrap_or_else(|| ClusterTable::scaled(weapon.missiles))
    }

    /// Missiles connecting for a weapon and roll.
    #[must_use]
    pub fn hits(&self, weapon: &WeaponSpec, roll: i32) -> u32 {
        self.table_for(weapon).hits_for(roll, weapon.missiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_flags() {
        assert!(!WeaponCategory::Energy.uses_ammo());
        assert!(WeaponCategory::Ballistic.uses_ammo());
        assert!(WeaponCategory::Missile.uses_ammo());
        assert!(!WeaponCategory::Physical.generates_heat());
    }

    #[test]
    fn test_range_band_inclusive() {
        let weapon = WeaponSpec::new(WeaponId(1), "PPC", WeaponCategory::Energy).with_range(3, 9);
        assert!(!weapon.in_range(2));
        assert!(weapon.in_range(3));
        assert!(weapon.in_range(9));
        assert!(!weapon.in_range(10));
    }

    #[test]
    fn test_standard_ten_rack() {
        let lrm10 = WeaponSpec::missile_rack(WeaponId(10), "LRM-10", 10, 1);
        let tables = ClusterTables::new();
        assert_eq!(tables.hits(&lrm10, 7), 6);
        assert_eq!(tables.hits(&lrm10, 2), 3);
        assert_eq!(tables.hits(&lrm10, 12), 10);
    }

    #[test]
    fn test_rolls_clamp_to_table() {
        let table = ClusterTable::standard(6).unwrap();
        assert_eq!(table.hits_for(-3, 6), 2);
        assert_eq!(table.hits_for(15, 6), 6);
    }

    #[test]
    fn test_hits_clamped_to_rack_size() {
        let table = ClusterTable::new([9; 11]);
        assert_eq!(table.hits_for(7, 4), 4);
    }

    #[test]
    fn test_override_wins() {
        let srm = WeaponSpec::missile_rack(WeaponId(2), "SRM-4", 4, 2);
        let mut tables = ClusterTables::new();
        tables.insert(WeaponId(2), ClusterTable::new([4; 11]));
        assert_eq!(tables.hits(&srm, 2), 4);
    }

    #[test]
    fn test_scaled_table_for_odd_rack() {
        let rack = WeaponSpec::missile_rack(WeaponId(3), "MRM-30", 30, 1);
        let tables = ClusterTables::new();
        assert_eq!(tables.hits(&rack, 12), 30);
        assert_eq!(tables.hits(&rack, 7), 18);
        // Every row stays within the rack
        for roll in 2..=12 {
            assert!(tables.hits(&rack, roll) <= 30);
        }
    }
}
