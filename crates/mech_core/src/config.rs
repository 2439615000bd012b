//! Combat configuration loaded from RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dice::{DiceEngine, SeededDice, DEFAULT_HISTORY_CAPACITY};
use crate::error::{CoreError, Result};
use crate::scheduler::SchedulerConfig;
use crate::weapons::ClusterTables;

/// Dice engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceConfig {
    /// Number of recent rolls kept for inspection.
    pub history_capacity: usize,
    /// Seed for the die source.
    pub seed: u64,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            seed: 0,
        }
    }
}

impl DiceConfig {
    /// Build a seeded engine from this configuration.
    #[must_use]
    pub fn engine(&self) -> DiceEngine<SeededDice> {
        DiceEngine::with_history_capacity(SeededDice::new(self.seed), self.history_capacity)
    }
}

/// Everything tunable about a battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Turn scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Dice engine settings.
    pub dice: DiceConfig,
    /// Weapon-specific cluster tables.
    pub cluster_tables: ClusterTables,
}

impl CombatConfig {
    /// Parse a configuration from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigParse`] if the text is not valid RON for
    /// this type.
    pub fn from_ron_str(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Load a configuration from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigIo`] if the file cannot be read and
    /// [`CoreError::ConfigParse`] if it does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_ron_str(&contents)?;
        tracing::debug!(path = %path.display(), "Combat config loaded");
        Ok(config)
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns the RON serializer's error if a value cannot be encoded.
    pub fn to_ron_string(&self) -> std::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
