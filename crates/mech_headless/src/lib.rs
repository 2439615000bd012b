//! Headless battle runner for balance testing and CI verification.
//!
//! Loads a RON scenario, builds a hex battlefield that implements every
//! combat collaborator, and plays the battle out with a scripted controller.
//! This enables:
//!
//! - **Balance testing**: Run thousands of seeds in parallel and compare win rates
//! - **CI verification**: Check that battles replay identically from a seed
//!
//! # Example
//!
//! ```bash
//! cargo run -p mech_headless -- run --scenario scenarios/ridge_skirmish.ron --seed 7
//! cargo run -p mech_headless -- batch --count 500 --output results/
//! ```

pub mod batch;
pub mod field;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use field::{Hex, HexField, Section};
pub use runner::{run_battle, BattleReport, BattleRunner, UnitReport};
pub use scenario::{Scenario, ScenarioError, UnitSetup};
