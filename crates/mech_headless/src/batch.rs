//! Batch battle runner for balance testing.
//!
//! Runs many seeds of one scenario in parallel using rayon and aggregates
//! win rates and damage figures.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{run_battle, BattleReport};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of battles to run
    pub game_count: u32,
    /// Maximum parallel battles (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed for deterministic runs
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a number of battles
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set thread count
    pub fn with_parallel(mut self, threads: u32) -> Self {
        self.parallel_games = threads;
        self
    }
}

/// Aggregate figures across a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Wins per team
    pub wins: BTreeMap<u8, u32>,
    /// Battles that hit the round limit
    pub draws: u32,
    /// Mean rounds per battle
    pub average_rounds: f64,
    /// Mean damage dealt per battle
    pub average_damage: f64,
}

impl BatchSummary {
    /// Summarize finished battles
    pub fn from_reports(reports: &[BattleReport]) -> Self {
        let mut summary = Self::default();
        if reports.is_empty() {
            return summary;
        }

        let mut rounds = 0u64;
        let mut damage = 0u64;
        for report in reports {
            match report.winner {
                Some(team) => *summary.wins.entry(team).or_insert(0) += 1,
                None => summary.draws += 1,
            }
            rounds += u64::from(report.rounds);
            damage += report
                .units
                .iter()
                .map(|u| u64::from(u.damage_dealt))
                .sum::<u64>();
        }

        let n = reports.len() as f64;
        summary.average_rounds = rounds as f64 / n;
        summary.average_damage = damage as f64 / n;
        summary
    }

    /// Win rate of a team in `0.0..=1.0`
    pub fn win_rate(&self, team: u8) -> f64 {
        let total = self.wins.values().sum::<u32>() + self.draws;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.wins.get(&team).copied().unwrap_or(0)) / f64::from(total)
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name
    pub scenario: String,
    /// Configuration used
    pub config: BatchConfig,
    /// Individual battle reports
    pub games: Vec<BattleReport>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Run a batch of battles
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        "Starting batch run: {} battles of '{}'",
        config.game_count, scenario.name
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<BattleReport, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_battle(scenario, seed) {
                Ok(report) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(report)
                }
                Err(e) => {
                    warn!("Battle {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<BattleReport> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_reports(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of a replay check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismCheck {
    /// All runs produced the same event stream
    pub is_deterministic: bool,
    /// Event hash of each run
    pub hashes: Vec<u64>,
}

/// Verify determinism by running the same seed multiple times
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> DeterminismCheck {
    let hashes: Vec<u64> = (0..runs)
        .filter_map(|run| match run_battle(scenario, seed) {
            Ok(report) => Some(report.event_hash),
            Err(e) => {
                warn!("Replay {} failed: {}", run, e);
                None
            }
        })
        .collect();

    let is_deterministic =
        hashes.len() == runs as usize && hashes.windows(2).all(|pair| pair[0] == pair[1]);
    if !is_deterministic {
        warn!(seed, ?hashes, "Replays diverged");
    }
    DeterminismCheck {
        is_deterministic,
        hashes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_runs_every_seed() {
        let scenario = Scenario::skirmish_2v2();
        let results = run_batch(&scenario, BatchConfig::new(6).with_seed(100));

        assert!(results.errors.is_empty());
        assert_eq!(results.games.len(), 6);
        let mut seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        seeds.sort_unstable();
        assert_eq!(seeds, (100..106).collect::<Vec<_>>());

        let decided: u32 = results.summary.wins.values().sum();
        assert_eq!(decided + results.summary.draws, 6);
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let scenario = Scenario::skirmish_2v2();
        let results = run_batch(&scenario, BatchConfig::new(3).with_seed(7));
        for game in &results.games {
            let solo = run_battle(&scenario, game.seed).unwrap();
            assert_eq!(&solo, game);
        }
    }

    #[test]
    fn test_summary() {
        let report = |winner, rounds| BattleReport {
            scenario: "t".into(),
            seed: 0,
            rounds,
            winner,
            survivors: Vec::new(),
            units: Vec::new(),
            event_count: 0,
            event_hash: 0,
        };
        let summary = BatchSummary::from_reports(&[
            report(Some(0), 4),
            report(Some(0), 6),
            report(Some(1), 8),
            report(None, 30),
        ]);
        assert_eq!(summary.wins.get(&0), Some(&2));
        assert_eq!(summary.draws, 1);
        assert!((summary.average_rounds - 12.0).abs() < f64::EPSILON);
        assert!((summary.win_rate(0) - 0.5).abs() < f64::EPSILON);
        assert!(BatchSummary::from_reports(&[]).wins.is_empty());
    }

    #[test]
    fn test_verify_determinism() {
        let check = verify_determinism(&Scenario::skirmish_2v2(), 42, 3);
        assert!(check.is_deterministic);
        assert_eq!(check.hashes.len(), 3);
    }

    #[test]
    fn test_save_and_load_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");

        let results = run_batch(&Scenario::skirmish_2v2(), BatchConfig::new(2));
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();

        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.summary.wins, results.summary.wins);
        assert_eq!(loaded.config.game_count, 2);
    }
}
