//! # Mech Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scripted dice and recording collaborator fakes
//! - Actor and weapon fixtures
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
