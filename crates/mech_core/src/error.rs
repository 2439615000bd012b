//! Error types for the combat core.
//!
//! Only input validation and caller misuse are errors. Attacks that fail
//! range, line-of-sight or resource checks are ordinary results (see
//! [`crate::combat::AttackRejection`]) and ineligible actors popped from the
//! schedule are skipped without an error.

use thiserror::Error;

use crate::actor::ActorId;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Malformed roll specifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// Dice need at least two faces.
    #[error("Invalid die: {sides} sides (minimum 2)")]
    InvalidSides {
        /// Requested number of faces.
        sides: u32,
    },

    /// A roll needs at least one die.
    #[error("Invalid dice count: {count} (minimum 1)")]
    InvalidCount {
        /// Requested number of dice.
        count: u32,
    },

    /// Dice notation could not be parsed.
    #[error("Invalid dice notation '{0}'")]
    InvalidNotation(String),
}

/// Misuse of the turn scheduler by its driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A round was started while another one is still running.
    #[error("Round {round} is still in progress")]
    RoundInProgress {
        /// The running round.
        round: u64,
    },

    /// An actor reported completion without holding the turn.
    #[error("Actor {actor} does not hold the turn (current: {current:?})")]
    NotCurrentActor {
        /// Actor that reported.
        actor: ActorId,
        /// Actor that actually holds the turn.
        current: Option<ActorId>,
    },

    /// No actor is currently offered a turn.
    #[error("No turn is currently in progress")]
    NoActiveTurn,
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The collaborator does not know the actor.
    #[error("Collaborator has no record of actor {0}")]
    UnknownActor(ActorId),

    /// The collaborator rejected the request.
    #[error("{service} failed: {message}")]
    ServiceFailed {
        /// Name of the failing service.
        service: &'static str,
        /// Failure description.
        message: String,
    },
}

/// Top-level error type for the combat core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid roll specification.
    #[error(transparent)]
    Dice(#[from] DiceError),

    /// Scheduler driven out of order.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// External collaborator failure.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Actor reference does not resolve.
    #[error("Actor not found: {0}")]
    UnknownActor(ActorId),

    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DiceError::InvalidSides { sides: 1 };
        assert_eq!(err.to_string(), "Invalid die: 1 sides (minimum 2)");

        let err = CoreError::from(SchedulerError::NoActiveTurn);
        assert_eq!(err.to_string(), "No turn is currently in progress");

        let err = SchedulerError::NotCurrentActor {
            actor: ActorId(3),
            current: Some(ActorId(1)),
        };
        assert!(err.to_string().contains("#3"));
    }
}
