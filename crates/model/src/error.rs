//! Error types for model training.

use thiserror::Error;

/// Failures that abort a training run. These carry the set sizes and
/// configured rank so a bad run is diagnosable from the message alone;
/// they are never retried automatically.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error(
        "Rank {factors} is too large for {users} users and {items} items; \
         it must be smaller than both"
    )]
    RankTooLarge {
        factors: usize,
        users: usize,
        items: usize,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ModelError>;
