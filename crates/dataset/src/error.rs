//! Error types for the dataset crate.
//!
//! One enum covers the three failure families this crate has:
//! - loading/parsing the raw CSV tables
//! - encoder misuse (ids or indices outside the fitted range)
//! - ingestion validation (rejected before any mutation)

use thiserror::Error;

/// Errors that can occur while loading, building, or mutating a snapshot.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in a data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// An external id was not seen when the encoder was fitted.
    ///
    /// This is encoder misuse: with correct pipeline wiring it should
    /// never fire, so it is always surfaced rather than swallowed.
    #[error("Identifier {id} was not seen at fit time")]
    UnknownIdentifier { id: u32 },

    /// An internal index beyond the encoder's assigned range
    #[error("Index {index} is out of range (encoder holds {len} ids)")]
    IndexOutOfRange { index: u32, len: usize },

    /// A genre label absent from the fitted vocabulary, under the
    /// `Reject` policy
    #[error("Genre label '{label}' is not in the fitted vocabulary")]
    UnknownGenre { label: String },

    /// Ingestion: the user id already has rows in the snapshot
    #[error("User {user_id} already exists in the snapshot")]
    DuplicateUser { user_id: u32 },

    /// Ingestion: the referenced movie is not part of the snapshot
    /// (cold-start items are deliberately unsupported)
    #[error("Movie {movie_id} does not exist in the snapshot")]
    UnknownItem { movie_id: u32 },

    /// Ingestion: rating outside the valid scale
    #[error("Rating {rating} is outside the valid scale [{min}, {max}]")]
    RatingOutOfRange { rating: f32, min: f32, max: f32 },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DatasetError>;
