//! # Dataset Crate
//!
//! Turns raw MovieLens-style tables into a training-ready snapshot.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Rating, Movie, EncodedInteraction)
//! - **parser**: Parse the CSV tables into Rust structs
//! - **encoder**: Bijection between external ids and dense indices
//! - **features**: Multi-hot genre vectors over a fitted vocabulary
//! - **snapshot**: Dataset building, train/held-out split, rebuild
//! - **ingest**: Copy-on-write appends of a new user's ratings
//! - **error**: Error types for the whole crate
//!
//! ## Example Usage
//!
//! ```ignore
//! use dataset::{Snapshot, UnseenLabelPolicy};
//! use std::path::Path;
//!
//! let snapshot = Snapshot::load_from_files(
//!     Path::new("data/ml-latest-small"),
//!     UnseenLabelPolicy::Ignore,
//! )?;
//! let (train, held_out) = snapshot.split(0.8, 42);
//! ```

pub mod encoder;
pub mod error;
pub mod features;
pub mod ingest;
pub mod parser;
pub mod snapshot;
pub mod types;

// Re-export commonly used types for convenience
pub use encoder::IdEncoder;
pub use error::{DatasetError, Result};
pub use features::{GenreVocabulary, UnseenLabelPolicy};
pub use snapshot::{Snapshot, DEFAULT_TRAIN_FRACTION};
pub use types::{
    rating_in_scale, EncodedInteraction, Movie, MovieId, Rating, UserId, NO_GENRES_LABEL,
    RATING_MAX, RATING_MIN,
};
