//! Core domain types for the interaction dataset.
//!
//! External ids are the sparse identifiers from the raw tables;
//! internal indices are the dense zero-based indices assigned by the
//! encoders at build time. Keeping the two spaces in separate type
//! positions (id fields vs. `*_index` fields) is what makes the rest
//! of the pipeline hard to wire wrong.

use serde::{Deserialize, Serialize};

/// Unique external identifier for a user
pub type UserId = u32;

/// Unique external identifier for a movie
pub type MovieId = u32;

/// Lowest valid rating on the scale
pub const RATING_MIN: f32 = 0.5;

/// Highest valid rating on the scale
pub const RATING_MAX: f32 = 5.0;

/// Sentinel genre label meaning "no genres", carried by the raw
/// metadata table and dropped from the feature schema after transform
pub const NO_GENRES_LABEL: &str = "(no genres listed)";

/// A single rating a user gave a movie, in external-id space.
///
/// Immutable once created; ingestion appends new rows rather than
/// editing existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value in [0.5, 5.0], step 0.5
    pub rating: f32,
    /// Unix timestamp when the rating was made
    pub timestamp: i64,
}

/// A movie from the metadata table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from the title suffix (e.g. "Toy Story (1995)")
    pub year: Option<u16>,
    /// Genre labels as they appear in the raw table. The vocabulary is
    /// data-driven, so these stay strings rather than a fixed enum.
    pub genres: Vec<String>,
}

/// A rating row after id encoding and genre augmentation.
///
/// `user_index` and `movie_index` live in the dense internal space of
/// the snapshot's encoders; `genre_features` is one 0/1 entry per
/// non-sentinel vocabulary label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedInteraction {
    pub user_index: u32,
    pub movie_index: u32,
    pub rating: f32,
    pub timestamp: i64,
    pub genre_features: Vec<u8>,
}

/// Whether a rating value lies on the valid scale
pub fn rating_in_scale(rating: f32) -> bool {
    (RATING_MIN..=RATING_MAX).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_scale_bounds() {
        assert!(rating_in_scale(0.5));
        assert!(rating_in_scale(5.0));
        assert!(rating_in_scale(3.5));
        assert!(!rating_in_scale(0.0));
        assert!(!rating_in_scale(6.0));
        assert!(!rating_in_scale(-1.0));
    }
}
