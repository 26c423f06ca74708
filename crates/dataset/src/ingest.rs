//! Appending ratings for a new user into a snapshot.
//!
//! Ingestion is copy-on-write: all validation runs against the input
//! snapshot first, and only when every pair passes is a new snapshot
//! produced. Encoders and the encoded set are NOT refit here, so a
//! model trained before ingestion is stale against the result until
//! it is retrained (the version check in the query engine enforces
//! that).

use crate::error::{DatasetError, Result};
use crate::snapshot::Snapshot;
use crate::types::{rating_in_scale, MovieId, Rating, UserId, RATING_MAX, RATING_MIN};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

impl Snapshot {
    /// Append synthetic rating rows for a new external user id.
    ///
    /// Validation, in order, each a distinct failure:
    /// - `DuplicateUser` if the user already has rows in the snapshot
    /// - `UnknownItem` for any movie id absent from the movie encoder
    ///   (cold-start items are out of scope)
    /// - `RatingOutOfRange` for ratings outside [0.5, 5.0]
    ///
    /// All-or-nothing: on any failure the input snapshot is left
    /// untouched and no rows are appended. The returned snapshot gets
    /// a fresh version; the new user cannot be recommended for until
    /// the snapshot is rebuilt and the model retrained.
    pub fn add_user_ratings(
        &self,
        user_id: UserId,
        pairs: &[(MovieId, f32)],
    ) -> Result<Snapshot> {
        if self.user_encoder.contains(user_id)
            || self.ratings.iter().any(|r| r.user_id == user_id)
        {
            return Err(DatasetError::DuplicateUser { user_id });
        }

        for &(movie_id, rating) in pairs {
            if !self.movie_encoder.contains(movie_id) {
                return Err(DatasetError::UnknownItem { movie_id });
            }
            if !rating_in_scale(rating) {
                return Err(DatasetError::RatingOutOfRange {
                    rating,
                    min: RATING_MIN,
                    max: RATING_MAX,
                });
            }
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let mut updated = self.clone();
        for &(movie_id, rating) in pairs {
            updated.ratings.push(Rating {
                user_id,
                movie_id,
                rating,
                timestamp,
            });
        }
        updated.version = crate::snapshot::next_version();

        info!(
            user_id,
            rows = pairs.len(),
            version = updated.version,
            "Ingested ratings for new user"
        );
        Ok(updated)
    }
}
