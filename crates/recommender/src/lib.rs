//! # Recommender Crate
//!
//! Top-N recommendation queries over a trained model and a dataset
//! snapshot.
//!
//! The model and the snapshot are two independently versioned,
//! immutable values passed in explicitly; [`recommend`] checks their
//! compatibility before doing any work, so a model trained before an
//! ingestion fails fast instead of scoring against a mismatched index
//! space.

use dataset::{MovieId, Snapshot, UserId};
use model::FactorModel;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder title when the metadata table has no entry for a
/// recommended movie; a missing title is reported, not fatal.
pub const UNKNOWN_TITLE: &str = "<unknown title>";

/// Failures a recommendation query can surface to the caller.
///
/// "No candidates left" is NOT an error; it yields an empty list. The
/// two variants here are invalid input and invalid pairing, and are
/// never collapsed into an empty success.
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The external user id is not part of the snapshot's encoder
    #[error("User {user_id} is not known to the dataset")]
    UnknownUser { user_id: UserId },

    /// The model was trained against a different snapshot version
    #[error(
        "Model is stale: trained against snapshot version {model_version}, \
         queried against version {snapshot_version}; retrain before querying"
    )]
    StaleModel {
        model_version: u64,
        snapshot_version: u64,
    },
}

pub type Result<T> = std::result::Result<T, RecommendError>;

/// One ranked recommendation, already resolved to external-id space.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub predicted_rating: f32,
}

/// Return up to `n` movies the user has not rated, ranked by predicted
/// rating.
///
/// ## Algorithm
/// 1. Refuse a model/snapshot version mismatch (`StaleModel`)
/// 2. Resolve the external user id (`UnknownUser` if absent)
/// 3. Candidates = all movie indices minus the user's rated set
/// 4. Score every candidate with the model, in parallel
/// 5. Sort by score descending, ties by ascending movie index so the
///    ordering is deterministic
/// 6. Truncate to `n`, decode indices, resolve titles
///
/// `n = 0` or an exhausted candidate set yields a short (possibly
/// empty) list, never an error.
pub fn recommend(
    model: &FactorModel,
    snapshot: &Snapshot,
    user_id: UserId,
    n: usize,
) -> Result<Vec<Recommendation>> {
    if model.snapshot_version() != snapshot.version {
        return Err(RecommendError::StaleModel {
            model_version: model.snapshot_version(),
            snapshot_version: snapshot.version,
        });
    }

    let user_index = snapshot
        .user_encoder
        .encode(user_id)
        .map_err(|_| RecommendError::UnknownUser { user_id })?;

    let rated = snapshot.rated_movie_indices(user_index);
    debug!(
        user_id,
        rated = rated.len(),
        total = snapshot.num_movies(),
        "Scoring candidates"
    );

    let mut scored: Vec<(u32, f32)> = (0..snapshot.num_movies() as u32)
        .into_par_iter()
        .filter(|index| !rated.contains(index))
        .map(|index| (index, model.predict(user_index, index)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(n);

    let recommendations = scored
        .into_iter()
        .map(|(index, predicted_rating)| {
            // The index came from the encoder's own range; a decode
            // failure here is a wiring bug, not a data condition
            let movie_id = snapshot
                .movie_encoder
                .decode(index)
                .expect("candidate index within the encoder's range");
            let title = match snapshot.movie_title(movie_id) {
                Some(title) => title.to_string(),
                None => {
                    warn!(movie_id, "No title for recommended movie");
                    UNKNOWN_TITLE.to_string()
                }
            };
            Recommendation {
                movie_id,
                title,
                predicted_rating,
            }
        })
        .collect();

    Ok(recommendations)
}
