//! Snapshot building: from raw tables to the training-ready dataset.
//!
//! A [`Snapshot`] bundles everything the rest of the system works
//! against: the raw rating rows, the movie metadata map, both id
//! encoders, the genre vocabulary, and the encoded interaction set.
//! Snapshots are immutable values; ingestion produces a new snapshot
//! rather than mutating one in place, so readers always observe
//! either the pre- or post-ingestion state, never a partial one.

use crate::encoder::IdEncoder;
use crate::error::Result;
use crate::features::{GenreVocabulary, UnseenLabelPolicy};
use crate::parser;
use crate::types::{EncodedInteraction, Movie, MovieId, Rating, UserId};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Default train fraction for [`Snapshot::split`]
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

// Each built or ingested snapshot gets a process-unique version, so a
// model trained against one snapshot can be checked against another.
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// The dataset snapshot: raw rows plus everything derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Raw rating rows in external-id space. Ingestion appends here.
    pub ratings: Vec<Rating>,
    /// Movie metadata keyed by external id
    pub movies: HashMap<MovieId, Movie>,
    /// User-id bijection fitted at build time
    pub user_encoder: IdEncoder,
    /// Movie-id bijection fitted at build time
    pub movie_encoder: IdEncoder,
    /// Fitted genre vocabulary
    pub vocabulary: GenreVocabulary,
    /// One encoded row per rating row present at build time
    pub interactions: Vec<EncodedInteraction>,
    /// Process-unique snapshot version, reassigned by build and by
    /// ingestion
    pub version: u64,
    pub(crate) policy: UnseenLabelPolicy,
}

impl Snapshot {
    /// Build a snapshot from raw rating rows and movie metadata.
    ///
    /// Ratings are left-joined to movie genres by external movie id;
    /// rows with no metadata match get an empty genre list and are
    /// never dropped. Both encoders and the vocabulary are fitted over
    /// the joined rows, then every rating is encoded. The row count is
    /// preserved exactly.
    pub fn build(
        ratings: Vec<Rating>,
        movies: Vec<Movie>,
        policy: UnseenLabelPolicy,
    ) -> Result<Self> {
        let movies: HashMap<MovieId, Movie> = movies.into_iter().map(|m| (m.id, m)).collect();

        // Left join: genre lists per rating row, empty when metadata
        // is missing
        let genre_rows: Vec<Vec<String>> = ratings
            .iter()
            .map(|r| {
                movies
                    .get(&r.movie_id)
                    .map(|m| m.genres.clone())
                    .unwrap_or_default()
            })
            .collect();

        let user_encoder = IdEncoder::fit(ratings.iter().map(|r| r.user_id));
        let movie_encoder = IdEncoder::fit(ratings.iter().map(|r| r.movie_id));
        let vocabulary = GenreVocabulary::fit(&genre_rows, policy);

        let mut interactions = Vec::with_capacity(ratings.len());
        for (rating, genres) in ratings.iter().zip(&genre_rows) {
            interactions.push(EncodedInteraction {
                user_index: user_encoder.encode(rating.user_id)?,
                movie_index: movie_encoder.encode(rating.movie_id)?,
                rating: rating.rating,
                timestamp: rating.timestamp,
                genre_features: vocabulary.transform_row(genres)?,
            });
        }
        debug_assert_eq!(interactions.len(), ratings.len());

        let version = next_version();
        info!(
            users = user_encoder.len(),
            movies = movie_encoder.len(),
            rows = interactions.len(),
            genre_columns = vocabulary.width(),
            version,
            "Built dataset snapshot"
        );

        Ok(Snapshot {
            ratings,
            movies,
            user_encoder,
            movie_encoder,
            vocabulary,
            interactions,
            version,
            policy,
        })
    }

    /// Load `ratings.csv` and `movies.csv` from a data directory and
    /// build a snapshot. The two files are parsed in parallel.
    pub fn load_from_files(data_dir: &Path, policy: UnseenLabelPolicy) -> Result<Self> {
        let ratings_path = data_dir.join("ratings.csv");
        let movies_path = data_dir.join("movies.csv");

        let (ratings, movies) = rayon::join(
            || parser::parse_ratings(&ratings_path),
            || parser::parse_movies(&movies_path),
        );
        let ratings = ratings?;
        let movies = movies?;

        info!(
            ratings = ratings.len(),
            movies = movies.len(),
            "Loaded raw tables from {}",
            data_dir.display()
        );

        Self::build(ratings, movies, policy)
    }

    /// Re-run the build over this snapshot's own raw rows.
    ///
    /// This is how rows appended by ingestion get folded into the
    /// encoders before retraining.
    pub fn rebuild(&self) -> Result<Self> {
        Self::build(
            self.ratings.clone(),
            self.movies.values().cloned().collect(),
            self.policy,
        )
    }

    /// Uniform random partition of the encoded set into train and
    /// held-out parts, without replacement. Every row is independently
    /// assigned; no temporal or per-user stratification.
    pub fn split(
        &self,
        train_fraction: f64,
        seed: u64,
    ) -> (Vec<EncodedInteraction>, Vec<EncodedInteraction>) {
        let mut order: Vec<usize> = (0..self.interactions.len()).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let train_len = (self.interactions.len() as f64 * train_fraction).round() as usize;
        let train_len = train_len.min(self.interactions.len());

        let train = order[..train_len]
            .iter()
            .map(|&i| self.interactions[i].clone())
            .collect();
        let held_out = order[train_len..]
            .iter()
            .map(|&i| self.interactions[i].clone())
            .collect();
        (train, held_out)
    }

    /// Movie internal indices the user has already rated, from the
    /// encoded set.
    pub fn rated_movie_indices(&self, user_index: u32) -> HashSet<u32> {
        self.interactions
            .iter()
            .filter(|i| i.user_index == user_index)
            .map(|i| i.movie_index)
            .collect()
    }

    /// All raw rating rows for an external user id, ingested rows
    /// included.
    pub fn user_ratings(&self, user_id: UserId) -> Vec<&Rating> {
        self.ratings.iter().filter(|r| r.user_id == user_id).collect()
    }

    /// Title lookup by external movie id
    pub fn movie_title(&self, movie_id: MovieId) -> Option<&str> {
        self.movies.get(&movie_id).map(|m| m.title.as_str())
    }

    pub fn num_users(&self) -> usize {
        self.user_encoder.len()
    }

    pub fn num_movies(&self) -> usize {
        self.movie_encoder.len()
    }
}
