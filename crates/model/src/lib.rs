//! # Model Crate
//!
//! Biased matrix factorization over an encoded dataset snapshot.
//!
//! The model predicts a rating for a (user, item) pair as
//! `global_mean + b_u + b_i + p_u . q_i`, with biases and k-dim
//! factor vectors learned by stochastic gradient descent over the
//! training partition. There is no incremental retraining: the only
//! way to obtain a usable [`FactorModel`] is [`FactorModel::train`],
//! and the value is immutable afterwards.

pub mod error;

pub use error::{ModelError, Result};

use dataset::{EncodedInteraction, Snapshot, RATING_MAX, RATING_MIN};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Latent rank k
    pub factors: usize,
    pub learning_rate: f32,
    /// L2 regularization applied to biases and factor vectors
    pub regularization: f32,
    /// Full passes over the training set; this is the iteration
    /// budget that bounds training time
    pub epochs: usize,
    /// Seed for factor initialization and epoch shuffling
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            factors: 32,
            learning_rate: 0.005,
            regularization: 0.02,
            epochs: 20,
            seed: 42,
        }
    }
}

/// A trained latent-factor model.
///
/// Scoped to the internal-index space of the snapshot it was trained
/// against; `snapshot_version` records which one, and the query
/// engine refuses to pair the model with any other snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorModel {
    global_mean: f32,
    user_bias: Vec<f32>,
    item_bias: Vec<f32>,
    user_factors: Vec<Vec<f32>>,
    item_factors: Vec<Vec<f32>>,
    factors: usize,
    snapshot_version: u64,
}

impl FactorModel {
    /// Train a model on the given partition of the snapshot's encoded
    /// set.
    ///
    /// Fails with [`ModelError::EmptyTrainingSet`] on zero rows and
    /// [`ModelError::RankTooLarge`] when the configured rank is not
    /// smaller than both entity counts. Neither failure is retried.
    pub fn train(
        snapshot: &Snapshot,
        train_set: &[EncodedInteraction],
        config: &TrainConfig,
    ) -> Result<Self> {
        let users = snapshot.num_users();
        let items = snapshot.num_movies();

        if train_set.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if config.factors >= users || config.factors >= items {
            return Err(ModelError::RankTooLarge {
                factors: config.factors,
                users,
                items,
            });
        }

        let global_mean =
            train_set.iter().map(|i| i.rating).sum::<f32>() / train_set.len() as f32;

        let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
        let mut model = FactorModel {
            global_mean,
            user_bias: vec![0.0; users],
            item_bias: vec![0.0; items],
            user_factors: init_factors(&mut rng, users, config.factors),
            item_factors: init_factors(&mut rng, items, config.factors),
            factors: config.factors,
            snapshot_version: snapshot.version,
        };

        info!(
            rows = train_set.len(),
            users,
            items,
            factors = config.factors,
            epochs = config.epochs,
            "Training factor model"
        );

        let mut order: Vec<usize> = (0..train_set.len()).collect();
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut squared_error = 0.0f64;

            for &row in &order {
                let example = &train_set[row];
                let u = example.user_index as usize;
                let i = example.movie_index as usize;

                let error = example.rating - model.predict_raw(u, i);
                squared_error += (error * error) as f64;

                let lr = config.learning_rate;
                let reg = config.regularization;

                model.user_bias[u] += lr * (error - reg * model.user_bias[u]);
                model.item_bias[i] += lr * (error - reg * model.item_bias[i]);

                for f in 0..config.factors {
                    let p = model.user_factors[u][f];
                    let q = model.item_factors[i][f];
                    model.user_factors[u][f] += lr * (error * q - reg * p);
                    model.item_factors[i][f] += lr * (error * p - reg * q);
                }
            }

            let rmse = (squared_error / train_set.len() as f64).sqrt();
            debug!(epoch, train_rmse = rmse, "Finished epoch");
        }

        Ok(model)
    }

    /// Predicted rating for a (user, item) pair of internal indices,
    /// clamped to the valid rating scale.
    ///
    /// Indices without trained parameters (absent from the training
    /// partition's index space) contribute zero bias and zero factors,
    /// so the prediction falls back to the clamped global mean. Never
    /// an error.
    pub fn predict(&self, user_index: u32, item_index: u32) -> f32 {
        self.predict_raw(user_index as usize, item_index as usize)
            .clamp(RATING_MIN, RATING_MAX)
    }

    fn predict_raw(&self, u: usize, i: usize) -> f32 {
        let mut prediction = self.global_mean;
        if let Some(bias) = self.user_bias.get(u) {
            prediction += bias;
        }
        if let Some(bias) = self.item_bias.get(i) {
            prediction += bias;
        }
        if let (Some(p), Some(q)) = (self.user_factors.get(u), self.item_factors.get(i)) {
            prediction += dot(p, q);
        }
        prediction
    }

    /// Root-mean-squared error over a held-out partition.
    pub fn evaluate(&self, held_out: &[EncodedInteraction]) -> f32 {
        if held_out.is_empty() {
            return 0.0;
        }
        let squared_error: f64 = held_out
            .iter()
            .map(|example| {
                let error =
                    example.rating - self.predict(example.user_index, example.movie_index);
                (error * error) as f64
            })
            .sum();
        (squared_error / held_out.len() as f64).sqrt() as f32
    }

    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    /// Version of the snapshot this model was trained against
    pub fn snapshot_version(&self) -> u64 {
        self.snapshot_version
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Small random factors around zero, scaled down with the rank so the
/// initial dot products stay near zero.
fn init_factors(rng: &mut impl Rng, rows: usize, factors: usize) -> Vec<Vec<f32>> {
    let scale = 0.1 / (factors as f32).sqrt();
    (0..rows)
        .map(|_| (0..factors).map(|_| rng.gen_range(-scale..scale)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::{Movie, Rating, UnseenLabelPolicy};

    fn movie(id: u32) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            year: None,
            genres: vec!["Drama".to_string()],
        }
    }

    fn rating(user_id: u32, movie_id: u32, value: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            timestamp: 0,
        }
    }

    fn test_snapshot() -> Snapshot {
        let ratings = vec![
            rating(1, 10, 4.0),
            rating(1, 20, 3.0),
            rating(1, 30, 5.0),
            rating(2, 10, 5.0),
            rating(2, 20, 2.5),
            rating(2, 40, 4.0),
            rating(3, 30, 4.5),
            rating(3, 40, 3.5),
        ];
        let movies = vec![movie(10), movie(20), movie(30), movie(40)];
        Snapshot::build(ratings, movies, UnseenLabelPolicy::Ignore).unwrap()
    }

    fn small_config() -> TrainConfig {
        TrainConfig {
            factors: 2,
            learning_rate: 0.01,
            regularization: 0.02,
            epochs: 50,
            seed: 7,
        }
    }

    #[test]
    fn test_train_basic() {
        let snapshot = test_snapshot();
        let model =
            FactorModel::train(&snapshot, &snapshot.interactions, &small_config()).unwrap();

        let expected_mean: f32 = snapshot.interactions.iter().map(|i| i.rating).sum::<f32>()
            / snapshot.interactions.len() as f32;
        assert!((model.global_mean() - expected_mean).abs() < 1e-5);
        assert_eq!(model.snapshot_version(), snapshot.version);
    }

    #[test]
    fn test_empty_training_set_fails() {
        let snapshot = test_snapshot();
        let err = FactorModel::train(&snapshot, &[], &small_config()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTrainingSet));
    }

    #[test]
    fn test_rank_too_large_fails() {
        let snapshot = test_snapshot();
        let config = TrainConfig {
            factors: 4, // snapshot has 3 users
            ..small_config()
        };
        let err = FactorModel::train(&snapshot, &snapshot.interactions, &config).unwrap_err();
        assert!(matches!(
            err,
            ModelError::RankTooLarge {
                factors: 4,
                users: 3,
                items: 4
            }
        ));
    }

    #[test]
    fn test_predict_within_scale() {
        let snapshot = test_snapshot();
        let model =
            FactorModel::train(&snapshot, &snapshot.interactions, &small_config()).unwrap();

        for u in 0..snapshot.num_users() as u32 {
            for i in 0..snapshot.num_movies() as u32 {
                let prediction = model.predict(u, i);
                assert!((RATING_MIN..=RATING_MAX).contains(&prediction));
            }
        }
    }

    #[test]
    fn test_predict_unseen_index_falls_back_to_mean() {
        let snapshot = test_snapshot();
        let model =
            FactorModel::train(&snapshot, &snapshot.interactions, &small_config()).unwrap();

        let fallback = model.predict(999, 999);
        let clamped_mean = model.global_mean().clamp(RATING_MIN, RATING_MAX);
        assert!((fallback - clamped_mean).abs() < 1e-6);
    }

    #[test]
    fn test_training_reduces_error() {
        let snapshot = test_snapshot();
        let short = TrainConfig {
            epochs: 1,
            ..small_config()
        };
        let long = TrainConfig {
            epochs: 200,
            ..small_config()
        };

        let model_short =
            FactorModel::train(&snapshot, &snapshot.interactions, &short).unwrap();
        let model_long = FactorModel::train(&snapshot, &snapshot.interactions, &long).unwrap();

        // Fitting the training set itself: more epochs must not be worse
        let rmse_short = model_short.evaluate(&snapshot.interactions);
        let rmse_long = model_long.evaluate(&snapshot.interactions);
        assert!(rmse_long <= rmse_short + 1e-3);
    }

    #[test]
    fn test_training_deterministic_for_seed() {
        let snapshot = test_snapshot();
        let a = FactorModel::train(&snapshot, &snapshot.interactions, &small_config()).unwrap();
        let b = FactorModel::train(&snapshot, &snapshot.interactions, &small_config()).unwrap();

        for u in 0..snapshot.num_users() as u32 {
            for i in 0..snapshot.num_movies() as u32 {
                assert_eq!(a.predict(u, i), b.predict(u, i));
            }
        }
    }

    #[test]
    fn test_evaluate_empty_held_out() {
        let snapshot = test_snapshot();
        let model =
            FactorModel::train(&snapshot, &snapshot.interactions, &small_config()).unwrap();
        assert_eq!(model.evaluate(&[]), 0.0);
    }
}
