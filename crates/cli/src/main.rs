use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dataset::{MovieId, Snapshot, UnseenLabelPolicy, UserId, DEFAULT_TRAIN_FRACTION};
use model::{FactorModel, TrainConfig};
use recommender::{recommend, Recommendation};
use std::path::PathBuf;
use std::time::Instant;

/// LensRecs - collaborative-filtering movie recommendations
#[derive(Parser)]
#[command(name = "lens-recs")]
#[command(about = "Movie recommendation engine using matrix factorization", long_about = None)]
struct Cli {
    /// Path to the dataset directory (ratings.csv + movies.csv)
    #[arg(short, long, default_value = "data/ml-latest-small")]
    data_dir: PathBuf,

    /// Fail the build on genre labels missing from the fitted
    /// vocabulary instead of silently ignoring them
    #[arg(long)]
    strict_genres: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Training hyperparameters shared by the subcommands
#[derive(Args)]
struct TrainArgs {
    /// Latent rank of the factorization
    #[arg(long, default_value = "32")]
    factors: usize,

    /// SGD learning rate
    #[arg(long, default_value = "0.005")]
    learning_rate: f32,

    /// L2 regularization strength
    #[arg(long, default_value = "0.02")]
    regularization: f32,

    /// Number of SGD passes over the training set
    #[arg(long, default_value = "20")]
    epochs: usize,

    /// Seed for splitting, initialization, and shuffling
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl TrainArgs {
    fn to_config(&self) -> TrainConfig {
        TrainConfig {
            factors: self.factors,
            learning_rate: self.learning_rate,
            regularization: self.regularization,
            epochs: self.epochs,
            seed: self.seed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the full dataset and print top-N recommendations for a user
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        /// Number of recommendations to return
        #[arg(long, default_value = "20")]
        limit: usize,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Train on a split and report held-out RMSE
    Evaluate {
        /// Fraction of rows assigned to the training partition
        #[arg(long, default_value_t = DEFAULT_TRAIN_FRACTION)]
        train_fraction: f64,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Append ratings for a new user, retrain, and recommend for them
    AddUser {
        /// New user ID; must not already exist in the dataset
        #[arg(long)]
        user_id: UserId,

        /// Ratings as movieId=rating pairs, e.g. --rating 318=4.5
        #[arg(long = "rating", required = true)]
        ratings: Vec<String>,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let policy = if cli.strict_genres {
        UnseenLabelPolicy::Reject
    } else {
        UnseenLabelPolicy::Ignore
    };

    println!("Loading dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let snapshot = Snapshot::load_from_files(&cli.data_dir, policy)
        .context("Failed to load dataset")?;
    println!(
        "{} Loaded {} ratings, {} movies, {} users in {:?}",
        "✓".green(),
        snapshot.ratings.len(),
        snapshot.num_movies(),
        snapshot.num_users(),
        start.elapsed()
    );

    match cli.command {
        Commands::Recommend {
            user_id,
            limit,
            train,
        } => handle_recommend(snapshot, user_id, limit, &train.to_config()),
        Commands::Evaluate {
            train_fraction,
            train,
        } => handle_evaluate(snapshot, train_fraction, &train.to_config()),
        Commands::AddUser {
            user_id,
            ratings,
            train,
        } => handle_add_user(snapshot, user_id, &ratings, &train.to_config()),
        Commands::Search { title } => handle_search(snapshot, &title),
    }
}

/// Handle the 'recommend' command
fn handle_recommend(
    snapshot: Snapshot,
    user_id: UserId,
    limit: usize,
    config: &TrainConfig,
) -> Result<()> {
    print_user_summary(&snapshot, user_id);

    let start = Instant::now();
    let model = FactorModel::train(&snapshot, &snapshot.interactions, config)
        .context("Training failed")?;
    println!("{} Trained model in {:?}", "✓".green(), start.elapsed());

    let recommendations = recommend(&model, &snapshot, user_id, limit)?;
    print_recommendations(&snapshot, &recommendations);
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(snapshot: Snapshot, train_fraction: f64, config: &TrainConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(anyhow!(
            "train fraction {} must lie in [0, 1]",
            train_fraction
        ));
    }

    let (train_set, held_out) = snapshot.split(train_fraction, config.seed);
    println!(
        "Split: {} training rows, {} held-out rows",
        train_set.len(),
        held_out.len()
    );

    let start = Instant::now();
    let model =
        FactorModel::train(&snapshot, &train_set, config).context("Training failed")?;
    println!("{} Trained model in {:?}", "✓".green(), start.elapsed());

    let rmse = model.evaluate(&held_out);
    println!(
        "{} Held-out RMSE: {}",
        "✓".green(),
        format!("{:.4}", rmse).bold()
    );
    println!("  Global mean rating: {:.4}", model.global_mean());
    Ok(())
}

/// Handle the 'add-user' command
fn handle_add_user(
    snapshot: Snapshot,
    user_id: UserId,
    raw_pairs: &[String],
    config: &TrainConfig,
) -> Result<()> {
    let pairs = parse_rating_pairs(raw_pairs)?;

    let updated = snapshot
        .add_user_ratings(user_id, &pairs)
        .context("Ingestion rejected")?;
    println!(
        "{} Appended {} ratings for user {} (snapshot version {} -> {})",
        "✓".green(),
        pairs.len(),
        user_id,
        snapshot.version,
        updated.version
    );

    // The new user has no internal index until the snapshot is rebuilt
    // and the model retrained against it.
    println!("Rebuilding snapshot and retraining...");
    let rebuilt = updated.rebuild().context("Rebuild failed")?;
    let start = Instant::now();
    let model = FactorModel::train(&rebuilt, &rebuilt.interactions, config)
        .context("Training failed")?;
    println!("{} Retrained model in {:?}", "✓".green(), start.elapsed());

    let recommendations = recommend(&model, &rebuilt, user_id, 10)?;
    print_recommendations(&rebuilt, &recommendations);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(snapshot: Snapshot, title: &str) -> Result<()> {
    let needle = title.to_lowercase();

    let mut matches: Vec<_> = snapshot
        .movies
        .values()
        .filter(|movie| movie.title.to_lowercase().contains(&needle))
        .collect();
    matches.sort_by_key(|movie| movie.id);

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    for movie in matches.iter().take(20) {
        println!(
            "{}: {} [{}]",
            movie.id,
            movie.title,
            movie.genres.join(", ")
        );
    }
    if matches.is_empty() {
        println!("  (no matches)");
    }
    Ok(())
}

/// Parse "movieId=rating" pairs from the command line
fn parse_rating_pairs(raw: &[String]) -> Result<Vec<(MovieId, f32)>> {
    raw.iter()
        .map(|pair| {
            let (movie, rating) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected movieId=rating, got '{}'", pair))?;
            let movie_id = movie
                .parse()
                .with_context(|| format!("Invalid movie id in '{}'", pair))?;
            let rating = rating
                .parse()
                .with_context(|| format!("Invalid rating in '{}'", pair))?;
            Ok((movie_id, rating))
        })
        .collect()
}

fn print_user_summary(snapshot: &Snapshot, user_id: UserId) {
    let rows = snapshot.user_ratings(user_id);
    if rows.is_empty() {
        return;
    }
    let mean: f32 = rows.iter().map(|r| r.rating).sum::<f32>() / rows.len() as f32;
    println!(
        "{}",
        format!(
            "User {}: {} ratings, mean {:.2}",
            user_id,
            rows.len(),
            mean
        )
        .bold()
        .blue()
    );
}

/// Helper function to format and print recommendations
fn print_recommendations(snapshot: &Snapshot, recommendations: &[Recommendation]) {
    println!("{}", "Recommendations:".bold().blue());
    for (rank, rec) in recommendations.iter().enumerate() {
        let genres = snapshot
            .movies
            .get(&rec.movie_id)
            .map(|m| m.genres.join(", "))
            .unwrap_or_default();
        println!(
            "{}. {} [{}] - predicted {:.2}",
            (rank + 1).to_string().green(),
            rec.title,
            genres,
            rec.predicted_rating
        );
    }
    if recommendations.is_empty() {
        println!("  (no candidates left to recommend)");
    }
}
