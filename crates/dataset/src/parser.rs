//! Parsers for the raw MovieLens-style CSV tables.
//!
//! Two files are expected in the data directory:
//! - `ratings.csv`: userId,movieId,rating,timestamp
//! - `movies.csv`:  movieId,title,genres
//!
//! Titles may contain commas and are then double-quoted
//! (`"American President, The (1995)"`), so the field splitter is
//! quote-aware. Genres are pipe-separated labels with the sentinel
//! `(no genres listed)` when a movie has none.

use crate::error::{DatasetError, Result};
use crate::types::{Movie, Rating};
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|_| DatasetError::FileNotFound {
        path: path.display().to_string(),
    })?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Split one CSV line into fields, honoring double-quoted fields and
/// `""` escapes inside them.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Escaped quote inside a quoted field
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn parse_error(file: &str, line: usize, reason: impl Into<String>) -> DatasetError {
    DatasetError::ParseError {
        file: file.to_string(),
        line,
        reason: reason.into(),
    }
}

/// Parse the ratings table.
///
/// The header row is skipped; empty lines are ignored. Every other
/// line must carry exactly four fields.
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let file = "ratings.csv";
    let lines = read_lines(path)?;
    let mut ratings = Vec::new();

    for (idx, line) in lines.iter().enumerate().skip(1) {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields = split_csv_line(trimmed);
        if fields.len() != 4 {
            return Err(parse_error(
                file,
                line_no,
                format!("Expected 4 fields, found {}", fields.len()),
            ));
        }

        ratings.push(Rating {
            user_id: fields[0]
                .parse()
                .map_err(|e| parse_error(file, line_no, format!("Invalid userId: {}", e)))?,
            movie_id: fields[1]
                .parse()
                .map_err(|e| parse_error(file, line_no, format!("Invalid movieId: {}", e)))?,
            rating: fields[2]
                .parse()
                .map_err(|e| parse_error(file, line_no, format!("Invalid rating: {}", e)))?,
            timestamp: fields[3]
                .parse()
                .map_err(|e| parse_error(file, line_no, format!("Invalid timestamp: {}", e)))?,
        });
    }

    Ok(ratings)
}

/// Parse the movie metadata table.
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let file = "movies.csv";
    let lines = read_lines(path)?;
    let mut movies = Vec::new();

    for (idx, line) in lines.iter().enumerate().skip(1) {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields = split_csv_line(trimmed);
        if fields.len() != 3 {
            return Err(parse_error(
                file,
                line_no,
                format!("Expected 3 fields, found {}", fields.len()),
            ));
        }

        let title = fields[1].clone();
        movies.push(Movie {
            id: fields[0]
                .parse()
                .map_err(|e| parse_error(file, line_no, format!("Invalid movieId: {}", e)))?,
            year: extract_year_from_title(&title),
            title,
            genres: parse_genres(&fields[2]),
        });
    }

    Ok(movies)
}

/// Extract year from a movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        if let Ok(year) = title[start + 1..end].parse::<u16>() {
            return Some(year);
        }
    }
    None
}

/// Parse pipe-separated genres into labels.
///
/// The sentinel `(no genres listed)` is kept as an ordinary label
/// here; the feature augmenter is responsible for dropping it.
fn parse_genres(s: &str) -> Vec<String> {
    s.split('|')
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}
