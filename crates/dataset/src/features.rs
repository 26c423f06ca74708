//! Multi-hot genre features.
//!
//! The vocabulary is fitted over the genre lists observed at build
//! time (sorted for determinism) and then transforms each row into a
//! fixed-width 0/1 vector. The sentinel "no genres" label is kept in
//! the vocabulary so unknown-vs-sentinel stays distinguishable, but
//! its column is dropped from the output schema: it carries no
//! discriminative information.

use crate::error::{DatasetError, Result};
use crate::types::NO_GENRES_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// What to do with a label seen at transform time but not at fit time.
///
/// The original pipeline silently ignored such labels; `Reject` is the
/// loud alternative for callers that prefer to fail the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnseenLabelPolicy {
    #[default]
    Ignore,
    Reject,
}

/// Fitted genre vocabulary with a fixed output schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreVocabulary {
    /// Output column labels, sorted, sentinel excluded
    labels: Vec<String>,
    column_of: HashMap<String, usize>,
    policy: UnseenLabelPolicy,
}

impl GenreVocabulary {
    /// Fit the vocabulary over the distinct labels across all rows.
    pub fn fit<S: AsRef<str>>(rows: &[Vec<S>], policy: UnseenLabelPolicy) -> Self {
        // BTreeSet gives the sorted, deduplicated label set directly
        let distinct: BTreeSet<String> = rows
            .iter()
            .flat_map(|row| row.iter())
            .map(|label| label.as_ref().to_string())
            .collect();

        let labels: Vec<String> = distinct
            .into_iter()
            .filter(|label| label != NO_GENRES_LABEL)
            .collect();
        let column_of = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        GenreVocabulary {
            labels,
            column_of,
            policy,
        }
    }

    /// Transform rows of labels into fixed-width binary vectors, one
    /// column per non-sentinel vocabulary label.
    pub fn transform<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> Result<Vec<Vec<u8>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Transform a single row of labels.
    pub fn transform_row<S: AsRef<str>>(&self, row: &[S]) -> Result<Vec<u8>> {
        let mut features = vec![0u8; self.labels.len()];
        for label in row {
            let label = label.as_ref();
            if label == NO_GENRES_LABEL {
                continue;
            }
            match self.column_of.get(label) {
                Some(&column) => features[column] = 1,
                None => match self.policy {
                    UnseenLabelPolicy::Ignore => {}
                    UnseenLabelPolicy::Reject => {
                        return Err(DatasetError::UnknownGenre {
                            label: label.to_string(),
                        })
                    }
                },
            }
        }
        Ok(features)
    }

    /// Output schema labels, in column order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Width of every transformed vector
    pub fn width(&self) -> usize {
        self.labels.len()
    }
}
