//! Bijective mapping between sparse external ids and dense internal
//! indices.
//!
//! One `IdEncoder` is fitted per entity kind (users, movies) when the
//! snapshot is built. Indices are assigned in first-seen order so the
//! encoding is reproducible across runs; the mapping never relies on
//! map iteration order.

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bijection external id <-> dense zero-based index.
///
/// Ids unseen at fit time fail to encode; the encoder is never grown
/// after `fit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdEncoder {
    index_of: HashMap<u32, u32>,
    /// `id_at[i]` is the external id assigned index `i`; this Vec is
    /// the source of truth for ordering.
    id_at: Vec<u32>,
}

impl IdEncoder {
    /// Build the bijection over the distinct ids observed, in
    /// first-seen order.
    pub fn fit(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut encoder = IdEncoder {
            index_of: HashMap::new(),
            id_at: Vec::new(),
        };
        for id in ids {
            if !encoder.index_of.contains_key(&id) {
                let index = encoder.id_at.len() as u32;
                encoder.index_of.insert(id, index);
                encoder.id_at.push(id);
            }
        }
        encoder
    }

    /// Map an external id to its internal index.
    pub fn encode(&self, id: u32) -> Result<u32> {
        self.index_of
            .get(&id)
            .copied()
            .ok_or(DatasetError::UnknownIdentifier { id })
    }

    /// Map an internal index back to its external id.
    pub fn decode(&self, index: u32) -> Result<u32> {
        self.id_at
            .get(index as usize)
            .copied()
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.id_at.len(),
            })
    }

    /// Whether an external id was seen at fit time
    pub fn contains(&self, id: u32) -> bool {
        self.index_of.contains_key(&id)
    }

    /// Number of distinct ids in the bijection
    pub fn len(&self) -> usize {
        self.id_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_at.is_empty()
    }
}
