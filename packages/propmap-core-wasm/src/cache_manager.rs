use std::collections::HashMap;

use crate::models::{CacheStats, Coordinate};

/// Append-only cache of geocoding results keyed by normalized address.
///
/// Entries are never evicted: an address resolves to the same coordinates for
/// the lifetime of the process, so keeping them is always safe.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<String, Coordinate>,
    hits: usize,
    misses: usize,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Look up a key, recording a hit or a miss
    pub fn get(&mut self, key: &str) -> Option<Coordinate> {
        match self.entries.get(key) {
            Some(c) => {
                self.hits += 1;
                Some(*c)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a result. An existing entry is kept as-is.
    pub fn insert(&mut self, key: String, coordinates: Coordinate) {
        self.entries.entry(key).or_insert(coordinates);
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
