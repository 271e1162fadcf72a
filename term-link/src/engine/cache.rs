//! Pipeline result cache.

use super::TableHandle;
use crate::pipeline::Fingerprint;
use std::collections::HashMap;

/// Maps pipeline fingerprints to the tables holding their results.
///
/// Entries are never modified in place. Inserting under a fingerprint that is
/// already present evicts the old handle and returns it; the backend table
/// behind it stays alive until its owner drops it.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<Fingerprint, TableHandle>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a fingerprint, counting the hit or miss.
    pub fn get(&mut self, fingerprint: &Fingerprint) -> Option<TableHandle> {
        match self.entries.get(fingerprint) {
            Some(handle) => {
                self.hits += 1;
                Some(handle.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Returns true if a result is cached for `fingerprint`.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Stores a handle under its fingerprint, returning any evicted handle.
    pub fn insert(&mut self, handle: TableHandle) -> Option<TableHandle> {
        self.entries.insert(handle.fingerprint.clone(), handle)
    }

    /// Removes the entry for `fingerprint`.
    pub fn remove(&mut self, fingerprint: &Fingerprint) -> Option<TableHandle> {
        self.entries.remove(fingerprint)
    }

    /// Removes the entry whose table has the given physical name.
    pub fn remove_physical(&mut self, physical_name: &str) -> Option<TableHandle> {
        let fingerprint = self
            .entries
            .iter()
            .find(|(_, handle)| handle.physical_name == physical_name)
            .map(|(fingerprint, _)| fingerprint.clone())?;
        self.entries.remove(&fingerprint)
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) -> Vec<TableHandle> {
        self.entries.drain().map(|(_, handle)| handle).collect()
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            total_rows: self.entries.values().map(|handle| handle.num_rows).sum(),
        }
    }
}

/// Statistics about the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached results
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Rows held by cached tables
    pub total_rows: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
