use std::collections::BTreeMap;

use crate::content::{Species, SpeciesCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub discovered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BoopdexEntry<'a> {
    pub species: &'a Species,
    pub count: u32,
}

/// Per-species boop counts and the session score. Counts only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryLedger {
    counts: BTreeMap<String, u32>,
    total_score: u64,
}

impl DiscoveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(counts: BTreeMap<String, u32>, total_score: u64) -> Self {
        Self {
            counts,
            total_score,
        }
    }

    /// Creates the entry at 1 or increments it; returns the new count.
    pub fn record(&mut self, species_key: &str) -> u32 {
        let count = self.counts.entry(species_key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Adds one point; returns the new score.
    pub fn award_point(&mut self) -> u64 {
        self.total_score = self.total_score.saturating_add(1);
        self.total_score
    }

    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    pub fn count(&self, species_key: &str) -> u32 {
        self.counts.get(species_key).copied().unwrap_or(0)
    }

    pub fn is_discovered(&self, species_key: &str) -> bool {
        self.count(species_key) > 0
    }

    /// Entries ordered by species key, including keys no longer in the
    /// catalog.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn completion(&self, catalog: &SpeciesCatalog) -> Completion {
        Completion {
            discovered: catalog
                .iter()
                .filter(|species| self.is_discovered(&species.key))
                .count(),
            total: catalog.len(),
        }
    }

    /// Every catalog species in catalog order with its count, zero when not
    /// yet booped.
    pub fn boopdex<'a>(&self, catalog: &'a SpeciesCatalog) -> Vec<BoopdexEntry<'a>> {
        catalog
            .iter()
            .map(|species| BoopdexEntry {
                species,
                count: self.count(&species.key),
            })
            .collect()
    }
}
