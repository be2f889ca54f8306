//! Per-stage count totals
//!
//! Tenants choose which stages they track, so totals are keyed by stage name
//! and keep the tenant's stage order. They serialize as a flat JSON map.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered stage name -> total pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTotals {
    entries: Vec<(String, u64)>,
}

impl StageTotals {
    /// All `stages` present with a zero total
    #[must_use]
    pub fn zeroed<S: AsRef<str>>(stages: &[S]) -> Self {
        Self {
            entries: stages
                .iter()
                .map(|stage| (stage.as_ref().to_string(), 0))
                .collect(),
        }
    }

    /// Build from stage names and totals of equal length
    #[must_use]
    pub fn from_parts<S: AsRef<str>>(stages: &[S], totals: &[u64]) -> Self {
        let mut result = Self::zeroed(stages);
        for (entry, total) in result.entries.iter_mut().zip(totals) {
            entry.1 = *total;
        }
        result
    }

    /// Total for `stage`, zero when the stage is not tracked
    #[must_use]
    pub fn get(&self, stage: &str) -> u64 {
        self.entries
            .iter()
            .find(|(name, _)| name == stage)
            .map_or(0, |(_, total)| *total)
    }

    /// Add `amount` to `stage`, appending the stage if it is new
    pub fn add(&mut self, stage: &str, amount: u64) {
        match self.entries.iter_mut().find(|(name, _)| name == stage) {
            Some(entry) => entry.1 += amount,
            None => self.entries.push((stage.to_string(), amount)),
        }
    }

    /// Add every total of `other` into `self`
    pub fn merge(&mut self, other: &Self) {
        for (stage, amount) in &other.entries {
            self.add(stage, *amount);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, total)| (name.as_str(), *total))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|(_, total)| *total == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for StageTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (stage, total) in &self.entries {
            map.serialize_entry(stage, total)?;
        }
        map.end()
    }
}
