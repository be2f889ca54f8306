//! Weekly prediction model
//!
//! Predictions are produced by an external model per region and week. Only
//! the most recently computed prediction for a `(region_id, date)` key is
//! current; [`PredictionSet`] enforces that rule when rows are loaded.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Zone reported when no prediction exists for a region and week
pub const NO_PREDICTION_ZONE: i32 = -2;

/// Value reported when no prediction exists for a region and week
pub const NO_PREDICTION_VALUE: f64 = 0.0;

/// A forecast for one region and one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub region_id: String,
    /// Immediate containing region, `None` for roots
    pub parent_id: Option<String>,
    /// First day of the predicted week
    pub date: NaiveDate,
    /// When the prediction was produced
    pub computation_date: NaiveDate,
    /// Numeric score
    pub prediction: f64,
    /// Category code of the score
    pub prediction_zone: i32,
    pub threshold_method: Option<String>,
}

/// The score part of a prediction, as shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionScore {
    pub zone: i32,
    pub value: f64,
}

impl PredictionScore {
    /// Reported in place of a missing prediction
    pub const MISSING: Self = Self {
        zone: NO_PREDICTION_ZONE,
        value: NO_PREDICTION_VALUE,
    };
}

impl Prediction {
    #[must_use]
    pub const fn score(&self) -> PredictionScore {
        PredictionScore {
            zone: self.prediction_zone,
            value: self.prediction,
        }
    }
}

/// Outcome of offering a prediction to a [`PredictionSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    /// An existing row was computed later and was kept
    Stale,
}

/// Current predictions keyed by `(region_id, date)`
///
/// A second index groups current rows by `(parent_id, date)`.
#[derive(Debug, Clone, Default)]
pub struct PredictionSet {
    current: FxHashMap<(String, NaiveDate), Prediction>,
    by_parent: FxHashMap<(String, NaiveDate), BTreeSet<String>>,
}

impl PredictionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a prediction; an older computation never overwrites a newer one
    pub fn upsert(&mut self, prediction: Prediction) -> Upsert {
        let key = (prediction.region_id.clone(), prediction.date);
        let outcome = match self.current.get(&key) {
            Some(existing) if existing.computation_date > prediction.computation_date => {
                return Upsert::Stale;
            }
            Some(existing) => {
                if let Some(parent) = existing.parent_id.clone() {
                    self.unlink(parent, &key);
                }
                Upsert::Replaced
            }
            None => Upsert::Inserted,
        };

        if let Some(parent) = &prediction.parent_id {
            self.by_parent
                .entry((parent.clone(), prediction.date))
                .or_default()
                .insert(prediction.region_id.clone());
        }
        self.current.insert(key, prediction);
        outcome
    }

    fn unlink(&mut self, parent: String, (region_id, date): &(String, NaiveDate)) {
        let parent_key = (parent, *date);
        if let Some(ids) = self.by_parent.get_mut(&parent_key) {
            ids.remove(region_id);
            if ids.is_empty() {
                self.by_parent.remove(&parent_key);
            }
        }
    }

    /// Current prediction for a region and week start
    #[must_use]
    pub fn get(&self, region_id: &str, date: NaiveDate) -> Option<&Prediction> {
        self.current.get(&(region_id.to_string(), date))
    }

    /// Current predictions of every region whose recorded parent is `parent_id`, by region id
    pub fn under(&self, parent_id: &str, date: NaiveDate) -> impl Iterator<Item = &Prediction> {
        self.by_parent
            .get(&(parent_id.to_string(), date))
            .into_iter()
            .flatten()
            .filter_map(move |region_id| self.current.get(&(region_id.clone(), date)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.current.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

impl FromIterator<Prediction> for PredictionSet {
    fn from_iter<I: IntoIterator<Item = Prediction>>(iter: I) -> Self {
        let mut set = Self::new();
        for prediction in iter {
            set.upsert(prediction);
        }
        set
    }
}
