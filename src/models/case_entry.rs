//! Case record model
//!
//! A case entry is one dated row of case counts. Its `regions` path carries
//! the full administrative hierarchy of the record, top level first. Unused
//! trailing positions are `None`; the `admin_0` placeholder used by source
//! files is converted to `None` when records enter the store.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

/// Number of hierarchy levels a record path can hold
pub const REGION_PATH_LEN: usize = 5;

/// Placeholder used by source data for "no region at this level"
pub const UNKNOWN_REGION: &str = "admin_0";

/// Source tag of individual-level records
pub const LINELIST_SOURCE: &str = "linelists";

/// Region path of a record, top level first
pub type RegionPath = SmallVec<[Option<String>; REGION_PATH_LEN]>;

/// Convert a raw region id to `None` when it is empty or the `admin_0` placeholder
#[must_use]
pub fn normalize_region_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN_REGION {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Categorical (non-numeric) fields of a case entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseField {
    Source,
    AgeRange,
    Gender,
    TestType,
}

impl CaseField {
    /// Name of the field as it appears in requests and responses
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::AgeRange => "age_range",
            Self::Gender => "gender",
            Self::TestType => "test_type",
        }
    }

    /// Look a field up by name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "source" => Some(Self::Source),
            "age_range" => Some(Self::AgeRange),
            "gender" => Some(Self::Gender),
            "test_type" => Some(Self::TestType),
            _ => None,
        }
    }
}

/// One dated record of case counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseEntry {
    /// Unique record id
    pub record_id: String,
    /// Day the counts refer to
    pub record_date: NaiveDate,
    /// Provenance tag, `linelists` for individual-level records
    pub source: String,
    /// Administrative path, top level first
    pub regions: RegionPath,
    /// Stage name -> count
    pub counts: FxHashMap<String, u64>,
    /// Only meaningful for linelists
    pub age_range: Option<String>,
    pub gender: Option<String>,
    pub test_type: Option<String>,
}

impl CaseEntry {
    /// Create an entry with no counts and no demographics
    ///
    /// `regions` may contain `admin_0` placeholders; they are normalized and
    /// the path is padded to [`REGION_PATH_LEN`].
    #[must_use]
    pub fn new(record_id: &str, record_date: NaiveDate, source: &str, regions: &[&str]) -> Self {
        let mut path: RegionPath = regions
            .iter()
            .take(REGION_PATH_LEN)
            .map(|raw| normalize_region_id(raw))
            .collect();
        while path.len() < REGION_PATH_LEN {
            path.push(None);
        }

        Self {
            record_id: record_id.to_string(),
            record_date,
            source: source.to_string(),
            regions: path,
            counts: FxHashMap::default(),
            age_range: None,
            gender: None,
            test_type: None,
        }
    }

    /// Set the count of one stage
    #[must_use]
    pub fn with_count(mut self, stage: &str, count: u64) -> Self {
        self.counts.insert(stage.to_string(), count);
        self
    }

    /// Set the demographic and test fields of a linelist record
    #[must_use]
    pub fn with_demographics(mut self, age_range: &str, gender: &str, test_type: &str) -> Self {
        self.age_range = non_empty(age_range);
        self.gender = non_empty(gender);
        self.test_type = non_empty(test_type);
        self
    }

    /// Count for `stage`, zero when the record does not carry the stage
    #[must_use]
    pub fn count(&self, stage: &str) -> u64 {
        self.counts.get(stage).copied().unwrap_or(0)
    }

    /// True if `region_id` appears at any level of the record's path
    #[must_use]
    pub fn belongs_to(&self, region_id: &str) -> bool {
        self.regions
            .iter()
            .any(|level| level.as_deref() == Some(region_id))
    }

    /// Region at hierarchy level `index`, `None` if unknown or out of range
    #[must_use]
    pub fn region_at(&self, index: usize) -> Option<&str> {
        self.regions.get(index).and_then(Option::as_deref)
    }

    /// Value of a categorical field
    #[must_use]
    pub fn category(&self, field: CaseField) -> Option<&str> {
        match field {
            CaseField::Source => Some(self.source.as_str()),
            CaseField::AgeRange => self.age_range.as_deref(),
            CaseField::Gender => self.gender.as_deref(),
            CaseField::TestType => self.test_type.as_deref(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
