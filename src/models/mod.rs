//! Domain models for the dashboard backend
//!
//! These are the read-only entities the aggregation engine works with:
//! regions of the administrative hierarchy, dated case records and weekly
//! predictions.

pub mod case_entry;
pub mod prediction;
pub mod region;
pub mod stage;

// Re-export commonly used types
pub use case_entry::{
    CaseEntry, CaseField, LINELIST_SOURCE, REGION_PATH_LEN, RegionPath, UNKNOWN_REGION,
    normalize_region_id,
};
pub use prediction::{
    NO_PREDICTION_VALUE, NO_PREDICTION_ZONE, Prediction, PredictionScore, PredictionSet, Upsert,
};
pub use region::Region;
pub use stage::StageTotals;
