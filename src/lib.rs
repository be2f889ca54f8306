//! Regional time-series aggregation for multi-tenant epidemiological
//! dashboards: region hierarchies, case-record grouping, weekly bucketing
//! and prediction overlays.

pub mod async_io;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod models;
pub mod store;
pub mod utils;

// Re-export the most common types for easier use
pub use config::{EngineConfig, TenantConfig, TenantRegistry};
pub use engine::{Aggregate, AggregationEngine, QueryRequest, QueryResponse};
pub use error::{Error, ErrorKind, Result};
pub use hierarchy::{Breadcrumb, RegionHierarchy};
pub use models::{CaseEntry, Prediction, PredictionSet, Region, StageTotals};
pub use store::{MemoryStore, PredictionStore, RecordStore, RetryingStore};

// Snapshot loading
pub use async_io::{Snapshot, load_case_entries, load_predictions, load_regions};
