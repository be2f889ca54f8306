//! Async Parquet snapshot loading
//! Reads region, case and prediction files through Arrow record batches

pub mod batch_ops;
pub mod file_ops;
pub mod parallel_ops;
pub mod rows;
pub mod snapshot;

pub use batch_ops::{read_parquet_async, rows_from_batches};
pub use file_ops::{find_parquet_files_async, resolve_parquet_inputs};
pub use parallel_ops::load_parquet_files_parallel_async;
pub use rows::{CaseRow, entries_from_batch};
pub use snapshot::{Snapshot, load_case_entries, load_predictions, load_regions};
