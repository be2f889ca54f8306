//! Shared helpers for snapshot files and logging

use std::path::Path;

use crate::error::{Error, Result};

pub mod logging;

pub use logging::{log_operation_complete, log_operation_start, log_warning};

/// Rows per record batch when reading snapshot files
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Environment variable overriding [`DEFAULT_BATCH_SIZE`]
pub const BATCH_SIZE_ENV: &str = "EPI_PARQUET_BATCH_SIZE";

/// Batch size from `EPI_PARQUET_BATCH_SIZE`, ignoring zero and garbage
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    let raw = std::env::var(BATCH_SIZE_ENV).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Some(size),
        _ => {
            log::warn!("Ignoring {BATCH_SIZE_ENV}={raw}");
            None
        }
    }
}

/// Fail with an I/O `NotFound` error unless `dir` is an existing directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("snapshot directory {} does not exist", dir.display()),
        )))
    }
}
