//! Locating and opening snapshot Parquet files

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs::{self, File};

use crate::error::Result;
use crate::utils::{log_operation_complete, log_operation_start, log_warning, validate_directory};

/// Every `*.parquet` file directly inside `dir`, sorted by path
///
/// # Errors
/// Returns an error if the directory or one of its entries cannot be read
pub async fn find_parquet_files_async(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Listing snapshot files in", dir.display());
    validate_directory(dir)?;

    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("listing {}", dir.display()))?;

    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("reading an entry of {}", dir.display()))?
    {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .with_context(|| format!("inspecting {}", path.display()))?
            .is_file();
        if is_file && path.extension().is_some_and(|ext| ext == "parquet") {
            found.push(path);
        }
    }
    found.sort();

    match found.len() {
        0 => log_warning("Snapshot directory holds no Parquet files", Some(&dir.display())),
        n => log_operation_complete("listed", dir.display(), n, None),
    }
    Ok(found)
}

/// Files making up one snapshot input: `path` itself, or the files of a directory
///
/// # Errors
/// Returns an error if `path` is neither a file nor a readable directory
pub async fn resolve_parquet_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_dir() {
        return find_parquet_files_async(path).await;
    }
    if !path.is_file() {
        return Err(anyhow::anyhow!("snapshot input {} does not exist", path.display()).into());
    }
    Ok(vec![path.to_path_buf()])
}

/// Open one snapshot file for async reading
///
/// # Errors
/// Returns an error if the file cannot be opened
pub async fn open_parquet_file_async(path: &Path) -> Result<File> {
    let file = File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(file)
}
