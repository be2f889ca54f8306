//! Uniform start/finish log lines
//!
//! The subject is whatever an operation works on: a snapshot directory, an
//! input file or a queried region.

use std::fmt::Display;
use std::time::Duration;

/// `<operation> <subject>` at info level
pub fn log_operation_start(operation: &str, subject: impl Display) {
    log::info!("{operation} {subject}");
}

/// Finish line of an operation
///
/// `operation` is a past-tense verb ("loaded", "aggregated") and `items`
/// counts whatever the operation produced.
pub fn log_operation_complete(
    operation: &str,
    subject: impl Display,
    items: usize,
    elapsed: Option<Duration>,
) {
    match elapsed {
        Some(elapsed) => log::info!("{subject}: {operation} {items} in {elapsed:.2?}"),
        None => log::info!("{subject}: {operation} {items}"),
    }
}

/// A degraded-but-continuing condition, optionally about a subject
pub fn log_warning(message: &str, subject: Option<&dyn Display>) {
    match subject {
        Some(subject) => log::warn!("{message}: {subject}"),
        None => log::warn!("{message}"),
    }
}
