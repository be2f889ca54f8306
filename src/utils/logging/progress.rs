//! Progress bars for snapshot loading

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Template of the per-input file counter
pub const FILES_TEMPLATE: &str = "{msg:>14} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} files";

/// A file counter for one snapshot input, drawn on stderr
///
/// Single-file inputs get a hidden bar.
#[must_use]
pub fn create_main_progress_bar(files: u64, input: Option<&str>) -> ProgressBar {
    let target = if files > 1 {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let pb = ProgressBar::with_draw_target(Some(files), target);
    if let Ok(style) = ProgressStyle::with_template(FILES_TEMPLATE) {
        pb.set_style(style.progress_chars("=> "));
    }
    if let Some(input) = input {
        pb.set_message(input.to_string());
    }
    pb
}

/// Stop the counter, leaving `message` on the finished line
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    match message {
        Some(message) => pb.finish_with_message(message.to_string()),
        None => pb.finish_and_clear(),
    }
}
