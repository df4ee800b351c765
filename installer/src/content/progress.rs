//! Download progress reporting.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BYTES_TEMPLATE: &str =
    "{bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta} left)";
const SPINNER_TEMPLATE: &str = "{spinner} {bytes} downloaded ({bytes_per_sec})";

/// Receives byte counts while an asset streams to disk.
pub trait DownloadProgress {
    /// Called once before the first byte with the declared length, if any.
    fn started(&self, total_bytes: Option<u64>);

    /// Called after each block is written.
    fn advanced(&self, bytes: u64);

    /// Called once when the body has been fully received, or the download
    /// was abandoned.
    fn finished(&self);
}

/// Progress sink that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl DownloadProgress for SilentProgress {
    fn started(&self, _total_bytes: Option<u64>) {}

    fn advanced(&self, _bytes: u64) {}

    fn finished(&self) {}
}

/// Terminal progress bar backed by `indicatif`.
///
/// Shows a byte bar when the length is known and a spinner otherwise. The
/// bar is cleared when the download finishes.
#[derive(Debug, Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Draw on stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(
            None,
            ProgressDrawTarget::stderr(),
        ))
    }

    /// Report through an existing bar, e.g. a hidden one in tests.
    #[must_use]
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    /// Bytes reported so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl DownloadProgress for BarProgress {
    fn started(&self, total_bytes: Option<u64>) {
        let template = match total_bytes {
            Some(total) => {
                self.bar.set_length(total);
                BYTES_TEMPLATE
            }
            None => SPINNER_TEMPLATE,
        };
        match ProgressStyle::with_template(template) {
            Ok(style) => self.bar.set_style(style.progress_chars("=> ")),
            Err(error) => log::debug!("progress template rejected: {error}"),
        }
        self.bar.set_position(0);
    }

    fn advanced(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_counts_reported_bytes() {
        let progress = BarProgress::with_bar(ProgressBar::hidden());

        progress.started(Some(10_000));
        progress.advanced(8_192);
        progress.advanced(1_808);

        assert_eq!(progress.position(), 10_000);
        progress.finished();
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn unknown_length_still_counts() {
        let progress = BarProgress::with_bar(ProgressBar::hidden());

        progress.started(None);
        progress.advanced(42);

        assert_eq!(progress.position(), 42);
        assert_eq!(progress.bar.length(), None);
    }
}
