//! Progress display for download sessions
//!
//! Renders [`SegmentProgress`] events from the coordinator with indicatif.
//! Without a terminal, or with `--no-progress`, the bar is hidden and only
//! the final tally is kept.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::SegmentProgress;
use crate::errors::{AppError, Result};

const MAX_FILENAME_WIDTH: usize = 40;

/// Counts gathered while rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTally {
    pub succeeded: usize,
    pub failed: usize,
}

/// Segment progress bar
#[derive(Debug)]
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    /// Creates the display; hidden unless `enabled` and stderr is a terminal
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled || !std::io::stderr().is_terminal() {
            return Ok(Self {
                bar: ProgressBar::hidden(),
            });
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?
                .progress_chars("##-"),
        );
        bar.set_message("Resolving manifests...");
        Ok(Self { bar })
    }

    /// Hidden display for tests and quiet runs
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Renders events until every sender is dropped
    pub fn spawn(self, mut receiver: mpsc::Receiver<SegmentProgress>) -> JoinHandle<ProgressTally> {
        tokio::spawn(async move {
            let mut tally = ProgressTally::default();

            while let Some(event) = receiver.recv().await {
                self.bar.set_length(event.total as u64);
                self.bar.set_position(event.completed as u64);

                if event.succeeded {
                    tally.succeeded += 1;
                } else {
                    tally.failed += 1;
                    self.bar.println(format!("failed: {}", event.file_name));
                }
                self.bar
                    .set_message(truncate_name(&event.file_name, MAX_FILENAME_WIDTH));
            }

            self.bar.finish_and_clear();
            debug!(
                "Progress display finished: {} ok, {} failed",
                tally.succeeded, tally.failed
            );
            tally
        })
    }
}

/// Shortens `name` to at most `width` characters, keeping the tail
pub fn truncate_name(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width || width < 4 {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, succeeded: bool, completed: usize) -> SegmentProgress {
        SegmentProgress {
            file_name: name.to_string(),
            succeeded,
            completed,
            total: 3,
        }
    }

    #[test]
    fn test_filename_truncation() {
        assert_eq!(truncate_name("seg1.ts", 10), "seg1.ts");
        let long = truncate_name("very_long_segment_name_0001.ts", 12);
        assert_eq!(long.chars().count(), 12);
        assert!(long.ends_with("_0001.ts"));
        assert!(long.starts_with("..."));
    }

    #[tokio::test]
    async fn test_tally_counts_events() {
        let (tx, rx) = mpsc::channel(8);
        let handle = ProgressDisplay::hidden().spawn(rx);

        tx.send(event("seg1.ts", true, 1)).await.unwrap();
        tx.send(event("seg2.ts", false, 2)).await.unwrap();
        tx.send(event("seg3.ts", true, 3)).await.unwrap();
        drop(tx);

        let tally = handle.await.unwrap();
        assert_eq!(
            tally,
            ProgressTally {
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn test_disabled_display_is_hidden() {
        let display = ProgressDisplay::new(false).unwrap();
        assert!(display.bar.is_hidden());
    }
}
