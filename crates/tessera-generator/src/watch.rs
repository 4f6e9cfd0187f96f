//! Serialized rebuild loop for watch mode.
//!
//! One task consumes change events. Changes that arrive while a build runs
//! queue up in the channel and are folded into a single follow-up build.

use std::{path::PathBuf, time::Duration};

use tokio::{sync::mpsc, time::timeout};
use tracing::{error, info, warn};

use crate::build::{BuildReport, Builder, StageError};

/// Paths touched by one filesystem event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

/// Something the loop can rebuild.
pub trait Rebuild: Send + 'static {
    /// Run one full build, leaving the target ready for the next one.
    fn rebuild(&mut self) -> Result<BuildReport, StageError>;
}

impl Rebuild for Builder {
    fn rebuild(&mut self) -> Result<BuildReport, StageError> {
        let result = self.build();
        self.reset();
        result
    }
}

/// Counts kept by a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub builds: usize,
    pub failures: usize,
}

/// Rebuild loop with a debounce window.
#[derive(Debug)]
pub struct RebuildLoop<R> {
    target: R,
    debounce: Duration,
}

impl<R: Rebuild> RebuildLoop<R> {
    #[must_use]
    pub fn new(target: R, debounce: Duration) -> Self {
        Self { target, debounce }
    }

    /// Consume events until every sender is dropped.
    ///
    /// Builds run on the blocking pool one at a time. A failed build is
    /// logged and the loop keeps waiting for changes.
    pub async fn run(self, mut events: mpsc::Receiver<ChangeEvent>) -> WatchSummary {
        let Self {
            mut target,
            debounce,
        } = self;
        let mut summary = WatchSummary::default();

        while let Some(first) = events.recv().await {
            let mut changed = first.paths;
            let mut closed = false;

            // Let a burst settle; anything queued during the last build is
            // picked up here without waiting.
            loop {
                match timeout(debounce, events.recv()).await {
                    Ok(Some(event)) => changed.extend(event.paths),
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }
            changed.sort();
            changed.dedup();

            for path in &changed {
                info!(path = %path.display(), "change detected");
            }

            let handle = tokio::task::spawn_blocking(move || {
                let result = target.rebuild();
                (target, result)
            });
            let (returned, result) = match handle.await {
                Ok(done) => done,
                Err(err) => {
                    error!(error = %err, "rebuild task failed, stopping watch loop");
                    summary.failures += 1;
                    return summary;
                }
            };
            target = returned;
            summary.builds += 1;

            match result {
                Ok(report) => info!(
                    pages = report.pages,
                    duration_ms = report.duration_ms,
                    "rebuild complete"
                ),
                Err(err) => {
                    summary.failures += 1;
                    error!(stage = %err.stage, error = %err, "rebuild failed, waiting for changes");
                }
            }

            if closed {
                break;
            }
        }

        if summary.builds == 0 {
            warn!("watch loop ended without any change");
        }
        summary
    }
}
