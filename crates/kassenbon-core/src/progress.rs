// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress notification stream.
//
// Progress flows one way: from the recognition worker to the orchestrator and
// on to whoever draws the progress bar. The channel is a `tokio::sync::watch`,
// so a slow consumer only ever sees the newest event and reporting never
// blocks or fails when nobody is listening.

use std::sync::Arc;

use tokio::sync::watch;

use crate::types::ProgressEvent;

/// Sending side of the progress stream. Cheap to clone and `Send + Sync`, so
/// it can be moved into blocking workers.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Create a reporter together with its first subscriber.
    pub fn channel() -> (Self, ProgressStream) {
        let (tx, rx) = watch::channel(ProgressEvent::new(0, ""));
        (Self { tx: Arc::new(tx) }, ProgressStream { rx })
    }

    /// A reporter nobody listens to (yet).
    pub fn detached() -> Self {
        Self::channel().0
    }

    /// Attach another consumer. It starts at the current event.
    pub fn subscribe(&self) -> ProgressStream {
        ProgressStream {
            rx: self.tx.subscribe(),
        }
    }

    /// The latest event.
    pub fn current(&self) -> ProgressEvent {
        self.tx.borrow().clone()
    }

    /// Publish progress. A percentage lower than the current one is raised
    /// to it, so the stream never goes backwards within a session.
    pub fn report(&self, percent: u8, status: &str) {
        let percent = percent.min(100);
        self.tx.send_if_modified(|event| {
            let next = percent.max(event.percent);
            if next == event.percent && event.status == status {
                return false;
            }
            event.percent = next;
            if event.status != status {
                event.status = status.to_owned();
            }
            true
        });
    }

    /// Change the status text, keeping the percentage.
    pub fn status(&self, status: &str) {
        let percent = self.current().percent;
        self.report(percent, status);
    }

    /// Start a new session at zero.
    pub fn reset(&self) {
        self.tx.send_replace(ProgressEvent::new(0, ""));
    }

    /// A reporter that maps fractions `0.0..=1.0` into `start..=end` percent.
    pub fn band(&self, start: u8, end: u8) -> ProgressBand {
        ProgressBand {
            reporter: self.clone(),
            start: start.min(100),
            end: end.clamp(start.min(100), 100),
        }
    }
}

/// A slice of the 0-100 range owned by one pipeline stage.
#[derive(Debug, Clone)]
pub struct ProgressBand {
    reporter: ProgressReporter,
    start: u8,
    end: u8,
}

impl ProgressBand {
    /// Percentage for a stage-local fraction.
    pub fn percent_for(&self, fraction: f32) -> u8 {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let span = f32::from(self.end - self.start);
        self.start + (span * fraction).round() as u8
    }

    pub fn report(&self, fraction: f32, status: &str) {
        self.reporter.report(self.percent_for(fraction), status);
    }
}

/// Receiving side of the progress stream.
#[derive(Debug, Clone)]
pub struct ProgressStream {
    rx: watch::Receiver<ProgressEvent>,
}

impl ProgressStream {
    /// Wait for the next event. `None` once the reporter is gone.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// The newest event, without waiting.
    pub fn latest(&self) -> ProgressEvent {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_goes_backwards() {
        let (reporter, stream) = ProgressReporter::channel();
        reporter.report(40, "recognizing text");
        reporter.report(20, "recognizing text");
        assert_eq!(stream.latest().percent, 40);
    }

    #[test]
    fn status_only_update_keeps_percent() {
        let reporter = ProgressReporter::detached();
        reporter.report(15, "engine ready");
        reporter.status("recognizing text");
        let event = reporter.current();
        assert_eq!(event.percent, 15);
        assert_eq!(event.status, "recognizing text");
    }

    #[test]
    fn band_maps_fraction_into_range() {
        let band = ProgressReporter::detached().band(15, 95);
        assert_eq!(band.percent_for(0.0), 15);
        assert_eq!(band.percent_for(0.5), 55);
        assert_eq!(band.percent_for(1.0), 95);
        assert_eq!(band.percent_for(7.0), 95);
        assert_eq!(band.percent_for(f32::NAN), 15);
    }

    #[test]
    fn reset_starts_over() {
        let reporter = ProgressReporter::detached();
        reporter.report(100, "done");
        reporter.reset();
        assert_eq!(reporter.current().percent, 0);
    }

    #[tokio::test]
    async fn slow_consumer_sees_latest_only() {
        let (reporter, mut stream) = ProgressReporter::channel();
        reporter.report(10, "a");
        reporter.report(30, "b");
        reporter.report(60, "c");
        let event = stream.next().await.unwrap();
        assert_eq!(event, ProgressEvent::new(60, "c"));
    }

    #[tokio::test]
    async fn stream_ends_when_reporter_dropped() {
        let (reporter, mut stream) = ProgressReporter::channel();
        drop(reporter);
        assert!(stream.next().await.is_none());
    }
}
