// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner session state and cancellation.

use std::sync::Arc;

use kassenbon_core::human_errors::UserMessage;
use kassenbon_core::types::{ExtractedRecord, NormalizedImage, ScanPhase};
use tokio::sync::watch;
use uuid::Uuid;

/// Lets another task cancel the running scan.
///
/// Cancellation is advisory: it only moves the session back to previewing.
/// The recognition engine never hears about it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation of the current scan.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clear a previous request before a new scan starts.
    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// One scan attempt: the normalized image and everything derived from it.
///
/// Dropping the session drops the image and with it the display handle.
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    pub(crate) image: NormalizedImage,
    pub(crate) phase: ScanPhase,
    pub(crate) raw_text: Option<String>,
    pub(crate) record: Option<ExtractedRecord>,
    pub(crate) error: Option<UserMessage>,
}

impl ScanSession {
    pub(crate) fn new(image: NormalizedImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            phase: ScanPhase::Previewing,
            raw_text: None,
            record: None,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn image(&self) -> &NormalizedImage {
        &self.image
    }

    /// Recognized text, once recognition has finished.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    pub fn record(&self) -> Option<&ExtractedRecord> {
        self.record.as_ref()
    }

    /// The last failure shown to the user, cleared when a new scan starts.
    pub fn error(&self) -> Option<UserMessage> {
        self.error
    }

    /// Forget recognition results ahead of a new scan.
    pub(crate) fn begin_scan(&mut self) {
        self.phase = ScanPhase::Processing;
        self.raw_text = None;
        self.record = None;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn cancel_and_reset() {
        let cancel = CancelHandle::new();
        assert!(!cancel.is_cancelled());
        cancel.cancel();
        assert!(cancel.is_cancelled());
        cancel.reset();
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_for_clones() {
        let cancel = CancelHandle::new();
        let remote = cancel.clone();
        let waiter = tokio::spawn(async move { cancel.cancelled().await });
        tokio::task::yield_now().await;
        remote.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation observed")
            .unwrap();
    }

    #[tokio::test]
    async fn already_cancelled_resolves_immediately() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_millis(50), cancel.cancelled())
            .await
            .expect("no wait when already cancelled");
    }
}
