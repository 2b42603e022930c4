// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt image retention: only high-value expenses keep their image.

use kassenbon_core::types::{NormalizedImage, ReceiptImage};
use tracing::debug;

/// Amount at and above which the receipt image is kept.
pub const DEFAULT_RETENTION_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionPolicy {
    threshold: f64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_THRESHOLD)
    }
}

impl RetentionPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True iff `amount >= threshold`. An absent amount counts as zero.
    pub fn decide(&self, amount: Option<f64>) -> bool {
        amount.unwrap_or(0.0) >= self.threshold
    }

    /// Decide and attach or drop the image. A dropped image releases its
    /// display handle before this returns.
    pub fn apply(&self, amount: Option<f64>, image: NormalizedImage) -> RetentionDecision {
        let retain = self.decide(amount);
        debug!(?amount, threshold = self.threshold, retain, "Retention decided");
        let image = retain.then(|| {
            let (image_bytes, display_handle) = image.into_parts();
            ReceiptImage {
                image_bytes,
                display_handle,
            }
        });
        RetentionDecision { retain, image }
    }
}

/// Outcome of [`RetentionPolicy::apply`].
#[derive(Debug)]
pub struct RetentionDecision {
    pub retain: bool,
    /// Present only when `retain` is true.
    pub image: Option<ReceiptImage>,
}
