// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kassenbon-scan — Scan session orchestration.
//
// Ties preprocessing, the shared recognition engine, text extraction and the
// retention policy into one scanner session with progress reporting and
// cancellation.

pub mod pipeline;
pub mod session;
pub mod sink;

pub use pipeline::{ScanOutcome, ScanPipeline};
pub use session::{CancelHandle, ScanSession};
pub use sink::{ExpenseSink, MemorySink};
