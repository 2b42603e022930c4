// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kassenbon — Core types and error definitions shared across all crates.

pub mod config;
pub mod display;
pub mod error;
pub mod human_errors;
pub mod progress;
pub mod types;

pub use config::ScanConfig;
pub use display::{DisplayHandle, DisplayRegistry};
pub use error::KassenbonError;
pub use human_errors::{UserMessage, humanize_error};
pub use progress::{ProgressBand, ProgressReporter, ProgressStream};
pub use types::*;
