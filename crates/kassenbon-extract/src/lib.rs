// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kassenbon-extract — Heuristic expense extraction for the Kassenbon scanner.
//
// Each field (amount, merchant, date, category) is found by an ordered table of
// small rules that can be tested on their own. The retention policy decides
// whether a receipt image travels with the final expense record.

pub mod amount;
pub mod category;
pub mod date;
pub mod extractor;
pub mod merchant;
pub mod retention;

pub use extractor::TextExtractionEngine;
pub use retention::{RetentionDecision, RetentionPolicy};
