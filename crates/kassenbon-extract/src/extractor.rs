// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turns recognized receipt text into an `ExtractedRecord`.

use kassenbon_core::types::ExtractedRecord;
use tracing::{debug, instrument};

use crate::amount::extract_amount;
use crate::category::classify;
use crate::date::extract_date;
use crate::merchant::extract_merchant;

/// Stateless heuristic extractor. Soft gaps leave fields empty; it never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractionEngine;

impl TextExtractionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Extract merchant, amount, date and category from `text`.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn extract(&self, text: &str) -> ExtractedRecord {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let record = ExtractedRecord {
            merchant: extract_merchant(&lines),
            amount: extract_amount(&lines),
            date: extract_date(&lines),
            category: classify(text).to_owned(),
        };

        debug!(
            line_count = lines.len(),
            merchant = %record.merchant,
            amount = ?record.amount,
            date = ?record.date,
            category = %record.category,
            "Receipt text extracted"
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn grocery_receipt_end_to_end() {
        let record = TextExtractionEngine::new().extract("Trader Joe's\n01/02/2024\nTOTAL: $45.67");
        assert_eq!(
            record,
            ExtractedRecord {
                merchant: "Trader Joe's".into(),
                amount: Some(45.67),
                date: NaiveDate::from_ymd_opt(2024, 1, 2),
                category: "Groceries".into(),
            }
        );
    }

    #[test]
    fn receipt_without_amount_or_date() {
        let record = TextExtractionEngine::new().extract("Corner Pizza\nThank you!");
        assert_eq!(record.merchant, "Corner Pizza");
        assert_eq!(record.amount, None);
        assert_eq!(record.date, None);
        assert_eq!(record.category, "Dining");
    }

    #[test]
    fn dining_keyword_beats_grocery_keyword() {
        let record =
            TextExtractionEngine::new().extract("WALMART SUPERCENTER\nPizza slice $2.99\nTotal 2.99");
        assert_eq!(record.category, "Dining");
        assert_eq!(record.amount, Some(2.99));
    }

    #[test]
    fn blank_and_padded_lines_are_ignored() {
        let text = "\n\n   \n   Blue Bottle Coffee   \n\n  Mar 3, 2024 \n  Balance due 6,40\n";
        let record = TextExtractionEngine::new().extract(text);
        assert_eq!(record.merchant, "Blue Bottle Coffee");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 3));
        assert_eq!(record.amount, Some(6.4));
    }

    #[test]
    fn empty_text_gives_empty_record() {
        assert!(TextExtractionEngine::new().extract("").is_empty());
        assert!(TextExtractionEngine::new().extract(" \n \n").is_empty());
    }

    #[test]
    fn windows_line_endings() {
        let record = TextExtractionEngine::new().extract("Shell Station 42\r\n$38.10\r\n");
        assert_eq!(record.merchant, "Shell Station 42");
        assert_eq!(record.amount, Some(38.1));
        assert_eq!(record.category, "Transportation");
    }
}
