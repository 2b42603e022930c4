// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Amount rules.
//
// Receipts print their total near the bottom, so lines are scanned from the
// last one upwards. The rules are tried strictly in table order: a labelled
// total anywhere on the receipt beats a bare currency figure, which beats a
// bare two-decimal number.

use std::sync::LazyLock;

use regex::Regex;

/// One pattern family for locating the receipt total.
#[derive(Debug)]
pub struct AmountRule {
    pub name: &'static str,
    pattern: Regex,
}

impl AmountRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("amount rule pattern is valid"),
        }
    }

    /// The amount this rule finds on `line`, if any.
    pub fn apply(&self, line: &str) -> Option<f64> {
        let caps = self.pattern.captures(line)?;
        parse_amount(caps.get(1)?.as_str())
    }
}

/// Amount rules in priority order.
pub static AMOUNT_RULES: LazyLock<Vec<AmountRule>> = LazyLock::new(|| {
    vec![
        AmountRule::new(
            "labelled",
            r"(?i)\b(?:total|amount|sum|due|balance)\b[^0-9\n]*?(\d+[.,]\d{2})\b",
        ),
        AmountRule::new("currency-symbol", r"[$€£¥]\s?(\d+[.,]\d{2})\b"),
        AmountRule::new(
            "bare-decimal",
            r"(?i)(\d+[.,]\d{2})\s*(?:usd|eur|gbp|chf|cad|aud|jpy|inr|sek|nok|dkk|pln|czk)?\s*$",
        ),
    ]
});

/// Parse matched digits, reading a comma as the decimal separator.
pub fn parse_amount(digits: &str) -> Option<f64> {
    digits.replace(',', ".").parse().ok()
}

/// Find the receipt total among trimmed, non-empty `lines` (original order).
pub fn extract_amount(lines: &[&str]) -> Option<f64> {
    AMOUNT_RULES.iter().find_map(|rule| {
        lines
            .iter()
            .rev()
            .find_map(|line| rule.apply(line))
            .inspect(|amount| tracing::debug!(rule = rule.name, amount, "amount matched"))
    })
}
