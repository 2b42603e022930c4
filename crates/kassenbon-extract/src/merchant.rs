// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merchant name heuristic: the first line near the top of the receipt that
// is not a date, a price, or a street address.

use std::sync::LazyLock;

use regex::Regex;

/// Longest merchant name kept, in characters.
pub const MAX_MERCHANT_CHARS: usize = 50;

static SHORT_DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[/.\-]\d{1,2}").expect("valid date prefix pattern"));

static CURRENCY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$€£¥]").expect("valid currency prefix pattern"));

static STREET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\d+\s*(?:st|nd|rd|th)\b|^\d+\s+(?:[a-z]+\s+)?(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|way|highway|hwy|court|ct|place|pl)\b",
    )
    .expect("valid street address pattern")
});

/// A reason to skip a line when looking for the merchant.
#[derive(Debug)]
pub struct MerchantFilter {
    pub name: &'static str,
    rejects: fn(&str) -> bool,
}

impl MerchantFilter {
    pub fn rejects(&self, line: &str) -> bool {
        (self.rejects)(line)
    }
}

/// Every filter a candidate line must pass.
pub static MERCHANT_FILTERS: &[MerchantFilter] = &[
    MerchantFilter {
        name: "too-short",
        rejects: |line| line.chars().count() <= 3,
    },
    MerchantFilter {
        name: "date-prefix",
        rejects: |line| SHORT_DATE_PREFIX.is_match(line),
    },
    MerchantFilter {
        name: "currency-prefix",
        rejects: |line| CURRENCY_PREFIX.is_match(line),
    },
    MerchantFilter {
        name: "street-address",
        rejects: |line| STREET_ADDRESS.is_match(line),
    },
];

/// First qualifying line, truncated; empty when none qualifies.
pub fn extract_merchant(lines: &[&str]) -> String {
    lines
        .iter()
        .find(|line| !MERCHANT_FILTERS.iter().any(|filter| filter.rejects(line)))
        .map(|line| line.chars().take(MAX_MERCHANT_CHARS).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(name: &str) -> &'static MerchantFilter {
        MERCHANT_FILTERS
            .iter()
            .find(|f| f.name == name)
            .expect("filter exists")
    }

    #[test]
    fn first_plain_line_is_the_merchant() {
        assert_eq!(extract_merchant(&["Trader Joe's", "01/02/2024"]), "Trader Joe's");
    }

    #[test]
    fn skips_short_dates_prices_and_addresses() {
        let lines = [
            "#12",
            "03/14 09:12",
            "$4.50",
            "221st Ave",
            "1600 Pennsylvania Avenue",
            "12 Main St",
            "Blue Bottle Coffee",
        ];
        assert_eq!(extract_merchant(&lines), "Blue Bottle Coffee");
    }

    #[test]
    fn address_filter_cases() {
        let address = filter("street-address");
        assert!(address.rejects("42nd Street Deli"));
        assert!(address.rejects("500 Oak Rd"));
        assert!(address.rejects("77 main street"));
        assert!(address.rejects("9 Elm Ln"));
        assert!(!address.rejects("7 Eleven"));
        assert!(!address.rejects("Main Street Bakery"));
    }

    #[test]
    fn at_most_one_word_between_number_and_road_word() {
        let address = filter("street-address");
        assert!(!address.rejects("3 Brothers Grill Drive Thru"));
        assert_eq!(
            extract_merchant(&["3 Brothers Grill Drive Thru", "01/02/2024"]),
            "3 Brothers Grill Drive Thru"
        );
    }

    #[test]
    fn short_line_filter_counts_characters() {
        assert!(filter("too-short").rejects("Käs"));
        assert!(!filter("too-short").rejects("Käse"));
    }

    #[test]
    fn long_names_are_truncated_to_fifty_chars() {
        let long = "Ä".repeat(80);
        let merchant = extract_merchant(&[long.as_str()]);
        assert_eq!(merchant.chars().count(), MAX_MERCHANT_CHARS);
    }

    #[test]
    fn empty_when_nothing_qualifies() {
        assert_eq!(extract_merchant(&["$1.00", "12/12/24", "ok"]), "");
    }
}
