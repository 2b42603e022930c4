// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Category keyword table. Order matters: the first category with any keyword
// in the receipt text wins, so a pizzeria inside a Walmart is Dining.

/// A category label and the keywords that select it.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

impl CategoryRule {
    /// Whether any keyword occurs in `lowered` (already lower-cased text).
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Categories in priority order.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        label: "Dining",
        keywords: &[
            "restaurant", "cafe", "café", "coffee", "pizza", "burger", "grill", "bistro", "diner",
            "sushi", "taco", "bakery", "starbucks", "mcdonald", "brasserie", "takeaway",
        ],
    },
    CategoryRule {
        label: "Groceries",
        keywords: &[
            "grocery", "supermarket", "walmart", "kroger", "safeway", "trader joe", "whole foods",
            "aldi", "lidl", "costco", "publix", "tesco", "produce",
        ],
    },
    CategoryRule {
        label: "Transportation",
        keywords: &[
            "uber", "lyft", "taxi", "fuel", "gasoline", "petrol", "shell", "chevron", "exxon",
            "parking", "transit", "metro", "airline", "railway",
        ],
    },
    CategoryRule {
        label: "Shopping",
        keywords: &[
            "amazon", "target", "best buy", "ikea", "mall", "department store", "clothing",
            "apparel", "electronics", "retail",
        ],
    },
    CategoryRule {
        label: "Entertainment",
        keywords: &[
            "cinema", "movie", "theater", "theatre", "netflix", "spotify", "concert",
            "ticketmaster", "museum", "bowling", "arcade",
        ],
    },
    CategoryRule {
        label: "Healthcare",
        keywords: &[
            "pharmacy", "cvs", "walgreens", "clinic", "hospital", "medical", "dental",
            "prescription", "drugstore",
        ],
    },
    CategoryRule {
        label: "Utilities",
        keywords: &[
            "electric", "utility", "water bill", "internet", "broadband", "comcast", "verizon",
            "at&t", "energy", "gas bill",
        ],
    },
];

/// Label of the first matching category, or `""`.
pub fn classify(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map_or("", |rule| rule.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(label: &str) -> usize {
        CATEGORY_RULES
            .iter()
            .position(|rule| rule.label == label)
            .expect("category exists")
    }

    #[test]
    fn dining_precedes_groceries() {
        assert!(position("Dining") < position("Groceries"));
        assert_eq!(classify("Walmart Supercenter\nPIZZA SLICE 3.99"), "Dining");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("TRADER JOE'S #552"), "Groceries");
        assert_eq!(classify("Uber Trip Receipt"), "Transportation");
    }

    #[test]
    fn each_rule_matches_its_own_keywords() {
        for rule in CATEGORY_RULES {
            for keyword in rule.keywords {
                assert!(rule.matches(keyword), "{} should match {keyword}", rule.label);
            }
        }
    }

    #[test]
    fn keywords_are_lower_case() {
        for rule in CATEGORY_RULES {
            for keyword in rule.keywords {
                assert_eq!(*keyword, keyword.to_lowercase());
            }
        }
    }

    #[test]
    fn unknown_text_has_no_category() {
        assert_eq!(classify("ACME Holdings\nInvoice 7781"), "");
        assert_eq!(classify(""), "");
    }
}
