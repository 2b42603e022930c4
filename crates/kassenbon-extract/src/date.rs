// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Purchase date rules.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

/// One date notation and how to turn its captures into a calendar date.
#[derive(Debug)]
pub struct DateRule {
    pub name: &'static str,
    pattern: Regex,
    parse: fn(&Captures<'_>) -> Option<NaiveDate>,
}

impl DateRule {
    /// First match on `line` that is a real calendar date.
    pub fn apply(&self, line: &str) -> Option<NaiveDate> {
        self.pattern
            .captures_iter(line)
            .find_map(|caps| (self.parse)(&caps))
    }
}

/// Date rules in the order they are tried on each line.
pub static DATE_RULES: LazyLock<Vec<DateRule>> = LazyLock::new(|| {
    vec![
        DateRule {
            name: "numeric",
            pattern: Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})\b")
                .expect("valid numeric date pattern"),
            parse: parse_numeric,
        },
        DateRule {
            name: "month-name",
            pattern: Regex::new(
                r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
            )
            .expect("valid month-name date pattern"),
            parse: parse_month_name,
        },
    ]
});

/// Two-digit years are taken to be in the 2000s.
fn full_year(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    Some(if digits.len() == 2 { 2000 + year } else { year })
}

/// `01/02/2024` reads month first; when that is not a valid date the
/// day-first reading is tried.
fn parse_numeric(caps: &Captures<'_>) -> Option<NaiveDate> {
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year = full_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, first, second)
        .or_else(|| NaiveDate::from_ymd_opt(year, second, first))
}

fn parse_month_name(caps: &Captures<'_>) -> Option<NaiveDate> {
    let month = match caps[1].to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First valid date, scanning lines top to bottom and rules in order.
pub fn extract_date(lines: &[&str]) -> Option<NaiveDate> {
    lines
        .iter()
        .find_map(|line| DATE_RULES.iter().find_map(|rule| rule.apply(line)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn numeric_reads_month_first() {
        assert_eq!(extract_date(&["01/02/2024"]), Some(ymd(2024, 1, 2)));
    }

    #[test]
    fn numeric_falls_back_to_day_first() {
        assert_eq!(extract_date(&["25.12.2023 14:02"]), Some(ymd(2023, 12, 25)));
    }

    #[test]
    fn two_digit_year() {
        assert_eq!(extract_date(&["Date: 3-7-24"]), Some(ymd(2024, 3, 7)));
    }

    #[test]
    fn impossible_numeric_date_is_skipped() {
        assert_eq!(extract_date(&["31/31/2024", "02/29/2023"]), None);
    }

    #[test]
    fn month_name_forms() {
        assert_eq!(extract_date(&["January 2, 2024"]), Some(ymd(2024, 1, 2)));
        assert_eq!(extract_date(&["Sept. 30 2023"]), Some(ymd(2023, 9, 30)));
        assert_eq!(extract_date(&["dec 1st, 2022"]), Some(ymd(2022, 12, 1)));
    }

    #[test]
    fn earliest_line_wins() {
        let lines = ["Mar 3, 2021", "04/05/2022"];
        assert_eq!(extract_date(&lines), Some(ymd(2021, 3, 3)));
    }

    #[test]
    fn numeric_rule_tried_before_month_name_on_same_line() {
        let line = ["Feb 9, 2020 printed 10/11/2021"];
        assert_eq!(extract_date(&line), Some(ymd(2021, 10, 11)));
    }

    #[test]
    fn later_match_on_line_used_when_first_is_invalid() {
        assert_eq!(
            extract_date(&["99/99/99 then 06/07/2021"]),
            Some(ymd(2021, 6, 7))
        );
    }
}
