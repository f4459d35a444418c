//! Date-range filters for activity queries.
//!
//! A filter arrives as a query parameter, is validated before the cache or
//! upstream is touched, and doubles as a cache-key segment via its canonical
//! string form.

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;

/// The accepted `filter` values, quoted in rejection messages.
pub const ACCEPTED_FILTERS: &str =
    "today, yesterday, this-week, last-week, this-month, month-MM-YYYY";

/// A validated activity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityFilter {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    /// A specific calendar month, from a `month-MM-YYYY` token.
    Month { month: u32, year: i32 },
}

#[derive(Debug, thiserror::Error)]
#[error("invalid filter '{input}', expected one of: {ACCEPTED_FILTERS}")]
pub struct InvalidFilter {
    input: String,
}

impl FromStr for ActivityFilter {
    type Err = InvalidFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => return Ok(Self::Today),
            "yesterday" => return Ok(Self::Yesterday),
            "this-week" => return Ok(Self::ThisWeek),
            "last-week" => return Ok(Self::LastWeek),
            "this-month" => return Ok(Self::ThisMonth),
            _ => {}
        }

        // month-MM-YYYY, exactly two month digits and four year digits.
        if let Some(rest) = s.strip_prefix("month-") {
            if let Some((month_str, year_str)) = rest.split_once('-') {
                let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
                if month_str.len() == 2
                    && year_str.len() == 4
                    && all_digits(month_str)
                    && all_digits(year_str)
                {
                    if let (Ok(month), Ok(year)) =
                        (month_str.parse::<u32>(), year_str.parse::<i32>())
                    {
                        if (1..=12).contains(&month) {
                            return Ok(Self::Month { month, year });
                        }
                    }
                }
            }
        }

        Err(InvalidFilter { input: s.to_owned() })
    }
}

impl fmt::Display for ActivityFilter {
    /// Canonical form, identical to the accepted input token.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Yesterday => f.write_str("yesterday"),
            Self::ThisWeek => f.write_str("this-week"),
            Self::LastWeek => f.write_str("last-week"),
            Self::ThisMonth => f.write_str("this-month"),
            Self::Month { month, year } => write!(f, "month-{month:02}-{year:04}"),
        }
    }
}

impl ActivityFilter {
    /// The window as a closed-open local date range `[start, end)`,
    /// relative to `today`. Weeks start on Monday.
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Today => (today, today + Days::new(1)),
            Self::Yesterday => (today - Days::new(1), today),
            Self::ThisWeek => {
                let monday = today.week(Weekday::Mon).first_day();
                (monday, monday + Days::new(7))
            }
            Self::LastWeek => {
                let monday = today.week(Weekday::Mon).first_day();
                (monday - Days::new(7), monday)
            }
            Self::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                (first, first + Months::new(1))
            }
            Self::Month { month, year } => {
                let first = NaiveDate::from_ymd_opt(*year, *month, 1)
                    .unwrap_or_else(|| today.with_day(1).unwrap_or(today));
                (first, first + Months::new(1))
            }
        }
    }

    /// Same range relative to the current local date.
    pub fn current_range(&self) -> (NaiveDate, NaiveDate) {
        self.date_range(Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_named_filters() {
        assert_eq!("today".parse::<ActivityFilter>().unwrap(), ActivityFilter::Today);
        assert_eq!(
            "this-week".parse::<ActivityFilter>().unwrap(),
            ActivityFilter::ThisWeek
        );
        assert_eq!(
            "last-week".parse::<ActivityFilter>().unwrap(),
            ActivityFilter::LastWeek
        );
    }

    #[test]
    fn parses_custom_month() {
        assert_eq!(
            "month-02-2025".parse::<ActivityFilter>().unwrap(),
            ActivityFilter::Month { month: 2, year: 2025 }
        );
    }

    #[test]
    fn rejects_malformed_month_tokens() {
        // Wrong digit counts, out-of-range month, missing parts.
        for bad in ["month-2-2025", "month-02-25", "month-13-2025", "month-", "month-02"] {
            assert!(bad.parse::<ActivityFilter>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn rejects_unknown_filters_with_enumerated_values() {
        let err = "fortnight".parse::<ActivityFilter>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("fortnight"));
        assert!(message.contains("this-week"));
        assert!(message.contains("month-MM-YYYY"));
    }

    #[test]
    fn display_is_canonical_and_reparses() {
        for token in ["today", "yesterday", "this-week", "last-week", "this-month", "month-09-2024"] {
            let filter: ActivityFilter = token.parse().unwrap();
            assert_eq!(filter.to_string(), token);
        }
    }

    #[test]
    fn day_ranges_are_closed_open() {
        let today = date(2025, 6, 11); // a Wednesday
        assert_eq!(
            ActivityFilter::Today.date_range(today),
            (date(2025, 6, 11), date(2025, 6, 12))
        );
        assert_eq!(
            ActivityFilter::Yesterday.date_range(today),
            (date(2025, 6, 10), date(2025, 6, 11))
        );
    }

    #[test]
    fn week_ranges_start_monday() {
        let today = date(2025, 6, 11); // Wednesday
        assert_eq!(
            ActivityFilter::ThisWeek.date_range(today),
            (date(2025, 6, 9), date(2025, 6, 16))
        );
        assert_eq!(
            ActivityFilter::LastWeek.date_range(today),
            (date(2025, 6, 2), date(2025, 6, 9))
        );
    }

    #[test]
    fn month_ranges_span_the_calendar_month() {
        let today = date(2025, 6, 11);
        assert_eq!(
            ActivityFilter::ThisMonth.date_range(today),
            (date(2025, 6, 1), date(2025, 7, 1))
        );
        assert_eq!(
            ActivityFilter::Month { month: 12, year: 2024 }.date_range(today),
            (date(2024, 12, 1), date(2025, 1, 1))
        );
    }
}
