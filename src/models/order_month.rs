//! Canonical order-month handling.
//!
//! Operators label order months inconsistently (`"11월분"`, `"11월"`, `"11"` or a
//! bare number). Every label is reduced to an integer month at the HTTP boundary
//! and only that form is stored or compared.

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use utoipa::ToSchema;

const MONTH_SUFFIXES: [&str; 2] = ["월분", "월"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderMonthError {
    #[error("order month is empty")]
    Empty,
    #[error("order month '{0}' is not a number")]
    NotANumber(String),
    #[error("order month {0} is outside 1-12")]
    OutOfRange(i64),
}

/// Calendar month 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderMonth(u8);

impl OrderMonth {
    pub fn new(month: i64) -> Result<Self, OrderMonthError> {
        if (1..=12).contains(&month) {
            Ok(Self(month as u8))
        } else {
            Err(OrderMonthError::OutOfRange(month))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Column value used by the entities.
    pub fn as_i32(self) -> i32 {
        i32::from(self.0)
    }
}

impl FromStr for OrderMonth {
    type Err = OrderMonthError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut label = raw.trim();
        for suffix in MONTH_SUFFIXES {
            if let Some(stripped) = label.strip_suffix(suffix) {
                label = stripped.trim_end();
                break;
            }
        }
        if label.is_empty() {
            return Err(OrderMonthError::Empty);
        }
        let number = label
            .parse::<i64>()
            .map_err(|_| OrderMonthError::NotANumber(raw.to_string()))?;
        Self::new(number)
    }
}

impl TryFrom<i32> for OrderMonth {
    type Error = OrderMonthError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl fmt::Display for OrderMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for OrderMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Label {
            Number(i64),
            Text(String),
        }

        match Label::deserialize(deserializer)? {
            Label::Number(n) => OrderMonth::new(n).map_err(de::Error::custom),
            Label::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// A (year, month) pair used for rolling order-month windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: OrderMonth,
}

impl YearMonth {
    pub fn new(year: i32, month: OrderMonth) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: OrderMonth(date.month() as u8),
        }
    }

    /// Moves by `delta` months, carrying into the year.
    pub fn shift(self, delta: i32) -> Self {
        let index = self.year * 12 + (i32::from(self.month.0) - 1) + delta;
        Self {
            year: index.div_euclid(12),
            month: OrderMonth((index.rem_euclid(12) + 1) as u8),
        }
    }

    /// Every month from `start` to `end`, both inclusive. Empty if `start > end`.
    pub fn range_inclusive(start: Self, end: Self) -> Vec<Self> {
        let mut months = Vec::new();
        let mut current = start;
        while current <= end {
            months.push(current);
            current = current.shift(1);
        }
        months
    }

    /// The months from `before` months ago through `after` months ahead of `today`.
    pub fn rolling_window(today: NaiveDate, before: u32, after: u32) -> Vec<Self> {
        let anchor = Self::from_date(today);
        Self::range_inclusive(anchor.shift(-(before as i32)), anchor.shift(after as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("11월분", 11)]
    #[case("11월", 11)]
    #[case(" 3 ", 3)]
    #[case("12", 12)]
    #[case("1 월분", 1)]
    fn canonicalizes_month_labels(#[case] raw: &str, #[case] expected: u8) {
        assert_eq!(raw.parse::<OrderMonth>().unwrap().get(), expected);
    }

    #[rstest]
    #[case("", OrderMonthError::Empty)]
    #[case("월분", OrderMonthError::Empty)]
    #[case("13", OrderMonthError::OutOfRange(13))]
    #[case("0월", OrderMonthError::OutOfRange(0))]
    fn rejects_invalid_labels(#[case] raw: &str, #[case] expected: OrderMonthError) {
        assert_eq!(raw.parse::<OrderMonth>().unwrap_err(), expected);
    }

    #[test]
    fn deserializes_numbers_and_labels() {
        let from_number: OrderMonth = serde_json::from_str("7").unwrap();
        let from_label: OrderMonth = serde_json::from_str("\"7월분\"").unwrap();
        assert_eq!(from_number, from_label);
        assert!(serde_json::from_str::<OrderMonth>("\"July\"").is_err());
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "7");
    }

    #[test]
    fn shift_carries_across_year_boundaries() {
        let january = YearMonth::new(2025, OrderMonth::new(1).unwrap());
        assert_eq!(
            january.shift(-1),
            YearMonth::new(2024, OrderMonth::new(12).unwrap())
        );
        let december = YearMonth::new(2024, OrderMonth::new(12).unwrap());
        assert_eq!(
            december.shift(1),
            YearMonth::new(2025, OrderMonth::new(1).unwrap())
        );
        assert_eq!(december.shift(13).year, 2026);
    }

    #[test]
    fn rolling_window_spans_previous_to_next_month() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let window = YearMonth::rolling_window(today, 1, 1);
        let labels: Vec<(i32, u8)> = window.iter().map(|ym| (ym.year, ym.month.get())).collect();
        assert_eq!(labels, vec![(2024, 12), (2025, 1), (2025, 2)]);
    }

    #[test]
    fn reversed_range_is_empty() {
        let start = YearMonth::new(2025, OrderMonth::new(5).unwrap());
        let end = YearMonth::new(2025, OrderMonth::new(4).unwrap());
        assert!(YearMonth::range_inclusive(start, end).is_empty());
    }
}
