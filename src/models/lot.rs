//! Lot-string codec.
//!
//! Schedules carry their order quantity as a display string such as `"50/100"`
//! (a 50-unit batch of a 100-unit order) or `"100"` (the whole order in one
//! batch). The database stores the two numbers separately.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A batch quantity and the total order quantity it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct LotQuantity {
    pub batch: i32,
    pub total: i32,
}

impl LotQuantity {
    pub fn new(batch: i32, total: i32) -> Self {
        Self { batch, total }
    }

    /// Parses `"batch/total"` or `"batch"`.
    ///
    /// Never fails: any non-numeric part collapses the whole value to `(0, 0)`.
    /// A missing or empty total means the batch is the whole order.
    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or_default()
    }

    fn try_parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('/');
        let head = parts.next().unwrap_or("").trim();
        let batch = if head.is_empty() {
            0
        } else {
            head.parse::<i32>().ok()?
        };

        let total = match parts.next().map(str::trim) {
            Some(tail) if !tail.is_empty() => tail.parse::<i32>().ok()?,
            _ => batch,
        };

        Some(Self { batch, total })
    }

    /// Renders the display form; the `/total` suffix only appears for a partial batch.
    pub fn format(&self) -> String {
        if self.total > 0 && self.total != self.batch {
            format!("{}/{}", self.batch, self.total)
        } else {
            self.batch.to_string()
        }
    }
}

impl fmt::Display for LotQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl From<&str> for LotQuantity {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Parses a committed lot size such as `"1,200"`; unparseable input counts as zero.
pub fn parse_committed_lot(raw: &str) -> i64 {
    raw.replace(',', "").trim().parse::<i64>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("50/100", 50, 100)]
    #[case("50", 50, 50)]
    #[case("", 0, 0)]
    #[case("abc/100", 0, 0)]
    #[case("50/abc", 0, 0)]
    #[case(" 40 / 120 ", 40, 120)]
    #[case("50/", 50, 50)]
    #[case("/100", 0, 100)]
    fn parses_display_strings(#[case] raw: &str, #[case] batch: i32, #[case] total: i32) {
        assert_eq!(LotQuantity::parse(raw), LotQuantity::new(batch, total));
    }

    #[rstest]
    #[case(50, 100, "50/100")]
    #[case(100, 100, "100")]
    #[case(70, 0, "70")]
    #[case(0, 0, "0")]
    fn formats_display_strings(#[case] batch: i32, #[case] total: i32, #[case] expected: &str) {
        assert_eq!(LotQuantity::new(batch, total).format(), expected);
    }

    #[test]
    fn committed_lot_strips_thousands_separators() {
        assert_eq!(parse_committed_lot("1,200"), 1200);
        assert_eq!(parse_committed_lot(" 300 "), 300);
        assert_eq!(parse_committed_lot("n/a"), 0);
    }

    proptest! {
        #[test]
        fn format_then_parse_is_identity_for_partial_batches(batch in 0i32..1_000_000, extra in 1i32..1_000_000) {
            let lot = LotQuantity::new(batch, batch + extra);
            prop_assert_eq!(LotQuantity::parse(&lot.format()), lot);
        }

        #[test]
        fn format_then_parse_is_identity_for_whole_orders(batch in 0i32..1_000_000) {
            let lot = LotQuantity::new(batch, batch);
            prop_assert_eq!(LotQuantity::parse(&lot.format()), lot);
        }

        #[test]
        fn parse_never_panics(raw in ".*") {
            let _ = LotQuantity::parse(&raw);
        }
    }
}
