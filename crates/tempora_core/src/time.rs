//! Timestamps for TEMPORA.
//!
//! A timestamp is kept as the string the log carries. Ordering is plain
//! lexicographic string comparison; the accepted format (fixed-width,
//! zero-padded, UTC) is what makes that coincide with chronological order.
//! Parsing is only used to check conformance, never to reorder.

use crate::error::{CoreError, CoreResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Longest accepted layout. `0` marks a digit; every other byte is literal.
///
/// Conformant timestamps are prefixes of this template ending at one of
/// [`LAYOUT_LENGTHS`], so comparing two of them byte by byte compares digits
/// of equal weight.
const TEMPLATE: &[u8; 20] = b"0000-00-00T00:00:00Z";

/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM:SSZ`
const LAYOUT_LENGTHS: [usize; 4] = [10, 16, 19, 20];

/// Suffix convention of a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampStyle {
    /// Ends in `Z`
    Zulu,
    /// No zone designator (dates and naive date-times)
    Naive,
}

impl std::fmt::Display for TimestampStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zulu => f.write_str("Z-suffixed"),
            Self::Naive => f.write_str("naive"),
        }
    }
}

/// Sortable ISO-8601 timestamp string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Wrap a timestamp string without checking it.
    ///
    /// Events arrive already parsed; conformance is the validator's job.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Wrap a timestamp string, rejecting non-conformant input
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTimestamp` if the string is not a conformant timestamp
    pub fn parse(value: impl Into<String>) -> CoreResult<Self> {
        let ts = Self(value.into());
        ts.check()?;
        Ok(ts)
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Zone convention, judged by the trailing `Z`
    #[must_use]
    pub fn style(&self) -> TimestampStyle {
        if self.0.ends_with('Z') {
            TimestampStyle::Zulu
        } else {
            TimestampStyle::Naive
        }
    }

    /// Check that this timestamp is conformant.
    ///
    /// Accepted: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS` and
    /// `YYYY-MM-DDTHH:MM:SSZ`, with an uppercase `T` and a calendar-valid
    /// date and time. Fractional seconds, offsets and other separators are
    /// rejected because they do not sort byte-wise against these forms.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTimestamp` describing the first problem found
    pub fn check(&self) -> CoreResult<()> {
        let s = self.0.as_str();
        let bytes = s.as_bytes();

        if !LAYOUT_LENGTHS.contains(&bytes.len()) {
            return Err(invalid(format!(
                "{:?} is not YYYY-MM-DD[THH:MM[:SS[Z]]] (UTC, no fractions or offsets)",
                s
            )));
        }

        for (pos, (&byte, &expected)) in bytes.iter().zip(TEMPLATE.iter()).enumerate() {
            let ok = if expected == b'0' {
                byte.is_ascii_digit()
            } else {
                byte == expected
            };
            if !ok {
                return Err(invalid(format!(
                    "{:?}: unexpected {:?} at byte {}, expected {}",
                    s,
                    char::from(byte),
                    pos,
                    if expected == b'0' {
                        "a digit".to_string()
                    } else {
                        format!("{:?}", char::from(expected))
                    }
                )));
            }
        }

        // Layout is pure ASCII from here, so byte slicing is on char boundaries.
        let calendar = match bytes.len() {
            10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|_| ()),
            16 => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").map(|_| ()),
            _ => NaiveDateTime::parse_from_str(&s[..19], "%Y-%m-%dT%H:%M:%S").map(|_| ()),
        };
        calendar.map_err(|e| invalid(format!("{:?}: {}", s, e)))
    }
}

fn invalid(reason: String) -> CoreError {
    CoreError::InvalidTimestamp { reason }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;

    #[test]
    fn test_timestamp_ord_is_lexicographic() {
        let t1 = Timestamp::new("2024-01-01T00:00:00Z");
        let t2 = Timestamp::new("2024-03-15T10:30:00Z");
        let t3 = Timestamp::new("2024-03-15T10:30:00Z");

        assert!(t1 < t2);
        assert_eq!(t2, t3);
    }

    fn conformant(s: &str) -> bool {
        Timestamp::new(s).check().is_ok()
    }

    #[test]
    fn test_check_accepts_fixed_layouts() {
        for s in [
            "2024-01-01",
            "2024-03-15T10:30",
            "2024-03-15T10:30:00",
            "2024-01-01T00:00:00Z",
            "2024-12-31T23:59:59Z",
        ] {
            assert!(conformant(s), "rejected {}", s);
        }
    }

    #[test]
    fn test_check_rejects_garbage() {
        for s in ["", "yesterday", "2024-1-1", "2024-13-01", "2024-02-30", "2024-01-01T25:00:00Z"] {
            assert!(!conformant(s), "accepted {}", s);
        }
    }

    #[test]
    fn test_check_rejects_layouts_that_misorder() {
        // Each of these sorts against the canonical form by byte value rather
        // than by time.
        for s in [
            "2024-01-01T00:00:00.500Z",
            "2024-01-01T00:00:00.5",
            "2024-01-01 12:00:00",
            "2024-01-01t12:00:00z",
            "2024-01-01T12:00:00z",
            "2024-01-01T12:00:00+00:00",
            "2024-01-01T10",
            "+2024-01-01",
        ] {
            assert!(!conformant(s), "accepted {}", s);
        }
    }

    #[test]
    fn test_check_rejects_non_utc_offset() {
        let err = Timestamp::new("2024-03-15T10:30:00+05:00").check().unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimestamp { .. }));
        assert!(err.to_string().contains("UTC"));
    }

    #[test]
    fn test_check_names_offending_byte() {
        let err = Timestamp::new("2024-01-01 12:00:00").check().unwrap_err();
        assert!(err.to_string().contains("at byte 10"), "{}", err);
    }

    #[test]
    fn test_style() {
        assert_eq!(Timestamp::new("2024-01-01T00:00:00Z").style(), TimestampStyle::Zulu);
        assert_eq!(Timestamp::new("2024-01-01T00:00:00").style(), TimestampStyle::Naive);
        assert_eq!(Timestamp::new("2024-01-01").style(), TimestampStyle::Naive);
    }

    #[test]
    fn test_parse_and_from_str() {
        let ts: Timestamp = "2024-06-01T09:00:00Z".parse().unwrap();
        assert_eq!(ts.as_str(), "2024-06-01T09:00:00Z");
        assert!(Timestamp::parse("not-a-time").is_err());
    }

    proptest! {
        #[test]
        fn prop_string_order_matches_time_order(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
            let fmt = |secs: i64| {
                DateTime::from_timestamp(secs, 0)
                    .unwrap()
                    .format("%Y-%m-%dT%H:%M:%SZ")
                    .to_string()
            };
            let ta = Timestamp::parse(fmt(a)).unwrap();
            let tb = Timestamp::parse(fmt(b)).unwrap();
            prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
        }

        #[test]
        fn prop_mixed_layouts_never_invert_time(
            a in 0i64..4_000_000_000,
            b in 0i64..4_000_000_000,
            la in 0usize..4,
            lb in 0usize..4
        ) {
            // A shorter layout truncates toward the start of its day/minute,
            // so string order may only break ties between equal truncations.
            let render = |secs: i64, layout: usize| {
                let dt = DateTime::from_timestamp(secs, 0).unwrap();
                let fmt = ["%Y-%m-%d", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"][layout];
                let text = dt.format(fmt).to_string();
                let floor = match layout {
                    0 => secs - secs.rem_euclid(86_400),
                    1 => secs - secs.rem_euclid(60),
                    _ => secs,
                };
                (Timestamp::parse(text).unwrap(), floor)
            };
            let (ta, fa) = render(a, la);
            let (tb, fb) = render(b, lb);
            if fa < fb {
                prop_assert!(ta < tb);
            } else if fa > fb {
                prop_assert!(ta > tb);
            }
        }
    }
}
