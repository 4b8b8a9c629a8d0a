//! Logical TTL specifications.
//!
//! A [`CacheDuration`] is the string form a configuration file or a segment
//! uses to say how long something may be cached. It normalizes to a whole
//! number of seconds, with two sentinels:
//!
//! - `"none"` (and the empty tag) means "do not cache" and yields `0`
//! - `"infinite"` means "never expire" and yields `-1`
//!
//! Everything else is parsed as a duration expression such as `"24h"`,
//! `"1h30m"` or `"1.5s"`. Anything that fails to parse behaves like `"none"`.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// A string-encoded TTL that normalizes to seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheDuration(Cow<'static, str>);

impl CacheDuration {
    /// Do not cache at all.
    pub const NONE: CacheDuration = CacheDuration(Cow::Borrowed("none"));
    /// Cache for the lifetime of the backing file.
    pub const INFINITE: CacheDuration = CacheDuration(Cow::Borrowed("infinite"));
    pub const ONE_MINUTE: CacheDuration = CacheDuration(Cow::Borrowed("1m"));
    pub const FIVE_MINUTES: CacheDuration = CacheDuration(Cow::Borrowed("5m"));
    pub const ONE_HOUR: CacheDuration = CacheDuration(Cow::Borrowed("1h"));
    pub const ONE_DAY: CacheDuration = CacheDuration(Cow::Borrowed("24h"));
    pub const ONE_WEEK: CacheDuration = CacheDuration(Cow::Borrowed("168h"));
    pub const ONE_YEAR: CacheDuration = CacheDuration(Cow::Borrowed("8760h"));

    /// Create a duration from an arbitrary tag.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    /// Create a duration of a whole number of seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(Cow::Owned(format!("{secs}s")))
    }

    /// The raw tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag itself is empty ("not configured").
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of seconds this duration stands for.
    ///
    /// Returns `-1` for `"infinite"` and `0` for `"none"`, the empty tag and
    /// anything that does not parse. Negative expressions keep their sign,
    /// truncated toward zero like positive ones.
    pub fn seconds(&self) -> i64 {
        match self.0.as_ref() {
            "infinite" => -1,
            "" | "none" => 0,
            other => parse_seconds(other).unwrap_or(0),
        }
    }
}

impl Default for CacheDuration {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for CacheDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for CacheDuration {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for CacheDuration {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

impl From<std::time::Duration> for CacheDuration {
    fn from(d: std::time::Duration) -> Self {
        Self::from_secs(d.as_secs())
    }
}

/// Parse a duration expression (`[+-]?(<number><unit>)+` or a bare `0`)
/// into whole seconds, truncating sub-second remainders.
fn parse_seconds(input: &str) -> Option<i64> {
    let (negative, mut rest) = match input.as_bytes().first()? {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Some(0);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return None;
        }
        let value: f64 = number.parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = unit_nanos(&rest[..unit_len])?;
        rest = &rest[unit_len..];

        total_nanos += value * scale;
    }

    let seconds = (total_nanos / NANOS_PER_SECOND).trunc();
    if !seconds.is_finite() || seconds > i64::MAX as f64 {
        return None;
    }
    let seconds = seconds as i64;
    Some(if negative { -seconds } else { seconds })
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "\u{00b5}s" | "\u{03bc}s" => 1_000.0,
        "ms" => 1_000_000.0,
        "s" => NANOS_PER_SECOND,
        "m" => 60.0 * NANOS_PER_SECOND,
        "h" => 3_600.0 * NANOS_PER_SECOND,
        _ => return None,
    };
    Some(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert_eq!(CacheDuration::NONE.seconds(), 0);
        assert_eq!(CacheDuration::new("").seconds(), 0);
        assert_eq!(CacheDuration::INFINITE.seconds(), -1);
    }

    #[test]
    fn test_standard_expressions() {
        assert_eq!(CacheDuration::ONE_DAY.seconds(), 86_400);
        assert_eq!(CacheDuration::new("2s").seconds(), 2);
        assert_eq!(CacheDuration::new("1h30m").seconds(), 5_400);
        assert_eq!(CacheDuration::new("1.5h").seconds(), 5_400);
        assert_eq!(CacheDuration::ONE_WEEK.seconds(), 604_800);
        assert_eq!(CacheDuration::new("0").seconds(), 0);
        assert_eq!(CacheDuration::new("+10s").seconds(), 10);
    }

    #[test]
    fn test_sub_second_truncates_to_zero() {
        assert_eq!(CacheDuration::new("300ms").seconds(), 0);
        assert_eq!(CacheDuration::new("1500ms").seconds(), 1);
        assert_eq!(CacheDuration::new("999999us").seconds(), 0);
    }

    #[test]
    fn test_unparsable_degrades_to_none() {
        for tag in ["bogus", "24", "h", "1.2.3s", "5 m", "10x", ".s", "-", "1h-"] {
            assert_eq!(CacheDuration::new(tag).seconds(), 0, "tag {tag:?}");
        }
    }

    #[test]
    fn test_negative_durations_keep_their_sign() {
        assert_eq!(CacheDuration::new("-5m").seconds(), -300);
        assert_eq!(CacheDuration::new("-1h30m").seconds(), -5_400);
        assert_eq!(CacheDuration::new("-1500ms").seconds(), -1);
        assert_eq!(CacheDuration::new("-0").seconds(), 0);
        assert_eq!(CacheDuration::new("-300ms").seconds(), 0);
    }

    #[test]
    fn test_is_empty_distinguishes_unset_from_none() {
        assert!(CacheDuration::new("").is_empty());
        assert!(!CacheDuration::NONE.is_empty());
    }

    #[test]
    fn test_from_std_duration() {
        let d = CacheDuration::from(std::time::Duration::from_secs(90));
        assert_eq!(d.as_str(), "90s");
        assert_eq!(d.seconds(), 90);
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&CacheDuration::ONE_DAY).unwrap();
        assert_eq!(json, "\"24h\"");
        let back: CacheDuration = serde_json::from_str("\"infinite\"").unwrap();
        assert_eq!(back.seconds(), -1);
    }
}
