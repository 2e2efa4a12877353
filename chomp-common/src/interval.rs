//! The enumerated cadence grammar of spec.md §3/§6: a single letter unit
//! (`s`, `m`, `h`, `D`, `W`, `M`, `Y`) followed by a magnitude, each unit
//! bounded to the range spec.md's interval table allows. Grounded on
//! `src/utils/date.py`'s `CRON_BY_TF`/`SEC_BY_TF` tables in
//! `examples/original_source`, generalized into a formula rather than a
//! fixed lookup since the tables are themselves just a cached
//! materialization of `(unit, n) -> seconds`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("invalid interval token: {0}")]
    InvalidToken(String),
    #[error("unsupported interval unit: {0}")]
    UnsupportedUnit(char),
    #[error("interval magnitude {n} out of range for unit {unit} (allowed 1..={max})")]
    OutOfRange { unit: char, n: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn letter(self) -> char {
        match self {
            Unit::Second => 's',
            Unit::Minute => 'm',
            Unit::Hour => 'h',
            Unit::Day => 'D',
            Unit::Week => 'W',
            Unit::Month => 'M',
            Unit::Year => 'Y',
        }
    }

    fn from_letter(c: char) -> Result<Unit, IntervalError> {
        match c {
            's' => Ok(Unit::Second),
            'm' => Ok(Unit::Minute),
            'h' => Ok(Unit::Hour),
            'D' => Ok(Unit::Day),
            'W' => Ok(Unit::Week),
            'M' => Ok(Unit::Month),
            'Y' => Ok(Unit::Year),
            other => Err(IntervalError::UnsupportedUnit(other)),
        }
    }

    /// Maximum magnitude allowed for this unit, per spec.md §6's exhaustive table.
    fn max_n(self) -> u32 {
        match self {
            Unit::Second => 30,
            Unit::Minute => 30,
            Unit::Hour => 12,
            Unit::Day => 3,
            Unit::Week => 2,
            Unit::Month => 6,
            Unit::Year => 3,
        }
    }

    /// Whether this unit's cadence is driven by a plain fixed-duration tick
    /// (seconds/minutes/hours) or by a wall-clock boundary (day-and-coarser).
    fn is_fixed_duration(self) -> bool {
        matches!(self, Unit::Second | Unit::Minute | Unit::Hour)
    }
}

/// A parsed interval token, e.g. `m5`, `h1`, `D3`, `Y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    unit: Unit,
    n: u32,
}

impl Interval {
    pub fn new(unit: Unit, n: u32) -> Result<Self, IntervalError> {
        let max = unit.max_n();
        if n == 0 || n > max {
            return Err(IntervalError::OutOfRange {
                unit: unit.letter(),
                n,
                max,
            });
        }
        Ok(Interval { unit, n })
    }

    pub fn unit(self) -> Unit {
        self.unit
    }

    pub fn magnitude(self) -> u32 {
        self.n
    }

    /// Approximate seconds for this interval, used for claim TTLs and
    /// fixed-duration scheduling. Matches `interval_to_seconds` in
    /// `src/utils/date.py` for the `raw=True` sub-week cases; month/year use
    /// the calendar-based approximation the source also falls back to.
    pub fn seconds(self) -> u64 {
        let secs_per_unit: u64 = match self.unit {
            Unit::Second => 1,
            Unit::Minute => 60,
            Unit::Hour => 3_600,
            Unit::Day => 86_400,
            Unit::Week => 604_800,
            Unit::Month => 2_592_000,  // 30-day month, matches MONTH_SECONDS
            Unit::Year => 31_540_000, // matches YEAR_SECONDS
        };
        secs_per_unit * self.n as u64
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(self.seconds())
    }

    pub fn is_fixed_duration(self) -> bool {
        self.unit.is_fixed_duration()
    }

    /// Equivalent cron expression, matching `CRON_BY_TF` in the source for
    /// documentation/diagnostics purposes (the scheduler itself drives ticks
    /// directly rather than parsing this string back).
    pub fn to_cron(self) -> String {
        match self.unit {
            Unit::Second => format!("* * * * * */{}", self.n),
            Unit::Minute => format!("*/{} * * * *", self.n),
            Unit::Hour => format!("0 */{} * * *", self.n),
            Unit::Day => format!("0 0 */{} * *", self.n),
            Unit::Week => {
                if self.n == 1 {
                    "0 0 * * 0".to_string()
                } else {
                    "0 0 * * 0/2".to_string()
                }
            }
            Unit::Month => format!("0 0 1 */{} *", self.n),
            Unit::Year => format!("0 0 1 1 */{}", self.n),
        }
    }

    /// Next wall-clock boundary strictly after `from`, for Day/Week/Month/Year
    /// cadences where a fixed-duration tick does not line up with calendar
    /// semantics (spec.md §4.7, §6).
    pub fn next_boundary_after(self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self.unit {
            Unit::Day => {
                let midnight = from
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("valid midnight");
                let midnight = Utc.from_utc_datetime(&midnight);
                let mut next = midnight + chrono::Duration::days(self.n as i64);
                while next <= from {
                    next += chrono::Duration::days(self.n as i64);
                }
                next
            }
            Unit::Week => {
                let days_since_sunday = from.weekday().num_days_from_sunday() as i64;
                let midnight = from
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("valid midnight");
                let this_sunday = Utc.from_utc_datetime(&midnight) - chrono::Duration::days(days_since_sunday);
                let mut next = this_sunday + chrono::Duration::weeks(self.n as i64);
                while next <= from {
                    next += chrono::Duration::weeks(self.n as i64);
                }
                next
            }
            Unit::Month => {
                let mut year = from.year();
                let mut month = from.month();
                loop {
                    month += self.n;
                    while month > 12 {
                        month -= 12;
                        year += 1;
                    }
                    if let Some(candidate) = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single() {
                        if candidate > from {
                            return candidate;
                        }
                    }
                }
            }
            Unit::Year => {
                let mut year = from.year() + self.n as i32;
                loop {
                    if let Some(candidate) = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single() {
                        if candidate > from {
                            return candidate;
                        }
                    }
                    year += self.n as i32;
                }
            }
            _ => from + self.duration(),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.unit.letter(), self.n)
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let unit_char = chars.next().ok_or_else(|| IntervalError::InvalidToken(s.to_string()))?;
        let digits: String = chars.collect();
        if digits.is_empty() {
            return Err(IntervalError::InvalidToken(s.to_string()));
        }
        let n: u32 = digits
            .parse()
            .map_err(|_| IntervalError::InvalidToken(s.to_string()))?;
        let unit = Unit::from_letter(unit_char)?;
        Interval::new(unit, n)
    }
}

impl serde::Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_documented_unit() {
        assert_eq!("s1".parse::<Interval>().unwrap().seconds(), 1);
        assert_eq!("m30".parse::<Interval>().unwrap().seconds(), 1800);
        assert_eq!("h12".parse::<Interval>().unwrap().seconds(), 43_200);
        assert_eq!("D3".parse::<Interval>().unwrap().seconds(), 259_200);
        assert_eq!("W2".parse::<Interval>().unwrap().seconds(), 1_209_600);
        assert_eq!("Y1".parse::<Interval>().unwrap().unit(), Unit::Year);
    }

    #[test]
    fn rejects_out_of_range_magnitude() {
        assert!(matches!(
            "s31".parse::<Interval>(),
            Err(IntervalError::OutOfRange { .. })
        ));
        assert!(matches!(
            "h13".parse::<Interval>(),
            Err(IntervalError::OutOfRange { .. })
        ));
        assert!(matches!("Y4".parse::<Interval>(), Err(IntervalError::OutOfRange { .. })));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(matches!(
            "x5".parse::<Interval>(),
            Err(IntervalError::UnsupportedUnit('x'))
        ));
    }

    #[test]
    fn round_trips_display_and_parse() {
        for s in ["s30", "m1", "h6", "D1", "W1", "M3", "Y2"] {
            let parsed: Interval = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn monotone_over_ordered_enum() {
        // P6: interval_to_seconds(...) is monotone within a unit.
        let a: Interval = "m5".parse().unwrap();
        let b: Interval = "m10".parse().unwrap();
        assert!(a.seconds() < b.seconds());
    }

    #[test]
    fn next_day_boundary_is_midnight_utc() {
        let interval: Interval = "D1".parse().unwrap();
        let from = Utc.with_ymd_and_hms(2026, 8, 1, 13, 30, 0).unwrap();
        let next = interval.next_boundary_after(from);
        assert_eq!(next.hour(), 0);
        assert_eq!(next.minute(), 0);
        assert!(next > from);
    }
}
