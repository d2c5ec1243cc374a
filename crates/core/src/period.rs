//! Period generation over a global date range.
//!
//! A [`PeriodGenerator`] slices a [`DateRange`] into sub-periods of a fixed
//! length that recur at a fixed frequency. The k-th period starts at
//! `range.start + k * frequency` (anchored on the range start, never on the
//! previous end), so a 7-month window can recur every year:
//!
//! ```
//! use geefetch_core::period::{DateRange, PeriodGenerator, PeriodSpec};
//!
//! let range = DateRange::parse("2017-04-01", "2021-12-01").unwrap();
//! let length: PeriodSpec = "7M".parse().unwrap();
//! let frequency: PeriodSpec = "Y".parse().unwrap();
//!
//! let periods: Vec<_> = PeriodGenerator::new(range, length, Some(frequency))
//!     .iter()
//!     .map(|p| p.label())
//!     .collect();
//! assert_eq!(periods[0], "2017-04-01_2017-11-01");
//! assert_eq!(periods.len(), 5);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate, Utc};

use crate::error::{Error, Result};

/// Date format used for parsing and for output labels.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Units and specs
// ---------------------------------------------------------------------------

/// Calendar unit of a [`PeriodSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl PeriodUnit {
    /// Parse a single unit letter (`d`, `w`, `m`, `y`, case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            'm' => Some(Self::Months),
            'y' => Some(Self::Years),
            _ => None,
        }
    }

    /// Canonical letter for this unit.
    pub fn symbol(&self) -> char {
        match self {
            Self::Days => 'd',
            Self::Weeks => 'w',
            Self::Months => 'M',
            Self::Years => 'Y',
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        };
        f.write_str(name)
    }
}

/// A positive calendar duration such as "7 months" or "1 year".
///
/// Parsed from compact strings: `7M`, `Y`, `2w`, `10d`. A bare unit letter
/// means a magnitude of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodSpec {
    magnitude: u32,
    unit: PeriodUnit,
}

impl PeriodSpec {
    /// Create a spec, rejecting a zero magnitude.
    pub fn new(magnitude: u32, unit: PeriodUnit) -> Result<Self> {
        if magnitude == 0 {
            return Err(Error::InvalidPeriod {
                value: format!("0{}", unit.symbol()),
                reason: "period must be positive".into(),
            });
        }
        Ok(Self { magnitude, unit })
    }

    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    pub fn unit(&self) -> PeriodUnit {
        self.unit
    }

    /// Advance `date` by `times` repetitions of this spec.
    ///
    /// Returns `None` when the result is not representable. Month and year
    /// arithmetic clamps to the last day of the month (Jan 31 + 1M = Feb 28).
    pub fn add_to(&self, date: NaiveDate, times: u32) -> Option<NaiveDate> {
        let n = self.magnitude.checked_mul(times)?;
        match self.unit {
            PeriodUnit::Days => date.checked_add_days(Days::new(u64::from(n))),
            PeriodUnit::Weeks => date.checked_add_days(Days::new(u64::from(n) * 7)),
            PeriodUnit::Months => date.checked_add_months(Months::new(n)),
            PeriodUnit::Years => date.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }

    /// Length in days, for day and week units.
    fn as_days(&self) -> Option<u64> {
        match self.unit {
            PeriodUnit::Days => Some(u64::from(self.magnitude)),
            PeriodUnit::Weeks => Some(u64::from(self.magnitude) * 7),
            _ => None,
        }
    }

    /// Length in months, for month and year units.
    fn as_months(&self) -> Option<u32> {
        match self.unit {
            PeriodUnit::Months => Some(self.magnitude),
            PeriodUnit::Years => self.magnitude.checked_mul(12),
            _ => None,
        }
    }
}

impl FromStr for PeriodSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |reason: String| Error::InvalidPeriod {
            value: s.to_string(),
            reason,
        };

        let unit_char = s
            .chars()
            .last()
            .ok_or_else(|| invalid("empty period".into()))?;
        let unit = PeriodUnit::from_char(unit_char).ok_or_else(|| {
            invalid(format!(
                "'{unit_char}' is not a period unit (use d, w, m or y)"
            ))
        })?;

        let digits = &s[..s.len() - unit_char.len_utf8()];
        let magnitude = if digits.is_empty() {
            1
        } else if digits.chars().all(|c| c.is_ascii_digit()) {
            digits
                .parse::<u32>()
                .map_err(|e| invalid(format!("'{digits}': {e}")))?
        } else {
            return Err(invalid(format!("'{digits}' is not a number")));
        };

        if magnitude == 0 {
            return Err(invalid("period must be positive".into()));
        }
        Ok(Self { magnitude, unit })
    }
}

impl fmt::Display for PeriodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.symbol())
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Parse an ISO date (`2021-12-01`), an RFC 3339 timestamp (date part kept)
/// or the literal `now` (today, UTC).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now().date_naive());
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|e| Error::InvalidDate {
            value: s.to_string(),
            reason: e.to_string(),
        })
}

/// Global date range, both bounds inclusive. Invariant: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds with [`parse_date`].
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// How a period's end date is computed from its start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndMode {
    /// `end = start + length`; the end day itself is not covered.
    #[default]
    Exclusive,
    /// `end = start + length - 1 day`; the end day is the last day covered.
    Inclusive,
}

/// One generated sub-range of a [`DateRange`].
///
/// A period cut short by the range end is *clipped*: its `end` is the range
/// end, which is then covered whatever the [`EndMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    mode: EndMode,
    clipped: bool,
}

impl Period {
    /// A period with an exclusive end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            mode: EndMode::Exclusive,
            clipped: false,
        }
    }

    pub fn end_mode(&self) -> EndMode {
        self.mode
    }

    /// Whether the range end cut this period short.
    pub fn is_clipped(&self) -> bool {
        self.clipped
    }

    /// First day *not* covered, for half-open remote date filters.
    pub fn exclusive_end(&self) -> NaiveDate {
        match (self.mode, self.clipped) {
            (EndMode::Exclusive, false) => self.end,
            _ => self.end.succ_opt().unwrap_or(self.end),
        }
    }

    /// `YYYY-MM-DD_YYYY-MM-DD`, used in export names.
    pub fn label(&self) -> String {
        format!(
            "{}_{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Immutable description of a period sequence. Iterate it as many times as
/// needed; every iteration yields the same periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodGenerator {
    range: DateRange,
    length: PeriodSpec,
    frequency: PeriodSpec,
    mode: EndMode,
}

impl PeriodGenerator {
    /// Create a generator. Without a frequency, periods are contiguous
    /// (frequency = length).
    pub fn new(range: DateRange, length: PeriodSpec, frequency: Option<PeriodSpec>) -> Self {
        Self {
            range,
            length,
            frequency: frequency.unwrap_or(length),
            mode: EndMode::default(),
        }
    }

    pub fn with_end_mode(mut self, mode: EndMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn length(&self) -> PeriodSpec {
        self.length
    }

    pub fn frequency(&self) -> PeriodSpec {
        self.frequency
    }

    /// End of the k-th period before clipping, starting at `start`.
    ///
    /// When length and frequency share a calendar family the end is computed
    /// from the range start, so `length == frequency` gives periods that
    /// touch exactly even across month-end clamping.
    fn raw_end(&self, start: NaiveDate, k: u32) -> Option<NaiveDate> {
        let anchor = self.range.start;
        if let (Some(f), Some(l)) = (self.frequency.as_months(), self.length.as_months()) {
            let months = f.checked_mul(k)?.checked_add(l)?;
            return anchor.checked_add_months(Months::new(months));
        }
        if let (Some(f), Some(l)) = (self.frequency.as_days(), self.length.as_days()) {
            let days = f.checked_mul(u64::from(k))?.checked_add(l)?;
            return anchor.checked_add_days(Days::new(days));
        }
        self.length.add_to(start, 1)
    }

    /// A fresh iterator starting at the first period.
    pub fn iter(&self) -> Periods {
        Periods {
            generator: *self,
            index: 0,
            done: false,
        }
    }
}

impl IntoIterator for &PeriodGenerator {
    type Item = Period;
    type IntoIter = Periods;

    fn into_iter(self) -> Periods {
        self.iter()
    }
}

/// Iterator over the periods of a [`PeriodGenerator`].
#[derive(Debug, Clone)]
pub struct Periods {
    generator: PeriodGenerator,
    index: u32,
    done: bool,
}

impl Iterator for Periods {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        if self.done {
            return None;
        }
        let g = &self.generator;

        let start = match g.frequency.add_to(g.range.start, self.index) {
            Some(start) if start <= g.range.end => start,
            _ => {
                self.done = true;
                return None;
            }
        };
        let k = self.index;
        match self.index.checked_add(1) {
            Some(next) => self.index = next,
            None => self.done = true,
        }

        let end = g.raw_end(start, k).map(|end| match g.mode {
            EndMode::Exclusive => end,
            EndMode::Inclusive => end.pred_opt().unwrap_or(start),
        });
        let (end, clipped) = match end {
            Some(end) if end <= g.range.end => (end, false),
            _ => (g.range.end, true),
        };

        Some(Period {
            start,
            end,
            mode: g.mode,
            clipped,
        })
    }
}

impl std::iter::FusedIterator for Periods {}

/// Parse CLI-style arguments and build the period iterator in one step.
///
/// `end` accepts `now`; `frequency` defaults to `size`.
pub fn iter_periods(
    start: &str,
    end: &str,
    size: &str,
    frequency: Option<&str>,
) -> Result<Periods> {
    let range = DateRange::parse(start, end)?;
    let length: PeriodSpec = size.parse()?;
    let frequency = frequency.map(str::parse::<PeriodSpec>).transpose()?;
    Ok(PeriodGenerator::new(range, length, frequency).iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn spec(s: &str) -> PeriodSpec {
        s.parse().unwrap()
    }

    #[test]
    fn seven_months_every_year() {
        let range = DateRange::new(d("2017-04-01"), d("2021-12-01")).unwrap();
        let periods: Vec<Period> = PeriodGenerator::new(range, spec("7M"), Some(spec("Y")))
            .iter()
            .collect();

        let expected: Vec<Period> = (2017..=2021)
            .map(|y| {
                Period::new(
                    NaiveDate::from_ymd_opt(y, 4, 1).unwrap(),
                    NaiveDate::from_ymd_opt(y, 11, 1).unwrap(),
                )
            })
            .collect();
        assert_eq!(periods, expected);
    }

    #[test]
    fn last_period_is_clipped() {
        let range = DateRange::new(d("2020-01-01"), d("2020-02-15")).unwrap();
        let periods: Vec<Period> = PeriodGenerator::new(range, spec("1M"), None)
            .iter()
            .collect();
        assert_eq!(
            periods.iter().map(|p| (p.start, p.end)).collect::<Vec<_>>(),
            vec![
                (d("2020-01-01"), d("2020-02-01")),
                (d("2020-02-01"), d("2020-02-15")),
            ]
        );
        assert!(!periods[0].is_clipped());
        assert_eq!(periods[0].exclusive_end(), d("2020-02-01"));
        // the range end day is still queried
        assert!(periods[1].is_clipped());
        assert_eq!(periods[1].exclusive_end(), d("2020-02-16"));
    }

    #[test]
    fn clipped_month_covers_last_day() {
        let range = DateRange::new(d("2020-01-01"), d("2020-01-31")).unwrap();
        let periods: Vec<Period> = PeriodGenerator::new(range, spec("1M"), None)
            .iter()
            .collect();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].label(), "2020-01-01_2020-01-31");
        assert_eq!(periods[0].exclusive_end(), d("2020-02-01"));
    }

    #[test]
    fn start_equal_to_end_yields_degenerate_period() {
        let range = DateRange::new(d("2020-01-01"), d("2020-01-01")).unwrap();
        let periods: Vec<Period> = PeriodGenerator::new(range, spec("1w"), None)
            .iter()
            .collect();
        assert_eq!(periods.len(), 1);
        assert_eq!((periods[0].start, periods[0].end), (d("2020-01-01"), d("2020-01-01")));
        assert_eq!(periods[0].exclusive_end(), d("2020-01-02"));
    }

    #[test]
    fn month_end_does_not_drift() {
        let range = DateRange::new(d("2021-01-31"), d("2021-04-30")).unwrap();
        let starts: Vec<NaiveDate> = PeriodGenerator::new(range, spec("1M"), None)
            .iter()
            .map(|p| p.start)
            .collect();
        assert_eq!(
            starts,
            vec![d("2021-01-31"), d("2021-02-28"), d("2021-03-31"), d("2021-04-30")]
        );
    }

    #[test]
    fn inclusive_end_mode() {
        let range = DateRange::new(d("2017-04-01"), d("2018-12-01")).unwrap();
        let periods: Vec<Period> = PeriodGenerator::new(range, spec("7M"), Some(spec("1Y")))
            .with_end_mode(EndMode::Inclusive)
            .iter()
            .collect();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].end, d("2017-10-31"));
        assert_eq!(periods[0].exclusive_end(), d("2017-11-01"));
        assert_eq!(periods[1].label(), "2018-04-01_2018-10-31");
    }

    #[test]
    fn iterating_twice_is_identical() {
        let range = DateRange::new(d("2019-03-10"), d("2020-07-02")).unwrap();
        let gen = PeriodGenerator::new(range, spec("10d"), Some(spec("3w")));
        let a: Vec<Period> = gen.iter().collect();
        let b: Vec<Period> = (&gen).into_iter().collect();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn parse_specs() {
        assert_eq!(spec("7M"), PeriodSpec::new(7, PeriodUnit::Months).unwrap());
        assert_eq!(spec("Y"), PeriodSpec::new(1, PeriodUnit::Years).unwrap());
        assert_eq!(spec("2w"), PeriodSpec::new(2, PeriodUnit::Weeks).unwrap());
        assert_eq!(spec(" 10d "), PeriodSpec::new(10, PeriodUnit::Days).unwrap());
        assert_eq!(spec("m").to_string(), "1M");
    }

    #[test]
    fn reject_bad_specs() {
        for bad in ["", "0M", "M7", "7", "x", "1.5M", "-3M", "7q"] {
            assert!(
                matches!(bad.parse::<PeriodSpec>(), Err(Error::InvalidPeriod { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(PeriodSpec::new(0, PeriodUnit::Days).is_err());
    }

    #[test]
    fn reject_reversed_range() {
        let err = DateRange::parse("2021-01-01", "2020-01-01").unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn parse_dates() {
        assert_eq!(parse_date("2021-12-01").unwrap(), d("2021-12-01"));
        assert_eq!(
            parse_date("2021-12-01T10:00:00Z").unwrap(),
            d("2021-12-01")
        );
        assert_eq!(parse_date("NOW").unwrap(), Utc::now().date_naive());
        assert!(matches!(
            parse_date("01/12/2021"),
            Err(Error::InvalidDate { .. })
        ));
    }

    #[test]
    fn iter_periods_defaults_frequency_to_size() {
        let labels: Vec<String> = iter_periods("2020-01-01", "2020-03-01", "1M", None)
            .unwrap()
            .map(|p| p.label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "2020-01-01_2020-02-01",
                "2020-02-01_2020-03-01",
                "2020-03-01_2020-03-01",
            ]
        );
    }

    #[test]
    fn iter_periods_rejects_zero_size() {
        assert!(iter_periods("2020-01-01", "2020-03-01", "0M", None).is_err());
        assert!(iter_periods("2020-01-01", "2020-03-01", "1M", Some("0Y")).is_err());
    }
}
