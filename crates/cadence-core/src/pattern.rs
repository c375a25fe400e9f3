//! Repetition-pattern algebra: parses textual patterns and computes the
//! next UTC instant strictly after a reference instant.
//!
//! Three shapes are recognized by segment count: interval (`N.unit`),
//! weekday (`wdays.HH.MM.SS`), and month/day (`months.days.HH.MM.SS`).
//! A `Pattern` is immutable once parsed; `next()` is pure.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::{Error, Result};

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Upper bound on the day-advance loop in `next_monthday`/`next_weekday`.
/// A parsed pattern can name a month/day combination that never occurs
/// (e.g. `2.31` — February never has 31 days); this stops the search
/// rather than looping forever.
const MAX_DAY_PROBES: i64 = 4 * 366;

fn weekday_index(name: &str) -> Option<usize> {
    WEEKDAY_NAMES.iter().position(|w| w.eq_ignore_ascii_case(name))
}

fn chrono_weekday_index(w: chrono::Weekday) -> usize {
    w.num_days_from_sunday() as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl Unit {
    fn as_str(&self) -> &'static str {
        match self {
            Unit::Seconds => "seconds",
            Unit::Minutes => "minutes",
            Unit::Hours => "hours",
            Unit::Days => "days",
            Unit::Weeks => "weeks",
            Unit::Months => "months",
        }
    }

    fn parse(s: &str) -> Option<Unit> {
        match s {
            "seconds" => Some(Unit::Seconds),
            "minutes" => Some(Unit::Minutes),
            "hours" => Some(Unit::Hours),
            "days" => Some(Unit::Days),
            "weeks" => Some(Unit::Weeks),
            "months" => Some(Unit::Months),
            _ => None,
        }
    }
}

/// One of the three recognized repetition shapes.
///
/// Day/month sets store `None` for `**` (any) and `Some(indices)` for an
/// explicit `|`-separated list, in the order given on input — canonicalization
/// preserves input order and only normalizes case, per the chosen policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Interval {
        n: u32,
        unit: Unit,
    },
    Weekday {
        days: Option<Vec<usize>>,
        h: u32,
        m: u32,
        s: u32,
    },
    MonthDay {
        months: Option<Vec<u32>>,
        days: Option<Vec<u32>>,
        h: u32,
        m: u32,
        s: u32,
    },
}

impl Pattern {
    pub fn parse(text: &str) -> Result<Pattern> {
        let segments: Vec<&str> = text.split('.').collect();
        match segments.len() {
            2 => Self::parse_interval(&segments),
            3 => Err(Error::Parse(format!(
                "pattern '{}' has exactly three segments, which is ambiguous",
                text
            ))),
            4 => Self::parse_weekday(&segments),
            5 => Self::parse_monthday(&segments),
            _ => Err(Error::Parse(format!("unrecognized pattern shape: '{}'", text))),
        }
    }

    fn parse_interval(segments: &[&str]) -> Result<Pattern> {
        let n: u32 = segments[0].parse().map_err(|_| {
            Error::Parse(format!(
                "interval count '{}' is not a positive integer",
                segments[0]
            ))
        })?;
        if n == 0 {
            return Err(Error::Parse("interval count must be positive".to_string()));
        }
        let unit = Unit::parse(segments[1])
            .ok_or_else(|| Error::Parse(format!("unknown interval unit '{}'", segments[1])))?;
        Ok(Pattern::Interval { n, unit })
    }

    fn parse_weekday(segments: &[&str]) -> Result<Pattern> {
        let days = parse_weekday_set(segments[0])?;
        let (h, m, s) = parse_hms(segments[1], segments[2], segments[3])?;
        Ok(Pattern::Weekday { days, h, m, s })
    }

    fn parse_monthday(segments: &[&str]) -> Result<Pattern> {
        let months = parse_numeric_set(segments[0], 1, 12)?;
        let days = parse_numeric_set(segments[1], 1, 31)?;
        let (h, m, s) = parse_hms(segments[2], segments[3], segments[4])?;
        Ok(Pattern::MonthDay { months, days, h, m, s })
    }

    /// Computes the next UTC instant strictly after `now`.
    pub fn next(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Pattern::Interval { n, unit } => next_interval(now, *n, *unit),
            Pattern::Weekday { days, h, m, s } => next_weekday(now, days.as_deref(), *h, *m, *s),
            Pattern::MonthDay { months, days, h, m, s } => {
                next_monthday(now, months.as_deref(), days.as_deref(), *h, *m, *s)
            }
        }
    }

    /// Canonical round-trip text, exactly what is stored in `task_due.repeats`.
    pub fn value(&self) -> String {
        match self {
            Pattern::Interval { n, unit } => format!("{}.{}", n, unit.as_str()),
            Pattern::Weekday { days, h, m, s } => {
                let wdays = render_set(days, |i| WEEKDAY_NAMES[*i].to_string());
                format!("{}.{:02}.{:02}.{:02}", wdays, h, m, s)
            }
            Pattern::MonthDay { months, days, h, m, s } => {
                let months_s = render_set(months, |n| n.to_string());
                let days_s = render_set(days, |n| n.to_string());
                format!("{}.{}.{:02}.{:02}.{:02}", months_s, days_s, h, m, s)
            }
        }
    }
}

fn render_set<T>(set: &Option<Vec<T>>, show: impl Fn(&T) -> String) -> String {
    match set {
        None => "**".to_string(),
        Some(values) => values.iter().map(show).collect::<Vec<_>>().join("|"),
    }
}

impl std::str::FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

fn parse_weekday_set(segment: &str) -> Result<Option<Vec<usize>>> {
    if segment == "**" {
        return Ok(None);
    }
    let mut out = Vec::new();
    for name in segment.split('|') {
        let idx =
            weekday_index(name).ok_or_else(|| Error::Parse(format!("unknown weekday name '{}'", name)))?;
        out.push(idx);
    }
    if out.is_empty() {
        return Err(Error::Parse(
            "weekday pattern requires at least one day value".to_string(),
        ));
    }
    Ok(Some(out))
}

fn parse_numeric_set(segment: &str, min: u32, max: u32) -> Result<Option<Vec<u32>>> {
    if segment == "**" {
        return Ok(None);
    }
    let mut out = Vec::new();
    for part in segment.split('|') {
        let n: u32 = part
            .parse()
            .map_err(|_| Error::Parse(format!("'{}' is not a valid number", part)))?;
        if n < min || n > max {
            return Err(Error::Parse(format!(
                "'{}' is out of range [{}, {}]",
                n, min, max
            )));
        }
        out.push(n);
    }
    if out.is_empty() {
        return Err(Error::Parse(
            "month/day pattern requires at least one day value".to_string(),
        ));
    }
    Ok(Some(out))
}

fn parse_hms(h: &str, m: &str, s: &str) -> Result<(u32, u32, u32)> {
    Ok((parse_bounded(h, 0, 23)?, parse_bounded(m, 0, 59)?, parse_bounded(s, 0, 59)?))
}

fn parse_bounded(segment: &str, min: u32, max: u32) -> Result<u32> {
    if segment == "**" {
        return Err(Error::Parse(
            "time-of-day fields must be numeric, not '**'".to_string(),
        ));
    }
    let n: u32 = segment
        .parse()
        .map_err(|_| Error::Parse(format!("'{}' is not a valid number", segment)))?;
    if n < min || n > max {
        return Err(Error::Parse(format!(
            "'{}' is out of range [{}, {}]",
            n, min, max
        )));
    }
    Ok(n)
}

fn at_time(now: DateTime<Utc>, h: u32, m: u32, s: u32) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(h, m, s)
        .expect("h/m/s validated in range at parse time")
        .and_utc()
}

fn next_interval(now: DateTime<Utc>, n: u32, unit: Unit) -> DateTime<Utc> {
    match unit {
        Unit::Seconds => now + Duration::seconds(n as i64),
        Unit::Minutes => now + Duration::minutes(n as i64),
        Unit::Hours => now + Duration::hours(n as i64),
        Unit::Days => now + Duration::days(n as i64),
        Unit::Weeks => now + Duration::weeks(n as i64),
        Unit::Months => add_months(now, n),
    }
}

fn add_months(now: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    // `n` is a `u32` and can exceed `i32::MAX`; do the month-count arithmetic
    // in `i64` so a large-but-valid interval can't wrap sign. The resulting
    // year is then clamped to what `NaiveDate` can represent at all, since a
    // multi-billion-month interval names a year no calendar type holds.
    let total: i64 = now.year() as i64 * 12 + now.month0() as i64 + n as i64;
    let year = total
        .div_euclid(12)
        .clamp(chrono::NaiveDate::MIN.year() as i64, chrono::NaiveDate::MAX.year() as i64) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    let mut day = now.day();
    loop {
        if let Some(date) = chrono::NaiveDate::from_ymd_opt(year, month, day) {
            return date
                .and_hms_opt(now.hour(), now.minute(), now.second())
                .expect("time copied from a valid instant")
                .and_utc();
        }
        day -= 1;
    }
}

fn next_weekday(now: DateTime<Utc>, allowed: Option<&[usize]>, h: u32, m: u32, s: u32) -> DateTime<Utc> {
    let mut candidate = at_time(now, h, m, s);
    for _ in 0..MAX_DAY_PROBES {
        let matches_day = allowed
            .map(|set| set.contains(&chrono_weekday_index(candidate.weekday())))
            .unwrap_or(true);
        if candidate > now && matches_day {
            return candidate;
        }
        candidate += Duration::days(1);
    }
    panic!("weekday pattern never matches within {} days", MAX_DAY_PROBES);
}

fn next_monthday(
    now: DateTime<Utc>,
    months: Option<&[u32]>,
    days: Option<&[u32]>,
    h: u32,
    m: u32,
    s: u32,
) -> DateTime<Utc> {
    let mut candidate = at_time(now, h, m, s);
    for _ in 0..MAX_DAY_PROBES {
        let month_ok = months.map(|set| set.contains(&candidate.month())).unwrap_or(true);
        let day_ok = days.map(|set| set.contains(&candidate.day())).unwrap_or(true);
        if candidate > now && month_ok && day_ok {
            return candidate;
        }
        candidate += Duration::days(1);
    }
    panic!(
        "month/day pattern never matches within {} days",
        MAX_DAY_PROBES
    );
}
