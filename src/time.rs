use chrono::{Duration, Months, NaiveDate, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::config::{DateOptions, TimeOptions};

/// Mission start, as stored in `mission.start_time` and `mission.date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionClock {
    /// Seconds since midnight.
    pub start_time: u32,
    pub date: NaiveDate,
}

/// Parses a duration such as `1h`, `-1h30m` or `90s`. Units are `h`, `m`,
/// `s` and `ms`, and a bare `0` is allowed.
pub fn parse_duration(text: &str) -> Option<Duration> {
    static FULL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^([+-])?((?:\d+(?:\.\d*)?|\.\d+)(?:h|ms|m|s))+$").unwrap()
    });
    static PART: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(h|ms|m|s)").unwrap());

    let text = text.trim();
    if matches!(text, "0" | "+0" | "-0") {
        return Some(Duration::zero());
    }
    let sign = match FULL.captures(text)?.get(1).map(|m| m.as_str()) {
        Some("-") => -1.0,
        _ => 1.0,
    };

    let mut milliseconds = 0.0;
    for part in PART.captures_iter(text) {
        let value: f64 = part[1].parse().ok()?;
        milliseconds += value
            * match &part[2] {
                "h" => 3_600_000.0,
                "m" => 60_000.0,
                "s" => 1000.0,
                _ => 1.0,
            };
    }
    let milliseconds = (sign * milliseconds).round();
    if !milliseconds.is_finite() || milliseconds.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(milliseconds as i64)
}

/// A calendar offset: signed years, months and days, each optional, as in
/// `+1y-2m3d`. `0` means no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateOffset {
    pub years: i32,
    pub months: i32,
    pub days: i64,
}

impl DateOffset {
    pub fn parse(text: &str) -> Option<Self> {
        static REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(?:([+-]?\d+)y)?(?:([+-]?\d+)m)?(?:([+-]?\d+)d)?$").unwrap()
        });

        let text = text.trim();
        if text.is_empty() || matches!(text, "0" | "+0" | "-0") {
            return Some(Self::default());
        }
        let captures = REGEX.captures(text)?;
        Some(Self {
            years: component(&captures, 1)?,
            months: component(&captures, 2)?,
            days: component(&captures, 3)?,
        })
    }

    /// Moves `date` by whole months first, then by days. Month arithmetic
    /// clamps to the end of shorter months.
    pub fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let months = i64::from(self.years) * 12 + i64::from(self.months);
        let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        let date = if months < 0 {
            date.checked_sub_months(count)?
        } else {
            date.checked_add_months(count)?
        };
        date.checked_add_signed(Duration::try_days(self.days)?)
    }
}

/// A missing component is zero; one that overflows fails the whole offset.
fn component<T: std::str::FromStr + Default>(captures: &Captures, index: usize) -> Option<T> {
    match captures.get(index) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(T::default()),
    }
}

/// Seconds since midnight of `base` shifted by the configured offset.
pub fn start_time(options: &TimeOptions, base: NaiveDateTime) -> u32 {
    let offset = parse_duration(&options.offset).unwrap_or_else(|| {
        warn!("Invalid time offset {:?}, using 0", options.offset);
        Duration::zero()
    });
    let time = base.checked_add_signed(offset).unwrap_or_else(|| {
        warn!("Time offset {:?} is out of range, using 0", options.offset);
        base
    });
    info!("   Start time:            {}", time.format("%H:%M:%S"));
    time.num_seconds_from_midnight()
}

pub fn mission_date(options: &DateOptions, base: NaiveDate) -> NaiveDate {
    let offset = DateOffset::parse(&options.offset).unwrap_or_else(|| {
        warn!("Invalid date offset {:?}, using 0", options.offset);
        DateOffset::default()
    });
    let date = offset.apply(base).unwrap_or_else(|| {
        warn!("Date offset {:?} is out of range, using {base}", options.offset);
        base
    });
    info!("   Date:                  {}", date.format("%Y-%m-%d"));
    date
}

/// Computes the mission clock from the observation time, or from the local
/// system clock where configured.
pub fn mission_clock(
    time: &TimeOptions,
    date: &DateOptions,
    observed: NaiveDateTime,
    local_now: NaiveDateTime,
) -> MissionClock {
    let time_base = if time.system_time { local_now } else { observed };
    let date_base = if date.system_date { local_now } else { observed };
    MissionClock {
        start_time: start_time(time, time_base),
        date: mission_date(date, date_base.date()),
    }
}
