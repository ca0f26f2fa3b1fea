//! Sample rates, boundary alignment and the retention configuration.
//!
//! A sample rate is encoded as its period in minutes. `Any` (0) is a
//! query-side wildcard meaning "whichever rate exists" and is never a valid
//! series rate. Boundary alignment is intrinsically wall-clock: the sampler
//! aligns in the controller's local timezone so daily/weekly/monthly samples
//! land on local midnights, and converts back to UTC for storage.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveTime, TimeZone, Timelike};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One of the supported sampling periodicities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRate {
    /// Query wildcard: whichever rate exists. Never used for a series.
    Any,
    OneMinute,
    FifteenMinutes,
    OneHour,
    ThreeHours,
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
}

impl SampleRate {
    /// The period encoded as minutes (`Any` = 0).
    #[must_use]
    pub const fn minutes(self) -> i64 {
        match self {
            Self::Any => 0,
            Self::OneMinute => 1,
            Self::FifteenMinutes => 15,
            Self::OneHour => 60,
            Self::ThreeHours => 180,
            Self::OneDay => 1440,
            Self::OneWeek => 10_080,
            Self::OneMonth => 43_200,
            Self::OneYear => 525_600,
        }
    }

    /// Decode a minute count back into a rate.
    #[must_use]
    pub const fn from_minutes(minutes: i64) -> Option<Self> {
        match minutes {
            0 => Some(Self::Any),
            1 => Some(Self::OneMinute),
            15 => Some(Self::FifteenMinutes),
            60 => Some(Self::OneHour),
            180 => Some(Self::ThreeHours),
            1440 => Some(Self::OneDay),
            10_080 => Some(Self::OneWeek),
            43_200 => Some(Self::OneMonth),
            525_600 => Some(Self::OneYear),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::OneMinute => "1m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::ThreeHours => "3h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1mo",
            Self::OneYear => "1y",
        }
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SampleRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.minutes())
    }
}

impl<'de> Deserialize<'de> for SampleRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let minutes = i64::deserialize(deserializer)?;
        Self::from_minutes(minutes)
            .ok_or_else(|| D::Error::custom(format!("unknown sample rate: {minutes}")))
    }
}

/// Retention configuration of one down-sampled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleConfig {
    /// The rate this series is sampled at.
    pub sample_rate: SampleRate,
    /// The finer rate it is aggregated from.
    pub base_rate: SampleRate,
    /// Maximum rows retained for this series.
    pub max_samples: u32,
}

/// Rows retained for the 1-minute base series (7 days).
pub const MAX_MINUTE_SAMPLES: u32 = 10_080;

/// The fixed down-sampling cascade.
///
/// Order matters: coarser rates consume the rows their base produced in the
/// same tick, so this array must be iterated front to back.
pub const SAMPLE_CONFIGS: [SampleConfig; 7] = [
    SampleConfig {
        sample_rate: SampleRate::FifteenMinutes,
        base_rate: SampleRate::OneMinute,
        max_samples: 16_128, // 6 months
    },
    SampleConfig {
        sample_rate: SampleRate::OneHour,
        base_rate: SampleRate::FifteenMinutes,
        max_samples: 8760, // 1 year
    },
    SampleConfig {
        sample_rate: SampleRate::ThreeHours,
        base_rate: SampleRate::FifteenMinutes,
        max_samples: 2920, // 1 year
    },
    SampleConfig {
        sample_rate: SampleRate::OneDay,
        base_rate: SampleRate::OneHour,
        max_samples: 1095, // 3 years
    },
    SampleConfig {
        sample_rate: SampleRate::OneWeek,
        base_rate: SampleRate::OneDay,
        max_samples: 168, // 3 years
    },
    SampleConfig {
        sample_rate: SampleRate::OneMonth,
        base_rate: SampleRate::OneDay,
        max_samples: 240, // 20 years
    },
    SampleConfig {
        sample_rate: SampleRate::OneYear,
        base_rate: SampleRate::OneMonth,
        max_samples: 20, // 20 years
    },
];

/// Look up the retention configuration for a cascaded rate.
#[must_use]
pub fn config_for(rate: SampleRate) -> Option<&'static SampleConfig> {
    SAMPLE_CONFIGS.iter().find(|c| c.sample_rate == rate)
}

/// The next boundary of `rate` strictly after flooring `after` to the rate's
/// grid.
///
/// Returns `None` for [`SampleRate::Any`] and for dates outside the calendar
/// range chrono can represent. When the computed local boundary falls into a
/// DST gap it is resolved to the earliest valid instant after the gap; a
/// three-hour boundary that lands on local 02:00 after a spring-forward is
/// pushed one hour so the 00/03/06 grid is kept.
pub fn next_sample_timestamp<Tz: TimeZone>(
    rate: SampleRate,
    after: DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let naive = after.naive_local();
    let date = naive.date();
    let time = naive.time();

    let next = match rate {
        SampleRate::Any => return None,
        SampleRate::OneMinute => {
            let floored = date.and_hms_opt(time.hour(), time.minute(), 0)?;
            floored + Duration::minutes(1)
        }
        SampleRate::FifteenMinutes => {
            let floored = date.and_hms_opt(time.hour(), time.minute() - time.minute() % 15, 0)?;
            floored + Duration::minutes(15)
        }
        SampleRate::OneHour => {
            let floored = date.and_hms_opt(time.hour(), 0, 0)?;
            floored + Duration::hours(1)
        }
        SampleRate::ThreeHours => {
            let floored = date.and_hms_opt(time.hour() - time.hour() % 3, 0, 0)?;
            floored + Duration::hours(3)
        }
        SampleRate::OneDay => date.checked_add_days(Days::new(1))?.and_time(NaiveTime::MIN),
        SampleRate::OneWeek => {
            let monday =
                date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))?;
            monday
                .checked_add_days(Days::new(7))?
                .and_time(NaiveTime::MIN)
        }
        SampleRate::OneMonth => {
            let first = date.with_day(1)?;
            first
                .checked_add_months(Months::new(1))?
                .and_time(NaiveTime::MIN)
        }
        SampleRate::OneYear => {
            let first = date.with_day(1)?.with_month(1)?;
            first
                .checked_add_months(Months::new(12))?
                .and_time(NaiveTime::MIN)
        }
    };

    let tz = after.timezone();
    let mut resolved = match tz.from_local_datetime(&next) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earliest, _) => earliest,
        // Spring-forward gap: the boundary does not exist locally.
        chrono::LocalResult::None => tz
            .from_local_datetime(&(next + Duration::hours(1)))
            .earliest()?,
    };

    if rate == SampleRate::ThreeHours && resolved.hour() == 2 {
        resolved = resolved + Duration::hours(1);
    }

    Some(resolved)
}

/// The instant `n` periods of `rate` before `end`.
///
/// Month and year periods are calendar-aware; all other rates are fixed
/// multiples of their minute count.
pub fn sample_start<Tz: TimeZone>(
    end: DateTime<Tz>,
    rate: SampleRate,
    n: u32,
) -> Option<DateTime<Tz>> {
    match rate {
        SampleRate::Any => None,
        SampleRate::OneMonth => end.checked_sub_months(Months::new(n)),
        SampleRate::OneYear => end.checked_sub_months(Months::new(n.checked_mul(12)?)),
        _ => Some(end - Duration::seconds(rate.minutes() * 60 * i64::from(n))),
    }
}
