//! When drain cycles start
//!
//! The binary itself never sleeps until the next cycle; an external scheduler
//! (cron, a systemd timer, a platform cron trigger) fires it. This module turns
//! the `[schedule]` section into the next start time and into the equivalent
//! UTC crontab line for that scheduler.
//!
//! Local time is a fixed UTC offset. A site in a zone with daylight saving
//! keeps the same UTC start all year, so its local start moves by an hour
//! when the clocks change; update `utc-offset` (and the crontab) then.

use crate::config::{Cadence, ScheduleConfig};
use crate::ConfigError;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use std::fmt;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parsed, validated schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    cadence: Cadence,
    weekday: Weekday,
    at: NaiveTime,
    offset: FixedOffset,
}

impl Schedule {
    /// Parses the schedule section
    ///
    /// # Returns
    ///
    /// * `Ok(Schedule)` - All fields were valid
    /// * `Err(ConfigError::InvalidSchedule)` - A field could not be parsed
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        let weekday = config.weekday.parse::<Weekday>().map_err(|_| {
            ConfigError::InvalidSchedule(format!("unknown weekday '{}'", config.weekday))
        })?;

        let at = NaiveTime::parse_from_str(&config.at, "%H:%M").map_err(|_| {
            ConfigError::InvalidSchedule(format!("'at' must be HH:MM, got '{}'", config.at))
        })?;

        let offset = parse_offset(&config.utc_offset)?;

        Ok(Self {
            cadence: config.cadence,
            weekday,
            at,
            offset,
        })
    }

    /// First start time strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_now = now.with_timezone(&self.offset);

        // A week and a day always contains the next occurrence
        for date in local_now.date_naive().iter_days().take(8) {
            if self.cadence == Cadence::Weekly && date.weekday() != self.weekday {
                continue;
            }
            let Some(candidate) = self
                .offset
                .from_local_datetime(&date.and_time(self.at))
                .single()
            else {
                continue;
            };
            if candidate > local_now {
                return candidate.with_timezone(&Utc);
            }
        }

        // Only reachable at the very end of chrono's date range
        now + Duration::weeks(1)
    }

    /// Five-field crontab line firing at the same instants, in UTC
    ///
    /// For weekly schedules the weekday moves when the offset pushes the time
    /// across midnight.
    pub fn cron_expression(&self) -> String {
        let local_minutes = i64::from(self.at.hour() * 60 + self.at.minute());
        let utc_minutes = local_minutes - i64::from(self.offset.local_minus_utc() / 60);

        let day_shift = utc_minutes.div_euclid(MINUTES_PER_DAY);
        let minute_of_day = utc_minutes.rem_euclid(MINUTES_PER_DAY);
        let (hour, minute) = (minute_of_day / 60, minute_of_day % 60);

        match self.cadence {
            Cadence::Daily => format!("{} {} * * *", minute, hour),
            Cadence::Weekly => {
                let weekday =
                    (i64::from(self.weekday.num_days_from_sunday()) + day_shift).rem_euclid(7);
                format!("{} {} * * {}", minute, hour, weekday)
            }
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cadence {
            Cadence::Daily => write!(f, "daily at {} ({})", self.at.format("%H:%M"), self.offset),
            Cadence::Weekly => write!(
                f,
                "weekly on {} at {} ({})",
                self.weekday,
                self.at.format("%H:%M"),
                self.offset
            ),
        }
    }
}

/// Parses "+HH:MM" / "-HH:MM"
fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidSchedule(format!("utc-offset must be +HH:MM, got '{}'", raw));

    if raw.contains('/') {
        return Err(ConfigError::InvalidSchedule(format!(
            "utc-offset takes a fixed offset such as +03:00, not a zone name ('{}')",
            raw
        )));
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
