//! Weekly cadence parsing and evaluation.
//!
//! A cadence is one weekday plus an HH:MM time of day, evaluated in local
//! time. It fires once per week, on the minute:
//! ```text
//! day:  monday | tuesday | ... | sunday   (case-insensitive)
//! time: HH:MM                             (24-hour)
//! ```

use chrono::{DateTime, Datelike, Duration, Local, Timelike, Weekday};
use std::fmt;
use thiserror::Error;

/// Errors from parsing a schedule's day or time fields.
#[derive(Debug, Error)]
pub enum CadenceParseError {
    #[error("Invalid schedule day: {0}")]
    InvalidDay(String),

    #[error("Invalid schedule time '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("{field} {value} is out of range [0, {max}]")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// A weekly trigger: fires once per week at (weekday, hour, minute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyCadence {
    /// Day of the week the trigger fires.
    pub weekday: Weekday,
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Minute of hour, 0-59.
    pub minute: u32,
}

impl WeeklyCadence {
    /// Parse from a weekday name and an HH:MM time string.
    pub fn parse(day: &str, time: &str) -> Result<Self, CadenceParseError> {
        let weekday = parse_weekday(day)?;
        let (hour, minute) = parse_time(time)?;
        Ok(Self {
            weekday,
            hour,
            minute,
        })
    }

    /// Weekday index with Monday = 0.
    pub fn weekday_index(&self) -> u32 {
        self.weekday.num_days_from_monday()
    }

    /// Check whether a local timestamp falls on this cadence's minute.
    pub fn matches(&self, dt: &DateTime<Local>) -> bool {
        dt.weekday() == self.weekday && dt.hour() == self.hour && dt.minute() == self.minute
    }

    /// Next fire time strictly after `after`.
    ///
    /// Steps whole minutes rather than doing date arithmetic so DST
    /// transitions cannot produce a local time that never existed. A week
    /// plus a day bounds the search.
    pub fn next_fire(&self, after: &DateTime<Local>) -> Option<DateTime<Local>> {
        let mut current = (*after + Duration::minutes(1))
            .with_second(0)?
            .with_nanosecond(0)?;

        let max_iterations = 8 * 24 * 60;
        for _ in 0..max_iterations {
            if self.matches(&current) {
                return Some(current);
            }
            current = current + Duration::minutes(1);
        }

        None
    }
}

impl fmt::Display for WeeklyCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:02}:{:02}", self.weekday, self.hour, self.minute)
    }
}

/// Map a case-insensitive weekday name onto [`chrono::Weekday`].
fn parse_weekday(day: &str) -> Result<Weekday, CadenceParseError> {
    match day.trim().to_ascii_lowercase().as_str() {
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        "sunday" => Ok(Weekday::Sun),
        _ => Err(CadenceParseError::InvalidDay(day.to_string())),
    }
}

/// Parse an HH:MM time of day.
fn parse_time(time: &str) -> Result<(u32, u32), CadenceParseError> {
    let (hour_str, minute_str) = time
        .trim()
        .split_once(':')
        .ok_or_else(|| CadenceParseError::InvalidTime(time.to_string()))?;

    let hour: u32 = hour_str
        .parse()
        .map_err(|_| CadenceParseError::InvalidTime(time.to_string()))?;
    let minute: u32 = minute_str
        .parse()
        .map_err(|_| CadenceParseError::InvalidTime(time.to_string()))?;

    if hour > 23 {
        return Err(CadenceParseError::OutOfRange {
            field: "hour",
            value: hour,
            max: 23,
        });
    }
    if minute > 59 {
        return Err(CadenceParseError::OutOfRange {
            field: "minute",
            value: minute,
            max: 59,
        });
    }

    Ok((hour, minute))
}
