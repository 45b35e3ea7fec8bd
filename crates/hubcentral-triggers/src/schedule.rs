//! Schedule specifications for `scheduled` triggers.
//!
//! A trigger's `config.schedule_type` selects one of four forms:
//!
//! | `schedule_type` | Parameters                                        |
//! |-----------------|---------------------------------------------------|
//! | `interval`      | `interval` (default 60), `unit` (seconds, minutes, hours, days; default minutes) |
//! | `daily`         | `time` `"HH:MM"` (default `09:00`)                |
//! | `weekly`        | `day` (default `monday`), `time`                  |
//! | `cron`          | `expression`, 5 or 6 fields                       |
//!
//! Wall-clock forms are evaluated in the timezone of the instant passed to
//! [`Schedule::next_after`]; the scheduler passes local time.  Standard
//! 5-field cron input is normalized by prepending a `0` seconds field.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Weekday};
use serde_json::{Map, Value};

use crate::error::{Result, TriggerError};

/// Parsed schedule of a `scheduled` trigger.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Every fixed period, first run one period after installation.
    Interval(Duration),
    /// Every day at `time`.
    Daily { time: NaiveTime },
    /// Every `day` at `time`.
    Weekly { day: Weekday, time: NaiveTime },
    /// A cron expression.
    Cron {
        expression: String,
        schedule: Box<cron::Schedule>,
    },
}

impl Schedule {
    /// Parse the schedule described by a trigger `config`.
    pub fn from_config(config: &Map<String, Value>) -> Result<Self> {
        let schedule_type = str_field(config, "schedule_type")?.unwrap_or("interval");
        match schedule_type {
            "interval" => {
                let amount = match config.get("interval") {
                    None => 60,
                    Some(value) => value.as_u64().filter(|n| *n > 0).ok_or_else(|| {
                        TriggerError::Configuration(format!(
                            "`interval` must be a positive integer, got {value}"
                        ))
                    })?,
                };
                let unit = str_field(config, "unit")?.unwrap_or("minutes");
                let seconds = match unit {
                    "seconds" => amount,
                    "minutes" => amount.saturating_mul(60),
                    "hours" => amount.saturating_mul(3600),
                    "days" => amount.saturating_mul(86_400),
                    other => {
                        return Err(TriggerError::Configuration(format!(
                            "unknown interval unit `{other}`"
                        )));
                    }
                };
                Ok(Self::Interval(Duration::from_secs(seconds)))
            }
            "daily" => Ok(Self::Daily {
                time: parse_time(str_field(config, "time")?.unwrap_or("09:00"))?,
            }),
            "weekly" => {
                let day = str_field(config, "day")?.unwrap_or("monday");
                let day = Weekday::from_str(day).map_err(|_| {
                    TriggerError::Configuration(format!("unknown weekday `{day}`"))
                })?;
                Ok(Self::Weekly {
                    day,
                    time: parse_time(str_field(config, "time")?.unwrap_or("09:00"))?,
                })
            }
            "cron" => {
                let expression = str_field(config, "expression")?.ok_or_else(|| {
                    TriggerError::Configuration("cron schedules need an `expression`".into())
                })?;
                let schedule = parse_cron(expression)?;
                Ok(Self::Cron {
                    expression: expression.to_string(),
                    schedule: Box::new(schedule),
                })
            }
            other => Err(TriggerError::Configuration(format!(
                "unknown schedule_type `{other}`"
            ))),
        }
    }

    /// The first firing strictly after `after`.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Self::Interval(period) => {
                let delta = chrono::Duration::from_std(*period).ok()?;
                after.clone().checked_add_signed(delta)
            }
            Self::Daily { time } => next_wall_clock(after, *time, None),
            Self::Weekly { day, time } => next_wall_clock(after, *time, Some(*day)),
            Self::Cron { schedule, .. } => schedule.after(after).next(),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval(period) => write!(f, "every {}s", period.as_secs()),
            Self::Daily { time } => write!(f, "daily at {}", time.format("%H:%M")),
            Self::Weekly { day, time } => write!(f, "every {day} at {}", time.format("%H:%M")),
            Self::Cron { expression, .. } => write!(f, "cron({expression})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn str_field<'a>(config: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(TriggerError::Configuration(format!(
            "`{key}` must be a string, got {other}"
        ))),
    }
}

fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| TriggerError::Configuration(format!("invalid time `{text}`, expected HH:MM")))
}

fn normalize_cron_expr(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

fn parse_cron(expr: &str) -> Result<cron::Schedule> {
    cron::Schedule::from_str(&normalize_cron_expr(expr)).map_err(|e| {
        TriggerError::Configuration(format!("invalid cron expression `{expr}`: {e}"))
    })
}

/// Next occurrence of `time` (on `day`, if given) strictly after `after`.
///
/// Wall-clock times skipped by a DST gap fall through to the next eligible
/// day.
fn next_wall_clock<Tz: TimeZone>(
    after: &DateTime<Tz>,
    time: NaiveTime,
    day: Option<Weekday>,
) -> Option<DateTime<Tz>> {
    let tz = after.timezone();
    let start = after.date_naive();
    for offset in 0..=8 {
        let date = start.checked_add_days(Days::new(offset))?;
        if day.is_some_and(|d| date.weekday() != d) {
            continue;
        }
        if let Some(candidate) = date.and_time(time).and_local_timezone(tz.clone()).earliest()
            && candidate > *after
        {
            return Some(candidate);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
