//! Text grammar for schedules.
//!
//! Accepted forms (kind is case-insensitive):
//!
//! ```text
//! interval 20s
//! interval 1h 30m
//! daily
//! daily 16:30
//! daily 16:30:00 MWF
//! daily 04:00 mon,wed,fri
//! constant
//! cron */5 * * * *
//! cron @daily
//! ```
//!
//! Day letters follow `MTWRFSU` (R is Thursday, U is Sunday).

use crate::config::validators::parse_duration;
use crate::schedule::ScheduleKind;
use crate::schedule::cron::CronExpression;

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TIME_OF_DAY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("time of day regex is valid")
});

const DAY_NAMES: [(&str, u8); 14] = [
    ("sunday", 0),
    ("monday", 1),
    ("tuesday", 2),
    ("wednesday", 3),
    ("thursday", 4),
    ("friday", 5),
    ("saturday", 6),
    ("sun", 0),
    ("mon", 1),
    ("tue", 2),
    ("wed", 3),
    ("thu", 4),
    ("fri", 5),
    ("sat", 6),
];

/// Why a schedule string was rejected; rendered with the location by the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleParseError {
    UnknownKind(String),
    Interval(String),
    TimeOfDay(String),
    DaysOfWeek(String),
    Cron(String),
    Trailing(String),
}

impl ScheduleParseError {
    pub fn describe(&self) -> String {
        match self {
            ScheduleParseError::UnknownKind(kind) => format!("unknown schedule type {kind:?}"),
            ScheduleParseError::Interval(text) => format!("invalid interval {text:?}"),
            ScheduleParseError::TimeOfDay(text) => format!("invalid time of day {text:?}"),
            ScheduleParseError::DaysOfWeek(text) => format!("invalid days of week {text:?}"),
            ScheduleParseError::Cron(reason) => format!("invalid cron expression: {reason}"),
            ScheduleParseError::Trailing(text) => format!("unexpected trailing text {text:?}"),
        }
    }
}

/// Parse `<kind> <value>` into a schedule variant.
pub fn parse_schedule_text(text: &str) -> Result<ScheduleKind, ScheduleParseError> {
    let text = text.trim();
    let (kind, rest) = match text.split_once(char::is_whitespace) {
        Some((kind, rest)) => (kind, rest.trim()),
        None => (text, ""),
    };
    parse_schedule_parts(kind, rest)
}

/// Parse a schedule given its kind and value separately, as in the
/// mapping form `{type: daily, value: "16:30 MWF"}`.
pub fn parse_schedule_parts(kind: &str, value: &str) -> Result<ScheduleKind, ScheduleParseError> {
    match kind.to_ascii_lowercase().as_str() {
        "interval" => parse_interval(value),
        "daily" => parse_daily(value),
        "constant" => {
            if value.is_empty() {
                Ok(ScheduleKind::Constant)
            } else {
                Err(ScheduleParseError::Trailing(value.to_string()))
            }
        }
        "cron" => CronExpression::parse(value)
            .map(ScheduleKind::Cron)
            .map_err(ScheduleParseError::Cron),
        _ => Err(ScheduleParseError::UnknownKind(kind.to_string())),
    }
}

fn parse_interval(value: &str) -> Result<ScheduleKind, ScheduleParseError> {
    match parse_duration(value) {
        Some(period) if !period.is_zero() => Ok(ScheduleKind::Interval { period }),
        _ => Err(ScheduleParseError::Interval(value.to_string())),
    }
}

fn parse_daily(value: &str) -> Result<ScheduleKind, ScheduleParseError> {
    let mut tokens = value.split_whitespace().peekable();

    let (hour, minute, second) = match tokens.peek() {
        Some(token) if token.contains(':') => {
            let parsed = parse_time_of_day(token)?;
            tokens.next();
            parsed
        }
        _ => (0, 0, 0),
    };

    let mut days = BTreeSet::new();
    for token in tokens {
        days.extend(parse_days(token)?);
    }

    Ok(ScheduleKind::Daily {
        hour,
        minute,
        second,
        days,
        time_zone: None,
    })
}

fn parse_time_of_day(token: &str) -> Result<(u32, u32, u32), ScheduleParseError> {
    let bad = || ScheduleParseError::TimeOfDay(token.to_string());
    let caps = TIME_OF_DAY_REGEX.captures(token).ok_or_else(bad)?;

    let hour: u32 = caps[1].parse().map_err(|_| bad())?;
    let minute: u32 = caps[2].parse().map_err(|_| bad())?;
    let second: u32 = match caps.get(3) {
        Some(m) => m.as_str().parse().map_err(|_| bad())?,
        None => 0,
    };

    // NaiveTime rejects out-of-range fields, e.g. 24:00 or 12:60.
    chrono::NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(bad)?;
    Ok((hour, minute, second))
}

fn parse_days(token: &str) -> Result<BTreeSet<u8>, ScheduleParseError> {
    let bad = || ScheduleParseError::DaysOfWeek(token.to_string());
    let mut days = BTreeSet::new();

    for part in token.split(',').filter(|p| !p.is_empty()) {
        let lower = part.to_ascii_lowercase();
        if let Some((_, day)) = DAY_NAMES.iter().find(|(name, _)| *name == lower) {
            days.insert(*day);
            continue;
        }
        for letter in part.chars() {
            let day = match letter.to_ascii_uppercase() {
                'U' => 0,
                'M' => 1,
                'T' => 2,
                'W' => 3,
                'R' => 4,
                'F' => 5,
                'S' => 6,
                _ => return Err(bad()),
            };
            days.insert(day);
        }
    }

    if days.is_empty() {
        return Err(bad());
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn days(values: &[u8]) -> BTreeSet<u8> {
        values.iter().copied().collect()
    }

    #[test]
    fn interval() {
        assert_eq!(
            parse_schedule_text("interval 20s").unwrap(),
            ScheduleKind::Interval {
                period: Duration::from_secs(20)
            }
        );
        assert_eq!(
            parse_schedule_text("INTERVAL 1h 30m").unwrap(),
            ScheduleKind::Interval {
                period: Duration::from_secs(5400)
            }
        );
        assert!(matches!(
            parse_schedule_text("interval 0s"),
            Err(ScheduleParseError::Interval(_))
        ));
        assert!(parse_schedule_text("interval").is_err());
        assert!(matches!(
            parse_schedule_text("interval 18446744073709551615s 1s"),
            Err(ScheduleParseError::Interval(_))
        ));
    }

    #[test]
    fn daily_with_days() {
        assert_eq!(
            parse_schedule_text("daily 00:30:00 MWF").unwrap(),
            ScheduleKind::Daily {
                hour: 0,
                minute: 30,
                second: 0,
                days: days(&[1, 3, 5]),
                time_zone: None,
            }
        );
        assert_eq!(
            parse_schedule_text("daily 04:00 sat,sunday").unwrap(),
            ScheduleKind::Daily {
                hour: 4,
                minute: 0,
                second: 0,
                days: days(&[0, 6]),
                time_zone: None,
            }
        );
    }

    #[test]
    fn daily_defaults_to_midnight() {
        assert_eq!(
            parse_schedule_text("daily").unwrap(),
            ScheduleKind::Daily {
                hour: 0,
                minute: 0,
                second: 0,
                days: BTreeSet::new(),
                time_zone: None,
            }
        );
        assert_eq!(
            parse_schedule_text("daily SU").unwrap(),
            ScheduleKind::Daily {
                hour: 0,
                minute: 0,
                second: 0,
                days: days(&[0, 6]),
                time_zone: None,
            }
        );
    }

    #[test]
    fn daily_rejects_bad_tokens() {
        assert_eq!(
            parse_schedule_text("daily 25:00").unwrap_err(),
            ScheduleParseError::TimeOfDay("25:00".to_string())
        );
        assert_eq!(
            parse_schedule_text("daily 12:00 MXF").unwrap_err(),
            ScheduleParseError::DaysOfWeek("MXF".to_string())
        );
        assert!(parse_schedule_text("daily 12:61").is_err());
    }

    #[test]
    fn constant_and_cron() {
        assert_eq!(parse_schedule_text("constant").unwrap(), ScheduleKind::Constant);
        assert!(parse_schedule_text("constant 5").is_err());
        assert!(matches!(
            parse_schedule_text("cron */5 * * * *").unwrap(),
            ScheduleKind::Cron(_)
        ));
        assert!(matches!(
            parse_schedule_text("cron 1 2 3"),
            Err(ScheduleParseError::Cron(_))
        ));
    }

    #[test]
    fn unknown_kind() {
        assert_eq!(
            parse_schedule_text("weekly 10:00").unwrap_err(),
            ScheduleParseError::UnknownKind("weekly".to_string())
        );
    }
}
