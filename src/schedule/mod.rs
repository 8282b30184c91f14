//! Job schedules.
//!
//! A schedule is written either as text (`"daily 16:30 MWF"`) or as a
//! mapping (`{type: daily, value: "16:30 MWF", jitter: 5m}`). Either way the
//! original text is kept so operators see what they wrote.

pub mod cron;
pub mod parse;

pub use cron::CronExpression;
pub use parse::{ScheduleParseError, parse_schedule_parts, parse_schedule_text};

use crate::Result;
use crate::config::context::ConfigContext;
use crate::config::entity::{EntitySchema, Fields, Validate, validate};
use crate::config::raw::{RawInput, display_value};
use crate::config::validators::{valid_str, valid_time_delta, valid_time_zone};
use crate::config_bail;

use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleKind {
    Interval {
        period: Duration,
    },
    Daily {
        hour: u32,
        minute: u32,
        second: u32,
        /// 0 = Sunday. Empty means every day.
        days: BTreeSet<u8>,
        time_zone: Option<Tz>,
    },
    Constant,
    Cron(CronExpression),
}

impl ScheduleKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScheduleKind::Interval { .. } => "interval",
            ScheduleKind::Daily { .. } => "daily",
            ScheduleKind::Constant => "constant",
            ScheduleKind::Cron(_) => "cron",
        }
    }
}

/// Random delay added to each run, between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub min: Duration,
    pub max: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub kind: ScheduleKind,
    pub original: String,
    pub jitter: Option<Jitter>,
}

fn invalid_schedule(ctx: &ConfigContext, text: &str, err: &ScheduleParseError) -> String {
    format!(
        "Invalid schedule at {}: {} in {:?}",
        ctx.path(),
        err.describe(),
        text
    )
}

impl Validate for Schedule {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Schedule",
        required: &["type"],
        optional: &["value", "jitter", "time_zone"],
    };

    fn shortcut(input: RawInput<'_>, ctx: &ConfigContext) -> Result<Option<Self>> {
        let RawInput::Scalar(Value::String(text)) = input else {
            return Ok(None);
        };
        match parse_schedule_text(text) {
            Ok(kind) => Ok(Some(Schedule {
                kind,
                original: text.trim().to_string(),
                jitter: None,
            })),
            Err(err) => config_bail!("{}", invalid_schedule(ctx, text, &err)),
        }
    }

    fn build(fields: Fields) -> Result<Self> {
        let kind_name = fields.required("type", valid_str)?;
        let value = fields.or_default("value", valid_str, String::new())?;
        let original = format!("{kind_name} {value}").trim().to_string();

        let mut kind = match parse_schedule_parts(&kind_name, value.trim()) {
            Ok(kind) => kind,
            Err(err) => config_bail!("{}", invalid_schedule(fields.ctx(), &original, &err)),
        };

        if let Some(tz) = fields.optional("time_zone", valid_time_zone)? {
            match &mut kind {
                ScheduleKind::Daily { time_zone, .. } => *time_zone = Some(tz),
                other => config_bail!(
                    "time_zone at {} only applies to daily schedules, not {}",
                    fields.ctx().path(),
                    other.type_name()
                ),
            }
        }

        Ok(Schedule {
            kind,
            original,
            jitter: fields.optional("jitter", valid_jitter)?,
        })
    }
}

pub fn valid_schedule(value: &Value, ctx: &ConfigContext) -> Result<Schedule> {
    validate(Some(value), ctx)
}

/// A single duration means `{min: 0, max: duration}`.
pub fn valid_jitter(value: &Value, ctx: &ConfigContext) -> Result<Jitter> {
    let jitter = match value {
        Value::Object(map) => {
            let bound = |key: &str| match map.get(key) {
                Some(v) => valid_time_delta(v, &ctx.build_child(key)),
                None => Ok(Duration::ZERO),
            };
            if let Some(extra) = map.keys().find(|k| *k != "min" && *k != "max") {
                config_bail!("Unknown options in jitter at {}: {}", ctx.path(), extra);
            }
            Jitter {
                min: bound("min")?,
                max: bound("max")?,
            }
        }
        other => Jitter {
            min: Duration::ZERO,
            max: valid_time_delta(other, ctx)?,
        },
    };
    if jitter.min > jitter.max {
        config_bail!(
            "Jitter at {} has min greater than max: {}",
            ctx.path(),
            display_value(value)
        );
    }
    Ok(jitter)
}
