//! Five-field cron expressions.
//!
//! Supports `*`, single values, `a-b` ranges, `/step` on either, comma
//! lists, month and weekday names, and the `@daily`-style shortcuts.
//! Weekday 7 is accepted as Sunday.

use std::collections::BTreeSet;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    pub minutes: BTreeSet<u8>,
    pub hours: BTreeSet<u8>,
    pub days_of_month: BTreeSet<u8>,
    pub months: BTreeSet<u8>,
    /// 0 = Sunday.
    pub days_of_week: BTreeSet<u8>,
}

struct FieldSpec {
    name: &'static str,
    min: u8,
    max: u8,
    names: &'static [&'static str],
    /// Value that `names[0]` maps to.
    names_base: u8,
}

const FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        name: "minute",
        min: 0,
        max: 59,
        names: &[],
        names_base: 0,
    },
    FieldSpec {
        name: "hour",
        min: 0,
        max: 23,
        names: &[],
        names_base: 0,
    },
    FieldSpec {
        name: "day of month",
        min: 1,
        max: 31,
        names: &[],
        names_base: 1,
    },
    FieldSpec {
        name: "month",
        min: 1,
        max: 12,
        names: &MONTH_NAMES,
        names_base: 1,
    },
    FieldSpec {
        name: "day of week",
        min: 0,
        max: 7,
        names: &WEEKDAY_NAMES,
        names_base: 0,
    },
];

fn expand_shortcut(expr: &str) -> Option<&'static str> {
    match expr {
        "@hourly" => Some("0 * * * *"),
        "@daily" | "@midnight" => Some("0 0 * * *"),
        "@weekly" => Some("0 0 * * 0"),
        "@monthly" => Some("0 0 1 * *"),
        "@yearly" | "@annually" => Some("0 0 1 1 *"),
        _ => None,
    }
}

fn parse_value(token: &str, spec: &FieldSpec) -> Result<u8, String> {
    let lower = token.to_ascii_lowercase();
    if let Some(idx) = spec.names.iter().position(|n| *n == lower) {
        return Ok(spec.names_base + idx as u8);
    }
    let value: u8 = token
        .parse()
        .map_err(|_| format!("invalid {} value {:?}", spec.name, token))?;
    if value < spec.min || value > spec.max {
        return Err(format!(
            "{} value {} out of range {}-{}",
            spec.name, value, spec.min, spec.max
        ));
    }
    Ok(value)
}

fn parse_field(field: &str, spec: &FieldSpec) -> Result<BTreeSet<u8>, String> {
    let mut out = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u8 = step
                    .parse()
                    .map_err(|_| format!("invalid {} step {:?}", spec.name, step))?;
                if step == 0 {
                    return Err(format!("{} step must be positive", spec.name));
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (start, end) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, spec)?, parse_value(b, spec)?)
        } else {
            let v = parse_value(range, spec)?;
            // `5/15` means "from 5 to the end, every 15".
            if step > 1 { (v, spec.max) } else { (v, v) }
        };
        if start > end {
            return Err(format!("{} range {} is reversed", spec.name, range));
        }

        out.extend((start..=end).step_by(step as usize));
    }
    Ok(out)
}

impl CronExpression {
    /// Parse an expression. The error is a short description of the
    /// offending fragment; callers add location context.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        let expanded = expand_shortcut(expr).unwrap_or(expr);
        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != FIELDS.len() {
            return Err(format!(
                "expected {} fields, found {}",
                FIELDS.len(),
                fields.len()
            ));
        }

        let mut sets = fields
            .iter()
            .zip(FIELDS.iter())
            .map(|(field, spec)| parse_field(field, spec))
            .collect::<Result<Vec<_>, _>>()?;

        let mut days_of_week = sets.pop().unwrap_or_default();
        if days_of_week.remove(&7) {
            days_of_week.insert(0);
        }
        let months = sets.pop().unwrap_or_default();
        let days_of_month = sets.pop().unwrap_or_default();
        let hours = sets.pop().unwrap_or_default();
        let minutes = sets.pop().unwrap_or_default();

        Ok(CronExpression {
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
        })
    }
}
