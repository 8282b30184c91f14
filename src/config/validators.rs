//! Primitive field validators.
//!
//! Every validator takes the raw value and the context scoped to the field
//! being checked, and either returns the typed value or a [`ConfigError`]
//! that names the field's path.

use crate::Result;
use crate::config::context::ConfigContext;
use crate::config::raw::{RawMap, display_value};
use crate::config_bail;
use crate::error::ConfigError;

use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const MAX_IDENTIFIER_LENGTH: usize = 255;

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("identifier regex is valid")
});

/// Date keys that accept an arithmetic suffix, e.g. `%(shortdate-1)s`.
static DATE_ARITHMETIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(shortdate|year|month|day|hour|unixtime|daynumber|ym|ymd|ymdh|ymdhm)([+-]\d+)?$")
        .expect("date arithmetic regex is valid")
});

pub fn valid_str(value: &Value, ctx: &ConfigContext) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => config_bail!(
            "Value at {} is not a string: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

pub fn valid_bool(value: &Value, ctx: &ConfigContext) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => config_bail!(
            "Value at {} is not a boolean: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

pub fn valid_list<'a>(value: &'a Value, ctx: &ConfigContext) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        other => config_bail!(
            "Value at {} is not a list: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

pub fn valid_populated_list<'a>(value: &'a Value, ctx: &ConfigContext) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) if !items.is_empty() => Ok(items),
        other => config_bail!(
            "Value at {} is not a list with items: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

pub fn valid_dict<'a>(value: &'a Value, ctx: &ConfigContext) -> Result<&'a RawMap> {
    match value {
        Value::Object(map) => Ok(map),
        other => config_bail!(
            "Value at {} is not a dictionary: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

/// A non-negative integer.
pub fn valid_int(value: &Value, ctx: &ConfigContext) -> Result<u64> {
    let Value::Number(n) = value else {
        config_bail!(
            "Value at {} is not an int: {}",
            ctx.path(),
            display_value(value)
        );
    };
    if let Some(v) = n.as_u64() {
        return Ok(v);
    }
    if n.as_i64().is_some_and(|v| v < 0) {
        config_bail!("{} must be a positive int.", ctx.path());
    }
    config_bail!("Value at {} is not an int: {}", ctx.path(), n)
}

/// A non-negative number; integers are accepted and widened.
pub fn valid_float(value: &Value, ctx: &ConfigContext) -> Result<f64> {
    let Some(v) = value.as_f64() else {
        config_bail!(
            "Value at {} is not a float: {}",
            ctx.path(),
            display_value(value)
        );
    };
    if v < 0.0 || !v.is_finite() {
        config_bail!("{} must be a positive float.", ctx.path());
    }
    Ok(v)
}

pub fn valid_identifier(value: &Value, ctx: &ConfigContext) -> Result<String> {
    match value {
        Value::String(s) if s.len() <= MAX_IDENTIFIER_LENGTH && IDENTIFIER_REGEX.is_match(s) => {
            Ok(s.clone())
        }
        other => config_bail!(
            "Identifier at {} is not a valid identifier: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

/// An identifier that must name a node or node pool known to the context.
/// Contexts without a target set accept any identifier.
pub fn valid_node_name(value: &Value, ctx: &ConfigContext) -> Result<String> {
    let name = valid_identifier(value, ctx)?;
    if let Some(nodes) = ctx.nodes() {
        if !nodes.contains(&name) {
            config_bail!("Unknown node name {} at {}", name, ctx.path());
        }
    }
    Ok(name)
}

/// A flat mapping of string keys to scalar values, stringified.
pub fn valid_string_map(value: &Value, ctx: &ConfigContext) -> Result<BTreeMap<String, String>> {
    let map = valid_dict(value, ctx)?;
    let mut out = BTreeMap::new();
    for (key, val) in map {
        let rendered = match val {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => config_bail!(
                "Value at {}.{} is not a scalar: {}",
                ctx.path(),
                key,
                display_value(other)
            ),
        };
        out.insert(key.clone(), rendered);
    }
    Ok(out)
}

/// The master `command_context`: any flat mapping, null meaning empty.
pub fn valid_command_context(
    value: &Value,
    ctx: &ConfigContext,
) -> Result<BTreeMap<String, String>> {
    if value.is_null() {
        return Ok(BTreeMap::new());
    }
    valid_string_map(value, ctx)
}

pub fn valid_time_zone(value: &Value, ctx: &ConfigContext) -> Result<Tz> {
    let name = valid_str(value, ctx)?;
    name.parse::<Tz>().map_err(|_| {
        ConfigError::new(format!("{name} is not a valid time zone at {}", ctx.path()))
    })
}

/// Parse a human duration such as `20s`, `2h`, `1day` or `1h 30m`.
/// Overflowing or unit-less text yields `None`.
pub fn parse_duration(text: &str) -> Option<Duration> {
    humantime::parse_duration(text.trim()).ok()
}

/// A duration given as text, or as a bare number of seconds.
pub fn valid_time_delta(value: &Value, ctx: &ConfigContext) -> Result<Duration> {
    let parsed = match value {
        Value::String(s) => parse_duration(s),
        Value::Number(n) => n.as_u64().map(Duration::from_secs),
        _ => None,
    };
    match parsed {
        Some(d) => Ok(d),
        None => config_bail!(
            "Value at {} is not a valid time delta: {}",
            ctx.path(),
            display_value(value)
        ),
    }
}

/// Check that `%(key)s` placeholders only reference known keys. Valid keys
/// are `keys` plus whatever the context's command context defines.
pub fn valid_format_string(value: &Value, ctx: &ConfigContext, keys: &[&str]) -> Result<String> {
    let template = valid_str(value, ctx)?;
    let known: BTreeSet<&str> = keys
        .iter()
        .copied()
        .chain(ctx.command_context().keys().map(String::as_str))
        .collect();

    let mut rest = template.as_str();
    while let Some(idx) = rest.find('%') {
        rest = &rest[idx + 1..];
        if let Some(after) = rest.strip_prefix('%') {
            rest = after;
            continue;
        }
        let Some(after) = rest.strip_prefix('(') else {
            continue;
        };
        let Some(close) = after.find(')') else {
            config_bail!("Invalid template string at {}: {}", ctx.path(), template);
        };
        let key = &after[..close];
        let date_base = DATE_ARITHMETIC_REGEX
            .captures(key)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());
        let is_known = known.contains(key) || date_base.is_some_and(|b| known.contains(b));
        if !is_known {
            config_bail!(
                "Unknown context variable {} at {}: {}",
                key,
                ctx.path(),
                template
            );
        }
        rest = &after[close + 1..];
    }
    Ok(template)
}

/// Build a reusable template validator over a fixed key list.
pub fn build_format_string_validator(
    keys: &'static [&'static str],
) -> impl Fn(&Value, &ConfigContext) -> Result<String> {
    move |value, ctx| valid_format_string(value, ctx, keys)
}

/// An existing, writable directory. Empty means "use the working directory".
pub fn valid_output_stream_dir(value: &Value, ctx: &ConfigContext) -> Result<Option<String>> {
    let dir = valid_str(value, ctx)?;
    if dir.is_empty() {
        return Ok(None);
    }
    if ctx.is_partial() {
        return Ok(Some(dir));
    }
    let path = Path::new(&dir);
    if !path.is_dir() {
        config_bail!("output_stream_dir '{}' is not a directory", dir);
    }
    if tempfile::tempfile_in(path).is_err() {
        config_bail!("output_stream_dir '{}' is not writable", dir);
    }
    Ok(Some(dir))
}

/// An SSH private key; its `.pub` sibling must exist as well.
pub fn valid_identity_file(value: &Value, ctx: &ConfigContext) -> Result<String> {
    let file = valid_str(value, ctx)?;
    if ctx.is_partial() {
        return Ok(file);
    }
    if !Path::new(&file).exists() {
        config_bail!("Private key file {} doesn't exist at {}", file, ctx.path());
    }
    let public = format!("{file}.pub");
    if !Path::new(&public).exists() {
        config_bail!("Public key file {} doesn't exist at {}", public, ctx.path());
    }
    Ok(file)
}

pub fn valid_known_hosts_file(value: &Value, ctx: &ConfigContext) -> Result<String> {
    let file = valid_str(value, ctx)?;
    if ctx.is_partial() {
        return Ok(file);
    }
    if !Path::new(&file).exists() {
        config_bail!("Known hosts file {} doesn't exist at {}", file, ctx.path());
    }
    Ok(file)
}
