//! Generic entity validation.
//!
//! Every configuration record (node, pool, action, job, service, option
//! blocks, whole fragments) is validated by the same algorithm. An entity
//! contributes a static [`EntitySchema`] describing its keys plus a few
//! hooks through the [`Validate`] trait:
//!
//! 1. absent input fails (or yields `None` via [`validate_optional`])
//! 2. `shortcut` may build the entity from an abbreviated literal
//! 3. `cast` normalizes the raw shape into a mapping
//! 4. a child context is scoped to `Type.name`
//! 5. required keys are checked, in schema order
//! 6. unexpected keys are rejected
//! 7. `build` validates each field, runs cross-field checks, fills defaults
//!
//! No partial entity ever escapes: the first failure aborts the whole call.

use crate::Result;
use crate::config::context::ConfigContext;
use crate::config::raw::{RawInput, RawMap, display_value};
use crate::config_bail;

use serde_json::Value;

/// Static description of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    /// Name used in paths and error messages.
    pub type_name: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl EntitySchema {
    pub fn allows(&self, key: &str) -> bool {
        self.required.contains(&key) || self.optional.contains(&key)
    }

    pub fn path_name(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("{}.{}", self.type_name, name),
            None => self.type_name.to_string(),
        }
    }

    fn describe_name(map: &RawMap) -> Option<String> {
        map.get("name")
            .filter(|v| !v.is_null())
            .map(display_value)
    }

    pub fn validate_required_keys(&self, map: &RawMap) -> Result<()> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|key| !map.contains_key(*key))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let missing = missing.join(", ");
        match Self::describe_name(map) {
            Some(name) if self.allows("name") => config_bail!(
                "{} {} is missing options: {}",
                self.type_name,
                name,
                missing
            ),
            _ => config_bail!("Nameless {} is missing options: {}", self.type_name, missing),
        }
    }

    pub fn validate_extra_keys(&self, map: &RawMap) -> Result<()> {
        let extra: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| !self.allows(key))
            .collect();
        if extra.is_empty() {
            return Ok(());
        }
        let extra = extra.join(", ");
        match Self::describe_name(map) {
            Some(name) => config_bail!(
                "Unknown options in {} {}: {}",
                self.type_name,
                name,
                extra
            ),
            None => config_bail!("Unknown options in {}: {}", self.type_name, extra),
        }
    }
}

/// Hooks that specialize the generic algorithm for one entity kind.
pub trait Validate: Sized {
    const SCHEMA: EntitySchema;

    /// Build the entity straight from an abbreviated literal.
    fn shortcut(_input: RawInput<'_>, _ctx: &ConfigContext) -> Result<Option<Self>> {
        Ok(None)
    }

    /// Normalize the raw input into the canonical mapping.
    fn cast(input: RawInput<'_>, ctx: &ConfigContext) -> Result<RawMap> {
        expect_mapping(input, ctx, Self::SCHEMA.type_name)
    }

    /// Validate fields, run post-validation, fill defaults, construct.
    fn build(fields: Fields) -> Result<Self>;
}

/// The cast used by entities that only accept the mapping form.
pub fn expect_mapping(input: RawInput<'_>, ctx: &ConfigContext, type_name: &str) -> Result<RawMap> {
    match input {
        RawInput::Mapping(map) => Ok(map.clone()),
        RawInput::Scalar(value) => config_bail!(
            "Value at {} is not a dictionary: {}",
            ctx.path(),
            display_value(value)
        ),
        RawInput::Sequence(items) => config_bail!(
            "Value at {} is not a dictionary: {}",
            ctx.path(),
            Value::Array(items.to_vec())
        ),
        RawInput::Absent => config_bail!("A {} is required.", type_name),
    }
}

pub fn validate<T: Validate>(raw: Option<&Value>, ctx: &ConfigContext) -> Result<T> {
    let input = RawInput::classify(raw);
    if input.is_absent() {
        config_bail!("A {} is required.", T::SCHEMA.type_name);
    }
    if let Some(entity) = T::shortcut(input, ctx)? {
        return Ok(entity);
    }

    let map = T::cast(input, ctx)?;
    let name = map.get("name").and_then(Value::as_str);
    let entity_ctx = ctx.build_child(&T::SCHEMA.path_name(name));

    T::SCHEMA.validate_required_keys(&map)?;
    T::SCHEMA.validate_extra_keys(&map)?;
    T::build(Fields::new(map, entity_ctx, T::SCHEMA.type_name))
}

/// Like [`validate`], but absent (missing or null) input yields `None`.
pub fn validate_optional<T: Validate>(
    raw: Option<&Value>,
    ctx: &ConfigContext,
) -> Result<Option<T>> {
    if RawInput::classify(raw).is_absent() {
        return Ok(None);
    }
    validate(raw, ctx).map(Some)
}

/// A list whose every item is a `T`.
pub fn valid_entity_list<T: Validate>(value: &Value, ctx: &ConfigContext) -> Result<Vec<T>> {
    match value {
        Value::Array(items) => items.iter().map(|item| validate(Some(item), ctx)).collect(),
        other => config_bail!(
            "Value at {} is not a list: {}",
            ctx.path(),
            display_value(other)
        ),
    }
}

/// The cast, key-checked mapping of one entity, plus its context.
///
/// Field accessors run a validator with a child context named after the
/// field, so errors report `...Job.sync.run_limit` style paths.
#[derive(Debug)]
pub struct Fields {
    raw: RawMap,
    ctx: ConfigContext,
    type_name: &'static str,
}

impl Fields {
    pub fn new(raw: RawMap, ctx: ConfigContext, type_name: &'static str) -> Self {
        Self {
            raw,
            ctx,
            type_name,
        }
    }

    pub fn ctx(&self) -> &ConfigContext {
        &self.ctx
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn field_ctx(&self, key: &str) -> ConfigContext {
        self.ctx.build_child(key)
    }

    /// Raw value of `key`; null counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.raw.contains_key(key)
    }

    /// Validate a key the schema lists as required. A null value is handed
    /// to the validator, which rejects it with a shape error.
    pub fn required<T>(
        &self,
        key: &str,
        validator: impl FnOnce(&Value, &ConfigContext) -> Result<T>,
    ) -> Result<T> {
        match self.raw.get(key) {
            Some(value) => validator(value, &self.field_ctx(key)),
            None => config_bail!(
                "Nameless {} is missing options: {}",
                self.type_name,
                key
            ),
        }
    }

    pub fn optional<T>(
        &self,
        key: &str,
        validator: impl FnOnce(&Value, &ConfigContext) -> Result<T>,
    ) -> Result<Option<T>> {
        self.get(key)
            .map(|value| validator(value, &self.field_ctx(key)))
            .transpose()
    }

    pub fn or_default<T>(
        &self,
        key: &str,
        validator: impl FnOnce(&Value, &ConfigContext) -> Result<T>,
        default: T,
    ) -> Result<T> {
        Ok(self.optional(key, validator)?.unwrap_or(default))
    }

    /// Validate a nested entity held under `key`.
    pub fn entity<T: Validate>(&self, key: &str) -> Result<T> {
        validate(self.raw.get(key), &self.ctx)
    }

    pub fn optional_entity<T: Validate>(&self, key: &str) -> Result<Option<T>> {
        validate_optional(self.raw.get(key), &self.ctx)
    }
}
