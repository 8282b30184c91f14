//! Shape classification of decoded document values.
//!
//! The document parser hands us `serde_json::Value` trees. Validators that
//! accept more than one spelling of an entity look at the shape once, here,
//! and dispatch on the result.

use serde_json::{Map, Value};

pub type RawMap = Map<String, Value>;

#[derive(Debug, Clone, Copy)]
pub enum RawInput<'a> {
    /// Key missing, or present with a null value.
    Absent,
    Scalar(&'a Value),
    Sequence(&'a [Value]),
    Mapping(&'a RawMap),
}

impl<'a> RawInput<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawInput::Absent,
            Some(Value::Array(items)) => RawInput::Sequence(items),
            Some(Value::Object(map)) => RawInput::Mapping(map),
            Some(other) => RawInput::Scalar(other),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RawInput::Absent)
    }
}

/// Render a raw value for an error message. Strings print bare.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
