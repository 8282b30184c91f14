//! Services: long-running workloads kept alive on a node or pool.

use crate::Result;
use crate::config::SERVICE_CONTEXT_KEYS;
use crate::config::context::ConfigContext;
use crate::config::entity::{EntitySchema, Fields, Validate, expect_mapping};
use crate::config::raw::{RawInput, RawMap};
use crate::config::validators::{
    build_format_string_validator, valid_float, valid_identifier, valid_int, valid_node_name,
};

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub namespace: String,
    pub node: String,
    pub pid_file: String,
    pub command: String,
    /// Seconds between health checks.
    pub monitor_interval: f64,
    pub count: u64,
    pub restart_interval: Option<f64>,
}

impl Service {
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl Validate for Service {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Service",
        required: &["name", "node", "pid_file", "command", "monitor_interval"],
        optional: &["namespace", "count", "restart_interval"],
    };

    fn cast(input: RawInput<'_>, ctx: &ConfigContext) -> Result<RawMap> {
        let mut map = expect_mapping(input, ctx, Self::SCHEMA.type_name)?;
        map.insert(
            "namespace".to_string(),
            Value::String(ctx.namespace().to_string()),
        );
        Ok(map)
    }

    fn build(fields: Fields) -> Result<Self> {
        let template = build_format_string_validator(SERVICE_CONTEXT_KEYS);
        Ok(Service {
            name: fields.required("name", valid_identifier)?,
            namespace: fields.required("namespace", valid_identifier)?,
            node: fields.required("node", valid_node_name)?,
            pid_file: fields.required("pid_file", &template)?,
            command: fields.required("command", &template)?,
            monitor_interval: fields.required("monitor_interval", valid_float)?,
            count: fields.or_default("count", valid_int, 1)?,
            restart_interval: fields.optional("restart_interval", valid_float)?,
        })
    }
}
