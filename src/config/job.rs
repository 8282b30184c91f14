//! Jobs: scheduled graphs of actions.

use crate::Result;
use crate::config::action::{Action, CleanupAction, DEFAULT_EXPECTED_RUNTIME};
use crate::config::context::ConfigContext;
use crate::config::dag::{index_actions, validate_action_graph};
use crate::config::entity::{EntitySchema, Fields, Validate, expect_mapping, validate};
use crate::config::raw::{RawInput, RawMap};
use crate::config::validators::{
    valid_bool, valid_identifier, valid_int, valid_node_name, valid_time_delta, valid_time_zone,
};
use crate::config_bail;
use crate::schedule::{Schedule, valid_schedule};

use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_RUN_LIMIT: u64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub name: String,
    pub namespace: String,
    /// Default target for actions that don't name their own.
    pub node: Option<String>,
    pub schedule: Schedule,
    pub actions: BTreeMap<String, Action>,
    pub cleanup_action: Option<CleanupAction>,
    pub run_limit: u64,
    pub all_nodes: bool,
    pub queueing: bool,
    pub enabled: bool,
    pub allow_overlap: bool,
    pub time_zone: Option<Tz>,
    pub expected_runtime: Duration,
    pub max_runtime: Option<Duration>,
}

impl Job {
    /// `<namespace>.<name>`, the job's name across the whole container.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl Validate for Job {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Job",
        required: &["name", "schedule", "actions"],
        optional: &[
            "namespace",
            "node",
            "cleanup_action",
            "run_limit",
            "all_nodes",
            "queueing",
            "enabled",
            "allow_overlap",
            "time_zone",
            "expected_runtime",
            "max_runtime",
        ],
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
        let name = fields.required("name", valid_identifier)?;
        let node = fields.optional("node", valid_node_name)?;
        let all_nodes = fields.or_default("all_nodes", valid_bool, false)?;
        if all_nodes && node.is_none() {
            config_bail!("Job {} sets all_nodes but has no node configured", name);
        }

        let raw_actions = match fields.get("actions") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            Some(Value::Array(_)) | None => {
                config_bail!("Job {}: `actions` can't be empty", name)
            }
            Some(other) => config_bail!(
                "Value at {}.actions is not a list: {}",
                fields.ctx().path(),
                other
            ),
        };

        let actions_ctx = fields.field_ctx("actions");
        let mut actions = Vec::with_capacity(raw_actions.len());
        for raw in raw_actions {
            let action: Action = validate(Some(raw), &actions_ctx)?;
            require_target(fields.ctx(), &action, node.as_deref())?;
            actions.push(action);
        }
        let actions = index_actions(&name, actions)?;
        validate_action_graph(&name, &actions)?;

        let cleanup_action = fields.optional_entity::<CleanupAction>("cleanup_action")?;
        if let Some(cleanup) = &cleanup_action {
            require_target(fields.ctx(), cleanup.action(), node.as_deref())?;
        }

        Ok(Job {
            namespace: fields.required("namespace", valid_identifier)?,
            schedule: fields.required("schedule", valid_schedule)?,
            run_limit: fields.or_default("run_limit", valid_int, DEFAULT_RUN_LIMIT)?,
            queueing: fields.or_default("queueing", valid_bool, true)?,
            enabled: fields.or_default("enabled", valid_bool, true)?,
            allow_overlap: fields.or_default("allow_overlap", valid_bool, false)?,
            time_zone: fields.optional("time_zone", valid_time_zone)?,
            expected_runtime: fields.or_default(
                "expected_runtime",
                valid_time_delta,
                DEFAULT_EXPECTED_RUNTIME,
            )?,
            max_runtime: fields.optional("max_runtime", valid_time_delta)?,
            name,
            node,
            actions,
            cleanup_action,
            all_nodes,
        })
    }
}

fn require_target(ctx: &ConfigContext, action: &Action, job_node: Option<&str>) -> Result<()> {
    if action.node.is_none() && job_node.is_none() {
        config_bail!("{} has no node configured for {}", ctx.path(), action.name);
    }
    Ok(())
}
