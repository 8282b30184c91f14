//! Actions: the steps of a job.

use crate::Result;
use crate::config::context::ConfigContext;
use crate::config::entity::{EntitySchema, Fields, Validate, valid_entity_list};
use crate::config::raw::display_value;
use crate::config::validators::{
    build_format_string_validator, valid_bool, valid_float, valid_identifier, valid_int,
    valid_node_name, valid_str, valid_string_map, valid_time_delta,
};
use crate::config::{CLEANUP_ACTION_NAME, JOB_CONTEXT_KEYS};
use crate::config_bail;

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_EXPECTED_RUNTIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Keys only meaningful for the container executor.
const MESOS_KEYS: &[&str] = &[
    "cpus",
    "mem",
    "constraints",
    "docker_image",
    "docker_parameters",
    "env",
    "extra_volumes",
    "mesos_address",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorType {
    Local,
    #[default]
    Ssh,
    Mesos,
}

impl ExecutorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorType::Local => "local",
            ExecutorType::Ssh => "ssh",
            ExecutorType::Mesos => "mesos",
        }
    }
}

fn valid_executor(value: &Value, ctx: &ConfigContext) -> Result<ExecutorType> {
    match valid_str(value, ctx)?.as_str() {
        "local" => Ok(ExecutorType::Local),
        "ssh" => Ok(ExecutorType::Ssh),
        "mesos" => Ok(ExecutorType::Mesos),
        other => config_bail!(
            "Unknown executor {} at {}, expected one of local, ssh, mesos",
            other,
            ctx.path()
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub container_path: String,
    pub host_path: String,
    pub mode: VolumeMode,
}

fn valid_volume_mode(value: &Value, ctx: &ConfigContext) -> Result<VolumeMode> {
    match valid_str(value, ctx)?.to_ascii_uppercase().as_str() {
        "RO" => Ok(VolumeMode::ReadOnly),
        "RW" => Ok(VolumeMode::ReadWrite),
        _ => config_bail!(
            "Value at {} is not a volume mode (RO or RW): {}",
            ctx.path(),
            display_value(value)
        ),
    }
}

impl Validate for Volume {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Volume",
        required: &["container_path", "host_path", "mode"],
        optional: &[],
    };

    fn build(fields: Fields) -> Result<Self> {
        Ok(Volume {
            container_path: fields.required("container_path", valid_str)?,
            host_path: fields.required("host_path", valid_str)?,
            mode: fields.required("mode", valid_volume_mode)?,
        })
    }
}

/// Placement constraint on container offers, e.g. `pool LIKE default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub attribute: String,
    pub operator: String,
    pub value: String,
}

impl Validate for Constraint {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Constraint",
        required: &["attribute", "operator", "value"],
        optional: &[],
    };

    fn build(fields: Fields) -> Result<Self> {
        Ok(Constraint {
            attribute: fields.required("attribute", valid_str)?,
            operator: fields.required("operator", valid_str)?,
            value: fields.required("value", valid_str)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerParameter {
    pub key: String,
    pub value: String,
}

impl Validate for DockerParameter {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "DockerParameter",
        required: &["key", "value"],
        optional: &[],
    };

    fn build(fields: Fields) -> Result<Self> {
        Ok(DockerParameter {
            key: fields.required("key", valid_str)?,
            value: fields.required("value", valid_str)?,
        })
    }
}

/// Settings for actions run by the container executor.
#[derive(Debug, Clone, PartialEq)]
pub struct MesosSettings {
    pub cpus: Option<f64>,
    pub mem: Option<f64>,
    pub constraints: Vec<Constraint>,
    pub docker_image: String,
    pub docker_parameters: Vec<DockerParameter>,
    pub env: BTreeMap<String, String>,
    pub extra_volumes: Vec<Volume>,
    pub mesos_address: Option<String>,
}

impl MesosSettings {
    fn from_fields(fields: &Fields) -> Result<Self> {
        let Some(docker_image) = fields.optional("docker_image", valid_str)? else {
            config_bail!(
                "Action at {} uses the mesos executor but has no docker_image",
                fields.ctx().path()
            );
        };
        Ok(MesosSettings {
            cpus: fields.optional("cpus", valid_float)?,
            mem: fields.optional("mem", valid_float)?,
            constraints: fields.or_default(
                "constraints",
                valid_entity_list::<Constraint>,
                Vec::new(),
            )?,
            docker_image,
            docker_parameters: fields.or_default(
                "docker_parameters",
                valid_entity_list::<DockerParameter>,
                Vec::new(),
            )?,
            env: fields.or_default("env", valid_string_map, BTreeMap::new())?,
            extra_volumes: fields.or_default(
                "extra_volumes",
                valid_entity_list::<Volume>,
                Vec::new(),
            )?,
            mesos_address: fields.optional("mesos_address", valid_str)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub command: String,
    pub executor: ExecutorType,
    pub requires: Vec<String>,
    pub node: Option<String>,
    pub expected_runtime: Duration,
    pub retries: Option<u64>,
    pub retries_delay: Option<Duration>,
    pub trigger_downstreams: Option<bool>,
    /// Present exactly when `executor` is [`ExecutorType::Mesos`].
    pub mesos: Option<MesosSettings>,
}

fn valid_action_name(value: &Value, ctx: &ConfigContext) -> Result<String> {
    let name = valid_identifier(value, ctx)?;
    if name == CLEANUP_ACTION_NAME {
        config_bail!("Action name reserved for cleanup action at {}", ctx.path());
    }
    Ok(name)
}

/// `requires` is a list of action names. A bare string is still accepted
/// but deprecated; a `{name: ...}` mapping stands for that name.
fn valid_requires(value: &Value, ctx: &ConfigContext) -> Result<Vec<String>> {
    let items: Vec<Value> = match value {
        Value::String(_) => {
            warn!(
                path = ctx.path(),
                "requires without a list is deprecated; use a list of action names"
            );
            vec![value.clone()]
        }
        Value::Object(_) => vec![value.clone()],
        Value::Array(items) => items.clone(),
        other => config_bail!(
            "Value at {} is not a list: {}",
            ctx.path(),
            display_value(other)
        ),
    };

    let mut requires = Vec::with_capacity(items.len());
    for item in &items {
        let name = match item {
            Value::Object(map) => match map.get("name") {
                Some(name) => valid_identifier(name, ctx)?,
                None => config_bail!(
                    "Value at {} is not an action name: {}",
                    ctx.path(),
                    display_value(item)
                ),
            },
            other => valid_identifier(other, ctx)?,
        };
        if name == CLEANUP_ACTION_NAME {
            config_bail!(
                "Actions cannot depend on the cleanup action. ({})",
                ctx.path()
            );
        }
        requires.push(name);
    }
    Ok(requires)
}

/// Fields shared by regular and cleanup actions.
fn build_common(fields: &Fields, name: String, requires: Vec<String>) -> Result<Action> {
    let command_validator = build_format_string_validator(JOB_CONTEXT_KEYS);
    let executor = fields.or_default("executor", valid_executor, ExecutorType::default())?;

    let mesos = if executor == ExecutorType::Mesos {
        Some(MesosSettings::from_fields(fields)?)
    } else {
        let stray: Vec<&str> = MESOS_KEYS
            .iter()
            .copied()
            .filter(|key| fields.get(key).is_some())
            .collect();
        if !stray.is_empty() {
            config_bail!(
                "Options {} at {} only apply to the mesos executor",
                stray.join(", "),
                fields.ctx().path()
            );
        }
        None
    };

    Ok(Action {
        name,
        command: fields.required("command", command_validator)?,
        executor,
        requires,
        node: fields.optional("node", valid_node_name)?,
        expected_runtime: fields.or_default(
            "expected_runtime",
            valid_time_delta,
            DEFAULT_EXPECTED_RUNTIME,
        )?,
        retries: fields.optional("retries", valid_int)?,
        retries_delay: fields.optional("retries_delay", valid_time_delta)?,
        trigger_downstreams: fields.optional("trigger_downstreams", valid_bool)?,
        mesos,
    })
}

/// `name` is listed so cleanup actions may spell out the reserved name;
/// regular actions require it anyway.
const ACTION_OPTIONAL_KEYS: &[&str] = &[
    "name",
    "requires",
    "node",
    "executor",
    "expected_runtime",
    "retries",
    "retries_delay",
    "trigger_downstreams",
    "cpus",
    "mem",
    "constraints",
    "docker_image",
    "docker_parameters",
    "env",
    "extra_volumes",
    "mesos_address",
];

impl Validate for Action {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Action",
        required: &["name", "command"],
        optional: ACTION_OPTIONAL_KEYS,
    };

    fn build(fields: Fields) -> Result<Self> {
        let name = fields.required("name", valid_action_name)?;
        let requires = fields.or_default("requires", valid_requires, Vec::new())?;
        build_common(&fields, name, requires)
    }
}

/// The dependency-free action that runs after every other action of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupAction(pub Action);

impl CleanupAction {
    pub fn action(&self) -> &Action {
        &self.0
    }
}

impl Validate for CleanupAction {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "CleanupAction",
        required: &["command"],
        optional: ACTION_OPTIONAL_KEYS,
    };

    fn build(fields: Fields) -> Result<Self> {
        if let Some(name) = fields.optional("name", valid_identifier)? {
            if name != CLEANUP_ACTION_NAME {
                config_bail!(
                    "Cleanup actions cannot have custom names ({}.{})",
                    fields.ctx().path(),
                    name
                );
            }
        }
        if fields.contains("requires") {
            let requires = fields
                .get("requires")
                .map_or_else(|| "null".to_string(), display_value);
            config_bail!(
                "Cleanup action cannot have dependencies, has {} ({})",
                requires,
                fields.ctx().path()
            );
        }
        build_common(&fields, CLEANUP_ACTION_NAME.to_string(), Vec::new()).map(CleanupAction)
    }
}
