//! Global option blocks of the master configuration.

use crate::Result;
use crate::config::action::Volume;
use crate::config::entity::{EntitySchema, Fields, Validate, valid_entity_list};
use crate::config::validators::{
    valid_bool, valid_float, valid_identity_file, valid_int, valid_known_hosts_file, valid_list,
    valid_str,
};
use crate::config_bail;

/// Settings for the SSH executor.
#[derive(Debug, Clone, PartialEq)]
pub struct SshOptions {
    pub agent: bool,
    pub identities: Vec<String>,
    pub known_hosts_file: Option<String>,
    /// Seconds.
    pub connect_timeout: u64,
    /// Seconds an idle connection stays open.
    pub idle_connection_timeout: u64,
    pub jitter_min_load: u64,
    pub jitter_max_delay: u64,
    pub jitter_load_factor: u64,
}

impl Default for SshOptions {
    fn default() -> Self {
        SshOptions {
            agent: false,
            identities: Vec::new(),
            known_hosts_file: None,
            connect_timeout: 30,
            idle_connection_timeout: 3600,
            jitter_min_load: 4,
            jitter_max_delay: 20,
            jitter_load_factor: 1,
        }
    }
}

impl Validate for SshOptions {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "SSHOptions",
        required: &[],
        optional: &[
            "agent",
            "identities",
            "known_hosts_file",
            "connect_timeout",
            "idle_connection_timeout",
            "jitter_min_load",
            "jitter_max_delay",
            "jitter_load_factor",
        ],
    };

    fn build(fields: Fields) -> Result<Self> {
        let defaults = SshOptions::default();
        let identities = fields.or_default(
            "identities",
            |value, ctx| {
                valid_list(value, ctx)?
                    .iter()
                    .map(|file| valid_identity_file(file, ctx))
                    .collect()
            },
            defaults.identities,
        )?;
        Ok(SshOptions {
            agent: fields.or_default("agent", valid_bool, defaults.agent)?,
            identities,
            known_hosts_file: fields.optional("known_hosts_file", valid_known_hosts_file)?,
            connect_timeout: fields.or_default(
                "connect_timeout",
                valid_int,
                defaults.connect_timeout,
            )?,
            idle_connection_timeout: fields.or_default(
                "idle_connection_timeout",
                valid_int,
                defaults.idle_connection_timeout,
            )?,
            jitter_min_load: fields.or_default(
                "jitter_min_load",
                valid_int,
                defaults.jitter_min_load,
            )?,
            jitter_max_delay: fields.or_default(
                "jitter_max_delay",
                valid_int,
                defaults.jitter_max_delay,
            )?,
            jitter_load_factor: fields.or_default(
                "jitter_load_factor",
                valid_int,
                defaults.jitter_load_factor,
            )?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    #[default]
    Shelve,
    Sql,
    Mongo,
    Yaml,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Shelve => "shelve",
            StoreType::Sql => "sql",
            StoreType::Mongo => "mongo",
            StoreType::Yaml => "yaml",
        }
    }
}

/// Where the scheduler keeps its state between restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePersistence {
    pub name: String,
    pub store_type: StoreType,
    pub connection_details: Option<String>,
    pub buffer_size: u64,
}

pub const DEFAULT_STATE_NAME: &str = "sched_state";

impl Default for StatePersistence {
    fn default() -> Self {
        StatePersistence {
            name: DEFAULT_STATE_NAME.to_string(),
            store_type: StoreType::default(),
            connection_details: None,
            buffer_size: 1,
        }
    }
}

impl Validate for StatePersistence {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "StatePersistence",
        required: &["name"],
        optional: &["store_type", "connection_details", "buffer_size"],
    };

    fn build(fields: Fields) -> Result<Self> {
        let store_type = fields.or_default(
            "store_type",
            |value, ctx| match valid_str(value, ctx)?.as_str() {
                "shelve" => Ok(StoreType::Shelve),
                "sql" => Ok(StoreType::Sql),
                "mongo" => Ok(StoreType::Mongo),
                "yaml" => Ok(StoreType::Yaml),
                other => config_bail!(
                    "Unknown store_type {} at {}, expected one of shelve, sql, mongo, yaml",
                    other,
                    ctx.path()
                ),
            },
            StoreType::default(),
        )?;

        let buffer_size = fields.or_default("buffer_size", valid_int, 1)?;
        if buffer_size < 1 {
            config_bail!("{} buffer_size must be >= 1.", fields.ctx().path());
        }

        Ok(StatePersistence {
            name: fields.required("name", valid_str)?,
            store_type,
            connection_details: fields.optional("connection_details", valid_str)?,
            buffer_size,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOptions {
    pub smtp_host: String,
    pub notification_addr: String,
}

impl Validate for NotificationOptions {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "NotificationOptions",
        required: &["smtp_host", "notification_addr"],
        optional: &[],
    };

    fn build(fields: Fields) -> Result<Self> {
        Ok(NotificationOptions {
            smtp_host: fields.required("smtp_host", valid_str)?,
            notification_addr: fields.required("notification_addr", valid_str)?,
        })
    }
}

/// Settings for the container executor cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct MesosOptions {
    pub enabled: bool,
    pub default_volumes: Vec<Volume>,
    pub dockercfg_location: Option<String>,
    /// Seconds.
    pub offer_timeout: f64,
}

impl Default for MesosOptions {
    fn default() -> Self {
        MesosOptions {
            enabled: false,
            default_volumes: Vec::new(),
            dockercfg_location: None,
            offer_timeout: 300.0,
        }
    }
}

impl Validate for MesosOptions {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "MesosOptions",
        required: &[],
        optional: &[
            "enabled",
            "default_volumes",
            "dockercfg_location",
            "offer_timeout",
        ],
    };

    fn build(fields: Fields) -> Result<Self> {
        let defaults = MesosOptions::default();
        Ok(MesosOptions {
            enabled: fields.or_default("enabled", valid_bool, defaults.enabled)?,
            default_volumes: fields.or_default(
                "default_volumes",
                valid_entity_list::<Volume>,
                defaults.default_volumes,
            )?,
            dockercfg_location: fields.optional("dockercfg_location", valid_str)?,
            offer_timeout: fields.or_default(
                "offer_timeout",
                valid_float,
                defaults.offer_timeout,
            )?,
        })
    }
}
