//! Execution targets: nodes and node pools.

use crate::Result;
use crate::config::context::ConfigContext;
use crate::config::entity::{EntitySchema, Fields, Validate, expect_mapping};
use crate::config::raw::{RawInput, RawMap};
use crate::config::validators::{valid_identifier, valid_int, valid_populated_list, valid_str};
use crate::config_bail;

use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_NODE_NAME: &str = "localhost";
const FALLBACK_USERNAME: &str = "batch";

/// Username of the invoking user, used when a node doesn't name one.
pub fn default_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| FALLBACK_USERNAME.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub hostname: String,
    pub username: String,
    pub port: u16,
}

impl Node {
    /// The node used when a configuration declares none.
    pub fn localhost() -> Self {
        Node {
            name: DEFAULT_NODE_NAME.to_string(),
            hostname: DEFAULT_NODE_NAME.to_string(),
            username: default_username(),
            port: DEFAULT_SSH_PORT,
        }
    }
}

fn valid_port(value: &Value, ctx: &ConfigContext) -> Result<u16> {
    let port = valid_int(value, ctx)?;
    match u16::try_from(port) {
        Ok(port) => Ok(port),
        Err(_) => config_bail!("Value at {} is not a valid port: {}", ctx.path(), port),
    }
}

impl Validate for Node {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "Node",
        required: &["hostname"],
        optional: &["name", "username", "port"],
    };

    /// A bare string is a node whose name and hostname are that string.
    fn shortcut(input: RawInput<'_>, _ctx: &ConfigContext) -> Result<Option<Self>> {
        Ok(match input {
            RawInput::Scalar(Value::String(host)) => Some(Node {
                name: host.clone(),
                hostname: host.clone(),
                username: default_username(),
                port: DEFAULT_SSH_PORT,
            }),
            _ => None,
        })
    }

    fn build(fields: Fields) -> Result<Self> {
        let hostname = fields.required("hostname", valid_str)?;
        let name = fields.optional("name", valid_identifier)?;
        Ok(Node {
            name: name.unwrap_or_else(|| hostname.clone()),
            username: fields.or_default("username", valid_str, default_username())?,
            port: fields.or_default("port", valid_port, DEFAULT_SSH_PORT)?,
            hostname,
        })
    }
}

/// An ordered group of plain nodes. Pools never contain other pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePool {
    pub name: String,
    pub nodes: Vec<String>,
}

impl Validate for NodePool {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "NodePool",
        required: &["nodes"],
        optional: &["name"],
    };

    /// A bare list is a pool of those node names.
    fn cast(input: RawInput<'_>, ctx: &ConfigContext) -> Result<RawMap> {
        match input {
            RawInput::Sequence(items) => {
                let mut map = RawMap::new();
                map.insert("nodes".to_string(), Value::Array(items.to_vec()));
                Ok(map)
            }
            RawInput::Mapping(map) => Ok(map.clone()),
            other => expect_mapping(other, ctx, Self::SCHEMA.type_name),
        }
    }

    fn build(fields: Fields) -> Result<Self> {
        let members = fields.required("nodes", |value, ctx| {
            valid_populated_list(value, ctx)?
                .iter()
                .map(|member| valid_identifier(member, ctx))
                .collect::<Result<Vec<_>>>()
        })?;
        let name = fields.optional("name", valid_identifier)?;
        Ok(NodePool {
            name: name.unwrap_or_else(|| members.join("_")),
            nodes: members,
        })
    }
}

/// A name resolved against the declared nodes and pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionTarget<'a> {
    Node(&'a Node),
    Pool(&'a NodePool),
}

/// Every pool member must be a declared plain node.
pub fn validate_node_pool_nodes(
    nodes: &BTreeMap<String, Node>,
    pools: &BTreeMap<String, NodePool>,
) -> Result<()> {
    for pool in pools.values() {
        let nested: Vec<&str> = pool
            .nodes
            .iter()
            .filter(|member| pools.contains_key(*member))
            .map(String::as_str)
            .collect();
        if !nested.is_empty() {
            config_bail!(
                "NodePool {} contains other NodePools: {}",
                pool.name,
                nested.join(", ")
            );
        }

        let unknown: Vec<&str> = pool
            .nodes
            .iter()
            .filter(|member| !nodes.contains_key(*member))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            config_bail!(
                "NodePool {} contains unknown nodes: {}",
                pool.name,
                unknown.join(", ")
            );
        }
    }
    Ok(())
}
