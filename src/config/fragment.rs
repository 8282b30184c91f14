//! Whole configuration fragments.
//!
//! The master fragment declares nodes, pools and global settings alongside
//! its jobs and services. Named fragments only carry jobs and services, in
//! their own namespace. Both validate in two passes: every entity on its
//! own first, then the checks that need the full entity set.

use crate::Result;
use crate::config::MASTER_NAMESPACE;
use crate::config::context::ConfigContext;
use crate::config::entity::{EntitySchema, Fields, Validate, validate};
use crate::config::job::Job;
use crate::config::names::{UniqueNames, insert_unique};
use crate::config::node::{ExecutionTarget, Node, NodePool, validate_node_pool_nodes};
use crate::config::options::{MesosOptions, NotificationOptions, SshOptions, StatePersistence};
use crate::config::service::Service;
use crate::config::validators::{
    valid_command_context, valid_identifier, valid_list, valid_output_stream_dir, valid_time_zone,
};
use crate::config_bail;

use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Root path segment of job, service and node paths in error messages.
const ROOT_PATH: &str = "config";

/// Validate each item of a list-valued field with `T`.
fn entity_items<T: Validate>(fields: &Fields, key: &str, ctx: &ConfigContext) -> Result<Vec<T>> {
    match fields.get(key) {
        Some(value) => valid_list(value, &fields.field_ctx(key))?
            .iter()
            .map(|item| validate(Some(item), ctx))
            .collect(),
        None => Ok(Vec::new()),
    }
}

type JobsAndServices = (BTreeMap<String, Job>, BTreeMap<String, Service>);

fn validate_jobs_and_services(fields: &Fields, ctx: &ConfigContext) -> Result<JobsAndServices> {
    let mut names = UniqueNames::new("Job and Service names must be unique");

    let mut jobs = BTreeMap::new();
    for job in entity_items::<Job>(fields, "jobs", ctx)? {
        names.claim(&job.name)?;
        insert_unique(&mut jobs, job.name.clone(), job, "Job")?;
    }

    let mut services = BTreeMap::new();
    for service in entity_items::<Service>(fields, "services", ctx)? {
        names.claim(&service.name)?;
        insert_unique(&mut services, service.name.clone(), service, "Service")?;
    }

    debug!(
        namespace = ctx.namespace(),
        jobs = jobs.len(),
        services = services.len(),
        "validated jobs and services"
    );
    Ok((jobs, services))
}

/// The `MASTER` fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterConfig {
    pub output_stream_dir: Option<String>,
    pub command_context: BTreeMap<String, String>,
    pub ssh_options: SshOptions,
    pub notification_options: Option<NotificationOptions>,
    pub time_zone: Option<Tz>,
    pub state_persistence: StatePersistence,
    pub mesos_options: MesosOptions,
    pub nodes: BTreeMap<String, Node>,
    pub node_pools: BTreeMap<String, NodePool>,
    pub jobs: BTreeMap<String, Job>,
    pub services: BTreeMap<String, Service>,
}

impl MasterConfig {
    /// Resolve a node or node-pool name.
    pub fn target(&self, name: &str) -> Option<ExecutionTarget<'_>> {
        self.nodes
            .get(name)
            .map(ExecutionTarget::Node)
            .or_else(|| self.node_pools.get(name).map(ExecutionTarget::Pool))
    }

    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .keys()
            .chain(self.node_pools.keys())
            .map(String::as_str)
    }
}

impl Validate for MasterConfig {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "MasterConfig",
        required: &[],
        optional: &[
            "config_name",
            "output_stream_dir",
            "command_context",
            "ssh_options",
            "notification_options",
            "time_zone",
            "state_persistence",
            "mesos_options",
            "nodes",
            "node_pools",
            "jobs",
            "services",
        ],
    };

    fn build(fields: Fields) -> Result<Self> {
        if let Some(name) = fields.optional("config_name", valid_identifier)? {
            if name != MASTER_NAMESPACE {
                config_bail!(
                    "config_name {} of the master configuration must be {}",
                    name,
                    MASTER_NAMESPACE
                );
            }
        }

        let command_context =
            fields.or_default("command_context", valid_command_context, BTreeMap::new())?;
        let root = fields
            .ctx()
            .rooted(ROOT_PATH)
            .with_namespace(MASTER_NAMESPACE)
            .with_command_context(command_context.clone());

        // Pass one for targets: each node and pool on its own.
        let mut target_names = UniqueNames::new("Node and NodePool names must be unique");
        let mut nodes = BTreeMap::new();
        let declared_nodes = match fields.get("nodes") {
            Some(_) => entity_items::<Node>(&fields, "nodes", &root)?,
            None => vec![Node::localhost()],
        };
        for node in declared_nodes {
            target_names.claim(&node.name)?;
            insert_unique(&mut nodes, node.name.clone(), node, "Node")?;
        }
        let mut node_pools = BTreeMap::new();
        for pool in entity_items::<NodePool>(&fields, "node_pools", &root)? {
            target_names.claim(&pool.name)?;
            insert_unique(&mut node_pools, pool.name.clone(), pool, "NodePool")?;
        }

        // Pass two: pools reference plain, declared nodes only.
        validate_node_pool_nodes(&nodes, &node_pools)?;
        debug!(
            nodes = nodes.len(),
            node_pools = node_pools.len(),
            "validated execution targets"
        );

        let job_ctx = root.with_nodes(target_names.into_names());
        let (jobs, services) = validate_jobs_and_services(&fields, &job_ctx)?;

        Ok(MasterConfig {
            output_stream_dir: fields
                .optional("output_stream_dir", valid_output_stream_dir)?
                .flatten(),
            command_context,
            ssh_options: fields
                .optional_entity::<SshOptions>("ssh_options")?
                .unwrap_or_default(),
            notification_options: fields.optional_entity("notification_options")?,
            time_zone: fields.optional("time_zone", valid_time_zone)?,
            state_persistence: fields
                .optional_entity::<StatePersistence>("state_persistence")?
                .unwrap_or_default(),
            mesos_options: fields
                .optional_entity::<MesosOptions>("mesos_options")?
                .unwrap_or_default(),
            nodes,
            node_pools,
            jobs,
            services,
        })
    }
}

/// A fragment contributing jobs and services under its own namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedConfig {
    pub config_name: String,
    pub jobs: BTreeMap<String, Job>,
    pub services: BTreeMap<String, Service>,
}

impl Validate for NamedConfig {
    const SCHEMA: EntitySchema = EntitySchema {
        type_name: "NamedConfig",
        required: &[],
        optional: &["config_name", "jobs", "services"],
    };

    fn build(fields: Fields) -> Result<Self> {
        let config_name = match fields.optional("config_name", valid_identifier)? {
            Some(name) => name,
            None => {
                let namespace = Value::String(fields.ctx().namespace().to_string());
                valid_identifier(&namespace, &fields.field_ctx("config_name"))?
            }
        };
        if config_name == MASTER_NAMESPACE {
            config_bail!(
                "Named configuration cannot use the reserved namespace {}",
                MASTER_NAMESPACE
            );
        }
        let ctx = fields.ctx().rooted(ROOT_PATH).with_namespace(&config_name);
        let (jobs, services) = validate_jobs_and_services(&fields, &ctx)?;
        Ok(NamedConfig {
            config_name,
            jobs,
            services,
        })
    }
}

/// One validated namespace of a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigFragment {
    Master(Box<MasterConfig>),
    Named(NamedConfig),
}

impl ConfigFragment {
    /// Validate `raw` as the fragment for `namespace`.
    pub fn validate(namespace: &str, raw: &Value, ctx: &ConfigContext) -> Result<Self> {
        if namespace == MASTER_NAMESPACE {
            validate::<MasterConfig>(Some(raw), ctx).map(|c| ConfigFragment::Master(Box::new(c)))
        } else {
            let named: NamedConfig = validate(Some(raw), &ctx.with_namespace(namespace))?;
            if named.config_name != namespace {
                config_bail!(
                    "Fragment {} declares config_name {}",
                    namespace,
                    named.config_name
                );
            }
            Ok(ConfigFragment::Named(named))
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            ConfigFragment::Master(_) => MASTER_NAMESPACE,
            ConfigFragment::Named(named) => &named.config_name,
        }
    }

    pub fn jobs(&self) -> &BTreeMap<String, Job> {
        match self {
            ConfigFragment::Master(master) => &master.jobs,
            ConfigFragment::Named(named) => &named.jobs,
        }
    }

    pub fn services(&self) -> &BTreeMap<String, Service> {
        match self {
            ConfigFragment::Master(master) => &master.services,
            ConfigFragment::Named(named) => &named.services,
        }
    }

    pub fn as_master(&self) -> Option<&MasterConfig> {
        match self {
            ConfigFragment::Master(master) => Some(master.as_ref()),
            ConfigFragment::Named(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::DEFAULT_NODE_NAME;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn master(raw: Value) -> Result<MasterConfig> {
        validate(Some(&raw), &ConfigContext::null())
    }

    fn job(name: &str, node: &str) -> Value {
        json!({
            "name": name,
            "node": node,
            "schedule": "interval 20s",
            "actions": [{"name": "action", "command": "command"}],
        })
    }

    #[test]
    fn empty_master_gets_defaults() {
        let config = master(json!({})).unwrap();
        assert_eq!(config.nodes.keys().collect::<Vec<_>>(), vec![DEFAULT_NODE_NAME]);
        assert_eq!(config.ssh_options, SshOptions::default());
        assert_eq!(config.state_persistence, StatePersistence::default());
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn nodes_pools_and_jobs() {
        let config = master(json!({
            "command_context": {"batch_dir": "/tron/batch"},
            "nodes": [{"name": "node0", "hostname": "node0"}, {"name": "node1", "hostname": "node1"}],
            "node_pools": [{"name": "NodePool", "nodes": ["node0", "node1"]}],
            "jobs": [
                job("test_job0", "node0"),
                job("test_job1", "NodePool"),
            ],
            "services": [{
                "name": "service0",
                "node": "NodePool",
                "pid_file": "/var/run/%(name)s.pid",
                "command": "run %(batch_dir)s",
                "monitor_interval": 20,
            }],
        }))
        .unwrap();

        assert_eq!(config.target_names().count(), 3);
        assert!(matches!(config.target("NodePool"), Some(ExecutionTarget::Pool(_))));
        assert!(matches!(config.target("node0"), Some(ExecutionTarget::Node(_))));
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.services["service0"].namespace, MASTER_NAMESPACE);
    }

    #[test]
    fn node_and_pool_names_share_a_namespace() {
        let err = master(json!({
            "nodes": [{"name": "sameName", "hostname": "box"}],
            "node_pools": [{"name": "sameName", "nodes": ["sameName"]}],
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Node and NodePool names must be unique sameName");
    }

    #[test]
    fn nested_pool() {
        let err = master(json!({
            "nodes": ["node0", "node1"],
            "node_pools": [
                {"name": "pool0", "nodes": ["node1"]},
                {"name": "pool1", "nodes": ["node0", "pool0"]},
            ],
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "NodePool pool1 contains other NodePools: pool0");
    }

    #[test]
    fn job_and_service_names_share_a_namespace() {
        let err = master(json!({
            "nodes": ["node0"],
            "jobs": [job("sameName", "node0")],
            "services": [{
                "name": "sameName",
                "node": "node0",
                "pid_file": "/tmp/x.pid",
                "command": "run",
                "monitor_interval": 20,
            }],
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Job and Service names must be unique sameName");
    }

    #[test]
    fn unknown_job_node() {
        let err = master(json!({
            "nodes": ["node0"],
            "jobs": [job("test_job0", "node9")],
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown node name node9 at config.Job.test_job0.node");
    }

    #[test]
    fn command_context_extends_template_keys() {
        let raw = json!({
            "nodes": ["node0"],
            "jobs": [{
                "name": "test_job0",
                "node": "node0",
                "schedule": "constant",
                "actions": [{"name": "action", "command": "%(python)s run.py"}],
            }],
        });
        assert!(master(raw.clone()).is_err());

        let mut with_context = raw;
        with_context["command_context"] = json!({"python": "/usr/bin/python"});
        assert!(master(with_context).is_ok());
    }

    #[test]
    fn named_fragment() {
        let raw = json!({
            "config_name": "other",
            "jobs": [job("test_job0", "node0")],
        });
        let fragment = ConfigFragment::validate("other", &raw, &ConfigContext::null()).unwrap();
        assert_eq!(fragment.namespace(), "other");
        assert_eq!(fragment.jobs()["test_job0"].namespace, "other");
        assert!(fragment.as_master().is_none());
    }

    #[test]
    fn named_fragment_name_defaults_to_namespace() {
        let raw = json!({"jobs": [job("test_job0", "node0")]});
        let fragment = ConfigFragment::validate("other", &raw, &ConfigContext::null()).unwrap();
        assert_eq!(fragment.namespace(), "other");

        let raw = json!({"config_name": "third"});
        let err = ConfigFragment::validate("other", &raw, &ConfigContext::null()).unwrap_err();
        assert_eq!(err.to_string(), "Fragment other declares config_name third");

        let raw = json!({"services": []});
        let err = ConfigFragment::validate("bad ns", &raw, &ConfigContext::null()).unwrap_err();
        assert!(
            err.to_string().ends_with("is not a valid identifier: bad ns"),
            "{err}"
        );
    }

    #[test]
    fn named_fragment_rejects_master_keys() {
        let raw = json!({"config_name": "other", "nodes": ["node0"]});
        let err = ConfigFragment::validate("other", &raw, &ConfigContext::null()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown options in NamedConfig: nodes");
    }
}
