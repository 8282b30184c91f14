//! The merged view over every validated namespace.

use crate::Result;
use crate::config::MASTER_NAMESPACE;
use crate::config::fragment::{ConfigFragment, MasterConfig, NamedConfig};
use crate::config::job::Job;
use crate::config::service::Service;
use crate::config_bail;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// All namespaces of a configuration, collated into one addressable job and
/// service space keyed by `<namespace>.<name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigContainer {
    master: MasterConfig,
    named: BTreeMap<String, NamedConfig>,
    jobs: BTreeMap<String, Job>,
    services: BTreeMap<String, Service>,
}

/// Serializable overview of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub namespaces: Vec<String>,
    pub jobs: Vec<String>,
    pub services: Vec<String>,
    pub nodes: Vec<String>,
}

impl ConfigContainer {
    /// Collate validated fragments. Exactly one must be the master.
    pub fn create(fragments: BTreeMap<String, ConfigFragment>) -> Result<Self> {
        let mut master = None;
        let mut named = BTreeMap::new();
        for (namespace, fragment) in fragments {
            match fragment {
                ConfigFragment::Master(config) if namespace == MASTER_NAMESPACE => {
                    master = Some(*config);
                }
                ConfigFragment::Named(config) if namespace != MASTER_NAMESPACE => {
                    named.insert(namespace, config);
                }
                _ => config_bail!("Fragment kind does not match namespace {}", namespace),
            }
        }
        let Some(master) = master else {
            config_bail!("Configuration container requires a MASTER namespace");
        };

        let mut jobs = BTreeMap::new();
        let mut services = BTreeMap::new();
        let mut sources: Vec<(&str, &BTreeMap<String, Job>, &BTreeMap<String, Service>)> =
            vec![(MASTER_NAMESPACE, &master.jobs, &master.services)];
        sources.extend(
            named
                .iter()
                .map(|(ns, config)| (ns.as_str(), &config.jobs, &config.services)),
        );
        for (namespace, fragment_jobs, fragment_services) in sources {
            for (name, job) in fragment_jobs {
                let identifier = format!("{namespace}.{name}");
                if jobs.contains_key(&identifier) || services.contains_key(&identifier) {
                    config_bail!("Collision found for identifier '{}'", identifier);
                }
                jobs.insert(identifier, job.clone());
            }
            for (name, service) in fragment_services {
                let identifier = format!("{namespace}.{name}");
                if jobs.contains_key(&identifier) || services.contains_key(&identifier) {
                    config_bail!("Collision found for identifier '{}'", identifier);
                }
                services.insert(identifier, service.clone());
            }
        }

        debug!(
            namespaces = named.len() + 1,
            jobs = jobs.len(),
            services = services.len(),
            "collated configuration container"
        );
        Ok(ConfigContainer {
            master,
            named,
            jobs,
            services,
        })
    }

    pub fn master(&self) -> &MasterConfig {
        &self.master
    }

    /// `MASTER` first, then named namespaces in name order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        std::iter::once(MASTER_NAMESPACE).chain(self.named.keys().map(String::as_str))
    }

    pub fn named(&self, namespace: &str) -> Option<&NamedConfig> {
        self.named.get(namespace)
    }

    /// Namespaced identifiers of every job.
    pub fn job_names(&self) -> BTreeSet<String> {
        self.jobs.keys().cloned().collect()
    }

    /// Every job keyed by its namespaced identifier.
    pub fn jobs(&self) -> &BTreeMap<String, Job> {
        &self.jobs
    }

    /// Look up a job by identifier, or by bare name for master jobs.
    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs
            .get(name)
            .or_else(|| self.jobs.get(&format!("{MASTER_NAMESPACE}.{name}")))
    }

    pub fn service_names(&self) -> BTreeSet<String> {
        self.services.keys().cloned().collect()
    }

    pub fn services(&self) -> &BTreeMap<String, Service> {
        &self.services
    }

    pub fn get_service(&self, name: &str) -> Option<&Service> {
        self.services
            .get(name)
            .or_else(|| self.services.get(&format!("{MASTER_NAMESPACE}.{name}")))
    }

    /// Names of every node and node pool. Only the master declares them.
    pub fn node_names(&self) -> BTreeSet<String> {
        self.master().target_names().map(str::to_string).collect()
    }

    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            namespaces: self.namespaces().map(str::to_string).collect(),
            jobs: self.job_names().into_iter().collect(),
            services: self.service_names().into_iter().collect(),
            nodes: self.node_names().into_iter().collect(),
        }
    }
}
