//! Loading documents into containers, and publishing them.

use crate::Result;
use crate::config::MASTER_NAMESPACE;
use crate::config::context::ConfigContext;
use crate::config::fragment::ConfigFragment;
use crate::config::raw::{RawMap, display_value};
use crate::config_bail;
use crate::container::ConfigContainer;
use crate::error::ConfigError;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Decode YAML text into a raw document.
pub fn parse_document(text: &str) -> Result<Value> {
    Ok(serde_yaml::from_str::<Value>(text)?)
}

fn expect_document_mapping(doc: Value) -> Result<RawMap> {
    match doc {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(RawMap::new()),
        other => config_bail!(
            "Configuration document is not a mapping: {}",
            display_value(&other)
        ),
    }
}

/// Namespace a fragment claims through `config_name`, `MASTER` if none.
fn fragment_namespace(fragment: &Value) -> String {
    fragment
        .get("config_name")
        .and_then(Value::as_str)
        .unwrap_or(MASTER_NAMESPACE)
        .to_string()
}

/// Map of namespace to raw fragment. A document without a `MASTER` key is a
/// single legacy fragment, keyed by its own `config_name`.
fn namespaced_mapping(doc: Value) -> Result<RawMap> {
    let map = expect_document_mapping(doc)?;
    if map.contains_key(MASTER_NAMESPACE) {
        return Ok(map);
    }
    let fragment = Value::Object(map);
    let namespace = fragment_namespace(&fragment);
    debug!(namespace = %namespace, "wrapping single-fragment document");
    let mut wrapped = RawMap::new();
    wrapped.insert(namespace, fragment);
    Ok(wrapped)
}

/// Validate every fragment of `mapping`, `MASTER` first, then named
/// fragments in name order. Named fragments see the master's nodes and
/// command context.
pub fn validate_config_mapping(mapping: &RawMap) -> Result<Vec<(String, ConfigFragment)>> {
    let Some(master_raw) = mapping.get(MASTER_NAMESPACE) else {
        config_bail!("Configuration mapping requires a MASTER namespace");
    };

    let master = ConfigFragment::validate(MASTER_NAMESPACE, master_raw, &ConfigContext::null())?;
    let named_ctx = match master.as_master() {
        Some(config) => ConfigContext::null()
            .with_nodes(config.target_names().map(str::to_string).collect())
            .with_command_context(config.command_context.clone()),
        None => ConfigContext::null(),
    };

    let mut fragments = vec![(MASTER_NAMESPACE.to_string(), master)];
    let mut named: Vec<(&String, &Value)> = mapping
        .iter()
        .filter(|(ns, _)| ns.as_str() != MASTER_NAMESPACE)
        .collect();
    named.sort_by(|a, b| a.0.cmp(b.0));
    for (namespace, raw) in named {
        let fragment = ConfigFragment::validate(namespace, raw, &named_ctx)?;
        debug!(namespace = %namespace, "validated named fragment");
        fragments.push((namespace.clone(), fragment));
    }
    Ok(fragments)
}

/// Parse, validate and collate a whole document.
pub fn load_config(text: &str) -> Result<ConfigContainer> {
    let mapping = namespaced_mapping(parse_document(text)?)?;
    let fragments: BTreeMap<String, ConfigFragment> =
        validate_config_mapping(&mapping)?.into_iter().collect();
    ConfigContainer::create(fragments)
}

fn fragment_document(content: &str) -> Result<(String, Value)> {
    let fragment = Value::Object(expect_document_mapping(parse_document(content)?)?);
    Ok((fragment_namespace(&fragment), fragment))
}

/// Validate a single fragment document on its own, under a partial context:
/// node references are not resolved and filesystem checks are skipped.
pub fn validate_fragment(content: &str) -> Result<ConfigFragment> {
    let (namespace, raw) = fragment_document(content)?;
    ConfigFragment::validate(
        &namespace,
        &raw,
        &ConfigContext::partial("", namespace.as_str()),
    )
}

/// Replace one namespace of `original_text` with the fragment in `content`
/// and return the merged document. The fragment is validated on its own,
/// then the merged document as a whole; nothing is written anywhere.
pub fn update_config(original_text: &str, content: &str) -> Result<String> {
    let mut original = namespaced_mapping(parse_document(original_text)?)?;

    validate_fragment(content)?;
    let (namespace, update) = fragment_document(content)?;

    original.insert(namespace.clone(), update);
    let merged = serde_yaml::to_string(&Value::Object(original))
        .map_err(|err| ConfigError::new(format!("Failed to render configuration: {err}")))?;
    load_config(&merged)?;
    debug!(namespace = %namespace, "validated configuration update");
    Ok(merged)
}

/// Holds the published container. Readers take a snapshot with
/// [`ConfigStore::current`]; reloads build a complete new container before
/// swapping it in, one reload at a time.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<ConfigContainer>>,
    reload_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(container: ConfigContainer) -> Self {
        Self {
            current: RwLock::new(Arc::new(container)),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn load(text: &str) -> Result<Self> {
        load_config(text).map(Self::new)
    }

    pub fn current(&self) -> Arc<ConfigContainer> {
        Arc::clone(&self.current.read())
    }

    /// Validate `text` and publish it. On error the published container is
    /// left as it was.
    pub fn reload(&self, text: &str) -> Result<Arc<ConfigContainer>> {
        let _guard = self.reload_lock.lock();
        let container = Arc::new(load_config(text)?);
        *self.current.write() = Arc::clone(&container);
        info!(
            jobs = container.jobs().len(),
            services = container.services().len(),
            "published configuration"
        );
        Ok(container)
    }
}
