//! Validation context: where in the document we are and what it can see.

use crate::config::MASTER_NAMESPACE;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read-only state handed to every validator.
///
/// Children share the target set and command context with their parent, so
/// building one only allocates the extended path.
#[derive(Debug, Clone)]
pub struct ConfigContext {
    path: String,
    nodes: Option<Arc<BTreeSet<String>>>,
    command_context: Arc<BTreeMap<String, String>>,
    namespace: String,
    partial: bool,
}

impl ConfigContext {
    pub fn new(
        path: impl Into<String>,
        nodes: Option<BTreeSet<String>>,
        command_context: BTreeMap<String, String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            nodes: nodes.map(Arc::new),
            command_context: Arc::new(command_context),
            namespace: namespace.into(),
            partial: false,
        }
    }

    /// Context for validator calls made outside any document.
    pub fn null() -> Self {
        Self::new("", None, BTreeMap::new(), MASTER_NAMESPACE)
    }

    /// Context for validating a fragment in isolation. Filesystem
    /// predicates are skipped and paths pass through unchecked.
    pub fn partial(path: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            partial: true,
            ..Self::new(path, None, BTreeMap::new(), namespace)
        }
    }

    pub fn build_child(&self, segment: &str) -> Self {
        let path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.path, segment)
        };
        Self {
            path,
            ..self.clone()
        }
    }

    /// Context that resolves node names against `nodes` instead of the
    /// parent's target set.
    pub fn with_nodes(&self, nodes: BTreeSet<String>) -> Self {
        Self {
            nodes: Some(Arc::new(nodes)),
            ..self.clone()
        }
    }

    pub fn with_command_context(&self, command_context: BTreeMap<String, String>) -> Self {
        Self {
            command_context: Arc::new(command_context),
            ..self.clone()
        }
    }

    /// Same state, path restarted at `path`.
    pub fn rooted(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }

    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..self.clone()
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Known node and node-pool names, if this context has any.
    pub fn nodes(&self) -> Option<&BTreeSet<String>> {
        self.nodes.as_deref()
    }

    pub fn command_context(&self) -> &BTreeMap<String, String> {
        &self.command_context
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }
}
