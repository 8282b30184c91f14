//! Configuration validation.
//!
//! The modules here turn decoded documents into typed, immutable records:
//!
//! - `context`, `raw`, `validators`: path tracking, input shapes, primitives
//! - `entity`: the generic validation algorithm shared by every record
//! - `node`, `action`, `job`, `service`, `options`: concrete records
//! - `dag`: per-job action graph checks
//! - `fragment`: whole documents (master and named)

pub mod action;
pub mod context;
pub mod dag;
pub mod entity;
pub mod fragment;
pub mod job;
pub mod names;
pub mod node;
pub mod options;
pub mod raw;
pub mod service;
pub mod validators;

pub use action::{
    Action, CleanupAction, Constraint, DockerParameter, ExecutorType, MesosSettings, Volume,
    VolumeMode,
};
pub use context::ConfigContext;
pub use entity::{EntitySchema, Fields, Validate, validate, validate_optional};
pub use fragment::{ConfigFragment, MasterConfig, NamedConfig};
pub use job::Job;
pub use node::{ExecutionTarget, Node, NodePool};
pub use options::{MesosOptions, NotificationOptions, SshOptions, StatePersistence, StoreType};
pub use service::Service;

/// Namespace of the fragment that declares nodes and global settings.
pub const MASTER_NAMESPACE: &str = "MASTER";

/// Name every cleanup action gets; regular actions may not use it.
pub const CLEANUP_ACTION_NAME: &str = "cleanup";

/// Placeholders available to job and action command templates.
pub const JOB_CONTEXT_KEYS: &[&str] = &[
    "cleanup_job_status",
    "runid",
    "actionname",
    "node",
    "name",
    "namespace",
    "last_success",
    "shortdate",
    "year",
    "month",
    "day",
    "hour",
    "unixtime",
    "daynumber",
    "ym",
    "ymd",
    "ymdh",
    "ymdhm",
];

/// Placeholders available to service `command` and `pid_file` templates.
pub const SERVICE_CONTEXT_KEYS: &[&str] =
    &["pid_file", "name", "instance_number", "node", "namespace"];
