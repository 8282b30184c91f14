//! Configuration compiler for a distributed job scheduler.
//!
//! Takes decoded configuration documents (nodes, node pools, jobs, services
//! and global options, split across namespaces) and produces a validated,
//! immutable [`ConfigContainer`]. Every failure is a [`ConfigError`] whose
//! message names the offending path; no partial configuration is returned.
//!
//! ```no_run
//! let container = sched_config::load_config(&std::fs::read_to_string("config.yaml")?)?;
//! for name in container.job_names() {
//!     println!("{name}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod manager;
pub mod schedule;

pub use container::{ConfigContainer, ContainerSummary};
pub use error::ConfigError;
pub use manager::{
    ConfigStore, load_config, parse_document, update_config, validate_config_mapping,
    validate_fragment,
};

pub type Result<T> = std::result::Result<T, ConfigError>;
