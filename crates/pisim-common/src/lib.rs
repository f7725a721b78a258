//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives for the pisim workspace."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the pisim workspace: configuration loading, tracing
//! bootstrap and wall-clock helpers.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, GeneratorConfig, LoadedAppConfig, LoggingConfig, UploadConfig};
pub use logging::{init_tracing, LogFormat};
