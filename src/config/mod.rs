// src/config/mod.rs

//! Configuration loading and validation for rsyncjob.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate ids and task references, then resolve jobs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, JobConfig, RawConfigFile, SettingsSection, TaskConfig};
