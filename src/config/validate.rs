// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{EngineError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::EngineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.settings, raw.job, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_settings(cfg)?;
    validate_ids(cfg)?;
    validate_tasks(cfg)?;
    validate_task_references(cfg)?;
    Ok(())
}

fn validate_settings(cfg: &RawConfigFile) -> Result<()> {
    if cfg.settings.rsync_path.trim().is_empty() {
        return Err(EngineError::ConfigError(
            "[settings].rsync_path must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Ids end up as the first field of history lines, so they must be
/// non-empty and free of whitespace.
fn validate_ids(cfg: &RawConfigFile) -> Result<()> {
    let ids = cfg
        .job
        .keys()
        .map(|id| ("job", id))
        .chain(cfg.task.keys().map(|id| ("task", id)));

    for (kind, id) in ids {
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(EngineError::ConfigError(format!(
                "{} id '{}' must be non-empty and contain no whitespace",
                kind, id
            )));
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (id, task) in cfg.task.iter() {
        if task.source.trim().is_empty() {
            return Err(EngineError::ConfigError(format!(
                "task '{}' has an empty `source`",
                id
            )));
        }
        if task.destination.trim().is_empty() {
            return Err(EngineError::ConfigError(format!(
                "task '{}' has an empty `destination`",
                id
            )));
        }
    }
    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile) -> Result<()> {
    for (id, job) in cfg.job.iter() {
        for task in job.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(EngineError::ConfigError(format!(
                    "job '{}' references unknown task '{}'",
                    id, task
                )));
            }
        }
    }
    Ok(())
}
