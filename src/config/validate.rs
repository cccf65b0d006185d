// src/config/validate.rs

use regex::Regex;

use crate::config::model::{ConfigFile, PipelineSection, RawConfigFile};
use crate::errors::{BuildError, Result};
use crate::pipeline::PathSpec;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_paths(cfg)?;
    validate_pipeline("scripts", &cfg.scripts)?;
    validate_pipeline("styles", &cfg.styles)?;
    validate_test(cfg)?;
    validate_dist(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // triggered_while_running_behaviour is strongly typed and validated
    // during deserialization, so we don't need to check it here.

    if cfg.config.queue_length == 0 {
        return Err(BuildError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.jobs == 0 {
        return Err(BuildError::ConfigError(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    if cfg.paths.dest.trim().is_empty() {
        return Err(BuildError::ConfigError(
            "[paths].dest must not be empty".to_string(),
        ));
    }
    PathSpec::new(&cfg.paths.vendor, &[])?;
    Ok(())
}

fn validate_pipeline(section: &str, p: &PipelineSection) -> Result<()> {
    PathSpec::new(&p.include, &p.exclude)?;
    if let Some(watch) = &p.watch {
        PathSpec::new(watch, &[])?;
    }

    if p.cmd.trim().is_empty() {
        return Err(BuildError::ConfigError(format!(
            "[{section}].cmd must not be empty"
        )));
    }

    if let Some(ext) = &p.extension {
        if ext.is_empty() || ext.contains('/') || ext.starts_with('.') {
            return Err(BuildError::ConfigError(format!(
                "[{section}].extension must be a bare extension like \"js\" (got {ext:?})"
            )));
        }
    }

    let re = Regex::new(&p.location_pattern).map_err(|e| {
        BuildError::ConfigError(format!("[{section}].location_pattern is not a valid regex: {e}"))
    })?;
    if re.capture_names().flatten().all(|name| name != "line") {
        return Err(BuildError::ConfigError(format!(
            "[{section}].location_pattern must contain a named group `line`"
        )));
    }

    Ok(())
}

fn validate_test(cfg: &RawConfigFile) -> Result<()> {
    PathSpec::new(&cfg.test.include, &cfg.test.exclude)?;
    if cfg.test.cmd.trim().is_empty() {
        return Err(BuildError::ConfigError(
            "[test].cmd must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_dist(cfg: &RawConfigFile) -> Result<()> {
    if cfg.dist.platforms.is_empty() {
        return Err(BuildError::ConfigError(
            "[dist].platforms must list at least one target platform".to_string(),
        ));
    }
    if cfg.dist.version.trim().is_empty() {
        return Err(BuildError::ConfigError(
            "[dist].version must not be empty".to_string(),
        ));
    }
    if cfg.dist.cmd.trim().is_empty() {
        return Err(BuildError::ConfigError(
            "[dist].cmd must not be empty".to_string(),
        ));
    }
    Ok(())
}
