// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SchedulerError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SchedulerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.copy, raw.alignment))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_workdir(cfg)?;
    validate_copy_limits(cfg)?;
    validate_alignment(cfg)?;
    Ok(())
}

fn validate_workdir(cfg: &RawConfigFile) -> Result<()> {
    let workdir = &cfg.scheduler.workdir;
    if workdir.as_os_str().is_empty() {
        return Err(SchedulerError::ConfigError(
            "[scheduler].workdir must not be empty".to_string(),
        ));
    }
    if !workdir.is_absolute() {
        return Err(SchedulerError::ConfigError(format!(
            "[scheduler].workdir must be absolute (got '{}')",
            workdir.display()
        )));
    }
    Ok(())
}

fn validate_copy_limits(cfg: &RawConfigFile) -> Result<()> {
    let copy = &cfg.copy;
    let caps = [
        ("max_copy_tasks_per_node", copy.max_copy_tasks_per_node),
        (
            "max_waiting_copy_tasks_per_node",
            copy.max_waiting_copy_tasks_per_node,
        ),
        ("max_held_copy_task_ready", copy.max_held_copy_task_ready),
        ("copy_same_task_in_parallel", copy.copy_same_task_in_parallel),
    ];
    for (name, value) in caps {
        if value == 0 {
            return Err(SchedulerError::ConfigError(format!(
                "[copy].{name} must be >= 1 (got 0)"
            )));
        }
    }
    if !(1..=100).contains(&copy.prio_phase_three) {
        return Err(SchedulerError::ConfigError(format!(
            "[copy].prio_phase_three must be between 1 and 100 (got {})",
            copy.prio_phase_three
        )));
    }
    Ok(())
}

fn validate_alignment(cfg: &RawConfigFile) -> Result<()> {
    let alignment = &cfg.alignment;
    let weight = alignment.weight_for_individual_node;
    if !(0.0..=1.0).contains(&weight) {
        return Err(SchedulerError::InvalidWeight(weight));
    }
    if alignment.init_cost < 0.0 {
        return Err(SchedulerError::ConfigError(format!(
            "[alignment].init_cost must be >= 0 (got {})",
            alignment.init_cost
        )));
    }
    if alignment.comparable_cost_epsilon < 0.0 || alignment.stalemate_threshold < 0.0 {
        return Err(SchedulerError::ConfigError(
            "[alignment] epsilon and stalemate threshold must be >= 0".to_string(),
        ));
    }
    Ok(())
}
