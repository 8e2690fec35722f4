use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 调度循环的轮询周期
    pub tick_seconds: u64,
    pub jobs: JobsConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 60,
            jobs: JobsConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub patients: JobConfig,
    pub appointments: JobConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            patients: JobConfig {
                enabled: false,
                interval_seconds: 60 * 15,
            },
            appointments: JobConfig {
                enabled: true,
                interval_seconds: 60 * 5,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl JobConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl ConfigValidator for SchedulerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_timeout_seconds(self.tick_seconds, "scheduler.tick_seconds")?;
        ValidationUtils::validate_positive(
            self.jobs.patients.interval_seconds,
            "scheduler.jobs.patients.interval_seconds",
        )?;
        ValidationUtils::validate_positive(
            self.jobs.appointments.interval_seconds,
            "scheduler.jobs.appointments.interval_seconds",
        )?;
        Ok(())
    }
}
