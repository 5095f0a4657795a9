//! Scheduler configuration: JSON file plus environment overrides.

use crate::calendar::{CalendarError, WorkWeek, provider_for_region};
use crate::worker::WorkerId;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const ENV_WORKDAY_HOURS: &str = "SHOP_SCHEDULER_WORKDAY_HOURS";
pub const ENV_DAY_WIDTH_PX: &str = "SHOP_SCHEDULER_DAY_WIDTH_PX";
pub const ENV_REGION: &str = "SHOP_SCHEDULER_REGION";
pub const ENV_DEFAULT_WORKER: &str = "SHOP_SCHEDULER_DEFAULT_WORKER";
/// Optional path of a JSON config file read by the binaries.
pub const ENV_CONFIG_PATH: &str = "SHOP_SCHEDULER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl ConfigError {
    fn invalid(key: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Nominal working hours in one workday.
    pub workday_hours: f64,
    pub day_width_px: f64,
    /// Fraction of a day width a drag must travel to round to the next day.
    pub snap_threshold: f64,
    /// Receives the items of deactivated workers.
    pub default_worker_id: WorkerId,
    pub default_worker_name: String,
    /// Holiday database region code.
    pub region: String,
    pub working_days: Vec<Weekday>,
    /// Years past the current one to resolve holidays for.
    pub holiday_years_ahead: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workday_hours: 8.0,
            day_width_px: 32.0,
            snap_threshold: 0.5,
            default_worker_id: 0,
            default_worker_name: "Unassigned".to_string(),
            region: "US".to_string(),
            working_days: WorkWeek::default().working_days().to_vec(),
            holiday_years_ahead: 2,
        }
    }
}

impl SchedulerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: SchedulerConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load from `path` when given, otherwise start from defaults; then apply
    /// process environment overrides.
    pub fn from_env_and_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Same as [`SchedulerConfig::from_env_and_file`] with the file taken from
    /// `SHOP_SCHEDULER_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(ENV_CONFIG_PATH).map(std::path::PathBuf::from);
        Self::from_env_and_file(path.as_deref())
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_WORKDAY_HOURS) {
            self.workday_hours = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_WORKDAY_HOURS, &raw, "expected a number"))?;
        }
        if let Some(raw) = lookup(ENV_DAY_WIDTH_PX) {
            self.day_width_px = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_DAY_WIDTH_PX, &raw, "expected a number"))?;
        }
        if let Some(raw) = lookup(ENV_REGION) {
            self.region = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_DEFAULT_WORKER) {
            self.default_worker_id = raw.trim().parse().map_err(|_| {
                ConfigError::invalid(ENV_DEFAULT_WORKER, &raw, "expected a worker id")
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.workday_hours.is_finite() || self.workday_hours <= 0.0 {
            return Err(ConfigError::invalid(
                "workday_hours",
                self.workday_hours,
                "must be positive",
            ));
        }
        if !self.day_width_px.is_finite() || self.day_width_px <= 0.0 {
            return Err(ConfigError::invalid(
                "day_width_px",
                self.day_width_px,
                "must be positive",
            ));
        }
        if !(self.snap_threshold > 0.0 && self.snap_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "snap_threshold",
                self.snap_threshold,
                "must be in (0, 1]",
            ));
        }
        if self.holiday_years_ahead < 0 {
            return Err(ConfigError::invalid(
                "holiday_years_ahead",
                self.holiday_years_ahead,
                "must not be negative",
            ));
        }
        self.work_week()?;
        provider_for_region(&self.region)?;
        Ok(())
    }

    pub fn work_week(&self) -> Result<WorkWeek, CalendarError> {
        WorkWeek::new(self.working_days.iter().copied())
    }
}
