//! # Configuration
//!
//! Environment-driven settings for the reminder host. Call `dotenvy::dotenv()`
//! before `Config::from_env()` to pick up a local `.env` file.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use crate::features::reminders::{Recurrence, SchedulerConfig};
use anyhow::{anyhow, Result};
use std::time::Duration;

/// Display window for a reminder notification unless overridden
pub const DEFAULT_NOTIFICATION_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub notification_display_secs: u64,
    pub recurrence: Recurrence,
    pub plans_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            notification_display_secs: DEFAULT_NOTIFICATION_SECS,
            recurrence: Recurrence::Daily,
            plans_path: "plans.yaml".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        let notification_display_secs = match lookup("MEDMINDER_NOTIFICATION_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    anyhow!("MEDMINDER_NOTIFICATION_SECS must be a positive integer, got {raw:?}")
                })?;
                if secs == 0 {
                    return Err(anyhow!("MEDMINDER_NOTIFICATION_SECS must be greater than zero"));
                }
                secs
            }
            None => defaults.notification_display_secs,
        };

        let recurrence = match lookup("MEDMINDER_RECURRENCE") {
            Some(raw) => raw
                .parse::<Recurrence>()
                .map_err(|e| anyhow!("MEDMINDER_RECURRENCE: {e}"))?,
            None => defaults.recurrence,
        };

        let plans_path = lookup("MEDMINDER_PLANS_PATH").unwrap_or(defaults.plans_path);

        Ok(Config {
            log_level,
            notification_display_secs,
            recurrence,
            plans_path,
        })
    }

    /// Scheduler settings derived from this config
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            display_for: Duration::from_secs(self.notification_display_secs),
            recurrence: self.recurrence,
        }
    }
}
