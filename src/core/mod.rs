//! # Core Module
//!
//! Configuration and error types shared by the reminder engine and its host.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{ScheduleError, MAX_INTAKE_TIMES};
