//! # Schedule Errors
//!
//! Validation failures surfaced to the caller of `ReminderScheduler::schedule`.
//! A plan that fails validation arms nothing.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::NaiveDateTime;
use thiserror::Error;

/// Maximum number of daily intake times a plan may carry
pub const MAX_INTAKE_TIMES: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("medication name must not be empty")]
    EmptyMedicationName,

    #[error("at most {max} intake times per day are allowed, got {count}", max = MAX_INTAKE_TIMES)]
    TooManyIntakeTimes { count: usize },

    #[error("intake time #{index} is not a valid HH:MM:SS time of day: {value:?}")]
    InvalidTimeOfDay { index: usize, value: String },

    #[error("dosage must be a finite, non-negative number of grams, got {0}")]
    InvalidDosage(f64),

    #[error("treatment course ends ({end}) before it starts ({start})")]
    InvalidCourse {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("reminders can only be scheduled from within a tokio runtime")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_time_message_names_index_and_value() {
        let err = ScheduleError::InvalidTimeOfDay {
            index: 2,
            value: "25:00:00".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("25:00:00"));
    }

    #[test]
    fn test_too_many_times_message() {
        let err = ScheduleError::TooManyIntakeTimes { count: 5 };
        assert_eq!(
            err.to_string(),
            "at most 4 intake times per day are allowed, got 5"
        );
    }
}
