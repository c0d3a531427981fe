//! # Scheduler Events
//!
//! Everything the scheduler does is announced on a broadcast channel so a
//! display layer can re-read state instead of holding its own copy.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use super::notification::Notification;
use super::plan::{IntakeTime, PlanId};
use super::scheduler::ReminderId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast channel capacity for scheduler events
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SchedulerEvent {
    /// A plan was accepted and recorded
    PlanScheduled {
        plan_id: PlanId,
        medication_name: String,
        intake_times: Vec<IntakeTime>,
    },
    /// A countdown was started (initially or after a daily re-arm)
    ReminderArmed {
        reminder_id: ReminderId,
        medication_name: String,
        time_of_day: IntakeTime,
        fire_at: NaiveDateTime,
        countdown_ms: i64,
    },
    /// A countdown expired and its notification was handed to the sink
    ReminderFired {
        reminder_id: ReminderId,
        notification: Notification,
    },
    /// A notification's display window elapsed
    NotificationDismissed {
        notification_id: Uuid,
        medication_name: String,
    },
    /// A reminder was stopped before its course ended
    ReminderCancelled {
        reminder_id: ReminderId,
        medication_name: String,
    },
    /// The treatment course ended; the reminder will not be re-armed
    ReminderCompleted {
        reminder_id: ReminderId,
        medication_name: String,
    },
}

impl SchedulerEvent {
    pub fn medication_name(&self) -> &str {
        match self {
            SchedulerEvent::PlanScheduled {
                medication_name, ..
            }
            | SchedulerEvent::ReminderArmed {
                medication_name, ..
            }
            | SchedulerEvent::NotificationDismissed {
                medication_name, ..
            }
            | SchedulerEvent::ReminderCancelled {
                medication_name, ..
            }
            | SchedulerEvent::ReminderCompleted {
                medication_name, ..
            } => medication_name,
            SchedulerEvent::ReminderFired { notification, .. } => &notification.medication_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_type() {
        let event = SchedulerEvent::ReminderCancelled {
            reminder_id: ReminderId::new(Uuid::nil(), 1),
            medication_name: "Aspirin".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ReminderCancelled");
        assert_eq!(json["reminder_id"]["index"], 1);
        assert_eq!(event.medication_name(), "Aspirin");
    }

    #[test]
    fn test_plan_event_serializes_times_as_strings() {
        let event = SchedulerEvent::PlanScheduled {
            plan_id: Uuid::nil(),
            medication_name: "Aspirin".to_string(),
            intake_times: vec!["08:00:00".parse().unwrap()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""intake_times":["08:00:00"]"#));

        let back: SchedulerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
