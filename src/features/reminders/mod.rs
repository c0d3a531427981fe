//! # Reminders Feature
//!
//! Medication reminder engine: plans, wall-clock aligned countdowns and
//! auto-dismissing notifications.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod clock;
pub mod events;
pub mod notification;
pub mod plan;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::SchedulerEvent;
pub use notification::{
    ChannelNotifier, LogNotifier, Notification, NotificationRequest, NotificationSink,
};
pub use plan::{IntakeTime, MedicationPlan, PlanFile, PlanId, PlanRequest};
pub use scheduler::{
    Recurrence, ReminderId, ReminderLogEntry, ReminderScheduler, ReminderSnapshot, ReminderState,
    SchedulerConfig,
};
