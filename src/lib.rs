// Core layer - configuration and error types
pub mod core;

// Features layer - the reminder engine
pub mod features;

pub use crate::core::{Config, ScheduleError};

pub use features::reminders::{
    ChannelNotifier, Clock, IntakeTime, LogNotifier, ManualClock, MedicationPlan, Notification,
    NotificationRequest, NotificationSink, PlanFile, PlanId, PlanRequest, Recurrence, ReminderId,
    ReminderLogEntry, ReminderScheduler, ReminderSnapshot, ReminderState, SchedulerConfig,
    SchedulerEvent, SystemClock,
};
