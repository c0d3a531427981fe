// Reminders - medication plans, countdowns and notifications
pub mod reminders;

pub use reminders::{
    IntakeTime, MedicationPlan, Notification, NotificationSink, PlanRequest, ReminderScheduler,
    SchedulerEvent,
};
