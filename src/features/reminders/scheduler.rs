//! # Reminder Scheduler
//!
//! Owns the recorded medication plans and one countdown per intake time.
//! Countdowns target the next wall-clock occurrence of their time of day and,
//! under daily recurrence, re-arm for the following day after each fire.
//!
//! The scheduler is the only holder of reminder state: a display layer reads
//! it through `list`/`log` or follows `subscribe`, and never keeps a copy.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Daily re-arm, cancellation and course-end completion
//! - 1.0.0: One-shot countdown per intake time with a session reminder log

use super::clock::{delay_until, following_occurrence, next_occurrence, Clock, SystemClock};
use super::events::{SchedulerEvent, EVENT_CHANNEL_CAPACITY};
use super::notification::{Notification, NotificationSink};
use super::plan::{IntakeTime, MedicationPlan, PlanId, PlanRequest};
use crate::core::ScheduleError;
use anyhow::Result;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Stable identity of one intake time within one plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderId {
    pub plan_id: PlanId,
    pub index: usize,
}

impl ReminderId {
    pub fn new(plan_id: PlanId, index: usize) -> Self {
        ReminderId { plan_id, index }
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.plan_id, self.index)
    }
}

/// What happens to a reminder after its countdown fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recurrence {
    /// Re-arm for the same time tomorrow until the course ends
    Daily,
    /// Fire once and stop
    Once,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Once => write!(f, "once"),
        }
    }
}

impl FromStr for Recurrence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Recurrence::Daily),
            "once" => Ok(Recurrence::Once),
            _ => Err(anyhow::anyhow!("Invalid recurrence: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How long a notification stays up before it is dismissed
    pub display_for: Duration,
    pub recurrence: Recurrence,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            display_for: Duration::from_secs(crate::core::config::DEFAULT_NOTIFICATION_SECS),
            recurrence: Recurrence::Daily,
        }
    }
}

/// Lifecycle state of a scheduled reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderState {
    /// Countdown running
    Armed,
    /// Countdown expired and the notification was shown
    Fired,
    /// Stopped by the user
    Cancelled,
    /// Treatment course ended
    Completed,
}

impl ReminderState {
    /// Armed or Fired; shown in the reminder list
    pub fn is_live(&self) -> bool {
        matches!(self, ReminderState::Armed | ReminderState::Fired)
    }

    /// No further transition happens on its own. A fired reminder only comes
    /// around again under daily recurrence.
    pub fn is_terminal(&self, recurrence: Recurrence) -> bool {
        match self {
            ReminderState::Armed => false,
            ReminderState::Fired => recurrence == Recurrence::Once,
            ReminderState::Cancelled | ReminderState::Completed => true,
        }
    }
}

impl fmt::Display for ReminderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderState::Armed => write!(f, "armed"),
            ReminderState::Fired => write!(f, "fired"),
            ReminderState::Cancelled => write!(f, "cancelled"),
            ReminderState::Completed => write!(f, "completed"),
        }
    }
}

/// Read-only view of one scheduled reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSnapshot {
    pub id: ReminderId,
    pub medication_name: String,
    pub time_of_day: IntakeTime,
    pub state: ReminderState,
    /// Wall-clock target while armed
    pub next_fire_at: Option<NaiveDateTime>,
    pub fire_count: u32,
    pub last_fired_at: Option<NaiveDateTime>,
}

/// One row of the session reminder log: a plan as it was submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderLogEntry {
    pub plan_id: PlanId,
    pub medication_name: String,
    pub intake_times: Vec<IntakeTime>,
}

struct ReminderEntry {
    snapshot: ReminderSnapshot,
    seq: u64,
    /// Target of the current (or just fired) countdown
    target: NaiveDateTime,
    course_end: NaiveDateTime,
    countdown: Option<JoinHandle<()>>,
}

struct PlanRecord {
    seq: u64,
    plan: MedicationPlan,
}

struct Inner {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    plans: DashMap<PlanId, PlanRecord>,
    reminders: DashMap<ReminderId, ReminderEntry>,
    next_seq: AtomicU64,
    events: broadcast::Sender<SchedulerEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for mut entry in self.reminders.iter_mut() {
            if let Some(handle) = entry.countdown.take() {
                handle.abort();
            }
        }
    }
}

/// Handle to the reminder engine; clones share the same state
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    /// Create a scheduler driven by the local wall clock
    pub fn new(config: SchedulerConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: SchedulerConfig,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ReminderScheduler {
            inner: Arc::new(Inner {
                config,
                clock,
                sink,
                plans: DashMap::new(),
                reminders: DashMap::new(),
                next_seq: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Follow everything the scheduler does from here on
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.inner.events.subscribe()
    }

    /// Record a plan and arm one countdown per intake time.
    ///
    /// The request is validated in full first; an invalid plan records and
    /// arms nothing. Countdowns run on the current tokio runtime.
    pub fn schedule(&self, request: PlanRequest) -> Result<PlanId, ScheduleError> {
        let intake_times = request.validate()?;
        let runtime = Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
        let inner = &self.inner;
        let now = inner.clock.now();

        let plan = MedicationPlan {
            id: Uuid::new_v4(),
            medication_name: request.medication_name.trim().to_string(),
            dosage_grams: request.dosage_grams,
            start: request.start,
            end: request.end,
            intake_times,
            created_at: now,
        };
        let plan_id = plan.id;

        info!(
            "💊 Scheduled {} ({}g, {} to {}) at [{}]",
            plan.medication_name,
            plan.dosage_grams,
            plan.start,
            plan.end,
            plan.intake_times
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        inner.plans.insert(
            plan_id,
            PlanRecord {
                seq: inner.next_seq(),
                plan: plan.clone(),
            },
        );
        inner.emit(SchedulerEvent::PlanScheduled {
            plan_id,
            medication_name: plan.medication_name.clone(),
            intake_times: plan.intake_times.clone(),
        });

        for (index, &time_of_day) in plan.intake_times.iter().enumerate() {
            let id = ReminderId::new(plan_id, index);
            let target = next_occurrence(now, time_of_day);
            let countdown_ms = (target - now).num_milliseconds();

            inner.reminders.insert(
                id,
                ReminderEntry {
                    snapshot: ReminderSnapshot {
                        id,
                        medication_name: plan.medication_name.clone(),
                        time_of_day,
                        state: ReminderState::Armed,
                        next_fire_at: Some(target),
                        fire_count: 0,
                        last_fired_at: None,
                    },
                    seq: inner.next_seq(),
                    target,
                    course_end: plan.end,
                    countdown: None,
                },
            );

            let handle = runtime.spawn(run_countdown(
                Arc::downgrade(inner),
                id,
                Duration::from_millis(countdown_ms as u64),
            ));
            if let Some(mut entry) = inner.reminders.get_mut(&id) {
                entry.countdown = Some(handle);
            }

            debug!("Armed reminder {id} for {target} ({countdown_ms} ms)");
            inner.emit(SchedulerEvent::ReminderArmed {
                reminder_id: id,
                medication_name: plan.medication_name.clone(),
                time_of_day,
                fire_at: target,
                countdown_ms,
            });
        }

        Ok(plan_id)
    }

    /// Show a reminder notification for `medication_name` and dismiss it once
    /// the display window has elapsed
    pub async fn fire_reminder(&self, medication_name: &str) -> Notification {
        self.inner.dispatch(medication_name, None).await
    }

    /// Live (armed or fired) reminders in scheduling order
    pub fn list(&self) -> Vec<ReminderSnapshot> {
        self.collect_reminders(|s| s.state.is_live())
    }

    /// Every reminder ever scheduled this session, including stopped ones
    pub fn reminders(&self) -> Vec<ReminderSnapshot> {
        self.collect_reminders(|_| true)
    }

    pub fn get(&self, id: &ReminderId) -> Option<ReminderSnapshot> {
        self.inner.reminders.get(id).map(|e| e.snapshot.clone())
    }

    /// Number of countdowns currently running
    pub fn armed_count(&self) -> usize {
        self.inner
            .reminders
            .iter()
            .filter(|e| e.snapshot.state == ReminderState::Armed)
            .count()
    }

    /// The session reminder log, one entry per `schedule` call
    pub fn log(&self) -> Vec<ReminderLogEntry> {
        self.sorted_plans()
            .into_iter()
            .map(|plan| ReminderLogEntry {
                plan_id: plan.id,
                medication_name: plan.medication_name,
                intake_times: plan.intake_times,
            })
            .collect()
    }

    pub fn plans(&self) -> Vec<MedicationPlan> {
        self.sorted_plans()
    }

    pub fn plan(&self, plan_id: &PlanId) -> Option<MedicationPlan> {
        self.inner.plans.get(plan_id).map(|r| r.plan.clone())
    }

    /// Stop a reminder and tear down its countdown.
    ///
    /// Returns false if the reminder is unknown or already terminal.
    pub fn cancel(&self, id: &ReminderId) -> bool {
        let recurrence = self.inner.config.recurrence;
        let medication_name = {
            let Some(mut entry) = self.inner.reminders.get_mut(id) else {
                return false;
            };
            if entry.snapshot.state.is_terminal(recurrence) {
                return false;
            }
            if let Some(handle) = entry.countdown.take() {
                handle.abort();
            }
            entry.snapshot.state = ReminderState::Cancelled;
            entry.snapshot.next_fire_at = None;
            entry.snapshot.medication_name.clone()
        };

        info!("Cancelled reminder {id} for {medication_name}");
        self.inner.emit(SchedulerEvent::ReminderCancelled {
            reminder_id: *id,
            medication_name,
        });
        true
    }

    /// Stop every reminder of a plan; returns how many were stopped
    pub fn cancel_plan(&self, plan_id: &PlanId) -> usize {
        let mut ids: Vec<ReminderId> = self
            .inner
            .reminders
            .iter()
            .filter(|e| e.key().plan_id == *plan_id)
            .map(|e| *e.key())
            .collect();
        ids.sort();

        ids.iter().filter(|id| self.cancel(id)).count()
    }

    fn collect_reminders<F>(&self, keep: F) -> Vec<ReminderSnapshot>
    where
        F: Fn(&ReminderSnapshot) -> bool,
    {
        let mut entries: Vec<(u64, ReminderSnapshot)> = self
            .inner
            .reminders
            .iter()
            .filter(|e| keep(&e.snapshot))
            .map(|e| (e.seq, e.snapshot.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, s)| s).collect()
    }

    fn sorted_plans(&self) -> Vec<MedicationPlan> {
        let mut plans: Vec<(u64, MedicationPlan)> = self
            .inner
            .plans
            .iter()
            .map(|r| (r.seq, r.plan.clone()))
            .collect();
        plans.sort_by_key(|(seq, _)| *seq);
        plans.into_iter().map(|(_, p)| p).collect()
    }
}

impl Inner {
    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn emit(&self, event: SchedulerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn dispatch(
        &self,
        medication_name: &str,
        reminder_id: Option<ReminderId>,
    ) -> Notification {
        let notification = Notification::new(
            medication_name,
            reminder_id,
            self.clock.now(),
            self.config.display_for,
        );

        if let Err(e) = self.sink.show(&notification).await {
            warn!("Failed to show reminder for {medication_name}: {e}");
        }

        let sink = self.sink.clone();
        let events = self.events.clone();
        let notification_id = notification.id;
        let display_for = self.config.display_for;
        let medication_name = medication_name.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(display_for).await;
            if let Err(e) = sink.dismiss(notification_id).await {
                warn!("Failed to dismiss notification {notification_id}: {e}");
            }
            debug!("Dismissed reminder for {medication_name}");
            let _ = events.send(SchedulerEvent::NotificationDismissed {
                notification_id,
                medication_name,
            });
        });

        notification
    }

    /// Countdown expiry: mark fired and raise the notification
    async fn fire(&self, id: &ReminderId) {
        let medication_name = {
            let Some(mut entry) = self.reminders.get_mut(id) else {
                return;
            };
            if entry.snapshot.state != ReminderState::Armed {
                return;
            }
            entry.snapshot.state = ReminderState::Fired;
            entry.snapshot.fire_count += 1;
            entry.snapshot.last_fired_at = Some(self.clock.now());
            entry.snapshot.next_fire_at = None;
            entry.snapshot.medication_name.clone()
        };

        info!("⏰ Reminder {id} fired for {medication_name}");
        let notification = self.dispatch(&medication_name, Some(*id)).await;
        self.emit(SchedulerEvent::ReminderFired {
            reminder_id: *id,
            notification,
        });
    }

    /// Decide whether a fired reminder goes around again; returns the delay
    /// until its next fire
    fn rearm(&self, id: &ReminderId) -> Option<Duration> {
        if self.config.recurrence == Recurrence::Once {
            return None;
        }

        let now = self.clock.now();
        let event = {
            let mut entry = self.reminders.get_mut(id)?;
            if entry.snapshot.state != ReminderState::Fired {
                return None;
            }

            let next = following_occurrence(entry.target, now);
            if next > entry.course_end {
                entry.snapshot.state = ReminderState::Completed;
                entry.countdown = None;
                SchedulerEvent::ReminderCompleted {
                    reminder_id: *id,
                    medication_name: entry.snapshot.medication_name.clone(),
                }
            } else {
                entry.target = next;
                entry.snapshot.state = ReminderState::Armed;
                entry.snapshot.next_fire_at = Some(next);
                SchedulerEvent::ReminderArmed {
                    reminder_id: *id,
                    medication_name: entry.snapshot.medication_name.clone(),
                    time_of_day: entry.snapshot.time_of_day,
                    fire_at: next,
                    countdown_ms: delay_until(now, next).as_millis() as i64,
                }
            }
        };

        let delay = match &event {
            SchedulerEvent::ReminderArmed {
                fire_at,
                countdown_ms,
                ..
            } => {
                debug!("Re-armed reminder {id} for {fire_at} ({countdown_ms} ms)");
                Some(Duration::from_millis(*countdown_ms as u64))
            }
            _ => {
                info!("Reminder {id} completed: treatment course has ended");
                None
            }
        };
        self.emit(event);
        delay
    }
}

async fn run_countdown(inner: Weak<Inner>, id: ReminderId, mut delay: Duration) {
    loop {
        tokio::time::sleep(delay).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        inner.fire(&id).await;
        match inner.rearm(&id) {
            Some(next) => delay = next,
            None => return,
        }
    }
}
