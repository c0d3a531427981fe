use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use medminder::core::Config;
use medminder::features::reminders::{
    LogNotifier, PlanFile, ReminderScheduler, SchedulerEvent,
};

/// Log every scheduler event until the scheduler goes away
async fn event_log_loop(mut events: broadcast::Receiver<SchedulerEvent>) {
    loop {
        match events.recv().await {
            Ok(SchedulerEvent::ReminderArmed {
                reminder_id,
                medication_name,
                fire_at,
                ..
            }) => {
                info!("⏳ {medication_name} ({reminder_id}) next at {fire_at}");
            }
            Ok(SchedulerEvent::ReminderCompleted {
                medication_name, ..
            }) => {
                info!("✅ Course finished for {medication_name}");
            }
            Ok(event) => {
                debug!(
                    "Event: {}",
                    serde_json::to_string(&event).unwrap_or_else(|_| format!("{event:?}"))
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log fell behind, skipped {skipped} events");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

fn load_plans(scheduler: &ReminderScheduler, plans_path: &str) {
    let plan_file = match PlanFile::load(plans_path) {
        Ok(file) => {
            info!("📄 Loaded {} plan(s) from {plans_path}", file.plans.len());
            file
        }
        Err(e) => {
            if std::path::Path::new(plans_path).exists() {
                error!("❌ Failed to load plans from {plans_path}: {e}");
            } else {
                info!("📄 No plan file found at {plans_path} - starting with no reminders");
            }
            return;
        }
    };

    for request in plan_file.plans {
        let name = request.medication_name.clone();
        if let Err(e) = scheduler.schedule(request) {
            error!("❌ Could not schedule {name}: {e}");
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting medication reminder service...");
    info!(
        "Notifications stay up for {}s, recurrence: {}",
        config.notification_display_secs, config.recurrence
    );

    let scheduler = ReminderScheduler::new(config.scheduler(), Arc::new(LogNotifier));

    tokio::spawn(event_log_loop(scheduler.subscribe()));

    load_plans(&scheduler, &config.plans_path);

    for reminder in scheduler.list() {
        info!(
            "  {} - {} ({})",
            reminder.medication_name, reminder.time_of_day, reminder.state
        );
    }
    info!("{} reminder(s) armed. Press Ctrl-C to stop.", scheduler.armed_count());

    tokio::signal::ctrl_c().await?;

    info!("Shutting down; pending reminders are discarded");
    Ok(())
}
