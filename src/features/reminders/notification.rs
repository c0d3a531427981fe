//! # Reminder Notifications
//!
//! The display request a fired reminder hands to the UI, and the sinks that
//! receive it. The scheduler decides when a notification is shown and when it
//! is dismissed; a sink only renders.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use super::scheduler::ReminderId;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A user-visible reminder that auto-dismisses after `display_for_ms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Reminder that raised this notification (None for a direct fire)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_id: Option<ReminderId>,
    pub medication_name: String,
    pub title: String,
    pub body: String,
    pub shown_at: NaiveDateTime,
    pub display_for_ms: u64,
}

impl Notification {
    pub fn new(
        medication_name: &str,
        reminder_id: Option<ReminderId>,
        shown_at: NaiveDateTime,
        display_for: Duration,
    ) -> Self {
        Notification {
            id: Uuid::new_v4(),
            reminder_id,
            medication_name: medication_name.to_string(),
            title: "Medication reminder".to_string(),
            body: format!("Time to take {medication_name}"),
            shown_at,
            display_for_ms: display_for.as_millis() as u64,
        }
    }

    pub fn display_for(&self) -> Duration {
        Duration::from_millis(self.display_for_ms)
    }
}

/// Where notifications are rendered
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<()>;

    async fn dismiss(&self, notification_id: Uuid) -> Result<()>;
}

/// Renders notifications into the log; used by the headless host
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        info!(
            "🔔 {}: {} (closes in {}s)",
            notification.title,
            notification.body,
            notification.display_for().as_secs()
        );
        Ok(())
    }

    async fn dismiss(&self, notification_id: Uuid) -> Result<()> {
        debug!("Notification {notification_id} dismissed");
        Ok(())
    }
}

/// Display request forwarded to a UI loop
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationRequest {
    Show(Notification),
    Dismiss(Uuid),
}

/// Forwards display requests over a channel to whatever owns the screen
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<NotificationRequest>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelNotifier { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        self.tx
            .send(NotificationRequest::Show(notification.clone()))
            .map_err(|_| anyhow!("notification receiver closed"))
    }

    async fn dismiss(&self, notification_id: Uuid) -> Result<()> {
        self.tx
            .send(NotificationRequest::Dismiss(notification_id))
            .map_err(|_| anyhow!("notification receiver closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn shown_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_notification_carries_name_and_window() {
        let n = Notification::new("Aspirin", None, shown_at(), Duration::from_secs(10));
        assert_eq!(n.medication_name, "Aspirin");
        assert!(n.body.contains("Aspirin"));
        assert_eq!(n.display_for_ms, 10_000);
        assert_eq!(n.display_for(), Duration::from_secs(10));
    }

    #[test]
    fn test_notification_json_omits_missing_reminder() {
        let n = Notification::new("Aspirin", None, shown_at(), Duration::from_secs(10));
        let json = serde_json::to_value(&n).unwrap();
        assert!(json.get("reminder_id").is_none());
        assert_eq!(json["display_for_ms"], 10_000);
    }

    #[tokio::test]
    async fn test_channel_notifier_forwards_requests() {
        let (sink, mut rx) = ChannelNotifier::new();
        let n = Notification::new("Ibuprofen", None, shown_at(), Duration::from_secs(10));

        sink.show(&n).await.unwrap();
        sink.dismiss(n.id).await.unwrap();

        assert_eq!(rx.recv().await, Some(NotificationRequest::Show(n.clone())));
        assert_eq!(rx.recv().await, Some(NotificationRequest::Dismiss(n.id)));
    }

    #[tokio::test]
    async fn test_channel_notifier_errors_when_receiver_gone() {
        let (sink, rx) = ChannelNotifier::new();
        drop(rx);
        let n = Notification::new("Ibuprofen", None, shown_at(), Duration::from_secs(10));
        assert!(sink.show(&n).await.is_err());
    }
}
