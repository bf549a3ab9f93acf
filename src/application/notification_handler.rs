use crate::application::reminder_scheduler::NowProvider;
use crate::application::workout_completion::check_workout_completion;
use crate::domain::models::{NotificationLog, NotificationPayload, DAILY_REMINDER_TYPE};
use crate::infrastructure::delivery_log_repository::{DeliveryLogEntry, DeliveryLogRepository};
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::notification_service::NotificationService;
use crate::infrastructure::supabase_client::BackendClient;
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedNotification {
    pub identifier: String,
    pub payload: NotificationPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryDecision {
    Shown,
    Dismissed,
    Ignored,
}

/// Decides what to do with a received daily-reminder notification: suppress
/// it when today's workout is already fully completed, and record the
/// decision in both the backend audit table and the local delivery log.
pub struct NotificationHandler {
    backend: Arc<dyn BackendClient>,
    notifier: Arc<dyn NotificationService>,
    delivery_log: Arc<dyn DeliveryLogRepository>,
    log: Arc<EventLog>,
    timezone: Tz,
    now_provider: NowProvider,
}

impl NotificationHandler {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        notifier: Arc<dyn NotificationService>,
        delivery_log: Arc<dyn DeliveryLogRepository>,
        log: Arc<EventLog>,
    ) -> Self {
        Self {
            backend,
            notifier,
            delivery_log,
            log,
            timezone: chrono_tz::UTC,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn handle_received(&self, notification: &ReceivedNotification) -> DeliveryDecision {
        if !notification.payload.is_daily_reminder() {
            return DeliveryDecision::Ignored;
        }
        let user_id = notification.payload.user_id.trim();
        if user_id.is_empty() {
            return DeliveryDecision::Ignored;
        }

        let now = (self.now_provider)();
        let today = now.with_timezone(&self.timezone).date_naive();
        let workout_completed =
            check_workout_completion(self.backend.as_ref(), user_id, today).await;

        let record = NotificationLog {
            user_id: user_id.to_string(),
            notification_type: DAILY_REMINDER_TYPE.to_string(),
            was_triggered: true,
            workout_completed,
        };
        if let Err(error) = self.backend.insert_notification_log(&record).await {
            self.log.error(
                "notification_received",
                &format!("failed to insert notification log: {error}"),
            );
        }
        if let Err(error) = self.delivery_log.record(&DeliveryLogEntry {
            log: record,
            decided_at: now,
        }) {
            self.log.error(
                "notification_received",
                &format!("failed to record delivery decision: {error}"),
            );
        }

        if workout_completed {
            if let Err(error) = self.notifier.dismiss(&notification.identifier).await {
                self.log.error(
                    "notification_received",
                    &format!("failed to dismiss notification: {error}"),
                );
            }
            DeliveryDecision::Dismissed
        } else {
            DeliveryDecision::Shown
        }
    }
}
