use crate::domain::models::{
    DailyTrigger, NotificationContent, NotificationPayload, PermissionStatus, ReminderTime,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::notification_service::{AlertPresenter, NotificationService};
use crate::infrastructure::supabase_client::BackendClient;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

pub const REMINDER_TITLE: &str = "Time for your workout!";
pub const REMINDER_BODY: &str = "Don't forget to complete your daily exercises.";
const PERMISSION_ALERT_TITLE: &str = "Notification Permission Required";
const PERMISSION_ALERT_BODY: &str = "Please enable notifications to set reminders.";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub active_user_id: Option<String>,
    pub last_scheduled_time: Option<String>,
    pub polling: bool,
}

#[derive(Default)]
struct SchedulerState {
    active_user_id: Option<String>,
    last_scheduled_time: Option<String>,
    poll_task: Option<JoinHandle<()>>,
}

/// Polls the backend for a user's reminder settings and keeps the platform's
/// single daily reminder in sync with them. At most one poll task is live at
/// any moment, and the task never outlives the scheduler that spawned it.
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    backend: Arc<dyn BackendClient>,
    notifier: Arc<dyn NotificationService>,
    alerts: Arc<dyn AlertPresenter>,
    log: Arc<EventLog>,
    poll_interval: Duration,
    timezone: Tz,
    now_provider: NowProvider,
    state: Mutex<SchedulerState>,
    tick_in_flight: AtomicBool,
}

impl ReminderScheduler {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        notifier: Arc<dyn NotificationService>,
        alerts: Arc<dyn AlertPresenter>,
        log: Arc<EventLog>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                backend,
                notifier,
                alerts,
                log,
                poll_interval: DEFAULT_POLL_INTERVAL,
                timezone: chrono_tz::UTC,
                now_provider: Arc::new(Utc::now),
                state: Mutex::new(SchedulerState::default()),
                tick_in_flight: AtomicBool::new(false),
            }),
        }
    }

    // The with_* configuration is only reachable before the first
    // `initialize` hands the inner state to a poll task.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.poll_interval = poll_interval;
        }
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timezone = timezone;
        }
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.now_provider = now_provider;
        }
        self
    }

    /// Starts (or restarts) monitoring for `user_id`. Passing `None` signs
    /// the scheduler out: state is cleared and no timer is left running.
    /// Switching users resets the armed-time marker; re-initializing for the
    /// same user keeps it so an unchanged time is not redundantly rearmed.
    ///
    /// Must be called from within a tokio runtime; the poll task is spawned
    /// onto the current one.
    pub fn initialize(&self, user_id: Option<&str>) {
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        if let Some(handle) = state.poll_task.take() {
            handle.abort();
        }
        // An aborted mid-tick task must not strand the single-flight guard.
        self.inner.tick_in_flight.store(false, Ordering::SeqCst);

        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            state.active_user_id = None;
            state.last_scheduled_time = None;
            return;
        };

        if state.active_user_id.as_deref() != Some(user_id) {
            state.active_user_id = Some(user_id.to_string());
            state.last_scheduled_time = None;
        }

        let inner = Arc::clone(&self.inner);
        let poll_interval = self.inner.poll_interval;
        state.poll_task = Some(tokio::spawn(async move {
            inner.run_tick().await;
            let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
            loop {
                ticker.tick().await;
                inner.run_tick().await;
            }
        }));
    }

    /// Safe to call at any point, including while a check is in flight, and
    /// idempotent.
    pub fn stop(&self) {
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        if let Some(handle) = state.poll_task.take() {
            handle.abort();
        }
        self.inner.tick_in_flight.store(false, Ordering::SeqCst);
        state.last_scheduled_time = None;
        state.active_user_id = None;
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let Ok(state) = self.inner.state.lock() else {
            return SchedulerSnapshot {
                active_user_id: None,
                last_scheduled_time: None,
                polling: false,
            };
        };
        SchedulerSnapshot {
            active_user_id: state.active_user_id.clone(),
            last_scheduled_time: state.last_scheduled_time.clone(),
            polling: state.poll_task.is_some(),
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.lock() {
            if let Some(handle) = state.poll_task.take() {
                handle.abort();
            }
        }
    }
}

impl SchedulerInner {
    async fn run_tick(&self) {
        if self.tick_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        self.check_and_schedule().await;
        self.tick_in_flight.store(false, Ordering::SeqCst);
    }

    async fn check_and_schedule(&self) {
        let Some(user_id) = self.active_user_id() else {
            return;
        };

        let settings = match self.backend.fetch_reminder_settings(&user_id).await {
            Ok(settings) => settings,
            Err(error) => {
                self.log.error(
                    "reminder_check",
                    &format!("failed to fetch reminder settings: {error}"),
                );
                return;
            }
        };

        match settings {
            Some(settings) if settings.reminder_enabled && settings.has_reminder_time() => {
                if self.last_scheduled_time().as_deref() == Some(settings.reminder_time.as_str()) {
                    return;
                }
                match self
                    .arm_daily_reminder(&settings.reminder_time, &user_id)
                    .await
                {
                    Ok(next_occurrence) => {
                        self.set_last_scheduled_time(Some(settings.reminder_time.clone()));
                        self.log.info(
                            "reminder_check",
                            &format!(
                                "daily reminder armed for {} (next occurrence {})",
                                settings.reminder_time,
                                next_occurrence.to_rfc3339()
                            ),
                        );
                    }
                    Err(error) => {
                        self.log.error(
                            "reminder_check",
                            &format!("failed to arm daily reminder: {error}"),
                        );
                    }
                }
            }
            _ => {
                // Disabled, no time set, or no settings row at all.
                if let Err(error) = self.notifier.cancel_all().await {
                    self.log.error(
                        "reminder_check",
                        &format!("failed to cancel scheduled notifications: {error}"),
                    );
                    return;
                }
                self.set_last_scheduled_time(None);
            }
        }
    }

    async fn arm_daily_reminder(
        &self,
        raw_time: &str,
        user_id: &str,
    ) -> Result<DateTime<Tz>, InfraError> {
        let mut permission = self.notifier.permission_status().await?;
        if permission != PermissionStatus::Granted {
            permission = self.notifier.request_permission().await?;
        }
        if permission != PermissionStatus::Granted {
            self.alerts.alert(PERMISSION_ALERT_TITLE, PERMISSION_ALERT_BODY);
            return Err(InfraError::PermissionDenied);
        }

        // The platform nets out to one reminder per app, so everything
        // pending is dropped before arming.
        self.notifier.cancel_all().await?;

        let reminder_time = ReminderTime::parse(raw_time).map_err(InfraError::InvalidConfig)?;

        let now = (self.now_provider)().with_timezone(&self.timezone);
        // Informational only; the repeating trigger below is what the
        // platform actually fires on.
        let next_occurrence = reminder_time.next_occurrence_after(&now).ok_or_else(|| {
            InfraError::InvalidConfig(format!("no valid local occurrence for '{raw_time}'"))
        })?;

        let trigger = DailyTrigger {
            hour: reminder_time.hour(),
            minute: reminder_time.minute(),
            repeats: true,
        };
        let content = NotificationContent {
            title: REMINDER_TITLE.to_string(),
            body: REMINDER_BODY.to_string(),
            sound: true,
            payload: NotificationPayload::daily_reminder(user_id),
        };
        self.notifier.schedule(&trigger, &content).await?;
        Ok(next_occurrence)
    }

    fn active_user_id(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.active_user_id.clone())
    }

    fn last_scheduled_time(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.last_scheduled_time.clone())
    }

    fn set_last_scheduled_time(&self, value: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.last_scheduled_time = value;
        }
    }
}
