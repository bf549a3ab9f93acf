use crate::domain::models::{DailyTrigger, NotificationContent, PermissionStatus};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Port onto the platform's local-notification facility. The embedding shell
/// supplies the real adapter; the in-memory implementation below backs tests
/// and headless hosts.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn permission_status(&self) -> Result<PermissionStatus, InfraError>;

    async fn request_permission(&self) -> Result<PermissionStatus, InfraError>;

    async fn cancel_all(&self) -> Result<(), InfraError>;

    async fn schedule(
        &self,
        trigger: &DailyTrigger,
        content: &NotificationContent,
    ) -> Result<String, InfraError>;

    async fn dismiss(&self, identifier: &str) -> Result<(), InfraError>;
}

pub trait AlertPresenter: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub identifier: String,
    pub trigger: DailyTrigger,
    pub content: NotificationContent,
}

#[derive(Debug)]
pub struct InMemoryNotificationService {
    permission: Mutex<PermissionStatus>,
    grant_on_request: Mutex<bool>,
    fail_next_schedule: Mutex<bool>,
    scheduled: Mutex<Vec<ScheduledNotification>>,
    dismissed: Mutex<Vec<String>>,
    cancel_all_calls: AtomicUsize,
    schedule_calls: AtomicUsize,
    next_identifier: AtomicU64,
}

impl Default for InMemoryNotificationService {
    fn default() -> Self {
        Self {
            permission: Mutex::new(PermissionStatus::Granted),
            grant_on_request: Mutex::new(true),
            fail_next_schedule: Mutex::new(false),
            scheduled: Mutex::new(Vec::new()),
            dismissed: Mutex::new(Vec::new()),
            cancel_all_calls: AtomicUsize::new(0),
            schedule_calls: AtomicUsize::new(0),
            next_identifier: AtomicU64::new(1),
        }
    }
}

impl InMemoryNotificationService {
    pub fn with_permission(permission: PermissionStatus, grant_on_request: bool) -> Self {
        Self {
            permission: Mutex::new(permission),
            grant_on_request: Mutex::new(grant_on_request),
            ..Self::default()
        }
    }

    pub fn fail_next_schedule(&self) {
        if let Ok(mut flag) = self.fail_next_schedule.lock() {
            *flag = true;
        }
    }

    pub fn scheduled(&self) -> Vec<ScheduledNotification> {
        self.scheduled
            .lock()
            .map(|scheduled| scheduled.clone())
            .unwrap_or_default()
    }

    pub fn dismissed(&self) -> Vec<String> {
        self.dismissed
            .lock()
            .map(|dismissed| dismissed.clone())
            .unwrap_or_default()
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.cancel_all_calls.load(Ordering::SeqCst)
    }

    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn permission_status(&self) -> Result<PermissionStatus, InfraError> {
        let permission = self
            .permission
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("permission lock poisoned: {error}")))?;
        Ok(*permission)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, InfraError> {
        let grant = self
            .grant_on_request
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("permission lock poisoned: {error}")))?;
        let mut permission = self
            .permission
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("permission lock poisoned: {error}")))?;
        if *grant {
            *permission = PermissionStatus::Granted;
        } else if *permission == PermissionStatus::Undetermined {
            *permission = PermissionStatus::Denied;
        }
        Ok(*permission)
    }

    async fn cancel_all(&self) -> Result<(), InfraError> {
        self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
        let mut scheduled = self
            .scheduled
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("scheduled lock poisoned: {error}")))?;
        scheduled.clear();
        Ok(())
    }

    async fn schedule(
        &self,
        trigger: &DailyTrigger,
        content: &NotificationContent,
    ) -> Result<String, InfraError> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);

        let mut fail = self
            .fail_next_schedule
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("schedule lock poisoned: {error}")))?;
        if *fail {
            *fail = false;
            return Err(InfraError::Backend("schedule rejected".to_string()));
        }
        drop(fail);

        let identifier = format!(
            "notification-{}",
            self.next_identifier.fetch_add(1, Ordering::Relaxed)
        );
        let mut scheduled = self
            .scheduled
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("scheduled lock poisoned: {error}")))?;
        scheduled.push(ScheduledNotification {
            identifier: identifier.clone(),
            trigger: *trigger,
            content: content.clone(),
        });
        Ok(identifier)
    }

    async fn dismiss(&self, identifier: &str) -> Result<(), InfraError> {
        let mut dismissed = self
            .dismissed
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("dismissed lock poisoned: {error}")))?;
        dismissed.push(identifier.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAlertPresenter {
    alerts: Mutex<Vec<(String, String)>>,
}

impl InMemoryAlertPresenter {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts
            .lock()
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }
}

impl AlertPresenter for InMemoryAlertPresenter {
    fn alert(&self, title: &str, message: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push((title.to_string(), message.to_string()));
        }
    }
}
