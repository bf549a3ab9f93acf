use crate::application::bootstrap::bootstrap_workspace;
use crate::application::meal_suggestion::MealSuggestionService;
use crate::application::notification_handler::{
    DeliveryDecision, NotificationHandler, ReceivedNotification,
};
use crate::application::reminder_scheduler::ReminderScheduler;
use crate::application::workout_completion::check_workout_completion;
use crate::domain::models::{MealPlanRequest, MealSuggestion};
use crate::infrastructure::config::{read_poll_interval_seconds, read_project_url, read_timezone};
use crate::infrastructure::credential_store::SessionStore;
use crate::infrastructure::delivery_log_repository::{
    DeliveryLogRepository, SqliteDeliveryLogRepository,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::notification_service::{AlertPresenter, NotificationService};
use crate::infrastructure::nutrition_client::{NutritionClient, ReqwestNutritionClient};
use crate::infrastructure::supabase_client::{BackendClient, ReqwestSupabaseClient};
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const SUPABASE_URL_ENV: &str = "FEMMEFITNESS_SUPABASE_URL";
const SUPABASE_ANON_KEY_ENV: &str = "FEMMEFITNESS_SUPABASE_ANON_KEY";
const NUTRITIONIX_APP_ID_ENV: &str = "FEMMEFITNESS_NUTRITIONIX_APP_ID";
const NUTRITIONIX_APP_KEY_ENV: &str = "FEMMEFITNESS_NUTRITIONIX_APP_KEY";

const SESSION_LEEWAY_SECONDS: i64 = 60;

/// The platform-facing collaborators an embedding shell must supply.
#[derive(Clone)]
pub struct AppPorts {
    pub backend: Arc<dyn BackendClient>,
    pub notifier: Arc<dyn NotificationService>,
    pub alerts: Arc<dyn AlertPresenter>,
    pub nutrition: Arc<dyn NutritionClient>,
}

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    log: Arc<EventLog>,
    delivery_log: Arc<dyn DeliveryLogRepository>,
    ports: AppPorts,
    runtime: Mutex<RuntimeState>,
}

#[derive(Default)]
struct RuntimeState {
    scheduler: Option<Arc<ReminderScheduler>>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf, ports: AppPorts) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");

        Ok(Self {
            config_dir,
            delivery_log: Arc::new(SqliteDeliveryLogRepository::new(&bootstrap.database_path)),
            database_path: bootstrap.database_path,
            log: Arc::new(EventLog::new(logs_dir)),
            ports,
            runtime: Mutex::new(RuntimeState::default()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log.error(command, &error.to_string());
        error.to_string()
    }

    fn timezone(&self) -> Tz {
        read_timezone(&self.config_dir)
            .ok()
            .flatten()
            .and_then(|name| name.parse().ok())
            .unwrap_or(chrono_tz::UTC)
    }

    fn scheduler(&self) -> Result<Arc<ReminderScheduler>, InfraError> {
        let mut runtime = lock_runtime(self)?;
        if let Some(scheduler) = &runtime.scheduler {
            return Ok(Arc::clone(scheduler));
        }

        let poll_interval = Duration::from_secs(read_poll_interval_seconds(&self.config_dir)?);
        let scheduler = Arc::new(
            ReminderScheduler::new(
                Arc::clone(&self.ports.backend),
                Arc::clone(&self.ports.notifier),
                Arc::clone(&self.ports.alerts),
                Arc::clone(&self.log),
            )
            .with_poll_interval(poll_interval)
            .with_timezone(self.timezone()),
        );
        runtime.scheduler = Some(Arc::clone(&scheduler));
        Ok(scheduler)
    }

    fn existing_scheduler(&self) -> Result<Option<Arc<ReminderScheduler>>, InfraError> {
        Ok(lock_runtime(self)?.scheduler.clone())
    }
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReminderLifecycleResponse {
    pub status: String,
    pub active_user_id: Option<String>,
    pub last_scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotificationDecisionResponse {
    pub decision: String,
}

pub fn start_reminders_impl(
    state: &AppState,
    user_id: Option<String>,
) -> Result<ReminderLifecycleResponse, InfraError> {
    let scheduler = state.scheduler()?;
    let user_id = user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    scheduler.initialize(user_id.as_deref());

    let snapshot = scheduler.snapshot();
    match &snapshot.active_user_id {
        Some(id) => state
            .log
            .info("start_reminders", &format!("reminder polling started for {id}")),
        None => state
            .log
            .info("start_reminders", "reminder polling cleared (no active user)"),
    }

    Ok(ReminderLifecycleResponse {
        status: if snapshot.polling { "polling" } else { "stopped" }.to_string(),
        active_user_id: snapshot.active_user_id,
        last_scheduled_time: snapshot.last_scheduled_time,
    })
}

pub fn stop_reminders_impl(state: &AppState) -> Result<ReminderLifecycleResponse, InfraError> {
    if let Some(scheduler) = state.existing_scheduler()? {
        scheduler.stop();
        state.log.info("stop_reminders", "reminder polling stopped");
    }
    reminder_status_impl(state)
}

pub fn reminder_status_impl(state: &AppState) -> Result<ReminderLifecycleResponse, InfraError> {
    let snapshot = state
        .existing_scheduler()?
        .map(|scheduler| scheduler.snapshot());

    Ok(match snapshot {
        Some(snapshot) => ReminderLifecycleResponse {
            status: if snapshot.polling { "polling" } else { "stopped" }.to_string(),
            active_user_id: snapshot.active_user_id,
            last_scheduled_time: snapshot.last_scheduled_time,
        },
        None => ReminderLifecycleResponse {
            status: "stopped".to_string(),
            active_user_id: None,
            last_scheduled_time: None,
        },
    })
}

pub async fn handle_notification_impl(
    state: &AppState,
    notification: ReceivedNotification,
) -> Result<NotificationDecisionResponse, InfraError> {
    let handler = NotificationHandler::new(
        Arc::clone(&state.ports.backend),
        Arc::clone(&state.ports.notifier),
        Arc::clone(&state.delivery_log),
        Arc::clone(&state.log),
    )
    .with_timezone(state.timezone());

    let decision = handler.handle_received(&notification).await;
    Ok(NotificationDecisionResponse {
        decision: match decision {
            DeliveryDecision::Shown => "shown",
            DeliveryDecision::Dismissed => "dismissed",
            DeliveryDecision::Ignored => "ignored",
        }
        .to_string(),
    })
}

pub async fn check_workout_completion_impl(
    state: &AppState,
    user_id: String,
) -> Result<bool, InfraError> {
    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "user_id must not be empty".to_string(),
        ));
    }

    let today = Utc::now().with_timezone(&state.timezone()).date_naive();
    Ok(check_workout_completion(state.ports.backend.as_ref(), &user_id, today).await)
}

pub async fn suggest_meals_impl(
    state: &AppState,
    request: MealPlanRequest,
) -> Result<Vec<MealSuggestion>, InfraError> {
    let service = MealSuggestionService::new(
        Arc::clone(&state.ports.backend),
        Arc::clone(&state.ports.nutrition),
    );
    service.suggest(&request).await
}

/// Builds the PostgREST client from config and environment, attaching the
/// stored session token while it is still valid.
pub fn backend_client_from_env(
    config_dir: &Path,
    session_store: &dyn SessionStore,
) -> Result<ReqwestSupabaseClient, InfraError> {
    backend_client_from_lookup(config_dir, session_store, |key| std::env::var(key).ok())
}

fn backend_client_from_lookup(
    config_dir: &Path,
    session_store: &dyn SessionStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ReqwestSupabaseClient, InfraError> {
    let project_url = lookup(SUPABASE_URL_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(Ok)
        .unwrap_or_else(|| {
            read_project_url(config_dir).and_then(|configured| {
                configured.ok_or_else(|| {
                    InfraError::InvalidConfig(format!(
                        "backend project url is not configured (set {SUPABASE_URL_ENV} or backend.json projectUrl)"
                    ))
                })
            })
        })?;

    let anon_key = lookup(SUPABASE_ANON_KEY_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("backend anon key is not set ({SUPABASE_ANON_KEY_ENV})"))
        })?;

    let client = ReqwestSupabaseClient::new(&project_url, anon_key)?;
    Ok(match session_store.load_session()? {
        Some(session) if session.is_valid_at(Utc::now(), SESSION_LEEWAY_SECONDS) => {
            client.with_access_token(session.access_token)
        }
        _ => client,
    })
}

pub fn nutrition_client_from_env() -> Result<ReqwestNutritionClient, InfraError> {
    nutrition_client_from_lookup(|key| std::env::var(key).ok())
}

fn nutrition_client_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ReqwestNutritionClient, InfraError> {
    let app_id = lookup(NUTRITIONIX_APP_ID_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("nutrition app id is not set ({NUTRITIONIX_APP_ID_ENV})"))
        })?;
    let app_key = lookup(NUTRITIONIX_APP_KEY_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("nutrition app key is not set ({NUTRITIONIX_APP_KEY_ENV})"))
        })?;

    ReqwestNutritionClient::new(app_id, app_key)
}
