use crate::domain::models::{
    DailyWorkout, Exercise, ExerciseCompletion, NotificationLog, ReminderSettings, UserProfile,
    WorkoutPlan,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

const USER_NOTIFICATIONS_TABLE: &str = "UserNotifications";
const WORKOUT_PLANS_TABLE: &str = "WorkoutPlans";
const DAILY_WORKOUTS_TABLE: &str = "DailyWorkouts";
const WORKOUTS_TABLE: &str = "Workouts";
const EXERCISE_COMPLETIONS_TABLE: &str = "ExerciseCompletions";
const NOTIFICATION_LOGS_TABLE: &str = "NotificationLogs";
const USERS_TABLE: &str = "User";

const SINGLE_OBJECT_ACCEPT: &str = "application/vnd.pgrst.object+json";
// PostgREST error code for a single-object read that matched no row.
const NO_ROW_CODE: &str = "PGRST116";

#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn fetch_reminder_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<ReminderSettings>, InfraError>;

    async fn fetch_active_plan(&self, user_id: &str) -> Result<Option<WorkoutPlan>, InfraError>;

    async fn fetch_daily_workout(
        &self,
        plan_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyWorkout>, InfraError>;

    async fn list_exercises(&self, daily_workout_id: &str) -> Result<Vec<Exercise>, InfraError>;

    async fn list_completions(
        &self,
        daily_workout_id: &str,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<ExerciseCompletion>, InfraError>;

    async fn insert_notification_log(&self, log: &NotificationLog) -> Result<(), InfraError>;

    async fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSupabaseClient {
    client: Client,
    project_url: Url,
    api_key: String,
    access_token: Option<String>,
}

impl ReqwestSupabaseClient {
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Result<Self, InfraError> {
        let api_key = api_key.into();
        Self::ensure_non_empty(&api_key, "api key")?;
        let project_url = Url::parse(project_url.trim())
            .map_err(|error| InfraError::Backend(format!("invalid project url: {error}")))?;

        Ok(Self {
            client: Client::new(),
            project_url,
            api_key,
            access_token: None,
        })
    }

    /// Replaces the anon-key bearer with an authenticated session token.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        let access_token = access_token.into();
        self.access_token = Some(access_token).filter(|token| !token.trim().is_empty());
        self
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Backend(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn table_endpoint(&self, table: &str) -> Result<Url, InfraError> {
        let mut url = self.project_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| InfraError::Backend("project URL cannot be a base".to_string()))?;
            segments.push("rest");
            segments.push("v1");
            segments.push(table);
        }
        Ok(url)
    }

    fn backend_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("backend api error: http {}", status.as_u16())
        } else {
            format!("backend api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Backend(message)
    }

    fn is_no_row(body: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("code")
                    .and_then(serde_json::Value::as_str)
                    .map(|code| code == NO_ROW_CODE)
            })
            .unwrap_or(false)
    }

    async fn get_object<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, InfraError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header(ACCEPT, SINGLE_OBJECT_ACCEPT)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|error| InfraError::Backend(format!("network error while querying backend: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Backend(format!("failed reading backend response: {error}")))?;

        if !status.is_success() {
            if Self::is_no_row(&body) {
                return Ok(None);
            }
            return Err(Self::backend_http_error(status, &body));
        }

        let parsed: T = serde_json::from_str(&body).map_err(|error| {
            InfraError::Backend(format!("invalid backend payload: {error}; body={body}"))
        })?;
        Ok(Some(parsed))
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, InfraError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|error| InfraError::Backend(format!("network error while querying backend: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Backend(format!("failed reading backend response: {error}")))?;

        if !status.is_success() {
            return Err(Self::backend_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::Backend(format!("invalid backend payload: {error}; body={body}"))
        })
    }

    async fn post_row<T: serde::Serialize>(&self, url: Url, row: &T) -> Result<(), InfraError> {
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer())
            .json(row)
            .send()
            .await
            .map_err(|error| InfraError::Backend(format!("network error while inserting row: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Backend(format!("failed reading insert response: {error}")))?;

        if !status.is_success() {
            return Err(Self::backend_http_error(status, &body));
        }
        Ok(())
    }
}

#[derive(Debug, serde::Deserialize)]
struct ReminderSettingsRow {
    reminder_enabled: bool,
    reminder_time: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct IdRow {
    id: String,
}

#[async_trait]
impl BackendClient for ReqwestSupabaseClient {
    async fn fetch_reminder_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<ReminderSettings>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let mut url = self.table_endpoint(USER_NOTIFICATIONS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "reminder_enabled,reminder_time")
            .append_pair("user_id", &format!("eq.{user_id}"));

        let row: Option<ReminderSettingsRow> = self.get_object(url).await?;
        Ok(row.map(|row| ReminderSettings {
            user_id: user_id.to_string(),
            reminder_enabled: row.reminder_enabled,
            reminder_time: row.reminder_time.unwrap_or_default(),
        }))
    }

    async fn fetch_active_plan(&self, user_id: &str) -> Result<Option<WorkoutPlan>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let mut url = self.table_endpoint(WORKOUT_PLANS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("user_id", &format!("eq.{user_id}"))
            .append_pair("status", "eq.active");

        let row: Option<IdRow> = self.get_object(url).await?;
        Ok(row.map(|row| WorkoutPlan { id: row.id }))
    }

    async fn fetch_daily_workout(
        &self,
        plan_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyWorkout>, InfraError> {
        Self::ensure_non_empty(plan_id, "plan id")?;

        let mut url = self.table_endpoint(DAILY_WORKOUTS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("workout_plan_id", &format!("eq.{plan_id}"))
            .append_pair("daily_workout_date", &format!("gte.{date}T00:00:00"))
            .append_pair("daily_workout_date", &format!("lte.{date}T23:59:59"));

        let row: Option<IdRow> = self.get_object(url).await?;
        Ok(row.map(|row| DailyWorkout { id: row.id }))
    }

    async fn list_exercises(&self, daily_workout_id: &str) -> Result<Vec<Exercise>, InfraError> {
        Self::ensure_non_empty(daily_workout_id, "daily workout id")?;

        let mut url = self.table_endpoint(WORKOUTS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("daily_workout_id", &format!("eq.{daily_workout_id}"));

        let rows: Vec<IdRow> = self.get_list(url).await?;
        Ok(rows.into_iter().map(|row| Exercise { id: row.id }).collect())
    }

    async fn list_completions(
        &self,
        daily_workout_id: &str,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<ExerciseCompletion>, InfraError> {
        Self::ensure_non_empty(daily_workout_id, "daily workout id")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let mut url = self.table_endpoint(EXERCISE_COMPLETIONS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "workout_id,status")
            .append_pair("daily_workout_id", &format!("eq.{daily_workout_id}"))
            .append_pair("user_id", &format!("eq.{user_id}"))
            .append_pair("completion_date", &format!("gte.{since}"));

        self.get_list(url).await
    }

    async fn insert_notification_log(&self, log: &NotificationLog) -> Result<(), InfraError> {
        log.validate().map_err(InfraError::Backend)?;
        let url = self.table_endpoint(NOTIFICATION_LOGS_TABLE)?;
        self.post_row(url, log).await
    }

    async fn fetch_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let mut url = self.table_endpoint(USERS_TABLE)?;
        url.query_pairs_mut()
            .append_pair(
                "select",
                "dietary_preference,calories,macros,health_conditions,cycle_phase",
            )
            .append_pair("id", &format!("eq.{user_id}"));

        self.get_object(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ReqwestSupabaseClient {
        ReqwestSupabaseClient::new("https://project.supabase.co", "anon-key")
            .expect("valid client")
    }

    #[test]
    fn new_rejects_empty_api_key_and_bad_url() {
        assert!(ReqwestSupabaseClient::new("https://project.supabase.co", "  ").is_err());
        assert!(ReqwestSupabaseClient::new("not a url", "anon-key").is_err());
    }

    #[test]
    fn table_endpoint_targets_rest_v1() {
        let url = client()
            .table_endpoint(USER_NOTIFICATIONS_TABLE)
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/UserNotifications"
        );
    }

    #[test]
    fn bearer_prefers_access_token_when_present() {
        let anonymous = client();
        assert_eq!(anonymous.bearer(), "anon-key");

        let authenticated = client().with_access_token("session-token");
        assert_eq!(authenticated.bearer(), "session-token");

        let blank_token = client().with_access_token("   ");
        assert_eq!(blank_token.bearer(), "anon-key");
    }

    #[test]
    fn no_row_error_code_is_recognized() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","message":"JSON object requested, multiple (or no) rows returned"}"#;
        assert!(ReqwestSupabaseClient::is_no_row(body));

        assert!(!ReqwestSupabaseClient::is_no_row(
            r#"{"code":"PGRST301","message":"JWT expired"}"#
        ));
        assert!(!ReqwestSupabaseClient::is_no_row("not json"));
    }
}
