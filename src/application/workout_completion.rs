use crate::domain::models::CompletionStatus;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::supabase_client::BackendClient;
use chrono::NaiveDate;

/// Whether the user has completed every exercise of today's assigned
/// workout. Anything missing along the chain (no active plan, no daily
/// workout, no assigned exercises) and any query error answer `false`, so a
/// reminder is shown rather than suppressed.
pub async fn check_workout_completion(
    backend: &dyn BackendClient,
    user_id: &str,
    today: NaiveDate,
) -> bool {
    completion_reached(backend, user_id, today)
        .await
        .unwrap_or(false)
}

async fn completion_reached(
    backend: &dyn BackendClient,
    user_id: &str,
    today: NaiveDate,
) -> Result<bool, InfraError> {
    let Some(plan) = backend.fetch_active_plan(user_id).await? else {
        return Ok(false);
    };
    let Some(daily_workout) = backend.fetch_daily_workout(&plan.id, today).await? else {
        return Ok(false);
    };

    let exercises = backend.list_exercises(&daily_workout.id).await?;
    if exercises.is_empty() {
        return Ok(false);
    }

    let completions = backend
        .list_completions(&daily_workout.id, user_id, today)
        .await?;
    let completed = completions
        .iter()
        .filter(|completion| completion.status == CompletionStatus::Completed)
        .count();
    Ok(completed >= exercises.len())
}
