use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DAILY_REMINDER_TYPE: &str = "daily_reminder";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderSettings {
    pub user_id: String,
    pub reminder_enabled: bool,
    pub reminder_time: String,
}

impl ReminderSettings {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_id, "reminder_settings.user_id")
    }

    pub fn has_reminder_time(&self) -> bool {
        !self.reminder_time.trim().is_empty()
    }
}

/// A reminder time-of-day in 24-hour form, parsed from the backend's
/// `"H:MM AM|PM"` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let mut parts = raw.split(' ');
        let (Some(clock), Some(meridiem), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("reminder time must be H:MM AM|PM, got '{raw}'"));
        };

        let mut clock_parts = clock.split(':');
        let (Some(hour_str), Some(minute_str), None) =
            (clock_parts.next(), clock_parts.next(), clock_parts.next())
        else {
            return Err(format!("reminder time clock must be H:MM, got '{clock}'"));
        };

        let hour = hour_str
            .parse::<u32>()
            .map_err(|_| format!("reminder time hour must be numeric, got '{hour_str}'"))?;
        let minute = minute_str
            .parse::<u32>()
            .map_err(|_| format!("reminder time minute must be numeric, got '{minute_str}'"))?;
        if !(1..=12).contains(&hour) {
            return Err(format!("reminder time hour must be 1-12, got {hour}"));
        }
        if minute > 59 {
            return Err(format!("reminder time minute must be 0-59, got {minute}"));
        }

        let hour = match meridiem {
            "PM" if hour != 12 => hour + 12,
            "AM" if hour == 12 => 0,
            "AM" | "PM" => hour,
            _ => {
                return Err(format!(
                    "reminder time meridiem must be AM or PM, got '{meridiem}'"
                ));
            }
        };

        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// The next local instant at this time of day strictly after `now`;
    /// today's occurrence when still ahead, otherwise tomorrow's. `None` only
    /// when the local timezone has no such instant (DST gap).
    pub fn next_occurrence_after<Z: TimeZone>(&self, now: &DateTime<Z>) -> Option<DateTime<Z>> {
        let timezone = now.timezone();
        let occurrence_on = |date: NaiveDate| -> Option<DateTime<Z>> {
            timezone
                .from_local_datetime(&date.and_hms_opt(self.hour, self.minute, 0)?)
                .earliest()
        };

        let today = now.date_naive();
        match occurrence_on(today) {
            Some(candidate) if candidate > *now => Some(candidate),
            _ => occurrence_on(today.succ_opt()?),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyTrigger {
    pub hour: u32,
    pub minute: u32,
    pub repeats: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: String,
}

impl NotificationPayload {
    pub fn daily_reminder(user_id: impl Into<String>) -> Self {
        Self {
            kind: DAILY_REMINDER_TYPE.to_string(),
            user_id: user_id.into(),
        }
    }

    pub fn is_daily_reminder(&self) -> bool {
        self.kind == DAILY_REMINDER_TYPE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub sound: bool,
    pub payload: NotificationPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutPlan {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyWorkout {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    Skipped,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseCompletion {
    pub workout_id: String,
    pub status: CompletionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationLog {
    pub user_id: String,
    pub notification_type: String,
    pub was_triggered: bool,
    pub workout_completed: bool,
}

impl NotificationLog {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_id, "notification_log.user_id")?;
        validate_non_empty(&self.notification_type, "notification_log.notification_type")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub user_id: String,
}

impl BackendSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Per-meal nutrient target: a share of the day's calories with each macro
/// scaled by the same share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroTargets {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl MacroTargets {
    pub fn for_meal(meal_calories: f64, daily_calories: f64, macros: &Macros) -> Self {
        let share = meal_calories / daily_calories;
        Self {
            calories: meal_calories,
            protein_g: macros.protein_g * share,
            carbs_g: macros.carbs_g * share,
            fat_g: macros.fat_g * share,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConditions {
    pub has_diabetes: bool,
    pub has_hypertension: bool,
    pub is_menopausal: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstruation,
    Follicular,
    Ovulation,
    Luteal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub dietary_preference: Option<String>,
    pub calories: Option<f64>,
    pub macros: Option<Macros>,
    pub health_conditions: Option<HealthConditions>,
    pub cycle_phase: Option<CyclePhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealPlanRequest {
    pub diet: String,
    pub calories: f64,
    pub macros: Macros,
    pub health_conditions: HealthConditions,
    pub cycle_phase: Option<CyclePhase>,
    pub user_id: String,
}

impl MealPlanRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.diet, "meal_plan_request.diet")?;
        validate_non_empty(&self.user_id, "meal_plan_request.user_id")?;
        if self.calories <= 0.0 {
            return Err("meal_plan_request.calories must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealSuggestion {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn reminder_time_parses_twelve_hour_edges() {
        assert_eq!(
            ReminderTime::parse("12:00 AM").expect("midnight"),
            ReminderTime { hour: 0, minute: 0 }
        );
        assert_eq!(
            ReminderTime::parse("12:00 PM").expect("noon"),
            ReminderTime {
                hour: 12,
                minute: 0
            }
        );
        assert_eq!(
            ReminderTime::parse("1:30 PM").expect("afternoon"),
            ReminderTime {
                hour: 13,
                minute: 30
            }
        );
        assert_eq!(
            ReminderTime::parse("11:59 PM").expect("end of day"),
            ReminderTime {
                hour: 23,
                minute: 59
            }
        );
    }

    #[test]
    fn reminder_time_rejects_malformed_input() {
        for raw in [
            "",
            "8:00",
            "8:00 XM",
            "8:00 am",
            "08-00 AM",
            "ate:00 PM",
            "8:xx PM",
            "0:30 AM",
            "13:00 PM",
            "8:60 AM",
            "8:00 PM extra",
        ] {
            assert!(ReminderTime::parse(raw).is_err(), "accepted '{raw}'");
        }
    }

    proptest! {
        #[test]
        fn reminder_time_parse_matches_twelve_hour_arithmetic(
            hour in 1u32..=12u32,
            minute in 0u32..=59u32,
            pm in proptest::bool::ANY
        ) {
            let meridiem = if pm { "PM" } else { "AM" };
            let parsed = ReminderTime::parse(&format!("{hour}:{minute:02} {meridiem}"))
                .expect("valid time");

            let expected_hour = match (pm, hour) {
                (true, 12) => 12,
                (true, hour) => hour + 12,
                (false, 12) => 0,
                (false, hour) => hour,
            };
            prop_assert_eq!(parsed.hour(), expected_hour);
            prop_assert_eq!(parsed.minute(), minute);
        }
    }

    #[test]
    fn next_occurrence_stays_today_when_time_is_ahead() {
        let now = fixed_time("2026-03-02T07:15:00Z");
        let time = ReminderTime::parse("8:00 AM").expect("valid time");
        let next = time.next_occurrence_after(&now).expect("occurrence");
        assert_eq!(next, fixed_time("2026-03-02T08:00:00Z"));
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow_when_time_has_passed() {
        let now = fixed_time("2026-03-02T09:00:00Z");
        let time = ReminderTime::parse("8:00 AM").expect("valid time");
        let next = time.next_occurrence_after(&now).expect("occurrence");
        assert_eq!(next, fixed_time("2026-03-03T08:00:00Z"));
    }

    #[test]
    fn next_occurrence_rolls_when_exactly_now() {
        let now = fixed_time("2026-03-02T08:00:00Z");
        let time = ReminderTime::parse("8:00 AM").expect("valid time");
        let next = time.next_occurrence_after(&now).expect("occurrence");
        assert_eq!(next, fixed_time("2026-03-03T08:00:00Z"));
    }

    #[test]
    fn next_occurrence_respects_local_timezone() {
        use chrono_tz::Asia::Karachi;

        // 04:30 UTC is 09:30 in Karachi, so 8:00 AM local already passed.
        let now = fixed_time("2026-03-02T04:30:00Z").with_timezone(&Karachi);
        let time = ReminderTime::parse("8:00 AM").expect("valid time");
        let next = time.next_occurrence_after(&now).expect("occurrence");
        assert_eq!(
            next.date_naive(),
            NaiveDate::from_ymd_opt(2026, 3, 3).expect("date")
        );
        assert_eq!(next.with_timezone(&Utc), fixed_time("2026-03-03T03:00:00Z"));
    }

    #[test]
    fn daily_reminder_payload_roundtrip_uses_type_field() {
        let payload = NotificationPayload::daily_reminder("user-1");
        let encoded = serde_json::to_string(&payload).expect("serialize payload");
        assert!(encoded.contains("\"type\":\"daily_reminder\""));

        let decoded: NotificationPayload =
            serde_json::from_str(&encoded).expect("deserialize payload");
        assert!(decoded.is_daily_reminder());
        assert_eq!(decoded, payload);
    }

    #[test]
    fn completion_status_tolerates_unknown_values() {
        let status: CompletionStatus =
            serde_json::from_str("\"in_progress\"").expect("deserialize status");
        assert_eq!(status, CompletionStatus::Unknown);

        let completed: CompletionStatus =
            serde_json::from_str("\"completed\"").expect("deserialize status");
        assert_eq!(completed, CompletionStatus::Completed);
    }

    #[test]
    fn session_validity_honors_leeway() {
        let session = BackendSession {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: fixed_time("2026-03-02T10:00:00Z"),
            token_type: "bearer".to_string(),
            user_id: "user-1".to_string(),
        };

        assert!(session.is_valid_at(fixed_time("2026-03-02T09:58:00Z"), 60));
        assert!(!session.is_valid_at(fixed_time("2026-03-02T09:59:30Z"), 60));
        assert!(!session.is_valid_at(fixed_time("2026-03-02T10:01:00Z"), 0));
    }

    #[test]
    fn macro_targets_scale_with_meal_share() {
        let macros = Macros {
            protein_g: 120.0,
            carbs_g: 200.0,
            fat_g: 60.0,
        };
        let target = MacroTargets::for_meal(600.0, 2000.0, &macros);

        assert!((target.calories - 600.0).abs() < f64::EPSILON);
        assert!((target.protein_g - 36.0).abs() < 1e-9);
        assert!((target.carbs_g - 60.0).abs() < 1e-9);
        assert!((target.fat_g - 18.0).abs() < 1e-9);
    }

    #[test]
    fn meal_plan_request_validation() {
        let request = MealPlanRequest {
            diet: "vegetarian".to_string(),
            calories: 1800.0,
            macros: Macros {
                protein_g: 90.0,
                carbs_g: 210.0,
                fat_g: 60.0,
            },
            health_conditions: HealthConditions::default(),
            cycle_phase: Some(CyclePhase::Luteal),
            user_id: "user-1".to_string(),
        };
        assert!(request.validate().is_ok());

        let mut missing_diet = request.clone();
        missing_diet.diet = "  ".to_string();
        assert!(missing_diet.validate().is_err());

        let mut zero_calories = request;
        zero_calories.calories = 0.0;
        assert!(zero_calories.validate().is_err());
    }

    #[test]
    fn notification_log_requires_identifiers() {
        let log = NotificationLog {
            user_id: "user-1".to_string(),
            notification_type: DAILY_REMINDER_TYPE.to_string(),
            was_triggered: true,
            workout_completed: false,
        };
        assert!(log.validate().is_ok());

        let mut missing_user = log;
        missing_user.user_id = String::new();
        assert!(missing_user.validate().is_err());
    }
}
