pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    backend_client_from_env, check_workout_completion_impl, handle_notification_impl,
    nutrition_client_from_env, reminder_status_impl, start_reminders_impl, stop_reminders_impl,
    suggest_meals_impl, AppPorts, AppState, NotificationDecisionResponse,
    ReminderLifecycleResponse,
};
pub use application::meal_suggestion::MealSuggestionService;
pub use application::notification_handler::{
    DeliveryDecision, NotificationHandler, ReceivedNotification,
};
pub use application::reminder_scheduler::{ReminderScheduler, SchedulerSnapshot};
pub use application::workout_completion::check_workout_completion;
pub use infrastructure::error::InfraError;
