pub mod bootstrap;
pub mod commands;
pub mod meal_suggestion;
pub mod notification_handler;
pub mod reminder_scheduler;
pub mod workout_completion;
