pub mod config;
pub mod credential_store;
pub mod delivery_log_repository;
pub mod error;
pub mod event_log;
pub mod notification_service;
pub mod nutrition_client;
pub mod storage;
pub mod supabase_client;
