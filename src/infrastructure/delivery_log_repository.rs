use crate::domain::models::NotificationLog;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryLogEntry {
    pub log: NotificationLog,
    pub decided_at: DateTime<Utc>,
}

pub trait DeliveryLogRepository: Send + Sync {
    fn record(&self, entry: &DeliveryLogEntry) -> Result<(), InfraError>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<DeliveryLogEntry>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteDeliveryLogRepository {
    db_path: PathBuf,
}

impl SqliteDeliveryLogRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl DeliveryLogRepository for SqliteDeliveryLogRepository {
    fn record(&self, entry: &DeliveryLogEntry) -> Result<(), InfraError> {
        entry.log.validate().map_err(InfraError::InvalidConfig)?;

        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO delivery_log (user_id, notification_type, was_triggered, workout_completed, decided_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.log.user_id,
                entry.log.notification_type,
                entry.log.was_triggered,
                entry.log.workout_completed,
                entry.decided_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<DeliveryLogEntry>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT user_id, notification_type, was_triggered, workout_completed, decided_at
             FROM delivery_log WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = statement.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (user_id, notification_type, was_triggered, workout_completed, decided_at_raw) =
                row?;
            let decided_at = DateTime::parse_from_rfc3339(&decided_at_raw).map_err(|error| {
                InfraError::InvalidConfig(format!(
                    "invalid delivery_log.decided_at '{decided_at_raw}': {error}"
                ))
            })?;
            entries.push(DeliveryLogEntry {
                log: NotificationLog {
                    user_id,
                    notification_type,
                    was_triggered,
                    workout_completed,
                },
                decided_at: decided_at.with_timezone(&Utc),
            });
        }
        Ok(entries)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDeliveryLogRepository {
    entries: Mutex<Vec<DeliveryLogEntry>>,
}

impl DeliveryLogRepository for InMemoryDeliveryLogRepository {
    fn record(&self, entry: &DeliveryLogEntry) -> Result<(), InfraError> {
        entry.log.validate().map_err(InfraError::InvalidConfig)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("delivery log lock poisoned: {error}")))?;
        entries.push(entry.clone());
        Ok(())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<DeliveryLogEntry>, InfraError> {
        let entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("delivery log lock poisoned: {error}")))?;
        Ok(entries
            .iter()
            .filter(|entry| entry.log.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DAILY_REMINDER_TYPE;
    use crate::infrastructure::storage::initialize_database;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    fn temp_db_path() -> PathBuf {
        let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "femmefitness-delivery-log-{}-{}.sqlite",
            std::process::id(),
            sequence
        ))
    }

    fn sample_entry(user_id: &str, workout_completed: bool) -> DeliveryLogEntry {
        DeliveryLogEntry {
            log: NotificationLog {
                user_id: user_id.to_string(),
                notification_type: DAILY_REMINDER_TYPE.to_string(),
                was_triggered: true,
                workout_completed,
            },
            decided_at: DateTime::parse_from_rfc3339("2026-03-02T08:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn sqlite_repository_roundtrip() {
        let db_path = temp_db_path();
        initialize_database(&db_path).expect("initialize database");
        let repository = SqliteDeliveryLogRepository::new(&db_path);

        repository
            .record(&sample_entry("user-1", false))
            .expect("record first");
        repository
            .record(&sample_entry("user-1", true))
            .expect("record second");
        repository
            .record(&sample_entry("user-2", true))
            .expect("record other user");

        let entries = repository.list_for_user("user-1").expect("list entries");
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].log.workout_completed);
        assert!(entries[1].log.workout_completed);

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn record_rejects_empty_user_id() {
        let repository = InMemoryDeliveryLogRepository::default();
        let mut entry = sample_entry("user-1", false);
        entry.log.user_id = String::new();
        assert!(repository.record(&entry).is_err());
    }
}
