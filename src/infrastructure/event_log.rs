use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const EVENTS_LOG: &str = "events.log";

/// Append-only JSON-line log under `logs/`. Logging never fails the caller;
/// a write that cannot happen is simply dropped.
#[derive(Debug)]
pub struct EventLog {
    logs_dir: PathBuf,
    guard: Mutex<()>,
}

impl EventLog {
    pub fn new(logs_dir: impl AsRef<Path>) -> Self {
        Self {
            logs_dir: logs_dir.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    pub fn info(&self, operation: &str, message: &str) {
        self.append("info", operation, message);
    }

    pub fn error(&self, operation: &str, message: &str) {
        self.append("error", operation, message);
    }

    fn append(&self, level: &str, operation: &str, message: &str) {
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let path = self.logs_dir.join(EVENTS_LOG);
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "operation": operation,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn lines_are_json_with_level_and_operation() {
        let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
        let logs_dir = std::env::temp_dir().join(format!(
            "femmefitness-event-log-{}-{}",
            std::process::id(),
            sequence
        ));
        fs::create_dir_all(&logs_dir).expect("create logs dir");

        let log = EventLog::new(&logs_dir);
        log.info("reminder_check", "daily reminder armed for 8:00 AM");
        log.error("reminder_check", "failed to fetch reminder settings");

        let raw = fs::read_to_string(logs_dir.join(EVENTS_LOG)).expect("read log");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json line");
        assert_eq!(first.get("level").and_then(serde_json::Value::as_str), Some("info"));
        assert_eq!(
            first.get("operation").and_then(serde_json::Value::as_str),
            Some("reminder_check")
        );

        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("json line");
        assert_eq!(second.get("level").and_then(serde_json::Value::as_str), Some("error"));

        let _ = fs::remove_dir_all(&logs_dir);
    }
}
