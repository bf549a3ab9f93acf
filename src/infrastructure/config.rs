use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const BACKEND_JSON: &str = "backend.json";
const REMINDERS_JSON: &str = "reminders.json";

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub schema: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub backend: serde_json::Value,
    pub reminders: serde_json::Value,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "FemmeFitness",
                "timezone": "UTC"
            }),
        ),
        (
            BACKEND_JSON,
            serde_json::json!({
                "schema": 1,
                "projectUrl": null
            }),
        ),
        (
            REMINDERS_JSON,
            serde_json::json!({
                "schema": 1,
                "pollIntervalSeconds": DEFAULT_POLL_INTERVAL_SECONDS
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        backend: read_config(&config_dir.join(BACKEND_JSON))?,
        reminders: read_config(&config_dir.join(REMINDERS_JSON))?,
    })
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn read_poll_interval_seconds(config_dir: &Path) -> Result<u64, InfraError> {
    let reminders = read_config(&config_dir.join(REMINDERS_JSON))?;
    let interval = reminders
        .get("pollIntervalSeconds")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);
    if interval == 0 {
        return Err(InfraError::InvalidConfig(
            "pollIntervalSeconds must be > 0".to_string(),
        ));
    }
    Ok(interval)
}

pub fn read_project_url(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let backend = read_config(&config_dir.join(BACKEND_JSON))?;
    Ok(backend
        .get("projectUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn save_project_url(config_dir: &Path, project_url: &str) -> Result<(), InfraError> {
    let project_url = project_url.trim();
    if project_url.is_empty() {
        return Err(InfraError::InvalidConfig(
            "projectUrl must not be empty".to_string(),
        ));
    }

    let path = config_dir.join(BACKEND_JSON);
    let mut backend = read_config(&path)?;
    let object = backend.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "projectUrl".to_string(),
        serde_json::Value::String(project_url.to_string()),
    );

    let formatted = serde_json::to_string_pretty(&backend)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "femmefitness-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_and_loadable() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        let bundle = load_configs(&dir.path).expect("load configs");
        assert_eq!(
            bundle.app.get("appName").and_then(serde_json::Value::as_str),
            Some("FemmeFitness")
        );
        assert_eq!(read_timezone(&dir.path).expect("timezone"), Some("UTC".to_string()));
        assert_eq!(
            read_poll_interval_seconds(&dir.path).expect("poll interval"),
            DEFAULT_POLL_INTERVAL_SECONDS
        );
        assert_eq!(read_project_url(&dir.path).expect("project url"), None);
    }

    #[test]
    fn project_url_roundtrip() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        save_project_url(&dir.path, "https://project.supabase.co").expect("save url");
        assert_eq!(
            read_project_url(&dir.path).expect("project url"),
            Some("https://project.supabase.co".to_string())
        );

        assert!(save_project_url(&dir.path, "   ").is_err());
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        fs::write(dir.path.join(APP_JSON), "{\"schema\": 2}\n").expect("overwrite app.json");

        assert!(load_configs(&dir.path).is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        fs::write(
            dir.path.join(REMINDERS_JSON),
            "{\"schema\": 1, \"pollIntervalSeconds\": 0}\n",
        )
        .expect("overwrite reminders.json");

        assert!(read_poll_interval_seconds(&dir.path).is_err());
    }
}
