use crate::analysis::live::{LiveSettings, Provider};
use crate::analysis::AnalysisMode;
use crate::collector::CollectOptions;
use crate::error::ConfigError;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_SCHEMA_VERSION: i64 = 1;
const STATE_DIR: &str = ".repolens";

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub repo_root: PathBuf,
    pub report_path: PathBuf,
    pub collect: CollectOptions,
    pub default_mode: AnalysisMode,
    pub live: LiveSettings,
}

impl Config {
    /// Load from `.env`, the optional settings file and the process environment.
    pub fn load(root_override: Option<PathBuf>) -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();
        Config::from_env_with(root_override, |key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(root_override: Option<PathBuf>, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let repo_root = root_override
            .or_else(|| env("REPOLENS_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let settings_file = env("REPOLENS_SETTINGS")
            .map(PathBuf::from)
            .unwrap_or_else(|| repo_root.join(STATE_DIR).join("settings.json"));
        let mut settings = load_settings_file(&settings_file)?;
        apply_env_overrides(&mut settings, &env)?;
        let settings = migrate_settings(settings);

        let report_path = env("REPOLENS_REPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_report_path(&repo_root));

        Ok(Config::from_settings(&settings, repo_root, report_path, &env))
    }

    fn from_settings<F>(settings: &Value, repo_root: PathBuf, report_path: PathBuf, env: &F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match settings["provider"].as_str() {
            Some("openai") => Provider::OpenAi,
            _ => Provider::Mistral,
        };
        let default_mode = match settings["defaultMode"].as_str() {
            Some("live") => AnalysisMode::Live,
            _ => AnalysisMode::Simulated,
        };

        let model = settings["model"]
            .as_str()
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| provider.default_model().to_string());
        let api_base_url = settings["apiBaseUrl"]
            .as_str()
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let api_key = provider
            .key_variables()
            .iter()
            .copied()
            .find_map(|var| env(var).filter(|k| !k.trim().is_empty()));

        Config {
            host: settings["host"].as_str().unwrap_or("0.0.0.0").to_string(),
            port: settings["port"].as_u64().unwrap_or(3001) as u16,
            repo_root,
            report_path,
            collect: CollectOptions {
                max_file_bytes: settings["maxFileBytes"].as_u64().unwrap_or(256 * 1024),
                recent_commit_limit: settings["recentCommitLimit"].as_u64().unwrap_or(5) as usize,
            },
            default_mode,
            live: LiveSettings {
                provider,
                model,
                api_base_url,
                api_key,
                timeout: Duration::from_secs(settings["timeoutSecs"].as_u64().unwrap_or(30)),
                max_retries: settings["maxRetries"].as_u64().unwrap_or(2) as u32,
                min_request_interval: Duration::from_millis(
                    settings["minRequestIntervalMs"].as_u64().unwrap_or(1000),
                ),
                temperature: settings["temperature"].as_f64().unwrap_or(0.1),
                max_tokens: settings["maxTokens"].as_u64().unwrap_or(2000) as u32,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn default_report_path(repo_root: &Path) -> PathBuf {
    repo_root.join(STATE_DIR).join("analysis_report.json")
}

fn load_settings_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(json!({}));
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_str::<Value>(&raw).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

fn apply_env_overrides<F>(settings: &mut Value, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !settings.is_object() {
        *settings = json!({});
    }
    let Some(obj) = settings.as_object_mut() else {
        return Ok(());
    };

    for (var, key) in [
        ("REPOLENS_HOST", "host"),
        ("REPOLENS_PROVIDER", "provider"),
        ("REPOLENS_MODE", "defaultMode"),
        ("REPOLENS_MODEL", "model"),
        ("REPOLENS_API_BASE_URL", "apiBaseUrl"),
    ] {
        if let Some(value) = env(var) {
            obj.insert(key.to_string(), json!(normalize_env_value(key, value.trim())));
        }
    }

    for (var, key) in [
        ("REPOLENS_PORT", "port"),
        ("REPOLENS_MAX_FILE_BYTES", "maxFileBytes"),
        ("REPOLENS_RECENT_COMMITS", "recentCommitLimit"),
        ("REPOLENS_TIMEOUT_SECS", "timeoutSecs"),
        ("REPOLENS_MAX_RETRIES", "maxRetries"),
        ("REPOLENS_MIN_REQUEST_INTERVAL_MS", "minRequestIntervalMs"),
        ("REPOLENS_MAX_TOKENS", "maxTokens"),
    ] {
        if let Some(value) = env(var) {
            let parsed = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid { key, value: value.clone() })?;
            obj.insert(key.to_string(), json!(parsed));
        }
    }

    if let Some(value) = env("REPOLENS_TEMPERATURE") {
        let parsed = value
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::Invalid { key: "temperature", value: value.clone() })?;
        obj.insert("temperature".to_string(), json!(parsed));
    }

    Ok(())
}

// Enum-valued keys are case-insensitive; free-form ones are kept as given.
fn normalize_env_value(key: &str, value: &str) -> String {
    match key {
        "provider" | "defaultMode" => value.to_ascii_lowercase(),
        _ => value.to_string(),
    }
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "host": "0.0.0.0",
        "port": 3001,
        "maxFileBytes": 256 * 1024,
        "recentCommitLimit": 5,
        "defaultMode": "simulated",
        "provider": "mistral",
        "model": "",
        "apiBaseUrl": "",
        "timeoutSecs": 30,
        "maxRetries": 2,
        "minRequestIntervalMs": 1000,
        "temperature": 0.1,
        "maxTokens": 2000
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "port", 1, 65535, 3001);
    clamp_u64(obj, "maxFileBytes", 1024, 10 * 1024 * 1024, 256 * 1024);
    clamp_u64(obj, "recentCommitLimit", 1, 100, 5);
    clamp_u64(obj, "timeoutSecs", 1, 300, 30);
    clamp_u64(obj, "maxRetries", 0, 5, 2);
    clamp_u64(obj, "minRequestIntervalMs", 0, 60_000, 1000);
    clamp_u64(obj, "maxTokens", 64, 32_000, 2000);

    let temperature = obj.get("temperature").and_then(Value::as_f64).unwrap_or(0.1);
    obj.insert("temperature".to_string(), json!(temperature.clamp(0.0, 2.0)));

    sanitize_enum(obj, "defaultMode", &["simulated", "live"], "simulated");
    sanitize_enum(obj, "provider", &["mistral", "openai"], "mistral");

    for key in ["host", "model", "apiBaseUrl"] {
        if !obj.get(key).map(Value::is_string).unwrap_or(false) {
            let fallback = default_settings()[key].clone();
            obj.insert(key.to_string(), fallback);
        }
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_settings_or_env() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::from_env_with(Some(tmp.path().to_path_buf()), env_from(&[])).unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.default_mode, AnalysisMode::Simulated);
        assert_eq!(config.live.provider, Provider::Mistral);
        assert_eq!(config.live.model, "mistral-large-latest");
        assert_eq!(config.live.timeout, Duration::from_secs(30));
        assert!(config.live.api_key.is_none());
        assert_eq!(config.report_path, tmp.path().join(".repolens/analysis_report.json"));
    }

    #[test]
    fn settings_file_is_merged_and_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(STATE_DIR)).unwrap();
        fs::write(
            tmp.path().join(STATE_DIR).join("settings.json"),
            r#"{ "provider": "openai", "timeoutSecs": 9000, "defaultMode": "bogus", "maxRetries": 1 }"#,
        )
        .unwrap();

        let config = Config::from_env_with(
            Some(tmp.path().to_path_buf()),
            env_from(&[("OPENAI_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert_eq!(config.live.provider, Provider::OpenAi);
        assert_eq!(config.live.model, "gpt-4o");
        assert_eq!(config.live.timeout, Duration::from_secs(300));
        assert_eq!(config.live.max_retries, 1);
        assert_eq!(config.default_mode, AnalysisMode::Simulated);
        assert_eq!(config.live.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn environment_overrides_settings_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::from_env_with(
            Some(tmp.path().to_path_buf()),
            env_from(&[
                ("REPOLENS_PORT", "8080"),
                ("REPOLENS_MODE", "LIVE"),
                ("REPOLENS_API_BASE_URL", "http://localhost:9999/v1/"),
                ("MISTRALAI_API_KEY", "abc"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.default_mode, AnalysisMode::Live);
        assert_eq!(config.live.api_base_url, "http://localhost:9999/v1");
        assert_eq!(config.live.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn rejects_non_numeric_env_values() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::from_env_with(
            Some(tmp.path().to_path_buf()),
            env_from(&[("REPOLENS_PORT", "eighty")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "port", .. }));
    }

    #[test]
    fn malformed_settings_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("custom.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::from_env_with(
            Some(tmp.path().to_path_buf()),
            env_from(&[("REPOLENS_SETTINGS", path.to_str().unwrap())]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
