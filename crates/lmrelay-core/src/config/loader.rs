//! Config loader — reads `~/.lmrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.lmrelay/config.json`
//! 3. Environment variables `LMRELAY_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `LMRELAY_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `LMRELAY_BACKEND__API_BASE` → `backend.api_base`
/// - `LMRELAY_BACKEND__API_KEY` → `backend.api_key`
/// - `LMRELAY_BACKEND__MODEL` → `backend.model`
/// - `LMRELAY_BACKEND__TIMEOUT_SECS` → `backend.timeout_secs`
/// - `LMRELAY_CHANNELS__TELEGRAM__TOKEN` → `channels.telegram.token`
///   (falls back to `API_TOKEN` when the token is still empty)
/// - `LMRELAY_STORAGE__DATABASE_PATH` → `storage.database_path`
/// - `LMRELAY_RELAY__SYSTEM_PROMPT` → `relay.system_prompt`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    // Backend
    if let Some(val) = var("LMRELAY_BACKEND__API_BASE") {
        config.backend.api_base = val;
    }
    if let Some(val) = var("LMRELAY_BACKEND__API_KEY") {
        config.backend.api_key = val;
    }
    if let Some(val) = var("LMRELAY_BACKEND__MODEL") {
        config.backend.model = val;
    }
    if let Some(val) = var("LMRELAY_BACKEND__TIMEOUT_SECS") {
        match val.parse::<u64>() {
            Ok(secs) => config.backend.timeout_secs = secs,
            Err(_) => warn!("Ignoring invalid LMRELAY_BACKEND__TIMEOUT_SECS: {}", val),
        }
    }

    // Channels
    if let Some(val) = var("LMRELAY_CHANNELS__TELEGRAM__TOKEN") {
        config.channels.telegram.token = val;
    }
    if config.channels.telegram.token.is_empty() {
        if let Some(val) = var("API_TOKEN") {
            config.channels.telegram.token = val;
        }
    }

    // Storage
    if let Some(val) = var("LMRELAY_STORAGE__DATABASE_PATH") {
        config.storage.database_path = val;
    }

    // Relay
    if let Some(val) = var("LMRELAY_RELAY__SYSTEM_PROMPT") {
        config.relay.system_prompt = val;
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.backend.api_base, "http://localhost:1234/v1");
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "backend": {
                "apiBase": "http://10.0.0.5:8080/v1",
                "timeoutSecs": 10
            },
            "storage": { "databasePath": "/var/lib/lmrelay/users.db" }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.backend.api_base, "http://10.0.0.5:8080/v1");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.storage.database_path, "/var/lib/lmrelay/users.db");
        // Default preserved
        assert_eq!(config.relay.bus_capacity, 100);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.backend.api_base, "http://localhost:1234/v1");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.backend.model = "qwen2.5-7b-instruct".to_string();
        config.channels.telegram.token = "123:abc".to_string();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.backend.model, "qwen2.5-7b-instruct");
        assert_eq!(reloaded.channels.telegram.token, "123:abc");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["backend"].get("apiBase").is_some());
        assert!(raw["backend"].get("api_base").is_none());
    }

    #[test]
    fn test_env_override_backend() {
        let config = apply_overrides(
            Config::default(),
            env(&[
                ("LMRELAY_BACKEND__API_BASE", "http://gpu-box:1234/v1"),
                ("LMRELAY_BACKEND__MODEL", "mistral-7b"),
                ("LMRELAY_BACKEND__TIMEOUT_SECS", "45"),
            ]),
        );
        assert_eq!(config.backend.api_base, "http://gpu-box:1234/v1");
        assert_eq!(config.backend.model, "mistral-7b");
        assert_eq!(config.backend.timeout_secs, 45);
    }

    #[test]
    fn test_env_override_invalid_timeout_ignored() {
        let config = apply_overrides(
            Config::default(),
            env(&[("LMRELAY_BACKEND__TIMEOUT_SECS", "soon")]),
        );
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_api_token_fallback() {
        let config = apply_overrides(Config::default(), env(&[("API_TOKEN", "legacy:token")]));
        assert_eq!(config.channels.telegram.token, "legacy:token");
    }

    #[test]
    fn test_explicit_token_beats_api_token() {
        let config = apply_overrides(
            Config::default(),
            env(&[
                ("API_TOKEN", "legacy:token"),
                ("LMRELAY_CHANNELS__TELEGRAM__TOKEN", "new:token"),
            ]),
        );
        assert_eq!(config.channels.telegram.token, "new:token");
    }

    #[test]
    fn test_env_override_storage_and_prompt() {
        let config = apply_overrides(
            Config::default(),
            env(&[
                ("LMRELAY_STORAGE__DATABASE_PATH", "/tmp/users.db"),
                ("LMRELAY_RELAY__SYSTEM_PROMPT", "Answer in French."),
            ]),
        );
        assert_eq!(config.storage.database_path, "/tmp/users.db");
        assert_eq!(config.relay.system_prompt, "Answer in French.");
    }
}
