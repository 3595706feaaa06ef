//! # PMVideo Configuration Module
//!
//! Configuration management for PMVideo:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Typed getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use pmvconfig::get_config;
//!
//! let config = get_config();
//! let host = config.get_server_host();
//! let port = config.get_server_port();
//! let client_id = config.get_client_id()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{info, warn};
use uuid::Uuid;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmvideo.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMVideo configuration"));
}

const ENV_CONFIG_DIR: &str = "PMVIDEO_CONFIG";
const ENV_PREFIX: &str = "PMVIDEO_CONFIG__";

// Default values for configuration
const DEFAULT_SERVER_PORT: u16 = 32400;
const DEFAULT_PLAYER: &str = "vlc";

/// Configuration manager for PMVideo
///
/// Holds the merged YAML value tree and knows how to persist it back to
/// the config.yaml file in the configuration directory.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".pmvideo").exists() {
            return ".pmvideo".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".pmvideo");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".pmvideo".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("Le chemin spécifié n'est pas un répertoire"));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// Searched in order: the `directory` parameter, the `PMVIDEO_CONFIG`
    /// environment variable, `.pmvideo` in the current directory, then
    /// `.pmvideo` in the home directory. Created if missing.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// Merges the external config.yaml (if present) over the embedded
    /// defaults, applies environment overrides and saves the result.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "Loaded config file");
            data
        } else {
            info!(config_file = %path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key);
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();
                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        new_map.insert(Value::String(s.to_lowercase()), Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub fn get_server_host(&self) -> String {
        match self.get_value(&["server", "host"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                warn!("Server host not configured, using localhost");
                "127.0.0.1".to_string()
            }
        }
    }

    pub fn set_server_host(&self, host: &str) -> Result<()> {
        self.set_value(&["server", "host"], Value::String(host.to_string()))
    }

    pub fn get_server_port(&self) -> u16 {
        match self.get_value(&["server", "port"]) {
            Ok(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap() as u16,
            Ok(Value::String(s)) => s.parse::<u16>().unwrap_or_else(|_| {
                warn!(port = %s, default = DEFAULT_SERVER_PORT, "Invalid server port");
                DEFAULT_SERVER_PORT
            }),
            _ => DEFAULT_SERVER_PORT,
        }
    }

    pub fn set_server_port(&self, port: u16) -> Result<()> {
        self.set_value(&["server", "port"], Value::Number(Number::from(port)))
    }

    /// Account token passed through as-is; no refresh logic lives here.
    pub fn get_token(&self) -> Option<String> {
        match self.get_value(&["server", "token"]) {
            Ok(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    // ========================================================================
    // Client identity
    // ========================================================================

    /// Gets the client identifier, generating and persisting one on first
    /// access so the server sees a stable identity across runs.
    pub fn get_client_id(&self) -> Result<String> {
        match self.get_value(&["client", "id"]) {
            Ok(Value::String(s)) if !s.is_empty() => Ok(s),
            _ => {
                let id = Uuid::new_v4().to_string();
                info!(client_id = %id, "Generated new client identifier");
                self.set_value(&["client", "id"], Value::String(id.clone()))?;
                Ok(id)
            }
        }
    }

    pub fn get_device_name(&self) -> String {
        match self.get_value(&["client", "device_name"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => "PMVideo".to_string(),
        }
    }

    // ========================================================================
    // GUI
    // ========================================================================

    pub fn get_player_command(&self) -> String {
        match self.get_value(&["gui", "player"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_PLAYER.to_string(),
        }
    }

    pub fn get_always_transcode(&self) -> bool {
        matches!(
            self.get_value(&["gui", "always_transcode"]),
            Ok(Value::Bool(true))
        )
    }

    pub fn set_always_transcode(&self, value: bool) -> Result<()> {
        self.set_value(&["gui", "always_transcode"], Value::Bool(value))
    }

    // ========================================================================
    // Caches
    // ========================================================================

    /// Cover cache directory, absolute or relative to the config
    /// directory; created if missing.
    pub fn get_cover_cache_dir(&self) -> Result<String> {
        let dir_path = match self.get_value(&["cache", "covers_dir"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => "covers".to_string(),
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Résout un chemin relatif ou absolu et crée le répertoire si nécessaire
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<String> {
        let path = Path::new(dir_path);
        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created cache directory");
        }

        Ok(absolute_path.to_string_lossy().to_string())
    }
}

/// Returns the global configuration singleton.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings merge key by key; scalars and sequences from the external
/// tree replace the defaults.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn defaults_are_embedded() {
        let (_dir, config) = temp_config();
        assert_eq!(config.get_server_host(), "127.0.0.1");
        assert_eq!(config.get_server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(config.get_player_command(), "vlc");
        assert!(!config.get_always_transcode());
        assert!(config.get_token().is_none());
    }

    #[test]
    fn values_survive_a_reload() {
        let (dir, config) = temp_config();
        config.set_server_host("media.local").unwrap();
        config.set_server_port(32500).unwrap();
        config.set_always_transcode(true).unwrap();

        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.get_server_host(), "media.local");
        assert_eq!(reloaded.get_server_port(), 32500);
        assert!(reloaded.get_always_transcode());
    }

    #[test]
    fn client_id_is_generated_once_and_persisted() {
        let (dir, config) = temp_config();
        let first = config.get_client_id().unwrap();
        assert_eq!(config.get_client_id().unwrap(), first);

        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.get_client_id().unwrap(), first);
    }

    #[test]
    fn cover_cache_dir_is_created_under_config_dir() {
        let (dir, config) = temp_config();
        let covers = config.get_cover_cache_dir().unwrap();
        assert!(Path::new(&covers).is_dir());
        assert!(covers.starts_with(dir.path().to_str().unwrap()));
    }

    #[test]
    fn external_values_merge_over_defaults() {
        let mut default: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        let external: Value =
            serde_yaml::from_str("server:\n  host: elsewhere\n").unwrap();
        merge_yaml(&mut default, &external);

        assert_eq!(
            Config::get_value_internal(&default, &["server", "host"]).unwrap(),
            Value::String("elsewhere".to_string())
        );
        // Untouched siblings keep their defaults.
        assert_eq!(
            Config::get_value_internal(&default, &["gui", "player"]).unwrap(),
            Value::String("vlc".to_string())
        );
    }
}
