//! Configuration loading and management
//!
//! # Configuration Hierarchy
//!
//! 1. Built-in defaults
//! 2. Global config: `~/.config/apiary/config.toml`
//! 3. Project config: `.apiary/config.toml`
//! 4. Explicit file passed with `--config`
//! 5. Environment variables: `APIARY_*`
//!
//! Each layer overrides the previous. Command-line flags are applied by the
//! binary after loading.
//!
//! # Example
//!
//! ```toml
//! state_db = ".apiary/state.db"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [inspection]
//! timeout_ms = 10000
//!
//! [engine]
//! serialize_in_process = true
//!
//! [hives]
//! H1 = "North meadow"
//! H2 = "Orchard row"
//! ```

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{engine::EngineSettings, Error, Result};

const DEFAULT_STATE_DB: &str = ".apiary/state.db";
const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the `SQLite` database holding batches and inspections.
    pub state_db: String,
    pub server: ServerConfig,
    pub inspection: InspectionConfig,
    pub engine: EngineConfig,
    /// Hive id to display name.
    pub hives: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Upper bound on one inspection service call.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub serialize_in_process: bool,
}

/// One config file as written. Only keys present in the file are `Some`,
/// so a layer can set a value back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub state_db: Option<String>,
    pub server: ServerLayer,
    pub inspection: InspectionLayer,
    pub engine: EngineLayer,
    pub hives: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerLayer {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectionLayer {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineLayer {
    pub serialize_in_process: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_db: DEFAULT_STATE_DB.to_string(),
            server: ServerConfig::default(),
            inspection: InspectionConfig::default(),
            engine: EngineConfig::default(),
            hives: HashMap::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            serialize_in_process: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration from all sources with hierarchy
///
/// # Errors
///
/// Returns error if:
/// - A config file is malformed TOML
/// - The explicit config file does not exist
/// - An `APIARY_*` variable has an unparsable value
/// - Config values fail validation
pub async fn load_config(explicit: Option<&Path>) -> Result<Config> {
    // 1. Start with built-in defaults
    let mut config = Config::default();

    // 2. Global config
    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config.merge(load_toml_file(&global_path).await?);
            debug!(path = %global_path.display(), "Loaded global config");
        }
    }

    // 3. Project config
    if let Ok(project_path) = project_config_path() {
        if project_path.exists() {
            config.merge(load_toml_file(&project_path).await?);
            debug!(path = %project_path.display(), "Loaded project config");
        }
    }

    // 4. Explicit config must exist
    if let Some(path) = explicit {
        config.merge(load_toml_file(path).await?);
        debug!(path = %path.display(), "Loaded config file");
    }

    // 5. Environment overrides
    config.apply_env_vars()?;

    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty `state_db`, an unparsable
    /// `server.bind` or a zero `inspection.timeout_ms`.
    pub fn validate(&self) -> Result<()> {
        if self.state_db.trim().is_empty() {
            return Err(Error::InvalidConfig("state_db cannot be empty".to_string()));
        }

        self.bind_addr()?;

        if self.inspection.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "inspection.timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `server.bind` is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|e| {
            Error::InvalidConfig(format!("Invalid server.bind '{}': {e}", self.server.bind))
        })
    }

    #[must_use]
    pub fn state_db_path(&self) -> PathBuf {
        PathBuf::from(&self.state_db)
    }

    #[must_use]
    pub const fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            inspection_timeout: Duration::from_millis(self.inspection.timeout_ms),
            serialize_in_process: self.engine.serialize_in_process,
        }
    }

    /// Overlay every key `layer` sets, whatever its value.
    pub fn merge(&mut self, layer: ConfigLayer) {
        if let Some(state_db) = layer.state_db {
            self.state_db = state_db;
        }
        if let Some(bind) = layer.server.bind {
            self.server.bind = bind;
        }
        if let Some(timeout_ms) = layer.inspection.timeout_ms {
            self.inspection.timeout_ms = timeout_ms;
        }
        if let Some(serialize) = layer.engine.serialize_in_process {
            self.engine.serialize_in_process = serialize;
        }
        // Hive names accumulate across layers
        self.hives.extend(layer.hives);
    }

    /// Apply `APIARY_*` environment variable overrides
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a variable cannot be parsed.
    pub fn apply_env_vars(&mut self) -> Result<()> {
        // APIARY_STATE_DB
        if let Ok(value) = std::env::var("APIARY_STATE_DB") {
            self.state_db = value;
        }

        // APIARY_SERVER_BIND
        if let Ok(value) = std::env::var("APIARY_SERVER_BIND") {
            self.server.bind = value;
        }

        // APIARY_INSPECTION_TIMEOUT_MS
        if let Ok(value) = std::env::var("APIARY_INSPECTION_TIMEOUT_MS") {
            self.inspection.timeout_ms = value.parse().map_err(|e| {
                Error::InvalidConfig(format!("Invalid APIARY_INSPECTION_TIMEOUT_MS value: {e}"))
            })?;
        }

        // APIARY_ENGINE_SERIALIZE_IN_PROCESS
        if let Ok(value) = std::env::var("APIARY_ENGINE_SERIALIZE_IN_PROCESS") {
            self.engine.serialize_in_process = value.parse().map_err(|e| {
                Error::InvalidConfig(format!(
                    "Invalid APIARY_ENGINE_SERIALIZE_IN_PROCESS value: {e}"
                ))
            })?;
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Get path to project config file
///
/// # Errors
///
/// Returns error if current directory cannot be determined
fn project_config_path() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|dir| dir.join(".apiary/config.toml"))
        .map_err(|e| Error::Io(format!("Failed to get current directory: {e}")))
}

/// Get path to global config file
#[must_use]
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "apiary")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

/// Load a TOML file as a layer holding only the keys it sets
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - TOML is malformed
async fn load_toml_file(path: &Path) -> Result<ConfigLayer> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Io(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Parse(format!("Failed to parse config: {}: {e}", path.display())))
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const ENV_VARS: [&str; 4] = [
        "APIARY_STATE_DB",
        "APIARY_SERVER_BIND",
        "APIARY_INSPECTION_TIMEOUT_MS",
        "APIARY_ENGINE_SERIALIZE_IN_PROCESS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.state_db, ".apiary/state.db");
        assert_eq!(
            config.engine_settings().inspection_timeout,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [inspection]
            timeout_ms = 250

            [hives]
            H1 = "North meadow"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.inspection.timeout_ms, 250);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.hives.get("H1").map(String::as_str), Some("North meadow"));
    }

    #[test]
    fn test_merge_applies_only_keys_the_layer_sets() {
        let mut base = Config {
            state_db: "/var/lib/apiary.db".to_string(),
            ..Config::default()
        };
        base.hives.insert("H1".to_string(), "North".to_string());

        let overlay: ConfigLayer = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [hives]
            H2 = "South"
            "#,
        )
        .expect("valid toml");

        base.merge(overlay);
        assert_eq!(base.state_db, "/var/lib/apiary.db");
        assert_eq!(base.server.bind, "0.0.0.0:9000");
        assert_eq!(base.hives.len(), 2);
    }

    #[test]
    fn test_later_layer_can_restore_default_values() {
        let global: ConfigLayer = toml::from_str(
            "[inspection]\ntimeout_ms = 2000\n[engine]\nserialize_in_process = false\n",
        )
        .expect("global toml");
        let project: ConfigLayer = toml::from_str(
            "[inspection]\ntimeout_ms = 10000\n[engine]\nserialize_in_process = true\n",
        )
        .expect("project toml");

        let mut config = Config::default();
        config.merge(global);
        assert_eq!(config.inspection.timeout_ms, 2000);
        assert!(!config.engine.serialize_in_process);

        config.merge(project);
        assert_eq!(config.inspection.timeout_ms, 10_000);
        assert!(config.engine.serialize_in_process);
    }

    #[tokio::test]
    async fn test_toml_file_layer_holds_only_present_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("apiary.toml");
        std::fs::write(&path, "[engine]\nserialize_in_process = true\n").expect("write");

        let layer = load_toml_file(&path).await.expect("layer");
        assert_eq!(layer.engine.serialize_in_process, Some(true));
        assert_eq!(layer.inspection.timeout_ms, None);
        assert_eq!(layer.state_db, None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.server.bind = "not an address".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.inspection.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            state_db: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_malformed_toml_returns_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "state_db = \n invalid toml [[[").expect("write");

        let result = load_toml_file(&path).await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_config(Some(&dir.path().join("missing.toml"))).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    #[serial]
    fn test_env_vars_override_file_values() {
        clear_env();
        std::env::set_var("APIARY_STATE_DB", "/tmp/apiary-env.db");
        std::env::set_var("APIARY_INSPECTION_TIMEOUT_MS", "1500");
        std::env::set_var("APIARY_ENGINE_SERIALIZE_IN_PROCESS", "false");

        let mut config = Config::default();
        let result = config.apply_env_vars();
        clear_env();

        assert!(result.is_ok());
        assert_eq!(config.state_db, "/tmp/apiary-env.db");
        assert_eq!(config.inspection.timeout_ms, 1500);
        assert!(!config.engine.serialize_in_process);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_is_rejected() {
        clear_env();
        std::env::set_var("APIARY_INSPECTION_TIMEOUT_MS", "soon");

        let mut config = Config::default();
        let result = config.apply_env_vars();
        clear_env();

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_explicit_file_then_env() {
        clear_env();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("apiary.toml");
        std::fs::write(
            &path,
            "state_db = \"from-file.db\"\n[server]\nbind = \"127.0.0.1:9100\"\n",
        )
        .expect("write");
        std::env::set_var("APIARY_SERVER_BIND", "127.0.0.1:9200");

        let result = load_config(Some(&path)).await;
        clear_env();

        let config = result.expect("config loads");
        assert_eq!(config.state_db, "from-file.db");
        assert_eq!(config.server.bind, "127.0.0.1:9200");
    }
}
