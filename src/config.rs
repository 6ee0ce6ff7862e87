use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use auditdash::AppConfig;
use auditdash::api::DEFAULT_LOGIN_PATH;
use auditdash::loading::TrackedNamespaces;
use auditdash::refresh::DEFAULT_REFRESH_PATH;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub navigation: NavigationConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub refresh_path: String,
    pub login_path: String,
    /// Extra operation namespaces that count toward the busy signal
    pub tracked_namespaces: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_ms: 30000,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            tracked_namespaces: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub hint_window_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self { hint_window_ms: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("auditdash")
                .join("credentials.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            navigation: NavigationConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            bail!("polling.interval_ms must be greater than 0");
        }
        if self.api.timeout_ms == 0 {
            bail!("api.timeout_ms must be greater than 0");
        }
        Ok(())
    }

    /// Settings for the library layer
    pub fn app_config(&self) -> AppConfig {
        let tracked = self
            .api
            .tracked_namespaces
            .iter()
            .fold(TrackedNamespaces::default(), |tracked, ns| tracked.register(ns.clone()));

        AppConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_millis(self.api.timeout_ms),
            refresh_path: self.api.refresh_path.clone(),
            login_path: self.api.login_path.clone(),
            poll_interval: Duration::from_millis(self.polling.interval_ms),
            hint_window: Duration::from_millis(self.navigation.hint_window_ms),
            tracked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.navigation.hint_window_ms, 500);
        assert_eq!(config.api.refresh_path, "/auth/token/refresh/");
        assert!(config.credentials.path.ends_with("auditdash/credentials.json"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
api:
  base_url: https://audit.example.com/api
  tracked_namespaces: [reportApi]
polling:
  interval_ms: 5000
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://audit.example.com/api");
        assert_eq!(config.api.timeout_ms, 30000);
        assert_eq!(config.polling.interval_ms, 5000);
        assert_eq!(config.navigation.hint_window_ms, 500);

        let app = config.app_config();
        assert_eq!(app.poll_interval, Duration::from_millis(5000));
        assert!(app.tracked.tracks("reportApi"));
        assert!(app.tracked.tracks("api"));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("auditdash.yml");
        fs::write(&path, "navigation:\n  hint_window_ms: 250\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.navigation.hint_window_ms, 250);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/auditdash.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_rejects_zero_poll_interval() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("auditdash.yml");
        fs::write(&path, "polling:\n  interval_ms: 0\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("polling.interval_ms"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
