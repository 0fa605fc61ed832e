//! Runtime configuration
//!
//! Sources, later ones winning: built-in defaults, `config/profesoria.toml`
//! (optional), `PROFESORIA_*` environment variables. `.env` is loaded first so
//! it can feed the environment. The API key additionally falls back to
//! `GEMINI_API_KEY` and `API_KEY`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::AppError;

pub const DEFAULT_CONFIG_FILE: &str = "config/profesoria.toml";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// What a unit build returns once every attempt has failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFailurePolicy {
    /// A single `Error de Generación` lesson stands in for the unit
    #[default]
    Placeholder,
    /// The failure is reported and the unit stays unbuilt
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub skeleton_timeout_secs: u64,
    pub unit_timeout_secs: u64,
    pub grading_timeout_secs: u64,
    pub unit_max_retries: u32,
    pub unit_failure_policy: UnitFailurePolicy,
    /// Where the SQLite library lives; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    pub autosave_debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_output_tokens: 16_384,
            skeleton_timeout_secs: 120,
            unit_timeout_secs: 90,
            grading_timeout_secs: 60,
            unit_max_retries: 1,
            unit_failure_policy: UnitFailurePolicy::Placeholder,
            data_dir: None,
            autosave_debounce_ms: 1000,
        }
    }
}

impl AppConfig {
    pub fn from_env_and_file() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::load(Some(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Build from an optional TOML file plus the environment.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file.filter(|p| p.exists()) {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PROFESORIA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let loaded = builder.build()?;
        let mut cfg: AppConfig = loaded.try_deserialize()?;

        // direct env fallbacks
        if cfg.api_key.as_deref().map_or(true, str::is_empty) {
            cfg.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|k| !k.is_empty() && k != "undefined");
        }
        Ok(cfg)
    }

    /// The key, or the fatal configuration error that stops any model call.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AppError::configuration(
                "API_KEY no detectada. Por favor, asegúrese de que la clave de API esté configurada.",
            )),
        }
    }

    pub fn skeleton_timeout(&self) -> Duration {
        Duration::from_secs(self.skeleton_timeout_secs)
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    pub fn grading_timeout(&self) -> Duration {
        Duration::from_secs(self.grading_timeout_secs)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("profesoria"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn library_path(&self) -> PathBuf {
        self.resolve_data_dir().join("library.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_generation_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.model, "gemini-3-flash-preview");
        assert_eq!(cfg.skeleton_timeout(), Duration::from_secs(120));
        assert_eq!(cfg.unit_timeout(), Duration::from_secs(90));
        assert_eq!(cfg.unit_max_retries, 1);
        assert_eq!(cfg.unit_failure_policy, UnitFailurePolicy::Placeholder);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profesoria.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "model = \"gemini-2.5-pro\"\nunit_timeout_secs = 30\nunit_failure_policy = \"error\""
        )
        .unwrap();

        let cfg = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(cfg.model, "gemini-2.5-pro");
        assert_eq!(cfg.unit_timeout_secs, 30);
        assert_eq!(cfg.unit_failure_policy, UnitFailurePolicy::Error);
        assert_eq!(cfg.skeleton_timeout_secs, 120);
    }

    #[test]
    fn environment_overrides_use_single_underscore_prefix() {
        std::env::set_var("PROFESORIA_GRADING_TIMEOUT_SECS", "45");
        let cfg = AppConfig::load(None);
        std::env::remove_var("PROFESORIA_GRADING_TIMEOUT_SECS");
        assert_eq!(cfg.unwrap().grading_timeout_secs, 45);
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let cfg = AppConfig {
            api_key: Some("  ".into()),
            ..AppConfig::default()
        };
        let err = cfg.require_api_key().unwrap_err();
        assert_eq!(err.error_type, crate::models::AppErrorType::Configuration);
        assert!(!err.is_retryable());
    }
}
