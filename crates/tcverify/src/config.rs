//! Configuration management for tcverify.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::cyclone::VerifyOptions;
use crate::error::{Error, Result};
use crate::io::tigge::{FileNamePattern, DEFAULT_FILE_PATTERN};
use crate::track::MatchOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tcverify";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "results.db";

/// Default best-track file name.
const HURDAT2_FILE_NAME: &str = "hurdat2.txt";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TCVERIFY_`, sections separated
///    by `__`, e.g. `TCVERIFY_VERIFICATION__MAX_LEAD_HOURS=120`)
/// 2. TOML config file at `~/.config/tcverify/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input data configuration.
    pub data: DataConfig,
    /// Verification configuration.
    pub verification: VerificationConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Input data configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the HURDAT2 best-track file.
    /// Defaults to `~/.local/share/tcverify/hurdat2.txt`
    pub hurdat2_path: Option<PathBuf>,
}

/// Verification-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Model subdirectories to load. Empty loads every model.
    pub models: Vec<String>,
    /// Model assigned to forecast files at the top of a storm directory.
    pub default_model: String,
    /// Largest time difference (hours) between a forecast fix and its
    /// best-track match. 0 requires identical timestamps.
    pub match_tolerance_hours: u32,
    /// Forecast fixes beyond this lead time are ignored.
    /// Set to 0 for unlimited.
    pub max_lead_hours: u32,
    /// Smallest ensemble for which a spread ellipse is computed.
    pub min_ensemble_members: usize,
    /// Forecast file-name regex with `name`, `year`, `month`, `day` and
    /// `hour` groups.
    pub file_pattern: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the results database.
    /// Defaults to `~/.local/share/tcverify/results.db`
    pub database_path: Option<PathBuf>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            models: vec!["ECMF".to_string(), "GEFS".to_string()],
            default_model: "ECMF".to_string(),
            match_tolerance_hours: 0,
            max_lead_hours: 144,
            min_ensemble_members: 5,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `TCVERIFY_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TCVERIFY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let verification = &self.verification;

        if verification.default_model.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "default_model cannot be empty".to_string(),
            });
        }

        if verification.min_ensemble_members < 2 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "min_ensemble_members ({}) must be at least 2",
                    verification.min_ensemble_members
                ),
            });
        }

        if let Some(model) = verification.models.iter().find(|m| m.trim().is_empty()) {
            return Err(Error::ConfigValidation {
                message: format!("invalid model name: '{model}'"),
            });
        }

        FileNamePattern::new(&verification.file_pattern)?;

        Ok(())
    }

    /// Get the HURDAT2 path, resolving defaults if not set.
    #[must_use]
    pub fn hurdat2_path(&self) -> PathBuf {
        self.data
            .hurdat2_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(HURDAT2_FILE_NAME))
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the fix matching options.
    #[must_use]
    pub fn match_options(&self) -> MatchOptions {
        let max_lead = self.verification.max_lead_hours;
        MatchOptions {
            tolerance: chrono::Duration::hours(i64::from(self.verification.match_tolerance_hours)),
            max_lead_hours: (max_lead > 0).then_some(i64::from(max_lead)),
        }
    }

    /// Get the options for loading cyclones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file pattern is invalid.
    pub fn verify_options(&self) -> Result<VerifyOptions> {
        let verification = &self.verification;
        Ok(VerifyOptions {
            matching: self.match_options(),
            models: verification.models.iter().map(|m| m.to_uppercase()).collect(),
            default_model: verification.default_model.to_uppercase(),
            min_members: verification.min_ensemble_members,
            file_pattern: FileNamePattern::new(&verification.file_pattern)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.data.hurdat2_path.is_none());
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.verification.models, vec!["ECMF", "GEFS"]);
    }

    #[test]
    fn test_default_verification_config() {
        let verification = VerificationConfig::default();

        assert_eq!(verification.default_model, "ECMF");
        assert_eq!(verification.match_tolerance_hours, 0);
        assert_eq!(verification.max_lead_hours, 144);
        assert_eq!(verification.min_ensemble_members, 5);
        assert_eq!(verification.file_pattern, DEFAULT_FILE_PATTERN);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_default_model() {
        let mut config = Config::default();
        config.verification.default_model = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_model"));
    }

    #[test]
    fn test_validate_min_members() {
        let mut config = Config::default();
        config.verification.min_ensemble_members = 1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("min_ensemble_members"));
    }

    #[test]
    fn test_validate_blank_model_name() {
        let mut config = Config::default();
        config.verification.models = vec!["ECMF".to_string(), String::new()];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid model name"));
    }

    #[test]
    fn test_validate_invalid_regex() {
        let mut config = Config::default();
        config.verification.file_pattern = "[invalid".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid file pattern"));
    }

    #[test]
    fn test_validate_pattern_missing_group() {
        let mut config = Config::default();
        config.verification.file_pattern = r"^(?P<name>\w+)\.csv$".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("year"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("results.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_hurdat2_path_default() {
        let config = Config::default();
        assert!(config.hurdat2_path().to_string_lossy().contains("hurdat2.txt"));
    }

    #[test]
    fn test_match_options_default_is_exact() {
        let options = Config::default().match_options();

        assert_eq!(options.tolerance, chrono::Duration::zero());
        assert_eq!(options.max_lead_hours, Some(144));
    }

    #[test]
    fn test_match_options_unlimited_lead() {
        let mut config = Config::default();
        config.verification.max_lead_hours = 0;
        config.verification.match_tolerance_hours = 3;

        let options = config.match_options();
        assert_eq!(options.tolerance, chrono::Duration::hours(3));
        assert!(options.max_lead_hours.is_none());
    }

    #[test]
    fn test_verify_options_uppercases_models() {
        let mut config = Config::default();
        config.verification.models = vec!["ecmf".to_string()];
        config.verification.default_model = "gefs".to_string();

        let options = config.verify_options().unwrap();
        assert_eq!(options.models, vec!["ECMF"]);
        assert_eq!(options.default_model, "GEFS");
        assert_eq!(options.min_members, 5);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("tcverify"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        figment::Jail::expect_with(|_jail| {
            // Loading from a nonexistent path should work (uses defaults)
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[verification]\nmodels = [\"UKMO\"]\nmax_lead_hours = 72\n\n[data]\nhurdat2_path = \"/data/hurdat2.txt\"\n",
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap();
            assert_eq!(config.verification.models, vec!["UKMO"]);
            assert_eq!(config.verification.max_lead_hours, 72);
            assert_eq!(config.verification.default_model, "ECMF");
            assert_eq!(config.hurdat2_path(), PathBuf::from("/data/hurdat2.txt"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_default() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TCVERIFY_VERIFICATION__MAX_LEAD_HOURS", "120");
            jail.set_env("TCVERIFY_STORAGE__DATABASE_PATH", "/tmp/results.db");

            let config = Config::load_from(Some(PathBuf::from("missing.toml"))).unwrap();
            assert_eq!(config.verification.max_lead_hours, 120);
            assert_eq!(config.database_path(), PathBuf::from("/tmp/results.db"));
            assert_eq!(config.verification.default_model, "ECMF");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[verification]\nmax_lead_hours = 72\nmin_ensemble_members = 10\n",
            )?;
            jail.set_env("TCVERIFY_VERIFICATION__MAX_LEAD_HOURS", "120");

            let config = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap();
            assert_eq!(config.verification.max_lead_hours, 120);
            assert_eq!(config.verification.min_ensemble_members, 10);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[verification]\nmin_ensemble_members = 0\n")?;

            let result = Config::load_from(Some(PathBuf::from("config.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_verification_config_deserialize() {
        let json = r#"{"default_model": "GEFS", "match_tolerance_hours": 6}"#;
        let verification: VerificationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(verification.default_model, "GEFS");
        assert_eq!(verification.match_tolerance_hours, 6);
        assert_eq!(verification.max_lead_hours, 144);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("match_tolerance_hours"));
        assert!(json.contains("database_path"));
    }
}
