use crate::core::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

pub(crate) const DEFAULT_CONFIG_FILE_NAME: &str = "config.toml";
pub(crate) const DEFAULT_LOG_FILE_NAME: &str = "awspect.log";

/// Optional TOML config, merged under CLI flags. Every field has a default
/// so a missing or partial file is never an error by itself.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct AppConfig {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE_NAME)
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Default location: `<user config dir>/awspect/config.toml`.
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("awspect").join(DEFAULT_CONFIG_FILE_NAME))
}

pub(crate) fn load_from(path: &PathBuf) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source: Box::new(source),
    })
}

/// Resolves the effective config before the logger exists, so failures can
/// only go to stderr. An explicitly passed path that fails to load is an
/// error; a broken file at the default location falls back to defaults with
/// a warning.
pub(crate) fn load(explicit_path: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit_path {
        return load_from(path);
    }
    let Some(path) = default_config_path() else {
        return Ok(AppConfig::default());
    };
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    match load_from(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
            eprintln!("[PRE-INIT WARN] Failed to load config from {path:?}: {e}. Using defaults.");
            Ok(AppConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, PathBuf::from(DEFAULT_LOG_FILE_NAME));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            profile = "dev"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.profile.as_deref(), Some("dev"));
        assert_eq!(config.region, None);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, PathBuf::from(DEFAULT_LOG_FILE_NAME));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = toml::from_str::<AppConfig>("porfile = \"dev\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE_NAME);
        std::fs::write(&path, "region = \"eu-west-1\"\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn explicit_broken_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE_NAME);
        std::fs::write(&path, "profile = [not toml").unwrap();
        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
