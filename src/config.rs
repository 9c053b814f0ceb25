use anyhow::{anyhow, Context, Result};
use chrono::Locale;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// chrono locale name used for the day header, e.g. `ru_RU`.
    pub locale: String,
    pub confirm_delete: bool,
    /// tracing filter directive, overridden by `DAYNOTES_LOG`.
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            locale: "en_US".into(),
            confirm_delete: false,
            log: "info".into(),
        }
    }
}

impl Config {
    pub fn locale(&self) -> Result<Locale> {
        parse_locale(&self.locale)
    }
}

pub fn parse_locale(name: &str) -> Result<Locale> {
    Locale::try_from(name.trim()).map_err(|_| anyhow!("unknown locale: {}", name))
}

/// Reads `explicit` (which must exist) or the per-user config file, which may not.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };
    let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    parse_config(&data).with_context(|| format!("parsing {:?}", path))
}

pub fn parse_config(data: &str) -> Result<Config> {
    if data.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(data)?;
    config.locale()?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    crate::storage::project_dirs()
        .ok()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = parse_config("confirm_delete: true\n").expect("parse");
        assert_eq!(
            config,
            Config {
                confirm_delete: true,
                ..Config::default()
            }
        );
        assert_eq!(parse_config("").expect("empty"), Config::default());
    }

    #[test]
    fn reads_locale_and_log_filter() {
        let config = parse_config("locale: ru_RU\nlog: daynotes=debug\n").expect("parse");
        assert!(matches!(config.locale().expect("locale"), Locale::ru_RU));
        assert_eq!(config.log, "daynotes=debug");
    }

    #[test]
    fn unknown_locale_is_an_error() {
        assert!(parse_config("locale: xx_YY\n").is_err());
        assert!(parse_locale("de_DE").is_ok());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        assert!(load_config(Some(path.as_path())).is_err());

        fs::write(&path, "locale: fr_FR\n").expect("write");
        let config = load_config(Some(path.as_path())).expect("load");
        assert_eq!(config.locale, "fr_FR");
    }
}
