//! Configuration management for Domwatch

use crate::dom::ObserveOptions;
use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Library configuration
///
/// Supplies the observe options a watcher uses when the caller passes none.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// React to child-list changes (added/removed child nodes)
    pub child_list: bool,

    /// Observe the entire subtree below the root, not only direct children
    pub subtree: bool,

    /// Log level hint for hosts that install a tracing subscriber
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            child_list: true,
            subtree: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(child_list) = env::var("DOMWATCH_CHILD_LIST") {
            config.child_list = child_list
                .parse()
                .map_err(|_| Error::configuration("Invalid DOMWATCH_CHILD_LIST"))?;
        }

        if let Ok(subtree) = env::var("DOMWATCH_SUBTREE") {
            config.subtree = subtree
                .parse()
                .map_err(|_| Error::configuration("Invalid DOMWATCH_SUBTREE"))?;
        }

        if let Ok(log_level) = env::var("DOMWATCH_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Observe options derived from this configuration
    pub fn observe_options(&self) -> ObserveOptions {
        ObserveOptions {
            child_list: self.child_list,
            subtree: self.subtree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.child_list);
        assert!(config.subtree);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_observe_options_follow_config() {
        let config = Config {
            child_list: true,
            subtree: false,
            log_level: "debug".to_string(),
        };

        let options = config.observe_options();
        assert!(options.child_list);
        assert!(!options.subtree);
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            child_list = true
            subtree = false
            log_level = "warn"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.child_list);
        assert!(!config.subtree);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join("domwatch_config_from_file.toml");
        std::fs::write(
            &path,
            "child_list = false\nsubtree = true\nlog_level = \"trace\"\n",
        )
        .expect("Failed to write config file");

        let config =
            Config::from_file(path.to_str().expect("non-utf8 temp path")).expect("Failed to load");
        assert!(!config.child_list);
        assert!(config.subtree);
        assert_eq!(config.log_level, "trace");

        std::fs::remove_file(&path).expect("Failed to remove config file");
    }

    #[test]
    fn test_from_file_rejects_missing_and_invalid() {
        assert!(matches!(
            Config::from_file("/nonexistent/domwatch.toml"),
            Err(Error::Configuration(_))
        ));

        let path = std::env::temp_dir().join("domwatch_config_invalid.toml");
        std::fs::write(&path, "child_list = \"not a bool\"\n").expect("Failed to write");
        assert!(matches!(
            Config::from_file(path.to_str().expect("non-utf8 temp path")),
            Err(Error::Configuration(_))
        ));
        std::fs::remove_file(&path).expect("Failed to remove config file");
    }
}
