//! Layered settings: defaults, an optional file, then `BLOCK_CLASSIFIER_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `BLOCK_CLASSIFIER_PASS__THRESHOLD=0.3`).

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::classifier::ZeroShotEndpoint;
use crate::config::PassConfig;
use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "BLOCK_CLASSIFIER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("block_classifier/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pass: PassConfig,
    pub classifier: ZeroShotEndpoint,
    pub driver: DriverSettings,
    /// Classification calls in flight; 1 means the sequential pass
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pass: PassConfig::default(),
            classifier: ZeroShotEndpoint::default(),
            driver: DriverSettings::default(),
            concurrency: 1,
        }
    }
}

impl Settings {
    /// Load settings, reading `path` (TOML, JSON, YAML… by extension) when
    /// given. A missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values no pass can run with. Labels are checked later, once
    /// command-line overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::ZeroConcurrency);
        }
        if !(0.0..=1.0).contains(&self.pass.threshold) {
            return Err(Error::InvalidThreshold(self.pass.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagName;
    use std::fs;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.pass.tag, TagName::Div);
        assert!(settings.driver.user_agent.starts_with("block_classifier/"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
concurrency = 3

[pass]
tag = "span"
labels = ["Price", "Review"]
threshold = 0.35

[classifier]
url = "http://localhost:8080/zero-shot"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.pass.tag, TagName::Span);
        assert_eq!(settings.pass.labels, vec!["Price", "Review"]);
        assert_eq!(settings.pass.threshold, 0.35);
        assert_eq!(settings.pass.attribute, "class");
        assert_eq!(settings.classifier.url, "http://localhost:8080/zero-shot");
        assert_eq!(settings.classifier.timeout_secs, 60);

        fs::write(&path, "[pass]\ntag = \"script\"\n").unwrap();
        assert!(matches!(Settings::load(Some(&path)), Err(Error::Settings(_))));

        fs::write(&path, "concurrency = 0\n").unwrap();
        assert!(matches!(Settings::load(Some(&path)), Err(Error::ZeroConcurrency)));
    }

    #[test]
    fn test_environment_overrides() {
        // Keys no other test loads, since the environment is shared
        std::env::set_var("BLOCK_CLASSIFIER_PASS__MAX_WORDS", "12");
        std::env::set_var("BLOCK_CLASSIFIER_DRIVER__TIMEOUT_SECS", "7");
        let loaded = Settings::load(None);
        std::env::remove_var("BLOCK_CLASSIFIER_PASS__MAX_WORDS");
        std::env::remove_var("BLOCK_CLASSIFIER_DRIVER__TIMEOUT_SECS");

        let settings = loaded.unwrap();
        assert_eq!(settings.pass.max_words, 12);
        assert_eq!(settings.driver.timeout_secs, 7);
        assert_eq!(settings.pass.min_fragments, 8);
    }

    #[test]
    fn test_overrides_are_validated() {
        let settings = Settings {
            concurrency: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::ZeroConcurrency)));

        let mut settings = Settings::default();
        settings.pass.threshold = -0.1;
        assert!(matches!(settings.validate(), Err(Error::InvalidThreshold(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.toml");
        assert!(Settings::load(Some(&path)).is_err());
    }
}
