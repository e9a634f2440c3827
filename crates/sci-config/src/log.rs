use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Logging output settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct LogSettings {
    /// Minimum level to emit: "trace", "debug", "info", "warn" or "error".
    /// Can be overridden with the SCI_LOG environment variable.
    /// Default: "info"
    pub level: Option<String>,

    /// Emit one JSON object per event instead of human readable lines.
    /// Default: false
    pub json: Option<bool>,

    /// Colourize level prefixes in human readable output.
    /// Default: true
    pub color: Option<bool>,
}

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LogSettings {
    /// Effective level, with `SCI_LOG` taking precedence over the file.
    pub fn level(&self) -> String {
        if let Ok(level) = std::env::var("SCI_LOG") {
            return level.to_lowercase();
        }
        self.level.as_deref().unwrap_or("info").to_lowercase()
    }

    pub fn json(&self) -> bool {
        self.json.unwrap_or(false)
    }

    pub fn color(&self) -> bool {
        self.color.unwrap_or(true)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let level = self.level();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(level));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::{with_env, without_env};

    #[test]
    #[serial]
    fn test_level_default_and_case() {
        without_env(&["SCI_LOG"], || {
            assert_eq!(LogSettings::default().level(), "info");

            let settings = LogSettings {
                level: Some("DEBUG".into()),
                ..Default::default()
            };
            assert_eq!(settings.level(), "debug");
        });
    }

    #[test]
    #[serial]
    fn test_level_env_override() {
        with_env(vec![("SCI_LOG", "trace")], || {
            let settings = LogSettings {
                level: Some("warn".into()),
                ..Default::default()
            };
            assert_eq!(settings.level(), "trace");
        });
    }

    #[test]
    #[serial]
    fn test_validate_rejects_unknown_level() {
        without_env(&["SCI_LOG"], || {
            let settings = LogSettings {
                level: Some("loud".into()),
                ..Default::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(ConfigError::InvalidLogLevel(level)) if level == "loud"
            ));
        });
    }
}
