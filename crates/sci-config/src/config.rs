use std::{
    fs,
    path::{Path, PathBuf},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    container::{ContainerSettings, DEFAULT_MAX_DEPTH},
    error::{ConfigError, Result},
    log::LogSettings,
    query::{IdentifierQuote, PlaceholderStyle, QuerySettings, DEFAULT_PRIMARY_KEY},
};

pub const CONFIG_ENV: &str = "SCI_CONFIG";
pub const CONFIG_FILE: &str = "sci.toml";

/// Framework configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Application name, stamped on the framework root handed to resolved objects.
    /// Default: "sci"
    pub name: Option<String>,

    /// SQL composition settings.
    pub query: Option<QuerySettings>,

    /// Dependency container settings.
    pub container: Option<ContainerSettings>,

    /// Logging output settings.
    pub log: Option<LogSettings>,
}

/// Location of the configuration file: `$SCI_CONFIG`, else `./sci.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_ENV) {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => PathBuf::from(CONFIG_FILE),
    }
}

impl Config {
    /// Fully populated configuration, used when no file exists and as the
    /// template written by [`generate_default_config`].
    pub fn default_config() -> Self {
        Self {
            name: Some("sci".to_string()),
            query: Some(QuerySettings {
                primary_key: Some(DEFAULT_PRIMARY_KEY.to_string()),
                placeholder: Some(PlaceholderStyle::Question),
                identifier_quote: Some(IdentifierQuote::Backtick),
                // u64::MAX does not fit a TOML integer; left to the accessor default.
                unbounded_limit: None,
                strict_groups: Some(false),
            }),
            container: Some(ContainerSettings {
                max_depth: Some(DEFAULT_MAX_DEPTH),
            }),
            log: Some(LogSettings {
                level: Some("info".to_string()),
                json: Some(false),
                color: Some(true),
            }),
        }
    }

    /// Loads the configuration from [`config_path`], falling back to the
    /// defaults when the file does not exist.
    pub fn new() -> Result<Self> {
        let config_path = config_path();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No configuration at {}, using defaults",
                    config_path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Loads and resolves the configuration at `path`. A missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Fills in missing sections and validates the values.
    pub fn resolve(&mut self) -> Result<()> {
        self.name.get_or_insert_with(|| "sci".to_string());

        let query = self.query.get_or_insert_with(QuerySettings::default);
        if query.primary_key().trim().is_empty() {
            return Err(ConfigError::EmptyPrimaryKey);
        }

        let container = self.container.get_or_insert_with(ContainerSettings::default);
        if container.max_depth() == 0 {
            return Err(ConfigError::InvalidMaxDepth(0));
        }

        self.log.get_or_insert_with(LogSettings::default).validate()?;

        Ok(())
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("sci")
    }

    pub fn query(&self) -> QuerySettings {
        self.query.clone().unwrap_or_default()
    }

    pub fn container(&self) -> ContainerSettings {
        self.container.clone().unwrap_or_default()
    }

    pub fn log(&self) -> LogSettings {
        self.log.clone().unwrap_or_default()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(table) = doc.get_mut("query").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<QuerySettings>(table, false)?;
        }
        if let Some(table) = doc.get_mut("container").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<ContainerSettings>(table, false)?;
        }
        if let Some(table) = doc.get_mut("log").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<LogSettings>(table, false)?;
        }

        Ok(doc)
    }
}

/// Writes the annotated default configuration to `path`.
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(path.display().to_string()));
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::{with_env, without_env};

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.name(), "sci");
        assert_eq!(config.query().primary_key(), "id");
        assert_eq!(config.query().placeholder(), PlaceholderStyle::Question);
        assert_eq!(config.container().max_depth(), 64);
        assert!(!config.log().json());
    }

    #[test]
    #[serial]
    fn test_resolve_fills_missing_sections() {
        without_env(&["SCI_LOG"], || {
            let mut config: Config = toml::from_str("name = \"blog\"").unwrap();
            assert!(config.query.is_none());

            config.resolve().unwrap();

            assert_eq!(config.name(), "blog");
            assert!(config.query.is_some());
            assert!(config.container.is_some());
            assert!(config.log.is_some());
        });
    }

    #[test]
    #[serial]
    fn test_resolve_rejects_empty_primary_key() {
        without_env(&["SCI_LOG"], || {
            let mut config: Config = toml::from_str("[query]\nprimary_key = \"  \"").unwrap();
            assert!(matches!(config.resolve(), Err(ConfigError::EmptyPrimaryKey)));
        });
    }

    #[test]
    #[serial]
    fn test_resolve_rejects_zero_depth() {
        without_env(&["SCI_LOG"], || {
            let mut config: Config = toml::from_str("[container]\nmax_depth = 0").unwrap();
            assert!(matches!(
                config.resolve(),
                Err(ConfigError::InvalidMaxDepth(0))
            ));
        });
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.query().primary_key(), "id");
        assert_eq!(deserialized.log().level.as_deref(), Some("info"));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        without_env(&["SCI_LOG"], || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sci.toml");
            fs::write(
                &path,
                "[query]\nprimary_key = \"uuid\"\nplaceholder = \"numbered\"\n",
            )
            .unwrap();

            let config = Config::load(&path).unwrap();
            assert_eq!(config.query().primary_key(), "uuid");
            assert_eq!(config.query().placeholder(), PlaceholderStyle::Numbered);
        });
    }

    #[test]
    #[serial]
    fn test_new_uses_env_path_and_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        with_env(vec![(CONFIG_ENV, missing.to_str().unwrap())], || {
            without_env(&["SCI_LOG"], || {
                let config = Config::new().unwrap();
                assert_eq!(config.name(), "sci");
                assert_eq!(config_path(), missing);
            });
        });
    }

    #[test]
    fn test_generate_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sci.toml");

        generate_default_config(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# Maximum nesting"));

        let again = generate_default_config(&path);
        assert!(matches!(again, Err(ConfigError::ConfigAlreadyExists(_))));
    }
}
