//! Domain configuration loader
//!
//! The domains document is re-read on every lookup so that edits (key
//! rotation in particular) take effect without a restart. Environment
//! references such as `${SHUTO_SECRET_V1}` are expanded before parsing.

use crate::domain::{DomainConfig, DomainsConfig};
use shuto_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of raw configuration bytes
pub trait ConfigReader: Send + Sync {
    fn read_config(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads configuration from the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigReader;

impl ConfigReader for FileConfigReader {
    fn read_config(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::file_system(path, "read", e))
    }
}

/// Looks up per-domain configuration
pub trait DomainConfigProvider: Send + Sync {
    fn domain_config(&self, domain: &str) -> Result<DomainConfig>;
}

/// Resolves domain configuration from a YAML document
pub struct DomainConfigManager<R: ConfigReader = FileConfigReader> {
    reader: R,
    config_path: PathBuf,
}

impl DomainConfigManager<FileConfigReader> {
    /// Create a manager reading from the given file
    pub fn from_file(config_path: impl Into<PathBuf>) -> Self {
        Self::new(FileConfigReader, config_path)
    }
}

impl<R: ConfigReader> DomainConfigManager<R> {
    pub fn new(reader: R, config_path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            config_path: config_path.into(),
        }
    }

    /// Read, expand and parse the whole domains document
    pub fn load(&self) -> Result<DomainsConfig> {
        let data = self.reader.read_config(&self.config_path)?;
        let content = String::from_utf8(data).map_err(|e| {
            Error::parse_with_source(&self.config_path, "config is not valid UTF-8", e)
        })?;

        let expanded = expand_env(&content)?;

        let config: DomainsConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| Error::parse_with_source(&self.config_path, e.to_string(), e))?;

        debug!(
            path = %self.config_path.display(),
            domains = config.domains.len(),
            "Loaded domains config"
        );
        Ok(config)
    }
}

impl<R: ConfigReader> DomainConfigProvider for DomainConfigManager<R> {
    fn domain_config(&self, domain: &str) -> Result<DomainConfig> {
        let mut config = self.load()?;
        config
            .domains
            .remove(domain)
            .ok_or_else(|| Error::domain_not_found(domain))
    }
}

/// Expand `$VAR` and `${VAR}` references; undefined variables are an error
pub fn expand_env(content: &str) -> Result<String> {
    shellexpand::env(content)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| Error::environment(e.var_name, e.cause.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const DOMAINS_YAML: &str = r#"
domains:
  images.example.com:
    rclone:
      remote: "s3:images"
    security:
      validity_window: 300
      secrets:
        - key_id: v1
          secret: "${SHUTO_TEST_SECRET}"
"#;

    struct StaticReader(HashMap<PathBuf, String>);

    impl ConfigReader for StaticReader {
        fn read_config(&self, path: &Path) -> Result<Vec<u8>> {
            self.0
                .get(path)
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| {
                    Error::file_system(
                        path,
                        "read",
                        std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                    )
                })
        }
    }

    fn static_manager(content: &str) -> DomainConfigManager<StaticReader> {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("domains.yaml"), content.to_string());
        DomainConfigManager::new(StaticReader(files), "domains.yaml")
    }

    #[test]
    #[serial]
    fn test_domain_lookup_expands_env() {
        std::env::set_var("SHUTO_TEST_SECRET", "from-env");
        let manager = static_manager(DOMAINS_YAML);

        let domain = manager.domain_config("images.example.com").unwrap();
        assert_eq!(domain.rclone.remote, "s3:images");
        assert_eq!(domain.security.secrets[0].secret, "from-env");
        std::env::remove_var("SHUTO_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_undefined_variable_is_an_error() {
        std::env::remove_var("SHUTO_TEST_SECRET");
        let manager = static_manager(DOMAINS_YAML);

        let err = manager.domain_config("images.example.com").unwrap_err();
        assert!(matches!(err, Error::Environment { ref variable, .. } if variable == "SHUTO_TEST_SECRET"));
    }

    #[test]
    #[serial]
    fn test_unknown_domain() {
        std::env::set_var("SHUTO_TEST_SECRET", "x");
        let manager = static_manager(DOMAINS_YAML);

        let err = manager.domain_config("other.example.com").unwrap_err();
        assert!(matches!(err, Error::DomainNotFound { .. }));
        std::env::remove_var("SHUTO_TEST_SECRET");
    }

    #[test]
    fn test_invalid_yaml() {
        let manager = static_manager("domains: [not, a, map");
        assert!(matches!(manager.load(), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_file_reader_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("domains.yaml");
        std::fs::write(
            &path,
            "domains:\n  default:\n    rclone:\n      remote: \"local:/srv\"\n",
        )
        .unwrap();

        let manager = DomainConfigManager::from_file(&path);
        let domain = manager.domain_config("default").unwrap();
        assert_eq!(domain.rclone.remote, "local:/srv");
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = DomainConfigManager::from_file(temp_dir.path().join("nope.yaml"));
        assert!(matches!(manager.load(), Err(Error::FileSystem { .. })));
    }
}
