//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    Components(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Components(msg) => write!(f, "Invalid components: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

/// Parse configuration from a TOML file.
///
/// Semantic validation is left to the caller, which runs it once the
/// command-line overrides are applied.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<(ServerConfig, ConfigSource), ConfigError> {
    match load_config(path) {
        Ok(config) => Ok((config, ConfigSource::File)),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok((ServerConfig::default(), ConfigSource::Defaults))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("strategy-server-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_valid_file() {
        let path = temp_file("valid.toml", "host = \"0.0.0.0\"\nport = 7000\nstore = \"memory://\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7000);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn reports_parse_errors() {
        let path = temp_file("broken.toml", "port = \"not a number\"");
        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn parses_without_validating() {
        let path = temp_file("unvalidated.toml", "port = 65535\nstore = \"ftp://x\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.port, 65535);
        assert_eq!(config.store, "ftp://x");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("strategy-server-does-not-exist.toml");
        let (config, source) = load_or_default(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[test]
    fn existing_file_reports_file_source() {
        let path = temp_file("source.toml", "port = 7001\n");
        let (config, source) = load_or_default(&path).unwrap();
        assert_eq!(config.port, 7001);
        assert_eq!(source, ConfigSource::File);
        let _ = fs::remove_file(path);
    }
}
