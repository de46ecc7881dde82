//! Configuration parser for loading resource files.
//!
//! This module handles loading the resource file from YAML and applying
//! environment variable overrides, with proper precedence and error handling.

use crate::error::{ConfigError, ProviderError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::{Credential, ResourceConfig};

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";

/// Configuration parser for loading resource files.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ResourceConfig> {
        let path = path.as_ref();
        info!("Loading resource file from: {}", path.display());

        if !path.exists() {
            return Err(ProviderError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ResourceConfig> {
        debug!("Parsing YAML resource file");

        let config: ResourceConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ProviderError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed resource: {}", config.resource.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ResourceConfig> {
        let mut config = self.load_file(path)?;

        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides<F>(config: &mut ResourceConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
            debug!("Using API token from {TOKEN_ENV}");
            config.image.token = Credential::new(token);
        }

        if let Some(name) = lookup("HCLOUD_IMAGE_RESOURCE_NAME") {
            debug!("Overriding resource.name from environment");
            config.resource.name = name;
        }

        if let Some(endpoint) = lookup("HCLOUD_ENDPOINT") {
            debug!("Overriding provider.endpoint from environment");
            config.provider.endpoint = endpoint;
        }

        if let Some(command) = lookup("HCLOUD_UPLOAD_IMAGE_BIN") {
            debug!("Overriding provider.upload_command from environment");
            config.provider.upload_command = command;
        }
    }

    /// Loads the `.env` file from the base path, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            debug!("Loading .env file from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ProviderError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the API token from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not set.
    pub fn get_token() -> Result<Credential> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or_else(|| {
                ProviderError::Config(ConfigError::MissingEnvVar {
                    name: String::from(TOKEN_ENV),
                })
            })
    }
}

/// Default resource file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "hcloud-image.yaml",
    "hcloud-image.yml",
    "image.yaml",
    "image.yml",
];

/// Finds the resource file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no resource file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found resource file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ProviderError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
resource:
  name: talos-x86
image:
  image_url: https://example.com/talos-amd64.raw.xz
  architecture: x86
";

    #[test]
    fn test_parse_minimal_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(MINIMAL, None).expect("valid config");

        assert_eq!(config.resource.name, "talos-x86");
        assert_eq!(config.image.architecture, "x86");
        assert_eq!(config.image.compression.as_deref(), Some("none"));
        assert_eq!(config.provider.upload_command, "hcloud-upload-image");
        assert!(config.state.path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
resource:
  name: talos-arm
state:
  path: .state
provider:
  endpoint: http://localhost:8080/v1
  upload_command: /usr/local/bin/hcloud-upload-image
  timeout_secs: 10
image:
  token: abc
  image_url: https://example.com/talos-arm64.raw.xz
  compression: xz
  format: raw
  image_size: 1073741824
  architecture: arm
  server_type: cax11
  description: "Talos 1.7"
  labels:
    os: talos
    version: "1.7"
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("valid config");

        assert_eq!(config.image.token.expose(), "abc");
        assert_eq!(config.image.server_type.as_deref(), Some("cax11"));
        assert_eq!(config.image.image_size, Some(1_073_741_824));
        assert_eq!(config.image.labels.len(), 2);
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.state.path.as_deref(), Some(".state"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("resource: [", None);
        assert!(matches!(
            result,
            Err(ProviderError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_token_wins() {
        let parser = ConfigParser::new();
        let mut config = parser.parse_yaml(MINIMAL, None).expect("valid config");
        config.image.token = Credential::new("from-file");

        ConfigParser::apply_env_overrides(&mut config, |name| match name {
            TOKEN_ENV => Some(String::from("from-env")),
            "HCLOUD_ENDPOINT" => Some(String::from("http://127.0.0.1:1/v1")),
            _ => None,
        });

        assert_eq!(config.image.token.expose(), "from-env");
        assert_eq!(config.provider.endpoint, "http://127.0.0.1:1/v1");
        assert_eq!(config.resource.name, "talos-x86");
    }

    #[test]
    fn test_empty_env_token_ignored() {
        let parser = ConfigParser::new();
        let mut config = parser.parse_yaml(MINIMAL, None).expect("valid config");
        config.image.token = Credential::new("from-file");

        ConfigParser::apply_env_overrides(&mut config, |name| {
            (name == TOKEN_ENV).then(String::new)
        });

        assert_eq!(config.image.token.expose(), "from-file");
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("create dirs");
        std::fs::write(dir.path().join("hcloud-image.yaml"), MINIMAL).expect("write file");

        let found = find_config_file(&nested).expect("file found");
        assert_eq!(found, dir.path().join("hcloud-image.yaml"));
    }
}
