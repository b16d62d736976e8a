//! Configuration parser for loading server configuration.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with environment values taking precedence.

use crate::error::{ConfigError, Result, SuperModelError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::spec::ServerConfig;

/// Configuration parser for loading server configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for `.env` and relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// A relative `deployments` path is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ServerConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(SuperModelError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SuperModelError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;
        if let (Some(deployments), Some(dir)) = (&config.deployments, path.parent()) {
            if deployments.is_relative() {
                config.deployments = Some(dir.join(deployments));
            }
        }
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ServerConfig> {
        debug!("Parsing YAML configuration");

        // serde_yaml reads an empty document as unit, not as an empty map.
        if content.trim().is_empty() {
            return Ok(ServerConfig::default());
        }

        let config: ServerConfig = serde_yaml::from_str(content).map_err(|e| {
            SuperModelError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!(
            environment = %config.zone.environment,
            region = %config.zone.region,
            "Successfully parsed configuration"
        );
        Ok(config)
    }

    /// Loads configuration, or defaults when `path` is `None`, and applies
    /// environment variable overrides.
    ///
    /// Environment variables have the form `SUPERMODEL_<KEY>`
    /// (e.g. `SUPERMODEL_ENVIRONMENT`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is not a valid number.
    pub fn load_with_env(&self, path: Option<&Path>) -> Result<ServerConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => ServerConfig::default(),
        };

        Self::apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a numeric override does not parse.
    pub fn apply_overrides(
        config: &mut ServerConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(environment) = lookup("SUPERMODEL_ENVIRONMENT") {
            debug!("Overriding zone.environment from environment");
            config.zone.environment = environment;
        }

        if let Some(region) = lookup("SUPERMODEL_REGION") {
            debug!("Overriding zone.region from environment");
            config.zone.region = region;
        }

        if let Some(deployments) = lookup("SUPERMODEL_DEPLOYMENTS") {
            debug!("Overriding deployments from environment");
            config.deployments = Some(PathBuf::from(deployments));
        }

        if let Some(ms) = parse_override(&lookup, "SUPERMODEL_DEFAULT_TIMEOUT_MS")? {
            config.long_poll.default_timeout_ms = ms;
        }

        if let Some(ms) = parse_override(&lookup, "SUPERMODEL_MAX_TIMEOUT_MS")? {
            config.long_poll.max_timeout_ms = ms;
        }

        if let Some(quality) = parse_override(&lookup, "SUPERMODEL_BROTLI_QUALITY")? {
            config.encoder.brotli_quality = quality;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                SuperModelError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    debug!("Overriding {name} from environment");
    raw.trim().parse().map(Some).map_err(|_| {
        SuperModelError::Config(ConfigError::validation(
            format!("'{raw}' is not a valid number"),
            name,
        ))
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["supermodel.yaml", "supermodel.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(SuperModelError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
