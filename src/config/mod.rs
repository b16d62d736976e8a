//! Configuration module for the supermodel server.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `supermodel.yaml`
//! - `SUPERMODEL_*` environment overrides and `.env` loading
//! - Validation of server configuration and deployment manifests

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{EncoderConfig, LongPollConfig, ServerConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
