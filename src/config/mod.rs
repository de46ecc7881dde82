//! Configuration module for the image provider.
//!
//! This module handles all configuration-related functionality:
//! - The desired image specification and the resource file layout
//! - Parsing `hcloud-image.yaml` and applying environment overrides
//! - Validation of resource files
//! - Computing spec hashes for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    Credential, ImageSpec, ProviderSettings, ResourceConfig, ResourceMeta, StateConfig,
    DEFAULT_COMPRESSION, DEFAULT_FORMAT,
};
pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES, TOKEN_ENV};
pub use validator::{ConfigValidator, ValidationIssue, ValidationResult};
pub use hash::SpecHasher;
