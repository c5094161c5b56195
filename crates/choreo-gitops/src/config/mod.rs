//! Repository-level configuration.

pub mod release_config;

pub use release_config::{
    ConfigTier, OutputDefaults, ProjectOutputConfig, ReleaseConfig, RELEASE_CONFIG_FILE_NAME,
    RELEASE_CONFIG_KIND,
};
