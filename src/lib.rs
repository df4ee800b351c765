//! Shared configuration for the sitesync workspace.
//!
//! The `sitesync-installer` crate consumes [`SiteConfig`] to locate releases,
//! lay out the content directory, and choose the server port.

pub mod config;

pub use config::{
    CONFIG_FILE_NAME, ConfigError, LayoutConfig, ReleaseConfig, ServerConfig, SiteConfig,
};
