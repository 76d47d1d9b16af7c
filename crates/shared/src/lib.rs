//! Shared library for the Liferay connector workspace.
//!
//! This crate provides the ambient functionality used by the connector binary:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::{ArchiveMode, Config};
pub use logging::LogConfig;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
