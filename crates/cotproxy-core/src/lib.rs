//! Shared configuration, error taxonomy, and transform types for COTProxy.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigOverrides, FileConfig, ProxyConfig};
pub use error::ConfigError;
pub use types::{TfLookup, TransformRule, VideoRule};
