//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating the proxy configuration.
///
/// All of these are fatal at startup; the pipeline cannot run with a
/// malformed listen or outbound endpoint.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL option could not be parsed at all.
    #[error("invalid URL for {option}: {source}")]
    InvalidUrl {
        option: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// A URL parsed but carries a scheme the option does not accept.
    #[error("unsupported scheme '{scheme}' for {option} (expected one of {expected})")]
    UnsupportedScheme {
        option: &'static str,
        scheme: String,
        expected: &'static str,
    },

    /// A network URL is missing its host or port.
    #[error("missing host or port in {option}: {url}")]
    MissingHostPort { option: &'static str, url: String },

    /// The config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    ParseFile(#[from] serde_yaml::Error),
}
