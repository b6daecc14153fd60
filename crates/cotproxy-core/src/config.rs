//! Proxy configuration surface.
//!
//! Options arrive from three places, in descending precedence: CLI flags /
//! environment variables, an optional YAML config file, and built-in
//! defaults. The merged result is validated once at startup and handed to
//! each component by reference; there is no ambient global configuration.

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Default ingest bind endpoint.
pub const DEFAULT_LISTEN_URL: &str = "udp://0.0.0.0:8087";
/// Default transform registry base URL.
pub const DEFAULT_CPAPI_URL: &str = "http://localhost:10415/";
/// Default outbound CoT endpoint (ATAK default multicast).
pub const DEFAULT_COT_URL: &str = "udp://239.2.3.1:6969";

/// Options as they appear in a YAML config file. Every field is optional;
/// anything absent falls through to the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen_url: Option<String>,
    pub cpapi_url: Option<String>,
    pub cot_url: Option<String>,
    pub pass_all: Option<bool>,
    pub auto_add: Option<bool>,
    pub debug: Option<bool>,
}

impl FileConfig {
    /// Parse a YAML config file body.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Overrides collected from CLI flags and environment variables. These win
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen_url: Option<String>,
    pub cpapi_url: Option<String>,
    pub cot_url: Option<String>,
    pub pass_all: Option<bool>,
    pub auto_add: Option<bool>,
    pub debug: Option<bool>,
}

/// Validated, merged proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Ingest bind endpoint, `tcp://` or `udp://`.
    pub listen_url: Url,
    /// Transform registry base URL, `http://` or `https://`.
    pub cpapi_url: Url,
    /// Outbound CoT endpoint, `tcp://` or `udp://`.
    pub cot_url: Url,
    /// Relay events even when no transform decision could be made.
    pub pass_all: bool,
    /// Auto-register unknown identities with the registry on first sighting.
    pub auto_add: bool,
    /// Lower the default log filter to debug.
    pub debug: bool,
}

impl ProxyConfig {
    /// Merge overrides over the file config over defaults, then validate.
    pub fn resolve(
        file: Option<FileConfig>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let listen_url = overrides
            .listen_url
            .or(file.listen_url)
            .unwrap_or_else(|| DEFAULT_LISTEN_URL.to_string());
        let cpapi_url = overrides
            .cpapi_url
            .or(file.cpapi_url)
            .unwrap_or_else(|| DEFAULT_CPAPI_URL.to_string());
        let cot_url = overrides
            .cot_url
            .or(file.cot_url)
            .unwrap_or_else(|| DEFAULT_COT_URL.to_string());

        let config = Self {
            listen_url: parse_net_url("LISTEN_URL", &listen_url)?,
            cpapi_url: parse_http_url("CPAPI_URL", &cpapi_url)?,
            cot_url: parse_net_url("COT_URL", &cot_url)?,
            pass_all: overrides.pass_all.or(file.pass_all).unwrap_or(false),
            auto_add: overrides.auto_add.or(file.auto_add).unwrap_or(false),
            debug: overrides.debug.or(file.debug).unwrap_or(false),
        };
        Ok(config)
    }
}

/// Extract the `host:port` pair from a validated network URL.
pub fn host_port(option: &'static str, url: &Url) -> Result<(String, u16), ConfigError> {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => Ok((host.to_string(), port)),
        _ => Err(ConfigError::MissingHostPort {
            option,
            url: url.to_string(),
        }),
    }
}

fn parse_net_url(option: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = parse_url(option, raw)?;
    match url.scheme() {
        "tcp" | "udp" => {}
        scheme => {
            return Err(ConfigError::UnsupportedScheme {
                option,
                scheme: scheme.to_string(),
                expected: "tcp, udp",
            })
        }
    }
    // Catch a missing port now rather than at bind time.
    host_port(option, &url)?;
    Ok(url)
}

fn parse_http_url(option: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = parse_url(option, raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::UnsupportedScheme {
            option,
            scheme: scheme.to_string(),
            expected: "http, https",
        }),
    }
}

fn parse_url(option: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { option, source })
}
