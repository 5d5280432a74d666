//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program.
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
    /// The poll interval is zero
    #[error("poll_interval_seconds must be greater than zero")]
    ZeroPollInterval,
    /// The endpoint is not an absolute http(s) URI
    #[error("uri is not a valid http(s) URI: {0}")]
    InvalidUri(String),
}

fn default_uri() -> String {
    String::from("http://localhost:9010")
}

fn default_poll_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    1_000
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// The endpoint serving the Prometheus text exposition payload
    #[serde(default = "default_uri")]
    pub uri: String,
    /// Seconds between two scrapes of `uri`
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Upper bound on a single scrape request, in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_milliseconds: u64,
    /// Metric identifiers to display. Leave unset to display all metrics.
    pub metrics: Option<Vec<String>>,
    /// The method by which to express promdash's own telemetry
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub telemetry: Option<Telemetry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            poll_interval_seconds: default_poll_interval(),
            request_timeout_milliseconds: default_request_timeout(),
            metrics: None,
            telemetry: None,
        }
    }
}

impl Config {
    /// The poll interval as a [`Duration`]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// The request timeout as a [`Duration`]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_milliseconds)
    }

    /// Check the values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll interval is zero or the URI is not an
    /// absolute http(s) URI.
    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_interval_seconds == 0 {
            return Err(Error::ZeroPollInterval);
        }
        self.endpoint().map(drop)
    }

    /// The endpoint as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `uri` is not an absolute http(s) URI.
    pub fn endpoint(&self) -> Result<reqwest::Url, Error> {
        match reqwest::Url::parse(&self.uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            _ => Err(Error::InvalidUri(self.uri.clone())),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
/// Defines the manner of promdash's own telemetry.
pub enum Telemetry {
    /// In prometheus mode promdash will emit its internal telemetry for
    /// scraping at a prometheus poll endpoint.
    Prometheus {
        /// Address and port for prometheus exporter
        addr: SocketAddr,
        /// Additional labels to include in every metric
        #[serde(default)]
        global_labels: FxHashMap<String, String>,
    },
}

/// Parse configuration from YAML text.
///
/// # Errors
///
/// Returns an error if the YAML is invalid or names unknown fields.
pub fn load_config_from_str(contents: &str) -> Result<Config, Error> {
    // An empty document deserializes to unit, not to an empty map.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(contents).map_err(Error::from)
}

/// Read and parse the configuration file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid
/// configuration.
pub fn load_config_from_path(path: &Path) -> Result<Config, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    load_config_from_str(&contents)
}
