//! Process configuration, read from `MEASURE_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::metrics::SortKey;

const DEFAULT_QUANTILE: f64 = 0.95;
const DEFAULT_STREAM_INTERVAL_MS: u64 = 500;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var}: invalid socket address {value:?}")]
    Addr { var: &'static str, value: String },
    #[error("{var}: expected true/false/1/0, got {value:?}")]
    Bool { var: &'static str, value: String },
    #[error("{var}: expected a number between 0 and 1, got {value:?}")]
    Quantile { var: &'static str, value: String },
    #[error("{var}: expected a positive integer, got {value:?}")]
    Interval { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub addr: SocketAddr,
    /// Start with measurement switched off.
    pub disabled: bool,
    /// Quantile reported in the `p95` column.
    pub quantile: f64,
    /// Tick of the SSE stats stream.
    pub stream_interval: Duration,
    /// Sort column used by `/stats` when the request names none.
    pub default_sort: SortKey,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            disabled: false,
            quantile: DEFAULT_QUANTILE,
            stream_interval: Duration::from_millis(DEFAULT_STREAM_INTERVAL_MS),
            default_sort: SortKey::Sum,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; unset variables take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let addr = match get("MEASURE_ADDR") {
            Some(v) => v.parse().map_err(|_| ConfigError::Addr {
                var: "MEASURE_ADDR",
                value: v.clone(),
            })?,
            None => default_addr(),
        };

        let disabled = match get("MEASURE_DISABLED") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Bool {
                var: "MEASURE_DISABLED",
                value: v,
            })?,
            None => false,
        };

        let quantile = match get("MEASURE_QUANTILE") {
            Some(v) => v
                .parse::<f64>()
                .ok()
                .filter(|q| (0.0..=1.0).contains(q))
                .ok_or(ConfigError::Quantile {
                    var: "MEASURE_QUANTILE",
                    value: v,
                })?,
            None => DEFAULT_QUANTILE,
        };

        let stream_interval = match get("MEASURE_STREAM_INTERVAL_MS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::Interval {
                    var: "MEASURE_STREAM_INTERVAL_MS",
                    value: v,
                })?,
            None => Duration::from_millis(DEFAULT_STREAM_INTERVAL_MS),
        };

        let default_sort = get("MEASURE_DEFAULT_SORT")
            .map(|v| SortKey::parse(&v))
            .unwrap_or_default();

        Ok(Self {
            addr,
            disabled,
            quantile,
            stream_interval,
            default_sort,
        })
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
