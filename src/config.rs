use crate::pairing::{MatchMode, RouterConfig, SignalPolicy, UnpairedChatPolicy};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_INDEX_PATH: &str = "static/index.html";
pub const DEFAULT_JAEGER_ENDPOINT: &str = "http://jaeger:14268/api/traces";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub router: RouterConfig,
    pub index_path: PathBuf,
    pub log_format: LogFormat,
    pub enable_telemetry: bool,
    /// Collector that spans are exported to when telemetry is enabled.
    pub jaeger_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            router: RouterConfig::default(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            log_format: LogFormat::default(),
            enable_telemetry: false,
            jaeger_endpoint: DEFAULT_JAEGER_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            router: RouterConfig {
                match_mode: parse_or(&lookup, "MATCH_MODE", defaults.router.match_mode)?,
                unpaired_chat: parse_or(&lookup, "UNPAIRED_CHAT", defaults.router.unpaired_chat)?,
                signal_policy: parse_or(&lookup, "SIGNAL_POLICY", defaults.router.signal_policy)?,
            },
            index_path: lookup("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
            enable_telemetry: parse_or(&lookup, "ENABLE_TELEMETRY", defaults.enable_telemetry)?,
            jaeger_endpoint: lookup("JAEGER_ENDPOINT")
                .map(|endpoint| endpoint.trim().to_string())
                .filter(|endpoint| !endpoint.is_empty())
                .unwrap_or(defaults.jaeger_endpoint),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

impl FromStr for MatchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(MatchMode::Auto),
            "opt-in" | "opt_in" | "optin" => Ok(MatchMode::OptIn),
            _ => Err(()),
        }
    }
}

impl FromStr for UnpairedChatPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "echo" => Ok(UnpairedChatPolicy::Echo),
            "broadcast" => Ok(UnpairedChatPolicy::Broadcast),
            _ => Err(()),
        }
    }
}

impl FromStr for SignalPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(SignalPolicy::AnyTarget),
            "partner-only" | "partner_only" => Ok(SignalPolicy::PartnerOnly),
            _ => Err(()),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}
