//! Server configuration read from `SIDER_*` environment variables

use crate::auth::Credentials;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GRPC_ADDR: &str = "127.0.0.1:7777";
const DEFAULT_REST_ADDR: &str = "127.0.0.1:7778";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub grpc_addr: SocketAddr,
    pub rest_addr: SocketAddr,
    pub credentials: Credentials,
    /// Zero disables the background sweeper
    pub sweep_interval: Duration,
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_on_shutdown: bool,
}

impl ServerConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let grpc_addr = parse(
            "SIDER_GRPC_ADDR",
            var("SIDER_GRPC_ADDR").unwrap_or_else(|| DEFAULT_GRPC_ADDR.to_string()),
        )?;
        let rest_addr = parse(
            "SIDER_REST_ADDR",
            var("SIDER_REST_ADDR").unwrap_or_else(|| DEFAULT_REST_ADDR.to_string()),
        )?;

        let login = var("SIDER_LOGIN").ok_or(ConfigError::Missing("SIDER_LOGIN"))?;
        let password = var("SIDER_PASSWORD").ok_or(ConfigError::Missing("SIDER_PASSWORD"))?;

        let sweep_interval = match var("SIDER_SWEEP_INTERVAL") {
            Some(value) => Duration::from_secs(parse("SIDER_SWEEP_INTERVAL", value)?),
            None => Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        };

        let snapshot_on_shutdown = match var("SIDER_SNAPSHOT_ON_SHUTDOWN") {
            Some(value) => parse_bool("SIDER_SNAPSHOT_ON_SHUTDOWN", value)?,
            None => false,
        };

        Ok(Self {
            grpc_addr,
            rest_addr,
            credentials: Credentials::new(login, password),
            sweep_interval,
            snapshot_path: var("SIDER_SNAPSHOT_PATH").map(PathBuf::from),
            snapshot_on_shutdown,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const CREDENTIALS: [(&str, &str); 2] = [("SIDER_LOGIN", "john"), ("SIDER_PASSWORD", "doe")];

    #[test]
    fn test_defaults() {
        let config = config_from(&CREDENTIALS).unwrap();

        assert_eq!(config.grpc_addr, "127.0.0.1:7777".parse().unwrap());
        assert_eq!(config.rest_addr, "127.0.0.1:7778".parse().unwrap());
        assert_eq!(config.credentials.login(), "john");
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert!(config.snapshot_path.is_none());
        assert!(!config.snapshot_on_shutdown);
    }

    #[test]
    fn test_missing_credentials() {
        let err = config_from(&[("SIDER_LOGIN", "john")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SIDER_PASSWORD")));

        let err = config_from(&[("SIDER_LOGIN", " "), ("SIDER_PASSWORD", "doe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SIDER_LOGIN")));
    }

    #[test]
    fn test_overrides() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("SIDER_GRPC_ADDR", "0.0.0.0:9000"),
            ("SIDER_REST_ADDR", "0.0.0.0:9001"),
            ("SIDER_SWEEP_INTERVAL", "0"),
            ("SIDER_SNAPSHOT_PATH", "/var/lib/sider/dump"),
            ("SIDER_SNAPSHOT_ON_SHUTDOWN", "true"),
        ]);
        let config = config_from(&vars).unwrap();

        assert_eq!(config.grpc_addr.port(), 9000);
        assert_eq!(config.rest_addr.port(), 9001);
        assert!(config.sweep_interval.is_zero());
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/var/lib/sider/dump")));
        assert!(config.snapshot_on_shutdown);
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("SIDER_SWEEP_INTERVAL", "soon"));
        assert!(matches!(
            config_from(&vars).unwrap_err(),
            ConfigError::Invalid { name: "SIDER_SWEEP_INTERVAL", .. }
        ));

        let mut vars = CREDENTIALS.to_vec();
        vars.push(("SIDER_GRPC_ADDR", "localhost"));
        assert!(matches!(
            config_from(&vars).unwrap_err(),
            ConfigError::Invalid { name: "SIDER_GRPC_ADDR", .. }
        ));

        let mut vars = CREDENTIALS.to_vec();
        vars.push(("SIDER_SNAPSHOT_ON_SHUTDOWN", "maybe"));
        assert!(config_from(&vars).is_err());
    }
}
