//! Server configuration
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! `BOARD_*` environment variables (a `.env` file is honored), then CLI flags.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::net::ServerAddress;

pub const DEFAULT_PORT: u16 = 1337;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interface to listen on
    pub host: IpAddr,

    pub port: u16,

    /// Where the board document is persisted
    pub data_file: PathBuf,

    /// Address reported to clients in `init_data`; overrides discovery
    pub advertise_ip: Option<IpAddr>,

    /// Look up the LAN address when `advertise_ip` is unset
    pub discover_ip: bool,

    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            data_file: PathBuf::from("data.json"),
            advertise_ip: None,
            discover_ip: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `file` if given, then the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Override fields from `BOARD_*` variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BOARD_HOST") {
            self.host = host.parse().context("BOARD_HOST is not an IP address")?;
        }
        if let Some(port) = lookup("BOARD_PORT") {
            self.port = port.parse().context("BOARD_PORT is not a port number")?;
        }
        if let Some(path) = lookup("BOARD_DATA_FILE") {
            self.data_file = PathBuf::from(path);
        }
        if let Some(ip) = lookup("BOARD_ADVERTISE_IP") {
            self.advertise_ip = Some(ip.parse().context("BOARD_ADVERTISE_IP is not an IP address")?);
        }
        if let Some(flag) = lookup("BOARD_DISCOVER_IP") {
            self.discover_ip = parse_flag(&flag).context("BOARD_DISCOVER_IP must be true or false")?;
        }
        if let Some(level) = lookup("BOARD_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn server_address(&self) -> ServerAddress {
        match (self.advertise_ip, self.discover_ip) {
            (Some(ip), _) => ServerAddress::Fixed(ip),
            (None, true) => ServerAddress::Discover,
            (None, false) => ServerAddress::Loopback,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:1337");
        assert_eq!(config.server_address(), ServerAddress::Discover);
    }

    #[test]
    fn test_toml_file_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("board.toml");
        std::fs::write(&path, "port = 8080\ndata_file = \"/var/lib/board/state.json\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_file, PathBuf::from("/var/lib/board/state.json"));
        assert_eq!(config.host, Config::default().host);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("BOARD_HOST", "127.0.0.1"),
                ("BOARD_PORT", "4000"),
                ("BOARD_ADVERTISE_IP", "10.1.2.3"),
                ("BOARD_LOG", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:4000");
        assert_eq!(
            config.server_address(),
            ServerAddress::Fixed("10.1.2.3".parse().unwrap())
        );
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_discovery_can_be_disabled() {
        let mut config = Config::default();
        config.apply_env(env(&[("BOARD_DISCOVER_IP", "off")])).unwrap();
        assert_eq!(config.server_address(), ServerAddress::Loopback);
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("BOARD_PORT", "http")])).is_err());
        assert!(config.apply_env(env(&[("BOARD_DISCOVER_IP", "maybe")])).is_err());
    }
}
