use std::path::{Path, PathBuf};

use fleet_core::{DEFAULT_DEVICES_CSV, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Top-level TOML configuration file structure.
/// Every key is optional; command-line flags and environment variables
/// take precedence over anything set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub devices: DevicesSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicesSection {
    pub csv: Option<PathBuf>,
}

/// Load a FleetConfig from a TOML file on disk.
pub fn load_config(path: &Path) -> anyhow::Result<FleetConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: FleetConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load the config file if it exists. A missing or unparsable file falls
/// back to defaults; neither stops the server from starting.
pub fn load_or_default(path: &Path) -> FleetConfig {
    if !path.exists() {
        info!(path = %path.display(), "No config file found, using defaults");
        return FleetConfig::default();
    }

    match load_config(path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded configuration from disk");
            config
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to load config file (starting with defaults)"
            );
            FleetConfig::default()
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub csv: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Effective server settings after merging every source.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub devices_csv: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// flag/env > config file > built-in default
    pub fn resolve(overrides: Overrides, file: FleetConfig) -> Self {
        Self {
            devices_csv: overrides
                .csv
                .or(file.devices.csv)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICES_CSV)),
            host: overrides
                .host
                .or(file.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::resolve(Overrides::default(), FleetConfig::default());
        assert_eq!(settings.devices_csv, PathBuf::from("devices.csv"));
        assert_eq!(settings.listen_addr(), "0.0.0.0:6733");
    }

    #[test]
    fn overrides_beat_config_file() {
        let file: FleetConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [devices]
            csv = "/etc/fleet/devices.csv"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            port: Some(7000),
            ..Default::default()
        };
        let settings = Settings::resolve(overrides, file);

        assert_eq!(settings.port, 7000);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.devices_csv, PathBuf::from("/etc/fleet/devices.csv"));
    }

    #[test]
    fn partial_config_file() {
        let file: FleetConfig = toml::from_str("[server]\nport = 8081\n").unwrap();
        let settings = Settings::resolve(Overrides::default(), file);
        assert_eq!(settings.listen_addr(), "0.0.0.0:8081");
    }

    #[test]
    fn load_or_default_handles_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("fleet.toml");
        assert!(load_or_default(&missing).server.port.is_none());

        let broken = dir.path().join("broken.toml");
        let mut f = std::fs::File::create(&broken).unwrap();
        writeln!(f, "[server\nport = ").unwrap();
        assert!(load_config(&broken).is_err());
        assert!(load_or_default(&broken).devices.csv.is_none());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[devices]\ncsv = \"fleet.csv\"\n").unwrap();
        assert_eq!(
            load_or_default(&good).devices.csv,
            Some(PathBuf::from("fleet.csv"))
        );
    }
}
